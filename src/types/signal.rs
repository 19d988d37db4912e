//! Per-frame perception types.

use serde::{Deserialize, Serialize};

/// A single tagged classification produced by the classifier for one frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    pub tag: String,
    /// Probability in `[0, 1]`.
    pub probability: f64,
}

impl Detection {
    pub fn new(tag: impl Into<String>, probability: f64) -> Self {
        Self {
            tag: tag.into(),
            probability,
        }
    }
}

/// Free-text scene description with the generator's confidence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Caption {
    pub text: String,
    pub confidence: f64,
}

impl Caption {
    pub fn new(text: impl Into<String>, confidence: f64) -> Self {
        Self {
            text: text.into(),
            confidence,
        }
    }
}

/// Raw analysis of one frame as returned by a [`crate::collaborators::Classifier`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClassifierResult {
    #[serde(default)]
    pub detections: Vec<Detection>,
    #[serde(default)]
    pub captions: Vec<Caption>,
}

impl ClassifierResult {
    /// Result with a single zero-confidence caption and no detections.
    pub fn caption_only(text: impl Into<String>) -> Self {
        Self {
            detections: Vec::new(),
            captions: vec![Caption::new(text, 0.0)],
        }
    }
}

/// Normalized one-tag-plus-caption summary of a frame.
///
/// Ephemeral: recomputed for every admitted frame and discarded once folded
/// into the rolling window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameSignal {
    pub primary_tag: String,
    pub caption: String,
}

/// Judgment of the temporal voter over the current rolling window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Normal,
    Alarm,
}

impl Verdict {
    pub fn is_alarm(self) -> bool {
        matches!(self, Verdict::Alarm)
    }
}

impl std::fmt::Display for Verdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Verdict::Normal => write!(f, "NORMAL"),
            Verdict::Alarm => write!(f, "ALARM"),
        }
    }
}
