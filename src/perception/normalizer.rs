//! Signal Normalizer
//!
//! Reduces one [`ClassifierResult`] to a [`FrameSignal`]: the highest-probability
//! detection above the acceptance threshold becomes the frame's tag, and the
//! first caption becomes its scene description. Missing data degrades to the
//! neutral tag and the placeholder caption; there is no error path.

use crate::config::TemporalConfig;
use crate::types::{ClassifierResult, FrameSignal};

/// Stateless per-frame normalizer.
#[derive(Debug, Clone)]
pub struct SignalNormalizer {
    acceptance_probability: f64,
    neutral_tag: String,
    placeholder_caption: String,
}

impl SignalNormalizer {
    pub fn new(config: &TemporalConfig) -> Self {
        Self {
            acceptance_probability: config.acceptance_probability,
            neutral_tag: config.neutral_tag.clone(),
            placeholder_caption: config.placeholder_caption.clone(),
        }
    }

    pub fn normalize(&self, result: &ClassifierResult) -> FrameSignal {
        // NaN probabilities never win the max and never pass the threshold.
        let best = result
            .detections
            .iter()
            .filter(|d| !d.probability.is_nan())
            .max_by(|a, b| a.probability.total_cmp(&b.probability));

        let primary_tag = match best {
            Some(d) if d.probability > self.acceptance_probability => d.tag.clone(),
            _ => self.neutral_tag.clone(),
        };

        let caption = result
            .captions
            .first()
            .map_or_else(|| self.placeholder_caption.clone(), |c| c.text.clone());

        FrameSignal {
            primary_tag,
            caption,
        }
    }
}

impl Default for SignalNormalizer {
    fn default() -> Self {
        Self::new(&TemporalConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Caption, Detection};

    fn result(detections: Vec<Detection>, captions: Vec<Caption>) -> ClassifierResult {
        ClassifierResult {
            detections,
            captions,
        }
    }

    #[test]
    fn test_highest_probability_detection_wins() {
        let n = SignalNormalizer::default();
        let signal = n.normalize(&result(
            vec![Detection::new("WAVE", 0.6), Detection::new("HELP", 0.9)],
            vec![Caption::new("a person raising a hand", 0.8)],
        ));
        assert_eq!(signal.primary_tag, "HELP");
        assert_eq!(signal.caption, "a person raising a hand");
    }

    #[test]
    fn test_threshold_is_strict() {
        let n = SignalNormalizer::default();
        let signal = n.normalize(&result(vec![Detection::new("HELP", 0.5)], vec![]));
        assert_eq!(signal.primary_tag, "Neutral");

        let signal = n.normalize(&result(vec![Detection::new("HELP", 0.51)], vec![]));
        assert_eq!(signal.primary_tag, "HELP");
    }

    #[test]
    fn test_empty_result_degrades_to_placeholders() {
        let n = SignalNormalizer::default();
        let signal = n.normalize(&ClassifierResult::default());
        assert_eq!(signal.primary_tag, "Neutral");
        assert_eq!(signal.caption, "Monitoring...");
    }

    #[test]
    fn test_only_first_caption_is_used() {
        let n = SignalNormalizer::default();
        let signal = n.normalize(&result(
            vec![],
            vec![Caption::new("first", 0.2), Caption::new("second", 0.9)],
        ));
        assert_eq!(signal.caption, "first");
    }

    #[test]
    fn test_nan_probability_is_ignored() {
        let n = SignalNormalizer::default();
        let signal = n.normalize(&result(
            vec![Detection::new("HELP", f64::NAN), Detection::new("WAVE", 0.7)],
            vec![],
        ));
        assert_eq!(signal.primary_tag, "WAVE");
    }
}
