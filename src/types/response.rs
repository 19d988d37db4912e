//! Frame response sent back over the session transport.

use serde::{Deserialize, Serialize};

/// Overall status of one frame response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseStatus {
    Monitoring,
    Alert,
    Fallback,
}

/// One JSON object per admitted frame: `{status, sign, caption, report, voiceReady}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FrameResponse {
    pub status: ResponseStatus,
    pub sign: String,
    pub caption: String,
    pub report: String,
    pub voice_ready: bool,
}

impl FrameResponse {
    pub fn monitoring(sign: impl Into<String>, caption: impl Into<String>) -> Self {
        Self {
            status: ResponseStatus::Monitoring,
            sign: sign.into(),
            caption: caption.into(),
            report: String::new(),
            voice_ready: false,
        }
    }

    /// Classifier call failed or timed out.
    pub fn classifier_offline() -> Self {
        Self {
            status: ResponseStatus::Fallback,
            sign: "Unknown".to_string(),
            caption: "Vision System Offline - Checking Connection...".to_string(),
            report: String::new(),
            voice_ready: false,
        }
    }

    /// Unexpected error while processing one frame.
    pub fn processing_error(detail: impl Into<String>) -> Self {
        Self {
            status: ResponseStatus::Fallback,
            sign: "Error".to_string(),
            caption: "System Error - Processing Halted".to_string(),
            report: detail.into(),
            voice_ready: false,
        }
    }
}
