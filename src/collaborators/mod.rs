//! External Collaborators
//!
//! The aggregation core talks to three remote services through narrow async
//! traits:
//!
//! - [`Classifier`]: frame bytes to detections and captions
//! - [`Reasoner`]: validation, severity scoring and SBAR report text
//! - [`Synthesizer`]: alert text to a playable audio artifact
//!
//! Each trait has an HTTP implementation (Azure Vision, Gemini, Azure Speech)
//! and an offline implementation. Which one is used is decided once at
//! startup by [`Capabilities::resolve`]; business logic never checks for
//! credentials itself.

use async_trait::async_trait;
use std::future::Future;
use std::time::Duration;

use crate::types::{ClassifierResult, UserMetadata};

mod capabilities;
pub mod llm;
pub mod offline;
pub mod parsing;
mod reasoner;
pub mod speech;
pub mod vision;

pub use capabilities::{Capabilities, CapabilityReport, Credentials};
pub use llm::{GeminiBackend, LlmBackend};
pub use offline::{OfflineClassifier, OfflineReasoner, OfflineSynthesizer};
pub use reasoner::LlmReasoner;
pub use speech::AzureSpeechSynthesizer;
pub use vision::AzureVisionClassifier;

// ============================================================================
// Error Type
// ============================================================================

/// Failure of one collaborator call.
///
/// Callers never propagate these past the escalation pipeline or the session
/// loop; every variant maps onto a degradation sentinel.
#[derive(Debug, thiserror::Error)]
pub enum CollaboratorError {
    #[error("{0} is not configured")]
    Unavailable(&'static str),
    #[error("{service} timed out after {}ms", .after.as_millis())]
    Timeout {
        service: &'static str,
        after: Duration,
    },
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("{service} returned status {status}: {body}")]
    Status {
        service: &'static str,
        status: u16,
        body: String,
    },
    #[error("Unexpected response: {0}")]
    Parse(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl CollaboratorError {
    pub fn is_unavailable(&self) -> bool {
        matches!(self, CollaboratorError::Unavailable(_))
    }
}

/// Run a collaborator call under a deadline.
pub async fn with_timeout<T, F>(
    service: &'static str,
    after: Duration,
    call: F,
) -> Result<T, CollaboratorError>
where
    F: Future<Output = Result<T, CollaboratorError>>,
{
    match tokio::time::timeout(after, call).await {
        Ok(result) => result,
        Err(_) => Err(CollaboratorError::Timeout { service, after }),
    }
}

/// Truncate a response body for inclusion in an error message.
pub(crate) fn body_excerpt(body: &str) -> String {
    const MAX: usize = 200;
    if body.len() <= MAX {
        return body.to_string();
    }
    let mut end = MAX;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &body[..end])
}

// ============================================================================
// Traits
// ============================================================================

/// Image classifier plus scene-description generator.
#[async_trait]
pub trait Classifier: Send + Sync {
    /// Analyze one frame. May fail or return an empty result.
    async fn classify(&self, frame: &[u8]) -> Result<ClassifierResult, CollaboratorError>;

    /// Name for logging and the status endpoint.
    fn name(&self) -> &'static str;
}

/// Plain text-in/text-out reasoning service.
#[async_trait]
pub trait Reasoner: Send + Sync {
    /// Expected to contain `VALID` or `INVALID`.
    async fn validate(&self, context: &str, signal: &str) -> Result<String, CollaboratorError>;

    /// Expected to contain an integer severity from 1 to 10.
    async fn score(&self, context: &str, signal: &str) -> Result<String, CollaboratorError>;

    /// Expected to contain the four labelled SBAR sections.
    async fn report(&self, context: &str, user: &UserMetadata) -> Result<String, CollaboratorError>;

    fn name(&self) -> &'static str;
}

/// Text-to-speech service.
#[async_trait]
pub trait Synthesizer: Send + Sync {
    /// Synthesize `text` and return the location of the audio artifact.
    async fn synthesize(&self, text: &str) -> Result<String, CollaboratorError>;

    fn name(&self) -> &'static str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_with_timeout_maps_elapsed() {
        let result: Result<(), _> = with_timeout("slow", Duration::from_millis(50), async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(())
        })
        .await;
        match result {
            Err(CollaboratorError::Timeout { service, after }) => {
                assert_eq!(service, "slow");
                assert_eq!(after, Duration::from_millis(50));
            }
            other => panic!("expected timeout, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_with_timeout_passes_through_result() {
        let result = with_timeout("fast", Duration::from_secs(1), async { Ok(7) }).await;
        assert_eq!(result.ok(), Some(7));
    }

    #[test]
    fn test_body_excerpt_respects_char_boundaries() {
        let body = "é".repeat(150);
        let excerpt = body_excerpt(&body);
        assert!(excerpt.ends_with("..."));
        assert!(excerpt.len() <= 203);
    }
}
