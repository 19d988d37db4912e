//! Degraded implementations selected when a collaborator has no credentials.
//!
//! The offline classifier still produces a result so frames keep flowing;
//! the offline reasoner and synthesizer report `Unavailable`, which the
//! escalation pipeline maps onto its sentinels.

use async_trait::async_trait;

use super::{Classifier, CollaboratorError, Reasoner, Synthesizer};
use crate::types::{ClassifierResult, UserMetadata};

pub const OFFLINE_CAPTION: &str = "Vision System Offline (Degraded Mode)";

/// No detections, one explanatory caption.
#[derive(Debug, Default, Clone, Copy)]
pub struct OfflineClassifier;

#[async_trait]
impl Classifier for OfflineClassifier {
    async fn classify(&self, _frame: &[u8]) -> Result<ClassifierResult, CollaboratorError> {
        Ok(ClassifierResult::caption_only(OFFLINE_CAPTION))
    }

    fn name(&self) -> &'static str {
        "offline"
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct OfflineReasoner;

#[async_trait]
impl Reasoner for OfflineReasoner {
    async fn validate(&self, _context: &str, _signal: &str) -> Result<String, CollaboratorError> {
        Err(CollaboratorError::Unavailable("reasoner"))
    }

    async fn score(&self, _context: &str, _signal: &str) -> Result<String, CollaboratorError> {
        Err(CollaboratorError::Unavailable("reasoner"))
    }

    async fn report(&self, _context: &str, _user: &UserMetadata) -> Result<String, CollaboratorError> {
        Err(CollaboratorError::Unavailable("reasoner"))
    }

    fn name(&self) -> &'static str {
        "offline"
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct OfflineSynthesizer;

#[async_trait]
impl Synthesizer for OfflineSynthesizer {
    async fn synthesize(&self, _text: &str) -> Result<String, CollaboratorError> {
        Err(CollaboratorError::Unavailable("synthesizer"))
    }

    fn name(&self) -> &'static str {
        "offline"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_offline_classifier_yields_caption_only() {
        let result = OfflineClassifier.classify(b"jpeg").await.unwrap();
        assert!(result.detections.is_empty());
        assert_eq!(result.captions[0].text, OFFLINE_CAPTION);
    }

    #[tokio::test]
    async fn test_offline_reasoner_is_unavailable() {
        let err = OfflineReasoner.validate("scene", "HELP").await.unwrap_err();
        assert!(err.is_unavailable());
        let err = OfflineSynthesizer.synthesize("alert").await.unwrap_err();
        assert!(err.is_unavailable());
    }
}
