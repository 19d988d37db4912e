//! One-time capability resolution.
//!
//! Credentials are read from the environment once at startup and turned into
//! trait objects. A missing or unusable credential selects the offline
//! implementation for that collaborator and logs why.

use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};

use super::llm::GeminiBackend;
use super::offline::{OfflineClassifier, OfflineReasoner, OfflineSynthesizer};
use super::reasoner::LlmReasoner;
use super::speech::AzureSpeechSynthesizer;
use super::vision::{AzureVisionClassifier, CaptionEndpoint, PredictionEndpoint};
use super::{Classifier, Reasoner, Synthesizer};
use crate::config::GuardianConfig;

/// Secrets for the remote collaborators. Never serialized.
#[derive(Default, Clone)]
pub struct Credentials {
    pub google_api_key: Option<String>,
    pub vision_endpoint: Option<String>,
    pub vision_key: Option<String>,
    pub custom_vision_endpoint: Option<String>,
    pub custom_vision_key: Option<String>,
    pub custom_vision_project_id: Option<String>,
    pub custom_vision_iteration: Option<String>,
    pub speech_key: Option<String>,
    pub speech_region: Option<String>,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("google_api_key", &self.google_api_key.is_some())
            .field("vision", &self.vision_key.is_some())
            .field("custom_vision", &self.custom_vision_key.is_some())
            .field("speech", &self.speech_key.is_some())
            .finish()
    }
}

fn env_nonempty(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

impl Credentials {
    pub fn from_env() -> Self {
        Self {
            google_api_key: env_nonempty("GOOGLE_API_KEY"),
            vision_endpoint: env_nonempty("AZURE_VISION_ENDPOINT"),
            vision_key: env_nonempty("AZURE_VISION_KEY"),
            custom_vision_endpoint: env_nonempty("AZURE_CUSTOM_VISION_ENDPOINT"),
            custom_vision_key: env_nonempty("AZURE_CUSTOM_VISION_KEY"),
            custom_vision_project_id: env_nonempty("AZURE_CUSTOM_VISION_PROJECT_ID"),
            custom_vision_iteration: env_nonempty("AZURE_CUSTOM_VISION_ITERATION_NAME"),
            speech_key: env_nonempty("AZURE_SPEECH_KEY"),
            speech_region: env_nonempty("AZURE_SPEECH_REGION"),
        }
    }

    fn caption_endpoint(&self) -> Option<CaptionEndpoint> {
        Some(CaptionEndpoint {
            endpoint: self.vision_endpoint.clone()?,
            key: self.vision_key.clone()?,
        })
    }

    fn prediction_endpoint(&self) -> Option<PredictionEndpoint> {
        Some(PredictionEndpoint {
            endpoint: self.custom_vision_endpoint.clone()?,
            key: self.custom_vision_key.clone()?,
            project_id: self.custom_vision_project_id.clone()?,
            iteration: self.custom_vision_iteration.clone()?,
        })
    }
}

/// The collaborator set the core runs against.
#[derive(Clone)]
pub struct Capabilities {
    pub classifier: Arc<dyn Classifier>,
    pub reasoner: Arc<dyn Reasoner>,
    pub synthesizer: Arc<dyn Synthesizer>,
}

/// Which implementation backs each collaborator.
#[derive(Debug, Clone, Serialize)]
pub struct CapabilityReport {
    pub classifier: &'static str,
    pub reasoner: &'static str,
    pub synthesizer: &'static str,
    pub degraded: bool,
}

impl Capabilities {
    /// Every collaborator offline.
    pub fn offline() -> Self {
        Self {
            classifier: Arc::new(OfflineClassifier),
            reasoner: Arc::new(OfflineReasoner),
            synthesizer: Arc::new(OfflineSynthesizer),
        }
    }

    pub fn resolve(config: &GuardianConfig, creds: &Credentials) -> Self {
        let classifier: Arc<dyn Classifier> =
            match AzureVisionClassifier::new(creds.caption_endpoint(), creds.prediction_endpoint()) {
                Ok(c) => Arc::new(c),
                Err(e) => {
                    warn!(error = %e, "Vision credentials missing, classifier running in degraded mode");
                    Arc::new(OfflineClassifier)
                }
            };

        let reasoner: Arc<dyn Reasoner> = match &creds.google_api_key {
            Some(key) => match GeminiBackend::new(key, &config.collaborators.reasoning_model) {
                Ok(backend) => Arc::new(LlmReasoner::new(
                    Arc::new(backend),
                    config.escalation.report_word_budget,
                )),
                Err(e) => {
                    warn!(error = %e, "Failed to build reasoning client, reasoner offline");
                    Arc::new(OfflineReasoner)
                }
            },
            None => {
                warn!("GOOGLE_API_KEY not set, reasoner offline (fail-open validation, default severity)");
                Arc::new(OfflineReasoner)
            }
        };

        let synthesizer: Arc<dyn Synthesizer> = match (&creds.speech_key, &creds.speech_region) {
            (Some(key), Some(region)) => {
                match AzureSpeechSynthesizer::new(key, region, &config.collaborators) {
                    Ok(s) => Arc::new(s),
                    Err(e) => {
                        warn!(error = %e, "Failed to build speech client, voice alerts disabled");
                        Arc::new(OfflineSynthesizer)
                    }
                }
            }
            _ => {
                warn!("Azure Speech credentials missing, voice alerts disabled");
                Arc::new(OfflineSynthesizer)
            }
        };

        let caps = Self {
            classifier,
            reasoner,
            synthesizer,
        };
        let report = caps.report();
        info!(
            classifier = report.classifier,
            reasoner = report.reasoner,
            synthesizer = report.synthesizer,
            "Collaborator capabilities resolved"
        );
        caps
    }

    pub fn report(&self) -> CapabilityReport {
        let classifier = self.classifier.name();
        let reasoner = self.reasoner.name();
        let synthesizer = self.synthesizer.name();
        CapabilityReport {
            classifier,
            reasoner,
            synthesizer,
            degraded: [classifier, reasoner, synthesizer].contains(&"offline"),
        }
    }
}
