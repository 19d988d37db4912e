//! Per-connection session driver.
//!
//! A [`SessionLoop`] threads admitted frames through classification,
//! normalization and aggregation and produces exactly one
//! [`FrameResponse`] per admitted frame. Processing errors, including
//! panics, become fallback responses; only the transport ends a session.

use base64::Engine as _;
use chrono::Utc;
use futures::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::coordinator::PipelineCoordinator;
use super::escalation::EscalationRequest;
use super::rate_limiter::FrameRateLimiter;
use super::registry::AggregationContext;
use super::stats::ServiceStats;
use crate::collaborators::{with_timeout, CollaboratorError};
use crate::perception::SignalNormalizer;
use crate::types::{EscalationOutcome, FrameResponse, ResponseStatus};

/// Report text on the frame that dispatched an escalation.
pub const REPORT_PENDING: &str = "Generating Report...";

// ============================================================================
// Frame Payload
// ============================================================================

/// One frame as it arrived on the transport.
#[derive(Debug, Clone)]
pub enum FramePayload {
    /// Base64 text, optionally a `data:image/...;base64,` URL.
    Encoded(String),
    /// Raw image bytes.
    Raw(Vec<u8>),
}

#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    #[error("Invalid base64 frame: {0}")]
    Decode(#[from] base64::DecodeError),
    #[error("Empty frame")]
    Empty,
    #[error("Classifier failed: {0}")]
    Classifier(#[from] CollaboratorError),
}

impl FramePayload {
    pub fn into_bytes(self) -> Result<Vec<u8>, FrameError> {
        let bytes = match self {
            FramePayload::Raw(bytes) => bytes,
            FramePayload::Encoded(text) => {
                let encoded = text.split_once(',').map_or(text.as_str(), |(_, data)| data);
                base64::engine::general_purpose::STANDARD.decode(encoded.trim())?
            }
        };
        if bytes.is_empty() {
            return Err(FrameError::Empty);
        }
        Ok(bytes)
    }
}

// ============================================================================
// Session Loop
// ============================================================================

pub struct SessionLoop {
    id: String,
    coordinator: Arc<PipelineCoordinator>,
    context: Arc<AggregationContext>,
    limiter: FrameRateLimiter,
    normalizer: SignalNormalizer,
    outcomes_tx: mpsc::UnboundedSender<EscalationOutcome>,
    outcomes_rx: mpsc::UnboundedReceiver<EscalationOutcome>,
}

impl SessionLoop {
    pub(crate) fn new(coordinator: Arc<PipelineCoordinator>, context: Arc<AggregationContext>) -> Self {
        let config = coordinator.config();
        let limiter = FrameRateLimiter::new(config.admission.interval());
        let normalizer = SignalNormalizer::new(&config.temporal);
        let (outcomes_tx, outcomes_rx) = mpsc::unbounded_channel();
        let id = uuid::Uuid::new_v4().simple().to_string();

        coordinator.stats().session_opened();
        info!(session = %id, context = %context.key(), "Session opened");

        Self {
            id,
            coordinator,
            context,
            limiter,
            normalizer,
            outcomes_tx,
            outcomes_rx,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn context_key(&self) -> &str {
        self.context.key()
    }

    /// Handle one incoming frame.
    ///
    /// Returns `None` when the rate limiter drops the frame; otherwise
    /// always a response, never an error.
    pub async fn handle_frame(&mut self, payload: FramePayload) -> Option<FrameResponse> {
        let coordinator = Arc::clone(&self.coordinator);
        let stats = coordinator.stats();

        if !self.limiter.admit() {
            ServiceStats::incr(&stats.frames_dropped);
            return None;
        }
        ServiceStats::incr(&stats.frames_admitted);

        let response = match AssertUnwindSafe(self.process(payload)).catch_unwind().await {
            Ok(Ok(response)) => response,
            Ok(Err(FrameError::Classifier(e))) => {
                warn!(session = %self.id, error = %e, "Classifier unavailable, sending fallback");
                FrameResponse::classifier_offline()
            }
            Ok(Err(e)) => {
                warn!(session = %self.id, error = %e, "Frame processing failed");
                FrameResponse::processing_error(e.to_string())
            }
            Err(panic) => {
                let detail = panic_message(panic.as_ref());
                tracing::error!(session = %self.id, panic = %detail, "Frame processing panicked");
                FrameResponse::processing_error(detail)
            }
        };

        if response.status == ResponseStatus::Fallback {
            ServiceStats::incr(&stats.frames_fallback);
        }
        Some(response)
    }

    async fn process(&mut self, payload: FramePayload) -> Result<FrameResponse, FrameError> {
        let frame = payload.into_bytes()?;
        let classifier = Arc::clone(self.coordinator.classifier());
        let result = with_timeout(
            "classifier",
            self.coordinator.classifier_timeout(),
            classifier.classify(&frame),
        )
        .await?;

        let signal = self.normalizer.normalize(&result);
        let observation = self.context.observe(&signal.primary_tag);
        debug!(
            session = %self.id,
            tag = %signal.primary_tag,
            verdict = %observation.verdict,
            alarm_count = observation.alarm_count,
            "Frame observed"
        );

        let mut response = FrameResponse::monitoring(&signal.primary_tag, &signal.caption);
        if observation.verdict.is_alarm() {
            response.status = ResponseStatus::Alert;
        }

        if observation.transition.trigger {
            ServiceStats::incr(&self.coordinator.stats().triggers);
            warn!(session = %self.id, context = %self.context.key(), "Executing escalation protocol");
            self.coordinator.escalation().dispatch(
                EscalationRequest {
                    context: self.context.key().to_string(),
                    session: self.id.clone(),
                    signal: signal.primary_tag.clone(),
                    scene: signal.caption.clone(),
                    triggered_at: Utc::now(),
                },
                self.outcomes_tx.clone(),
            );
            response.report = REPORT_PENDING.to_string();
        }

        if let Ok(outcome) = self.outcomes_rx.try_recv() {
            response.report = outcome.report_preview();
            response.voice_ready = outcome.speech_triggered();
            response.caption = outcome.user_feedback();
        }

        Ok(response)
    }
}

impl Drop for SessionLoop {
    fn drop(&mut self) {
        self.coordinator.stats().session_closed();
        info!(session = %self.id, "Session closed");
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
