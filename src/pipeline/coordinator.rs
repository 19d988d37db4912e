//! Pipeline Coordinator - shared services behind every session
//!
//! ```text
//! frame -> FrameRateLimiter (per session)
//!       -> Classifier (timeout)
//!       -> SignalNormalizer
//!       -> AggregationContext { TemporalVoter -> EscalationStateMachine }  (one lock)
//!       -> [trigger] EscalationPipeline (detached)
//!       -> FrameResponse
//! ```
//!
//! The coordinator is built once in `main()` and shared by `Arc`. Sessions
//! get their aggregation context from it; nothing lives in a global.

use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, warn};

use super::escalation::EscalationPipeline;
use super::registry::{AggregationRegistry, ContextSnapshot};
use super::session::SessionLoop;
use super::stats::{ServiceStats, StatsSnapshot};
use crate::collaborators::{Capabilities, CapabilityReport, Classifier};
use crate::config::{AggregationScope, GuardianConfig};

/// Body of `GET /api/v1/status`.
#[derive(Debug, Clone, Serialize)]
pub struct StatusReport {
    pub uptime_secs: u64,
    pub scope: AggregationScope,
    pub capabilities: CapabilityReport,
    pub stats: StatsSnapshot,
    pub escalations_in_flight: usize,
    pub contexts: Vec<ContextSnapshot>,
}

pub struct PipelineCoordinator {
    config: Arc<GuardianConfig>,
    classifier: Arc<dyn Classifier>,
    capabilities: CapabilityReport,
    registry: AggregationRegistry,
    escalation: Arc<EscalationPipeline>,
    stats: Arc<ServiceStats>,
    started_at: Instant,
}

impl PipelineCoordinator {
    pub fn new(config: Arc<GuardianConfig>, caps: Capabilities) -> Self {
        let stats = Arc::new(ServiceStats::default());
        let escalation = Arc::new(EscalationPipeline::new(&config, &caps, Arc::clone(&stats)));
        Self {
            classifier: Arc::clone(&caps.classifier),
            capabilities: caps.report(),
            registry: AggregationRegistry::new(Arc::clone(&config)),
            escalation,
            stats,
            config,
            started_at: Instant::now(),
        }
    }

    /// Start a session bound to the context for `device`.
    pub fn open_session(self: &Arc<Self>, device: Option<&str>) -> SessionLoop {
        let context = self.registry.context_for(device);
        SessionLoop::new(Arc::clone(self), context)
    }

    pub fn config(&self) -> &GuardianConfig {
        &self.config
    }

    pub fn classifier(&self) -> &Arc<dyn Classifier> {
        &self.classifier
    }

    pub fn escalation(&self) -> &Arc<EscalationPipeline> {
        &self.escalation
    }

    pub fn stats(&self) -> &ServiceStats {
        &self.stats
    }

    pub fn classifier_timeout(&self) -> Duration {
        self.config.collaborators.classifier_timeout()
    }

    pub fn status(&self) -> StatusReport {
        StatusReport {
            uptime_secs: self.started_at.elapsed().as_secs(),
            scope: self.registry.scope(),
            capabilities: self.capabilities.clone(),
            stats: self.stats.snapshot(),
            escalations_in_flight: self.escalation.in_flight(),
            contexts: self.registry.snapshots(),
        }
    }

    /// Wait for in-flight escalations for the configured grace period.
    pub async fn shutdown(&self) -> bool {
        let grace = Duration::from_secs(self.config.server.shutdown_grace_secs);
        let finished = self.escalation.shutdown(grace).await;
        if finished {
            info!("All in-flight escalations finished");
        } else {
            warn!(
                abandoned = self.escalation.in_flight(),
                "Shutdown grace period elapsed with escalations still running"
            );
        }
        info!("{}", self.stats.snapshot());
        finished
    }
}
