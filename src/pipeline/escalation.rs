//! Escalation Pipeline - validate -> score -> (voice) -> report
//!
//! Runs once per trigger, detached from frame admission:
//!
//! ```text
//! STAGE 1: Validate    fail-open; only an explicit INVALID aborts
//! STAGE 2: Severity    first integer in the answer, default on failure
//! STAGE 3: Voice       severity > threshold, spawned, never awaited here
//! STAGE 4: Report      SBAR; sentinel on failure, template on malformed text
//! ```
//!
//! Every collaborator call carries its own timeout. No stage error escapes:
//! the result is always `Aborted` or `Completed` with a displayable report.

use chrono::{DateTime, Utc};
use futures::FutureExt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Notify};
use tokio_util::task::TaskTracker;
use tracing::{error, info, warn};

use super::log::EscalationLog;
use super::stats::ServiceStats;
use crate::collaborators::parsing::{parse_sbar, parse_severity, parse_validation, template_sbar};
use crate::collaborators::{with_timeout, Capabilities, CollaboratorError, Reasoner, Synthesizer};
use crate::config::GuardianConfig;
use crate::profile::ProfileStore;
use crate::types::{EscalationOutcome, EscalationRecord, UserMetadata};

/// Abort reason when the reasoner judges the scene inconsistent with the signal.
pub const ABORT_CONTEXT_MISMATCH: &str = "Context Mismatch";
/// Report when the reasoner is not configured.
pub const REPORT_BRAIN_OFFLINE: &str = "SBAR Unavailable (Brain Offline)";
/// Report when the reasoner failed.
pub const REPORT_CRITICAL_ERROR: &str = "CRITICAL ERROR: Failed to generate emergency report.";

/// Everything a detached pipeline run needs to know about its trigger.
#[derive(Debug, Clone)]
pub struct EscalationRequest {
    pub context: String,
    pub session: String,
    pub signal: String,
    pub scene: String,
    pub triggered_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
struct Settings {
    voice_severity_threshold: u8,
    default_severity: u8,
    report_word_budget: usize,
    reasoner_timeout: Duration,
    synthesizer_timeout: Duration,
}

/// Count of detached tasks, independent of the tracker's open/closed state.
#[derive(Default)]
struct InFlight {
    count: AtomicUsize,
    idle: Notify,
}

/// Decrements [`InFlight`] when a task finishes, panics or is dropped.
struct InFlightGuard(Arc<InFlight>);

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        if self.0.count.fetch_sub(1, Ordering::AcqRel) == 1 {
            self.0.idle.notify_waiters();
        }
    }
}

pub struct EscalationPipeline {
    reasoner: Arc<dyn Reasoner>,
    synthesizer: Arc<dyn Synthesizer>,
    profile: ProfileStore,
    settings: Settings,
    tracker: TaskTracker,
    in_flight: Arc<InFlight>,
    log: EscalationLog,
    stats: Arc<ServiceStats>,
}

impl EscalationPipeline {
    pub fn new(config: &GuardianConfig, caps: &Capabilities, stats: Arc<ServiceStats>) -> Self {
        Self {
            reasoner: Arc::clone(&caps.reasoner),
            synthesizer: Arc::clone(&caps.synthesizer),
            profile: ProfileStore::new(&config.profile),
            settings: Settings {
                voice_severity_threshold: config.escalation.voice_severity_threshold,
                default_severity: config.escalation.default_severity,
                report_word_budget: config.escalation.report_word_budget,
                reasoner_timeout: config.collaborators.reasoner_timeout(),
                synthesizer_timeout: config.collaborators.synthesizer_timeout(),
            },
            tracker: TaskTracker::new(),
            in_flight: Arc::new(InFlight::default()),
            log: EscalationLog::new(config.escalation.log_capacity),
            stats,
        }
    }

    pub fn log(&self) -> &EscalationLog {
        &self.log
    }

    /// Pipeline runs and voice alerts still in flight.
    pub fn in_flight(&self) -> usize {
        self.in_flight.count.load(Ordering::Acquire)
    }

    fn spawn_tracked<F>(&self, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.in_flight.count.fetch_add(1, Ordering::AcqRel);
        let guard = InFlightGuard(Arc::clone(&self.in_flight));
        self.tracker.spawn(async move {
            let _guard = guard;
            task.await;
        });
    }

    // ========================================================================
    // Dispatch
    // ========================================================================

    /// Run the pipeline for `request` as a detached task.
    ///
    /// The outcome is recorded in the dispatcher log and sent to `reply` if
    /// the session is still listening. A closed session does not cancel the
    /// run.
    pub fn dispatch(
        self: &Arc<Self>,
        request: EscalationRequest,
        reply: mpsc::UnboundedSender<EscalationOutcome>,
    ) {
        let pipeline = Arc::clone(self);
        self.spawn_tracked(async move {
            let user = pipeline.profile.load().await;
            let outcome = AssertUnwindSafe(pipeline.run(&request.scene, &request.signal, &user))
                .catch_unwind()
                .await
                .unwrap_or_else(|_| {
                    error!(session = %request.session, "Escalation pipeline panicked");
                    EscalationOutcome::Completed {
                        severity: pipeline.settings.default_severity,
                        report: REPORT_CRITICAL_ERROR.to_string(),
                        speech_triggered: false,
                    }
                });

            pipeline.log.push(EscalationRecord {
                id: uuid::Uuid::new_v4().to_string(),
                context: request.context.clone(),
                session: request.session.clone(),
                signal: request.signal.clone(),
                scene: request.scene.clone(),
                triggered_at: request.triggered_at,
                completed_at: Utc::now(),
                outcome: outcome.clone(),
            });

            if reply.send(outcome).is_err() {
                info!(session = %request.session, "Session closed before escalation finished; outcome logged only");
            }
        });
    }

    /// Wait until no run or voice alert is in flight.
    ///
    /// Leaves the tracker untouched, so it is safe alongside [`Self::shutdown`].
    pub async fn wait_idle(&self) {
        loop {
            let notified = self.in_flight.idle.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            if self.in_flight() == 0 {
                return;
            }
            notified.await;
        }
    }

    /// Stop accepting new runs and wait up to `grace` for in-flight ones.
    ///
    /// Returns true if everything finished inside the grace period.
    pub async fn shutdown(&self, grace: Duration) -> bool {
        self.tracker.close();
        let pending = self.in_flight();
        if pending > 0 {
            info!(pending, grace_secs = grace.as_secs(), "Waiting for in-flight escalations");
        }
        tokio::time::timeout(grace, self.tracker.wait()).await.is_ok()
    }

    // ========================================================================
    // Stages
    // ========================================================================

    /// Run all stages for one trigger.
    pub async fn run(&self, scene: &str, signal: &str, user: &UserMetadata) -> EscalationOutcome {
        info!(signal = %signal, scene = %scene, "Escalation pipeline started");

        // Stage 1
        if !self.validate(scene, signal).await {
            warn!(signal = %signal, "Escalation ABORTED: scene inconsistent with signal");
            ServiceStats::incr(&self.stats.escalations_aborted);
            return EscalationOutcome::Aborted {
                reason: ABORT_CONTEXT_MISMATCH.to_string(),
            };
        }

        // Stage 2
        let severity = self.score(scene, signal).await;

        // Stage 3
        let speech_triggered = severity > self.settings.voice_severity_threshold;
        if speech_triggered {
            warn!(severity, "High severity, dispatching voice alert");
            self.dispatch_voice(&user.location);
        }

        // Stage 4
        let report = self.report(scene, signal, user).await;

        ServiceStats::incr(&self.stats.escalations_completed);
        info!(severity, speech_triggered, "Escalation pipeline completed");
        EscalationOutcome::Completed {
            severity,
            report,
            speech_triggered,
        }
    }

    async fn validate(&self, scene: &str, signal: &str) -> bool {
        let answer = with_timeout(
            "reasoner",
            self.settings.reasoner_timeout,
            self.reasoner.validate(scene, signal),
        )
        .await;

        match answer {
            Ok(text) => match parse_validation(&text) {
                Some(valid) => {
                    info!(valid, "Validation result");
                    valid
                }
                None => {
                    warn!(answer = %text.trim(), "Ambiguous validation answer, treating as valid");
                    true
                }
            },
            Err(e) => {
                warn!(error = %e, "Validation failed, treating as valid (fail-open)");
                true
            }
        }
    }

    async fn score(&self, scene: &str, signal: &str) -> u8 {
        let default = self.settings.default_severity;
        let answer = with_timeout(
            "reasoner",
            self.settings.reasoner_timeout,
            self.reasoner.score(scene, signal),
        )
        .await;

        match answer {
            Ok(text) => parse_severity(&text).map_or_else(
                || {
                    warn!(answer = %text.trim(), default, "No severity in answer, using default");
                    default
                },
                |s| {
                    info!(severity = s, "Severity scored");
                    s
                },
            ),
            Err(e) => {
                warn!(error = %e, default, "Severity scoring failed, using default");
                default
            }
        }
    }

    async fn report(&self, scene: &str, signal: &str, user: &UserMetadata) -> String {
        let budget = self.settings.report_word_budget;
        let answer = with_timeout(
            "reasoner",
            self.settings.reasoner_timeout,
            self.reasoner.report(scene, user),
        )
        .await;

        match answer {
            Ok(text) => match parse_sbar(&text) {
                Ok(sbar) => sbar.within_budget(budget).render(),
                Err(e) => {
                    warn!(error = %e, "Malformed SBAR answer, using template report");
                    template_sbar(scene, signal, user).within_budget(budget).render()
                }
            },
            Err(CollaboratorError::Unavailable(_)) => REPORT_BRAIN_OFFLINE.to_string(),
            Err(e) => {
                error!(error = %e, "Failed to generate SBAR report");
                REPORT_CRITICAL_ERROR.to_string()
            }
        }
    }

    fn dispatch_voice(&self, location: &str) {
        let text = format!("Emergency Alert! High severity incident detected at {location}.");
        let synthesizer = Arc::clone(&self.synthesizer);
        let timeout = self.settings.synthesizer_timeout;
        ServiceStats::incr(&self.stats.voice_alerts);

        self.spawn_tracked(async move {
            match with_timeout("synthesizer", timeout, synthesizer.synthesize(&text)).await {
                Ok(location) => info!(audio = %location, "Voice alert synthesized"),
                Err(e) => warn!(error = %e, "Voice alert failed"),
            }
        });
    }
}
