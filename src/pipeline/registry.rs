//! Aggregation Contexts
//!
//! An [`AggregationContext`] owns one rolling window and one escalation state
//! machine behind a single mutex. The [`AggregationRegistry`] hands sessions
//! their context: one process-wide context in `shared` scope, or one per
//! device identifier in `per_device` scope.

use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;
use tracing::{info, warn};

use crate::config::defaults::MAX_DEVICE_ID_LEN;
use crate::config::{AggregationScope, GuardianConfig, TemporalConfig};
use crate::temporal::{EscalationStateMachine, StateTransition, TemporalVoter};
use crate::types::{EscalationState, Verdict};

/// Context key used in `shared` scope.
pub const SHARED_CONTEXT_KEY: &str = "default";

/// Device ids are short printable tokens: ASCII alphanumerics plus `-_.:`,
/// at most [`MAX_DEVICE_ID_LEN`] bytes.
pub fn is_valid_device_id(device: &str) -> bool {
    !device.is_empty()
        && device.len() <= MAX_DEVICE_ID_LEN
        && device
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'-' | b'_' | b'.' | b':'))
}

struct Aggregation {
    voter: TemporalVoter,
    machine: EscalationStateMachine,
}

/// Result of folding one tag into a context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Observation {
    pub verdict: Verdict,
    pub transition: StateTransition,
    pub alarm_count: usize,
    pub state: EscalationState,
}

/// Point-in-time view of a context for the status endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct ContextSnapshot {
    pub key: String,
    pub state: EscalationState,
    pub verdict: Verdict,
    pub window: Vec<String>,
    pub alarm_count: usize,
    /// Seconds since the last trigger, if any.
    pub secs_since_trigger: Option<u64>,
}

pub struct AggregationContext {
    key: String,
    inner: Mutex<Aggregation>,
}

impl AggregationContext {
    pub fn new(key: impl Into<String>, config: &GuardianConfig) -> Self {
        Self {
            key: key.into(),
            inner: Mutex::new(Aggregation {
                voter: TemporalVoter::new(&config.temporal),
                machine: EscalationStateMachine::new(config.escalation.cooldown()),
            }),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Observe a tag at the current instant.
    pub fn observe(&self, tag: &str) -> Observation {
        self.observe_at(tag, Instant::now())
    }

    /// Push the tag, vote, check the cooldown and decide the trigger as one
    /// critical section.
    pub fn observe_at(&self, tag: &str, now: Instant) -> Observation {
        let mut agg = self.lock();
        let verdict = agg.voter.observe(tag);
        let transition = agg.machine.observe_at(verdict, now);
        Observation {
            verdict,
            transition,
            alarm_count: agg.voter.alarm_count(),
            state: agg.machine.state(),
        }
    }

    /// Not cooling down after a trigger, so dropping it cannot let a
    /// suppressed alarm through.
    pub fn is_dormant_at(&self, now: Instant) -> bool {
        !self.lock().machine.in_cooldown(now)
    }

    pub fn snapshot(&self) -> ContextSnapshot {
        let agg = self.lock();
        ContextSnapshot {
            key: self.key.clone(),
            state: agg.machine.state(),
            verdict: agg.voter.verdict(),
            window: agg.voter.window().iter().map(str::to_string).collect(),
            alarm_count: agg.voter.alarm_count(),
            secs_since_trigger: agg.machine.last_trigger().map(|t| t.elapsed().as_secs()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Aggregation> {
        self.inner.lock().unwrap_or_else(|poisoned: PoisonError<_>| {
            warn!(context = %self.key, "Aggregation lock poisoned, recovering state");
            poisoned.into_inner()
        })
    }
}

/// Hands out aggregation contexts by scope.
pub struct AggregationRegistry {
    scope: AggregationScope,
    config: Arc<GuardianConfig>,
    contexts: Mutex<HashMap<String, Arc<AggregationContext>>>,
}

impl AggregationRegistry {
    pub fn new(config: Arc<GuardianConfig>) -> Self {
        Self {
            scope: config.escalation.scope,
            config,
            contexts: Mutex::new(HashMap::new()),
        }
    }

    pub fn scope(&self) -> AggregationScope {
        self.scope
    }

    pub fn temporal_config(&self) -> &TemporalConfig {
        &self.config.temporal
    }

    /// Context for a session. `device` is ignored in `shared` scope; in
    /// `per_device` scope a missing or malformed device falls back to the
    /// shared key.
    ///
    /// At most `escalation.max_device_contexts` contexts are retained. When
    /// the limit is reached, contexts no session holds and that are not in
    /// cooldown are evicted; if none qualify the session gets an unregistered
    /// context of its own.
    pub fn context_for(&self, device: Option<&str>) -> Arc<AggregationContext> {
        let key = match (self.scope, device.map(str::trim)) {
            (AggregationScope::PerDevice, Some(d)) if is_valid_device_id(d) => d,
            (AggregationScope::PerDevice, Some(d)) if !d.is_empty() => {
                warn!(len = d.len(), "Malformed device id, using shared context");
                SHARED_CONTEXT_KEY
            }
            _ => SHARED_CONTEXT_KEY,
        };

        let mut contexts = self.contexts.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(ctx) = contexts.get(key) {
            return Arc::clone(ctx);
        }

        let limit = self.config.escalation.max_device_contexts;
        if contexts.len() >= limit {
            let now = Instant::now();
            let before = contexts.len();
            contexts.retain(|_, ctx| Arc::strong_count(ctx) > 1 || !ctx.is_dormant_at(now));
            let evicted = before - contexts.len();
            if evicted > 0 {
                info!(evicted, remaining = contexts.len(), "Evicted dormant aggregation contexts");
            }
        }

        let ctx = Arc::new(AggregationContext::new(key, &self.config));
        if contexts.len() >= limit {
            warn!(context = %key, limit, "Aggregation context limit reached, context will not be retained");
            return ctx;
        }
        info!(context = %key, scope = %self.scope, "Creating aggregation context");
        contexts.insert(key.to_string(), Arc::clone(&ctx));
        ctx
    }

    /// Number of retained contexts.
    pub fn len(&self) -> usize {
        self.contexts.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn snapshots(&self) -> Vec<ContextSnapshot> {
        let contexts: Vec<Arc<AggregationContext>> = self
            .contexts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .cloned()
            .collect();
        let mut snaps: Vec<ContextSnapshot> = contexts.iter().map(|c| c.snapshot()).collect();
        snaps.sort_by(|a, b| a.key.cmp(&b.key));
        snaps
    }
}
