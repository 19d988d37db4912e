//! Process-wide counters for the status endpoint.

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Default)]
pub struct ServiceStats {
    pub sessions_active: AtomicU64,
    pub sessions_total: AtomicU64,
    pub frames_admitted: AtomicU64,
    pub frames_dropped: AtomicU64,
    pub frames_fallback: AtomicU64,
    pub triggers: AtomicU64,
    pub escalations_completed: AtomicU64,
    pub escalations_aborted: AtomicU64,
    pub voice_alerts: AtomicU64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    pub sessions_active: u64,
    pub sessions_total: u64,
    pub frames_admitted: u64,
    pub frames_dropped: u64,
    pub frames_fallback: u64,
    pub triggers: u64,
    pub escalations_completed: u64,
    pub escalations_aborted: u64,
    pub voice_alerts: u64,
}

impl ServiceStats {
    pub fn incr(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn session_opened(&self) {
        Self::incr(&self.sessions_active);
        Self::incr(&self.sessions_total);
    }

    pub fn session_closed(&self) {
        // Saturating: never wrap below zero.
        let _ = self
            .sessions_active
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |n| Some(n.saturating_sub(1)));
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        let load = |c: &AtomicU64| c.load(Ordering::Relaxed);
        StatsSnapshot {
            sessions_active: load(&self.sessions_active),
            sessions_total: load(&self.sessions_total),
            frames_admitted: load(&self.frames_admitted),
            frames_dropped: load(&self.frames_dropped),
            frames_fallback: load(&self.frames_fallback),
            triggers: load(&self.triggers),
            escalations_completed: load(&self.escalations_completed),
            escalations_aborted: load(&self.escalations_aborted),
            voice_alerts: load(&self.voice_alerts),
        }
    }
}

impl std::fmt::Display for StatsSnapshot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Guardian: {} sessions, {} frames admitted ({} dropped, {} fallback), {} triggers ({} completed, {} aborted), {} voice alerts",
            self.sessions_total,
            self.frames_admitted,
            self.frames_dropped,
            self.frames_fallback,
            self.triggers,
            self.escalations_completed,
            self.escalations_aborted,
            self.voice_alerts
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_counters() {
        let stats = ServiceStats::default();
        stats.session_opened();
        stats.session_opened();
        stats.session_closed();
        stats.session_closed();
        stats.session_closed();
        let snap = stats.snapshot();
        assert_eq!(snap.sessions_active, 0);
        assert_eq!(snap.sessions_total, 2);
    }
}
