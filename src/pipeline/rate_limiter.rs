//! Per-session frame admission control

use std::time::{Duration, Instant};

/// Admits at most one frame per interval.
///
/// Owned by a single session, so no locking is needed. Keepalive traffic
/// never reaches the limiter.
#[derive(Debug, Clone)]
pub struct FrameRateLimiter {
    interval: Duration,
    last_admitted: Option<Instant>,
}

impl FrameRateLimiter {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_admitted: None,
        }
    }

    /// Check and record admission at the current instant.
    pub fn admit(&mut self) -> bool {
        self.admit_at(Instant::now())
    }

    /// Returns true if:
    /// - No frame has been admitted yet
    /// - At least `interval` has passed since the last admitted frame
    ///
    /// Dropped frames do not move the window.
    pub fn admit_at(&mut self, now: Instant) -> bool {
        let allowed = self
            .last_admitted
            .map_or(true, |last| now.saturating_duration_since(last) >= self.interval);
        if allowed {
            self.last_admitted = Some(now);
        }
        allowed
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }
}
