//! Idle/Confirmed hysteresis with a trigger cooldown.
//!
//! | state     | verdict | effect                                   |
//! |-----------|---------|------------------------------------------|
//! | Idle      | Alarm   | trigger, -> Confirmed, stamp trigger time |
//! | Confirmed | Alarm   | suppressed                               |
//! | any       | Normal  | nothing                                  |
//!
//! Before the table is consulted, a Confirmed machine whose last trigger is
//! strictly older than the cooldown reverts to Idle.

use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use crate::types::{EscalationState, Verdict};

/// What one observation did to the machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StateTransition {
    /// An escalation must be dispatched for this frame.
    pub trigger: bool,
    /// The cooldown elapsed and the machine reverted to Idle first.
    pub cooldown_reset: bool,
    /// An Alarm verdict was suppressed by an active cooldown.
    pub suppressed: bool,
}

#[derive(Debug, Clone)]
pub struct EscalationStateMachine {
    state: EscalationState,
    last_trigger: Option<Instant>,
    cooldown: Duration,
}

impl EscalationStateMachine {
    pub fn new(cooldown: Duration) -> Self {
        Self {
            state: EscalationState::Idle,
            last_trigger: None,
            cooldown,
        }
    }

    pub fn state(&self) -> EscalationState {
        self.state
    }

    pub fn last_trigger(&self) -> Option<Instant> {
        self.last_trigger
    }

    pub fn cooldown(&self) -> Duration {
        self.cooldown
    }

    /// True while a trigger at or before `now` still suppresses new ones.
    pub fn in_cooldown(&self, now: Instant) -> bool {
        self.state == EscalationState::Confirmed && !self.cooldown_elapsed(now)
    }

    /// Evaluate one verdict at the current instant.
    pub fn observe(&mut self, verdict: Verdict) -> StateTransition {
        self.observe_at(verdict, Instant::now())
    }

    /// Evaluate one verdict at `now`.
    pub fn observe_at(&mut self, verdict: Verdict, now: Instant) -> StateTransition {
        let mut transition = StateTransition::default();

        if self.state == EscalationState::Confirmed && self.cooldown_elapsed(now) {
            self.state = EscalationState::Idle;
            transition.cooldown_reset = true;
            info!("Escalation state reset to IDLE (cooldown complete)");
        }

        if verdict.is_alarm() {
            match self.state {
                EscalationState::Idle => {
                    self.state = EscalationState::Confirmed;
                    self.last_trigger = Some(now);
                    transition.trigger = true;
                    warn!(cooldown_secs = self.cooldown.as_secs(), "Escalation TRIGGERED - state CONFIRMED");
                }
                EscalationState::Confirmed => {
                    transition.suppressed = true;
                    debug!("Alarm verdict suppressed (escalation in cooldown)");
                }
            }
        }

        transition
    }

    fn cooldown_elapsed(&self, now: Instant) -> bool {
        self.last_trigger
            .map_or(true, |t| now.saturating_duration_since(t) > self.cooldown)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const COOLDOWN: Duration = Duration::from_secs(30);

    #[test]
    fn test_first_alarm_triggers() {
        let mut sm = EscalationStateMachine::new(COOLDOWN);
        let t = sm.observe_at(Verdict::Alarm, Instant::now());
        assert!(t.trigger);
        assert_eq!(sm.state(), EscalationState::Confirmed);
    }

    #[test]
    fn test_normal_verdict_never_triggers() {
        let mut sm = EscalationStateMachine::new(COOLDOWN);
        let t = sm.observe_at(Verdict::Normal, Instant::now());
        assert!(!t.trigger);
        assert_eq!(sm.state(), EscalationState::Idle);
    }

    #[test]
    fn test_continuous_alarm_triggers_once_per_cooldown() {
        let mut sm = EscalationStateMachine::new(COOLDOWN);
        let start = Instant::now();
        let mut triggers = Vec::new();
        // One alarm verdict per second for 95 seconds.
        for s in 0..95 {
            let now = start + Duration::from_secs(s);
            if sm.observe_at(Verdict::Alarm, now).trigger {
                triggers.push(s);
            }
        }
        // Strictly greater than 30s: re-trigger at 31s after the previous one.
        assert_eq!(triggers, vec![0, 31, 62, 93]);
        for pair in triggers.windows(2) {
            assert!(pair[1] - pair[0] > 30);
        }
    }

    #[test]
    fn test_exactly_at_cooldown_is_still_suppressed() {
        let mut sm = EscalationStateMachine::new(COOLDOWN);
        let start = Instant::now();
        sm.observe_at(Verdict::Alarm, start);
        let t = sm.observe_at(Verdict::Alarm, start + COOLDOWN);
        assert!(!t.trigger);
        assert!(t.suppressed);
    }

    #[test]
    fn test_reset_after_cooldown_then_single_new_trigger() {
        let mut sm = EscalationStateMachine::new(COOLDOWN);
        let start = Instant::now();
        sm.observe_at(Verdict::Alarm, start);

        // Normal verdict after cooldown resets to Idle without triggering.
        let later = start + Duration::from_secs(40);
        let t = sm.observe_at(Verdict::Normal, later);
        assert!(t.cooldown_reset);
        assert!(!t.trigger);
        assert_eq!(sm.state(), EscalationState::Idle);

        let t = sm.observe_at(Verdict::Alarm, later + Duration::from_secs(1));
        assert!(t.trigger);
        let t = sm.observe_at(Verdict::Alarm, later + Duration::from_secs(2));
        assert!(!t.trigger);
    }

    #[test]
    fn test_reset_and_retrigger_in_same_observation() {
        let mut sm = EscalationStateMachine::new(COOLDOWN);
        let start = Instant::now();
        sm.observe_at(Verdict::Alarm, start);
        let t = sm.observe_at(Verdict::Alarm, start + Duration::from_secs(31));
        assert!(t.cooldown_reset);
        assert!(t.trigger);
        assert_eq!(sm.state(), EscalationState::Confirmed);
    }
}
