//! Temporal Evidence Aggregation
//!
//! Two stages turn a noisy per-frame tag stream into at-most-once escalation
//! triggers:
//!
//! 1. [`TemporalVoter`]: fixed-size rolling window, super-majority vote,
//!    full-window gate. Produces a [`Verdict`](crate::types::Verdict).
//! 2. [`EscalationStateMachine`]: Idle/Confirmed hysteresis with a cooldown.
//!    Produces a trigger.
//!
//! Both are plain synchronous types. Sharing and locking are the job of
//! [`crate::pipeline::AggregationContext`].

mod state_machine;
mod voter;
mod window;

pub use state_machine::{EscalationStateMachine, StateTransition};
pub use voter::TemporalVoter;
pub use window::FrameWindow;
