//! Shared data structures for the gesture aggregation and escalation pipeline
//!
//! This module defines the values that flow between stages:
//! - Perception: `Detection`, `Caption`, `ClassifierResult` (classifier output)
//! - Normalization: `FrameSignal` (one tag plus one caption per frame)
//! - Temporal logic: `Verdict`, `EscalationState`
//! - Escalation: `UserMetadata`, `EscalationOutcome`, `EscalationRecord`
//! - Transport: `FrameResponse`, `ResponseStatus`

mod escalation;
mod response;
mod signal;

pub use escalation::*;
pub use response::*;
pub use signal::*;
