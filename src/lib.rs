//! Guardian-Link: temporal gesture aggregation and emergency escalation
//!
//! Turns a noisy per-frame gesture classification stream into at most one
//! verified emergency escalation per cooldown window.
//!
//! ## Architecture
//!
//! - **Perception**: classifier output to one tag plus one caption per frame
//! - **Temporal**: rolling-window super-majority vote and Idle/Confirmed hysteresis
//! - **Pipeline**: per-session loop, aggregation contexts, detached escalation runs
//! - **Collaborators**: vision, reasoning and speech services behind async traits
//! - **API**: WebSocket frame stream and operator endpoints

pub mod api;
pub mod collaborators;
pub mod config;
pub mod perception;
pub mod pipeline;
pub mod profile;
pub mod temporal;
pub mod types;

// Re-export configuration
pub use config::GuardianConfig;

// Re-export commonly used types
pub use types::{
    ClassifierResult, Detection, EscalationOutcome, EscalationState, FrameResponse, FrameSignal,
    ResponseStatus, UserMetadata, Verdict,
};

// Re-export pipeline entry points
pub use pipeline::{PipelineCoordinator, SessionLoop};

// Re-export collaborator seams
pub use collaborators::{Capabilities, Classifier, Reasoner, Synthesizer};
