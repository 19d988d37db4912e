//! Frame Processing Pipeline
//!
//! ```text
//! SessionLoop (one per connection)
//!   FrameRateLimiter      admit <= 1 frame / interval
//!   Classifier            remote, bounded timeout, failure -> fallback response
//!   SignalNormalizer      detections + captions -> FrameSignal
//!   AggregationContext    voter + state machine under one lock
//!   EscalationPipeline    detached, once per trigger
//! ```
//!
//! GUARANTEE: at most one escalation per aggregation context per cooldown.

mod coordinator;
mod escalation;
mod log;
mod rate_limiter;
mod registry;
mod session;
mod stats;

pub use coordinator::{PipelineCoordinator, StatusReport};
pub use escalation::{
    EscalationPipeline, EscalationRequest, ABORT_CONTEXT_MISMATCH, REPORT_BRAIN_OFFLINE,
    REPORT_CRITICAL_ERROR,
};
pub use log::EscalationLog;
pub use rate_limiter::FrameRateLimiter;
pub use registry::{
    is_valid_device_id, AggregationContext, AggregationRegistry, ContextSnapshot, Observation,
    SHARED_CONTEXT_KEY,
};
pub use session::{FrameError, FramePayload, SessionLoop, REPORT_PENDING};
pub use stats::{ServiceStats, StatsSnapshot};
