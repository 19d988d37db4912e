//! System-wide default constants.
//!
//! Centralises the values every `#[serde(default)]` in the configuration falls
//! back to. Grouped by subsystem for easy discovery.

// ============================================================================
// Temporal Voting
// ============================================================================

/// Rolling window capacity (frames).
///
/// 10 frames at the 1 Hz admission rate = 10 seconds of evidence.
pub const WINDOW_SIZE: usize = 10;

/// Minimum alarm-tag count in a full window for an Alarm verdict (8 of 10).
pub const ALARM_MIN_COUNT: usize = 8;

/// Tag that counts towards the alarm super-majority.
pub const ALARM_TAG: &str = "HELP";

/// Sentinel tag for frames without an accepted detection.
pub const NEUTRAL_TAG: &str = "Neutral";

/// A detection must be strictly above this probability to become the frame's tag.
pub const ACCEPTANCE_PROBABILITY: f64 = 0.5;

/// Caption used when the classifier produced no caption.
pub const PLACEHOLDER_CAPTION: &str = "Monitoring...";

// ============================================================================
// Escalation
// ============================================================================

/// Minimum time between two escalation triggers (seconds).
pub const COOLDOWN_SECS: u64 = 30;

/// Severity strictly above this value dispatches the voice alert.
pub const VOICE_SEVERITY_THRESHOLD: u8 = 8;

/// Severity used when the reasoning service cannot score the incident.
pub const DEFAULT_SEVERITY: u8 = 5;

/// Word budget for the generated SBAR report.
pub const REPORT_WORD_BUDGET: usize = 80;

/// Capacity of the in-memory dispatcher log.
pub const ESCALATION_LOG_CAPACITY: usize = 200;

/// Upper bound on retained `per_device` aggregation contexts.
pub const MAX_DEVICE_CONTEXTS: usize = 256;

/// Longest accepted device identifier (bytes).
pub const MAX_DEVICE_ID_LEN: usize = 64;

// ============================================================================
// Admission
// ============================================================================

/// Minimum interval between two admitted frames of one session (milliseconds).
pub const ADMISSION_INTERVAL_MS: u64 = 1_000;

// ============================================================================
// Collaborators
// ============================================================================

/// Upper bound on one classifier call (milliseconds).
pub const CLASSIFIER_TIMEOUT_MS: u64 = 2_000;

/// Upper bound on one reasoning call (milliseconds).
pub const REASONER_TIMEOUT_MS: u64 = 15_000;

/// Upper bound on one speech synthesis call (milliseconds).
pub const SYNTHESIZER_TIMEOUT_MS: u64 = 20_000;

/// HTTP client timeout for collaborator requests (seconds).
///
/// Kept above every per-call timeout so the caller's deadline always wins.
pub const COLLABORATOR_HTTP_TIMEOUT_SECS: u64 = 30;

/// Reasoning model used by the Gemini backend.
pub const REASONING_MODEL: &str = "gemini-2.5-flash";

/// Voice used for the spoken alert.
pub const SPEECH_VOICE: &str = "en-US-AvaNeural";

/// Directory the synthesized alert audio is written to.
pub const AUDIO_DIR: &str = "./data/audio";

/// URL prefix the audio directory is served under.
pub const AUDIO_URL_PREFIX: &str = "/runtime_audio";

// ============================================================================
// Profile
// ============================================================================

/// User profile JSON file.
pub const PROFILE_PATH: &str = "user_profile.json";

// ============================================================================
// Server
// ============================================================================

/// HTTP/WebSocket bind address.
pub const SERVER_ADDR: &str = "0.0.0.0:8000";

/// How long shutdown waits for in-flight escalations (seconds).
pub const SHUTDOWN_GRACE_SECS: u64 = 10;
