//! Guardian Configuration - voting, cooldown and collaborator settings as TOML values
//!
//! Every threshold the aggregation pipeline uses is a field in this module.
//! Each struct implements `Default` with the values from [`super::defaults`],
//! so an absent or partial config file behaves exactly like the built-ins.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

use super::defaults;

// ============================================================================
// Top-Level Config
// ============================================================================

/// Root configuration for one Guardian-Link deployment.
///
/// Load with `GuardianConfig::load()` which searches:
/// 1. `$GUARDIAN_CONFIG` env var
/// 2. `./guardian_config.toml`
/// 3. Built-in defaults
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GuardianConfig {
    /// Rolling-window voting
    #[serde(default)]
    pub temporal: TemporalConfig,

    /// Trigger cooldown and escalation pipeline behaviour
    #[serde(default)]
    pub escalation: EscalationConfig,

    /// Frame admission control
    #[serde(default)]
    pub admission: AdmissionConfig,

    /// External collaborator timeouts and endpoints
    #[serde(default)]
    pub collaborators: CollaboratorConfig,

    /// User profile lookup
    #[serde(default)]
    pub profile: ProfileConfig,

    /// HTTP/WebSocket server
    #[serde(default)]
    pub server: ServerConfig,
}

impl GuardianConfig {
    /// Load configuration using the standard search order:
    /// 1. `$GUARDIAN_CONFIG` environment variable
    /// 2. `./guardian_config.toml` in the current working directory
    /// 3. Built-in defaults
    pub fn load() -> Self {
        if let Ok(path) = std::env::var("GUARDIAN_CONFIG") {
            let p = PathBuf::from(&path);
            if p.exists() {
                match Self::load_from_file(&p) {
                    Ok(config) => {
                        info!(path = %p.display(), "Loaded config from GUARDIAN_CONFIG");
                        return config;
                    }
                    Err(e) => {
                        warn!(path = %p.display(), error = %e, "Failed to load config from GUARDIAN_CONFIG, falling back");
                    }
                }
            } else {
                warn!(path = %path, "GUARDIAN_CONFIG points to non-existent file, falling back");
            }
        }

        let local = PathBuf::from("guardian_config.toml");
        if local.exists() {
            match Self::load_from_file(&local) {
                Ok(config) => {
                    info!("Loaded config from ./guardian_config.toml");
                    return config;
                }
                Err(e) => {
                    warn!(error = %e, "Failed to load ./guardian_config.toml, using defaults");
                }
            }
        }

        info!("No guardian_config.toml found, using built-in defaults");
        Self::default()
    }

    /// Load from a specific TOML file path.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(path.to_path_buf(), e))?;
        Self::from_toml_str(&contents).map_err(|e| match e {
            ConfigError::Parse(_, inner) => ConfigError::Parse(path.to_path_buf(), inner),
            other => other,
        })
    }

    /// Parse and validate a TOML document.
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(contents)
            .map_err(|e| ConfigError::Parse(PathBuf::from("<inline>"), e))?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize the current config to a TOML string.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(ConfigError::Serialize)
    }

    /// Validate all settings for internal consistency.
    ///
    /// Every violation is collected so the operator sees the full list at once.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut errors: Vec<String> = Vec::new();

        let t = &self.temporal;
        if t.window_size == 0 {
            errors.push("temporal.window_size must be > 0".to_string());
        }
        if t.alarm_min_count == 0 || t.alarm_min_count > t.window_size {
            errors.push(format!(
                "temporal.alarm_min_count ({}) must be within 1..={} (window_size)",
                t.alarm_min_count, t.window_size
            ));
        }
        if !t.acceptance_probability.is_finite() || !(0.0..=1.0).contains(&t.acceptance_probability) {
            errors.push(format!(
                "temporal.acceptance_probability ({}) must be within [0, 1]",
                t.acceptance_probability
            ));
        }
        if t.alarm_tag.trim().is_empty() {
            errors.push("temporal.alarm_tag must not be empty".to_string());
        }
        if t.alarm_tag == t.neutral_tag {
            errors.push("temporal.alarm_tag must differ from temporal.neutral_tag".to_string());
        }

        let e = &self.escalation;
        if !(1..=10).contains(&e.voice_severity_threshold) {
            errors.push(format!(
                "escalation.voice_severity_threshold ({}) must be within 1..=10",
                e.voice_severity_threshold
            ));
        }
        if !(1..=10).contains(&e.default_severity) {
            errors.push(format!(
                "escalation.default_severity ({}) must be within 1..=10",
                e.default_severity
            ));
        }
        if e.report_word_budget < 4 {
            errors.push("escalation.report_word_budget must leave room for four sections (>= 4)".to_string());
        }
        if e.log_capacity == 0 {
            errors.push("escalation.log_capacity must be > 0".to_string());
        }
        if e.max_device_contexts == 0 {
            errors.push("escalation.max_device_contexts must be > 0".to_string());
        }

        if self.admission.interval_ms == 0 {
            warn!("admission.interval_ms is 0; every frame will be admitted");
        }

        let c = &self.collaborators;
        for (name, value) in [
            ("collaborators.classifier_timeout_ms", c.classifier_timeout_ms),
            ("collaborators.reasoner_timeout_ms", c.reasoner_timeout_ms),
            ("collaborators.synthesizer_timeout_ms", c.synthesizer_timeout_ms),
        ] {
            if value == 0 {
                errors.push(format!("{name} must be > 0"));
            }
        }

        if !c.audio_url_prefix.starts_with('/') || c.audio_url_prefix.trim_end_matches('/').is_empty() {
            errors.push(format!(
                "collaborators.audio_url_prefix ('{}') must be a non-root path starting with '/'",
                c.audio_url_prefix
            ));
        }

        if self.server.addr.parse::<std::net::SocketAddr>().is_err() {
            errors.push(format!("server.addr ('{}') is not a valid socket address", self.server.addr));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Validation(errors))
        }
    }
}

// ============================================================================
// Error Type
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Config I/O error ({}): {1}", .0.display())]
    Io(PathBuf, #[source] std::io::Error),
    #[error("Config parse error ({}): {1}", .0.display())]
    Parse(PathBuf, #[source] toml::de::Error),
    #[error("Config serialization error: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("Config validation failed:\n  - {}", .0.join("\n  - "))]
    Validation(Vec<String>),
}

// ============================================================================
// Temporal Voting
// ============================================================================

/// Settings for signal normalization and the rolling-window vote.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemporalConfig {
    /// Rolling window capacity (frames).
    #[serde(default = "default_window_size")]
    pub window_size: usize,

    /// Minimum alarm-tag count in a full window for an Alarm verdict.
    #[serde(default = "default_alarm_min_count")]
    pub alarm_min_count: usize,

    /// Tag counted towards the alarm super-majority.
    #[serde(default = "default_alarm_tag")]
    pub alarm_tag: String,

    /// Tag recorded for frames without an accepted detection.
    #[serde(default = "default_neutral_tag")]
    pub neutral_tag: String,

    /// A detection must be strictly above this probability to be accepted.
    #[serde(default = "default_acceptance_probability")]
    pub acceptance_probability: f64,

    /// Caption used when the classifier produced none.
    #[serde(default = "default_placeholder_caption")]
    pub placeholder_caption: String,
}

fn default_window_size() -> usize {
    defaults::WINDOW_SIZE
}

fn default_alarm_min_count() -> usize {
    defaults::ALARM_MIN_COUNT
}

fn default_alarm_tag() -> String {
    defaults::ALARM_TAG.to_string()
}

fn default_neutral_tag() -> String {
    defaults::NEUTRAL_TAG.to_string()
}

fn default_acceptance_probability() -> f64 {
    defaults::ACCEPTANCE_PROBABILITY
}

fn default_placeholder_caption() -> String {
    defaults::PLACEHOLDER_CAPTION.to_string()
}

impl Default for TemporalConfig {
    fn default() -> Self {
        Self {
            window_size: default_window_size(),
            alarm_min_count: default_alarm_min_count(),
            alarm_tag: default_alarm_tag(),
            neutral_tag: default_neutral_tag(),
            acceptance_probability: default_acceptance_probability(),
            placeholder_caption: default_placeholder_caption(),
        }
    }
}

// ============================================================================
// Escalation
// ============================================================================

/// Where rolling-window state lives.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AggregationScope {
    /// One window and state machine for the whole process.
    #[default]
    Shared,
    /// One window and state machine per device identifier.
    PerDevice,
}

impl std::fmt::Display for AggregationScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AggregationScope::Shared => write!(f, "shared"),
            AggregationScope::PerDevice => write!(f, "per_device"),
        }
    }
}

impl std::str::FromStr for AggregationScope {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "shared" => Ok(AggregationScope::Shared),
            "per_device" | "per-device" | "device" => Ok(AggregationScope::PerDevice),
            other => Err(format!("unknown aggregation scope '{other}' (expected shared | per_device)")),
        }
    }
}

/// Trigger cooldown and escalation pipeline behaviour.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EscalationConfig {
    /// Minimum time between two triggers (seconds).
    #[serde(default = "default_cooldown_secs")]
    pub cooldown_secs: u64,

    /// Severity strictly above this value dispatches the voice alert.
    #[serde(default = "default_voice_severity_threshold")]
    pub voice_severity_threshold: u8,

    /// Severity used when scoring fails.
    #[serde(default = "default_default_severity")]
    pub default_severity: u8,

    /// Word budget for the SBAR report.
    #[serde(default = "default_report_word_budget")]
    pub report_word_budget: usize,

    /// Whether aggregation state is shared or per device.
    #[serde(default)]
    pub scope: AggregationScope,

    /// Entries kept in the in-memory dispatcher log.
    #[serde(default = "default_log_capacity")]
    pub log_capacity: usize,

    /// Retained aggregation contexts in `per_device` scope. Dormant contexts
    /// are evicted once the limit is reached.
    #[serde(default = "default_max_device_contexts")]
    pub max_device_contexts: usize,
}

fn default_cooldown_secs() -> u64 {
    defaults::COOLDOWN_SECS
}

fn default_voice_severity_threshold() -> u8 {
    defaults::VOICE_SEVERITY_THRESHOLD
}

fn default_default_severity() -> u8 {
    defaults::DEFAULT_SEVERITY
}

fn default_report_word_budget() -> usize {
    defaults::REPORT_WORD_BUDGET
}

fn default_log_capacity() -> usize {
    defaults::ESCALATION_LOG_CAPACITY
}

fn default_max_device_contexts() -> usize {
    defaults::MAX_DEVICE_CONTEXTS
}

impl Default for EscalationConfig {
    fn default() -> Self {
        Self {
            cooldown_secs: default_cooldown_secs(),
            voice_severity_threshold: default_voice_severity_threshold(),
            default_severity: default_default_severity(),
            report_word_budget: default_report_word_budget(),
            scope: AggregationScope::default(),
            log_capacity: default_log_capacity(),
            max_device_contexts: default_max_device_contexts(),
        }
    }
}

impl EscalationConfig {
    pub fn cooldown(&self) -> Duration {
        Duration::from_secs(self.cooldown_secs)
    }
}

// ============================================================================
// Admission
// ============================================================================

/// Frame admission control.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdmissionConfig {
    /// Minimum interval between two admitted frames of one session (ms).
    #[serde(default = "default_admission_interval_ms")]
    pub interval_ms: u64,
}

fn default_admission_interval_ms() -> u64 {
    defaults::ADMISSION_INTERVAL_MS
}

impl Default for AdmissionConfig {
    fn default() -> Self {
        Self {
            interval_ms: default_admission_interval_ms(),
        }
    }
}

impl AdmissionConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

// ============================================================================
// Collaborators
// ============================================================================

/// Timeouts and non-secret settings for the external services.
///
/// Credentials are never read from this file; see
/// [`crate::collaborators::Capabilities::resolve`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollaboratorConfig {
    #[serde(default = "default_classifier_timeout_ms")]
    pub classifier_timeout_ms: u64,

    #[serde(default = "default_reasoner_timeout_ms")]
    pub reasoner_timeout_ms: u64,

    #[serde(default = "default_synthesizer_timeout_ms")]
    pub synthesizer_timeout_ms: u64,

    /// Model name passed to the reasoning service.
    #[serde(default = "default_reasoning_model")]
    pub reasoning_model: String,

    /// Voice used for the spoken alert.
    #[serde(default = "default_speech_voice")]
    pub speech_voice: String,

    /// Directory synthesized audio is written to.
    #[serde(default = "default_audio_dir")]
    pub audio_dir: PathBuf,

    /// URL prefix the audio directory is served under.
    #[serde(default = "default_audio_url_prefix")]
    pub audio_url_prefix: String,
}

fn default_classifier_timeout_ms() -> u64 {
    defaults::CLASSIFIER_TIMEOUT_MS
}

fn default_reasoner_timeout_ms() -> u64 {
    defaults::REASONER_TIMEOUT_MS
}

fn default_synthesizer_timeout_ms() -> u64 {
    defaults::SYNTHESIZER_TIMEOUT_MS
}

fn default_reasoning_model() -> String {
    defaults::REASONING_MODEL.to_string()
}

fn default_speech_voice() -> String {
    defaults::SPEECH_VOICE.to_string()
}

fn default_audio_dir() -> PathBuf {
    PathBuf::from(defaults::AUDIO_DIR)
}

fn default_audio_url_prefix() -> String {
    defaults::AUDIO_URL_PREFIX.to_string()
}

impl Default for CollaboratorConfig {
    fn default() -> Self {
        Self {
            classifier_timeout_ms: default_classifier_timeout_ms(),
            reasoner_timeout_ms: default_reasoner_timeout_ms(),
            synthesizer_timeout_ms: default_synthesizer_timeout_ms(),
            reasoning_model: default_reasoning_model(),
            speech_voice: default_speech_voice(),
            audio_dir: default_audio_dir(),
            audio_url_prefix: default_audio_url_prefix(),
        }
    }
}

impl CollaboratorConfig {
    pub fn classifier_timeout(&self) -> Duration {
        Duration::from_millis(self.classifier_timeout_ms)
    }

    pub fn reasoner_timeout(&self) -> Duration {
        Duration::from_millis(self.reasoner_timeout_ms)
    }

    pub fn synthesizer_timeout(&self) -> Duration {
        Duration::from_millis(self.synthesizer_timeout_ms)
    }
}

// ============================================================================
// Profile
// ============================================================================

/// Read-only user profile lookup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileConfig {
    /// JSON file holding name, location, medical history and emergency contact.
    #[serde(default = "default_profile_path")]
    pub path: PathBuf,

    /// Replaces the profile location (e.g. a fixed GPS fix for a kiosk).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location_override: Option<String>,
}

fn default_profile_path() -> PathBuf {
    PathBuf::from(defaults::PROFILE_PATH)
}

impl Default for ProfileConfig {
    fn default() -> Self {
        Self {
            path: default_profile_path(),
            location_override: None,
        }
    }
}

// ============================================================================
// Server Config
// ============================================================================

/// HTTP server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// HTTP server bind address.
    ///
    /// Can be overridden by `GUARDIAN_SERVER_ADDR` env var or `--addr` CLI flag.
    #[serde(default = "default_server_addr")]
    pub addr: String,

    /// How long shutdown waits for in-flight escalations (seconds).
    #[serde(default = "default_shutdown_grace_secs")]
    pub shutdown_grace_secs: u64,
}

fn default_server_addr() -> String {
    defaults::SERVER_ADDR.to_string()
}

fn default_shutdown_grace_secs() -> u64 {
    defaults::SHUTDOWN_GRACE_SECS
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: default_server_addr(),
            shutdown_grace_secs: default_shutdown_grace_secs(),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_validates() {
        let config = GuardianConfig::default();
        assert!(config.validate().is_ok(), "Default config must always validate");
    }

    #[test]
    fn test_empty_toml_produces_defaults() {
        let config: GuardianConfig = toml::from_str("").expect("empty TOML should parse");
        assert_eq!(config.temporal.window_size, 10);
        assert_eq!(config.temporal.alarm_min_count, 8);
        assert_eq!(config.temporal.alarm_tag, "HELP");
        assert_eq!(config.temporal.acceptance_probability, 0.5);
        assert_eq!(config.escalation.cooldown_secs, 30);
        assert_eq!(config.escalation.voice_severity_threshold, 8);
        assert_eq!(config.admission.interval_ms, 1_000);
        assert_eq!(config.collaborators.classifier_timeout_ms, 2_000);
        assert_eq!(config.escalation.scope, AggregationScope::Shared);
    }

    #[test]
    fn test_partial_toml_override() {
        let toml_str = r#"
[temporal]
window_size = 6
alarm_min_count = 5

[escalation]
scope = "per_device"
"#;
        let config = GuardianConfig::from_toml_str(toml_str).expect("partial TOML should parse");
        assert_eq!(config.temporal.window_size, 6);
        assert_eq!(config.temporal.alarm_min_count, 5);
        assert_eq!(config.escalation.scope, AggregationScope::PerDevice);
        // Non-overridden values retain defaults
        assert_eq!(config.temporal.alarm_tag, "HELP");
        assert_eq!(config.escalation.cooldown_secs, 30);
    }

    #[test]
    fn test_validation_catches_alarm_count_above_window() {
        let mut config = GuardianConfig::default();
        config.temporal.alarm_min_count = 11;
        let result = config.validate();
        assert!(result.is_err());
        if let Err(ConfigError::Validation(errors)) = result {
            assert!(errors.iter().any(|e| e.contains("alarm_min_count")));
        }
    }

    #[test]
    fn test_validation_collects_every_error() {
        let mut config = GuardianConfig::default();
        config.temporal.acceptance_probability = 1.5;
        config.escalation.default_severity = 0;
        config.collaborators.classifier_timeout_ms = 0;
        match config.validate() {
            Err(ConfigError::Validation(errors)) => assert_eq!(errors.len(), 3),
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn test_alarm_tag_must_differ_from_neutral() {
        let mut config = GuardianConfig::default();
        config.temporal.alarm_tag = config.temporal.neutral_tag.clone();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_roundtrip_toml() {
        let original = GuardianConfig::default();
        let toml_str = original.to_toml().expect("serialization should work");
        assert!(toml_str.contains("[temporal]"));
        assert!(toml_str.contains("[escalation]"));
        let parsed = GuardianConfig::from_toml_str(&toml_str).expect("deserialization should work");
        assert_eq!(parsed.escalation.cooldown(), Duration::from_secs(30));
        assert_eq!(parsed.admission.interval(), Duration::from_secs(1));
    }

    #[test]
    fn test_scope_from_str() {
        assert_eq!("shared".parse::<AggregationScope>(), Ok(AggregationScope::Shared));
        assert_eq!("per-device".parse::<AggregationScope>(), Ok(AggregationScope::PerDevice));
        assert!("galaxy".parse::<AggregationScope>().is_err());
    }
}
