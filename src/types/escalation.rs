//! Escalation state, user profile and pipeline outcome types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ============================================================================
// State Machine
// ============================================================================

/// Hysteresis state of the escalation state machine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EscalationState {
    #[default]
    Idle,
    Confirmed,
}

impl std::fmt::Display for EscalationState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EscalationState::Idle => write!(f, "IDLE"),
            EscalationState::Confirmed => write!(f, "CONFIRMED"),
        }
    }
}

// ============================================================================
// User Profile
// ============================================================================

/// Read-only user profile consulted when a report is generated.
///
/// Missing fields fall back to placeholder text so the report prompt is
/// always complete.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserMetadata {
    #[serde(default = "unknown_name")]
    pub name: String,
    #[serde(default = "unknown_location")]
    pub location: String,
    #[serde(default = "none_available")]
    pub medical_history: String,
    #[serde(default = "none_available")]
    pub emergency_contact: String,
}

fn unknown_name() -> String {
    "Unknown".to_string()
}

fn unknown_location() -> String {
    "Unknown Location".to_string()
}

fn none_available() -> String {
    "None available".to_string()
}

impl Default for UserMetadata {
    fn default() -> Self {
        Self {
            name: unknown_name(),
            location: unknown_location(),
            medical_history: none_available(),
            emergency_contact: none_available(),
        }
    }
}

// ============================================================================
// Escalation Outcome
// ============================================================================

/// Result of one escalation pipeline run.
///
/// `Completed` always carries a displayable report, even when that report is
/// a failure sentinel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum EscalationOutcome {
    Completed {
        /// Severity in `1..=10`.
        severity: u8,
        /// SBAR-formatted report.
        report: String,
        speech_triggered: bool,
    },
    Aborted {
        reason: String,
    },
}

impl EscalationOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, EscalationOutcome::Completed { .. })
    }

    pub fn speech_triggered(&self) -> bool {
        matches!(
            self,
            EscalationOutcome::Completed {
                speech_triggered: true,
                ..
            }
        )
    }

    /// Short text shown in the `report` field of the frame response.
    pub fn report_preview(&self) -> String {
        match self {
            EscalationOutcome::Completed {
                severity, report, ..
            } => format!("[Severity {severity}] {report}"),
            EscalationOutcome::Aborted { reason } => format!("Alert Aborted: {reason}"),
        }
    }

    /// Caption shown to the person in front of the camera.
    pub fn user_feedback(&self) -> String {
        match self {
            EscalationOutcome::Completed {
                speech_triggered: true,
                ..
            } => "Help is on the way. Stay calm. (Voice Alert Broadcasted)".to_string(),
            EscalationOutcome::Completed { .. } => "Help is on the way. Stay calm.".to_string(),
            EscalationOutcome::Aborted { .. } => {
                "Alert cancelled. Please confirm emergency.".to_string()
            }
        }
    }
}

/// Dispatcher log entry for one escalation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EscalationRecord {
    pub id: String,
    /// Aggregation context that emitted the trigger.
    pub context: String,
    /// Session the trigger came from.
    pub session: String,
    pub signal: String,
    pub scene: String,
    pub triggered_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    pub outcome: EscalationOutcome,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_profile_placeholders_fill_missing_fields() {
        let profile: UserMetadata =
            serde_json::from_str(r#"{"name": "Ada"}"#).expect("partial profile parses");
        assert_eq!(profile.name, "Ada");
        assert_eq!(profile.location, "Unknown Location");
        assert_eq!(profile.medical_history, "None available");
        assert_eq!(profile.emergency_contact, "None available");
    }

    #[test]
    fn test_outcome_preview_and_feedback() {
        let done = EscalationOutcome::Completed {
            severity: 9,
            report: "SITUATION: fall".to_string(),
            speech_triggered: true,
        };
        assert_eq!(done.report_preview(), "[Severity 9] SITUATION: fall");
        assert!(done.user_feedback().ends_with("(Voice Alert Broadcasted)"));

        let aborted = EscalationOutcome::Aborted {
            reason: "Context Mismatch".to_string(),
        };
        assert_eq!(aborted.report_preview(), "Alert Aborted: Context Mismatch");
        assert!(!aborted.speech_triggered());
    }

    #[test]
    fn test_outcome_serializes_with_status_tag() {
        let aborted = EscalationOutcome::Aborted {
            reason: "Context Mismatch".to_string(),
        };
        let v = serde_json::to_value(&aborted).expect("serializes");
        assert_eq!(v["status"], "aborted");
        assert_eq!(v["reason"], "Context Mismatch");
    }
}
