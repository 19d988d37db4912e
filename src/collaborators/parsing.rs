//! Reasoner Output Parsing
//!
//! Interprets the free-text answers of the reasoning collaborator: the
//! validation verdict, the severity score and the four-section SBAR report.
//! Also provides the deterministic template report used when the reasoner's
//! answer is not usable.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

use crate::types::UserMetadata;

// ============================================================================
// Validation
// ============================================================================

fn verdict_word() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)\b(in)?valid\b").ok()).as_ref()
}

/// Interpret a validation answer.
///
/// The first standalone `VALID` or `INVALID` word is the verdict; later
/// mentions in the explanation are ignored. `None` when neither word appears.
pub fn parse_validation(text: &str) -> Option<bool> {
    let caps = verdict_word()?.captures(text)?;
    Some(caps.get(1).is_none())
}

// ============================================================================
// Severity
// ============================================================================

fn first_integer() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\d+").ok()).as_ref()
}

/// First integer in the answer, clamped to `1..=10`.
pub fn parse_severity(text: &str) -> Option<u8> {
    let m = first_integer()?.find(text)?;
    // Long digit runs overflow u64; treat them as the maximum.
    let value = m.as_str().parse::<u64>().unwrap_or(u64::MAX);
    Some(value.clamp(1, 10) as u8)
}

// ============================================================================
// SBAR Report
// ============================================================================

/// Four-section dispatcher report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SbarReport {
    pub situation: String,
    pub background: String,
    pub assessment: String,
    pub recommendation: String,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SbarError {
    #[error("missing section header: {0}")]
    MissingSection(&'static str),
    #[error("empty section: {0}")]
    EmptySection(&'static str),
}

const HEADERS: [&str; 4] = ["SITUATION", "BACKGROUND", "ASSESSMENT", "RECOMMENDATION"];

fn section_regex() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?is)SITUATION\s*:(.*?)BACKGROUND\s*:(.*?)ASSESSMENT\s*:(.*?)RECOMMENDATION\s*:(.*)",
        )
        .ok()
    })
    .as_ref()
}

/// Parse a report with the four labelled sections in order.
///
/// Markdown emphasis and heading markers around the headers are tolerated.
pub fn parse_sbar(text: &str) -> Result<SbarReport, SbarError> {
    let cleaned: String = text.chars().filter(|c| !matches!(c, '*' | '#')).collect();
    let upper = cleaned.to_uppercase();
    for header in HEADERS {
        if !upper.contains(header) {
            return Err(SbarError::MissingSection(header));
        }
    }

    let caps = section_regex()
        .and_then(|re| re.captures(&cleaned))
        .ok_or(SbarError::MissingSection(HEADERS[0]))?;

    let mut sections = [String::new(), String::new(), String::new(), String::new()];
    for (i, header) in HEADERS.iter().enumerate() {
        let body = caps
            .get(i + 1)
            .map(|m| collapse_whitespace(m.as_str()))
            .unwrap_or_default();
        if body.is_empty() {
            return Err(SbarError::EmptySection(header));
        }
        sections[i] = body;
    }

    let [situation, background, assessment, recommendation] = sections;
    Ok(SbarReport {
        situation,
        background,
        assessment,
        recommendation,
    })
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

impl SbarReport {
    pub fn word_count(&self) -> usize {
        self.sections().iter().map(|s| s.split_whitespace().count()).sum()
    }

    fn sections(&self) -> [&str; 4] {
        [
            &self.situation,
            &self.background,
            &self.assessment,
            &self.recommendation,
        ]
    }

    /// Shorten the report so its total word count fits `budget`.
    ///
    /// Reports already within budget are returned unchanged. Otherwise every
    /// section is capped at an equal share, so no section is dropped.
    pub fn within_budget(self, budget: usize) -> Self {
        if self.word_count() <= budget {
            return self;
        }
        let share = (budget / HEADERS.len()).max(1);
        Self {
            situation: truncate_words(&self.situation, share),
            background: truncate_words(&self.background, share),
            assessment: truncate_words(&self.assessment, share),
            recommendation: truncate_words(&self.recommendation, share),
        }
    }

    /// Render with one `HEADER: body` line per section.
    pub fn render(&self) -> String {
        HEADERS
            .iter()
            .zip(self.sections())
            .map(|(h, body)| format!("{h}: {body}"))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

fn truncate_words(text: &str, max_words: usize) -> String {
    let words: Vec<&str> = text.split_whitespace().collect();
    if words.len() <= max_words {
        return words.join(" ");
    }
    format!("{}...", words[..max_words].join(" "))
}

// ============================================================================
// Template Fallback
// ============================================================================

/// Deterministic report built from the scene and profile alone.
///
/// Used when the reasoner answered but the answer has no usable SBAR
/// structure. Tagged in the text so the dispatcher knows it is automated.
pub fn template_sbar(scene: &str, signal: &str, user: &UserMetadata) -> SbarReport {
    SbarReport {
        situation: format!(
            "Sustained '{signal}' distress signal from {} at {}. Scene: {scene}.",
            user.name, user.location
        ),
        background: format!("Medical history: {}.", user.medical_history),
        assessment: "Automated template report; severity unverified by operator.".to_string(),
        recommendation: format!(
            "Dispatch responders to {}. Notify emergency contact: {}.",
            user.location, user.emergency_contact
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_is_not_mistaken_for_valid() {
        assert_eq!(parse_validation("INVALID"), Some(false));
        assert_eq!(parse_validation("The signal is invalid."), Some(false));
        assert_eq!(parse_validation("VALID"), Some(true));
        assert_eq!(parse_validation("  valid\n"), Some(true));
        assert_eq!(parse_validation("I cannot tell"), None);
    }

    #[test]
    fn test_parse_validation_uses_leading_verdict() {
        assert_eq!(
            parse_validation("VALID. The scene shows no sign of an invalid or accidental gesture."),
            Some(true)
        );
        assert_eq!(parse_validation("Verdict: INVALID, although the pose looks valid."), Some(false));
        assert_eq!(parse_validation("**Invalid**"), Some(false));
        assert_eq!(parse_validation("The request was validated"), None);
    }

    #[test]
    fn test_severity_first_integer_clamped() {
        assert_eq!(parse_severity("9"), Some(9));
        assert_eq!(parse_severity("Severity: 7/10"), Some(7));
        assert_eq!(parse_severity("0"), Some(1));
        assert_eq!(parse_severity("42"), Some(10));
        assert_eq!(parse_severity("99999999999999999999999"), Some(10));
        assert_eq!(parse_severity("high"), None);
    }

    const GOOD: &str = "SITUATION: Person collapsed on kitchen floor.\n\
        BACKGROUND: History of hypertension.\n\
        ASSESSMENT: Possible cardiac event.\n\
        RECOMMENDATION: Dispatch ALS unit immediately.";

    #[test]
    fn test_parse_sbar_sections() {
        let sbar = parse_sbar(GOOD).expect("well-formed report");
        assert_eq!(sbar.situation, "Person collapsed on kitchen floor.");
        assert_eq!(sbar.recommendation, "Dispatch ALS unit immediately.");
        assert_eq!(sbar.render(), GOOD);
    }

    #[test]
    fn test_parse_sbar_tolerates_markdown() {
        let md = "**SITUATION:** Fire in hallway.\n## Background: Lives alone.\n\
            **Assessment:** Smoke inhalation risk.\n**Recommendation:** Send fire unit.";
        let sbar = parse_sbar(md).expect("markdown report");
        assert_eq!(sbar.background, "Lives alone.");
        assert_eq!(sbar.assessment, "Smoke inhalation risk.");
    }

    #[test]
    fn test_parse_sbar_rejects_missing_or_empty_sections() {
        assert_eq!(
            parse_sbar("SITUATION: x\nBACKGROUND: y\nASSESSMENT: z"),
            Err(SbarError::MissingSection("RECOMMENDATION"))
        );
        assert_eq!(
            parse_sbar("SITUATION: x\nBACKGROUND:\nASSESSMENT: z\nRECOMMENDATION: w"),
            Err(SbarError::EmptySection("BACKGROUND"))
        );
    }

    #[test]
    fn test_within_budget_caps_every_section() {
        let long = "word ".repeat(50);
        let sbar = SbarReport {
            situation: long.trim().to_string(),
            background: "short".to_string(),
            assessment: long.trim().to_string(),
            recommendation: "act now".to_string(),
        };
        let trimmed = sbar.within_budget(80);
        assert!(trimmed.word_count() <= 80);
        assert!(trimmed.situation.ends_with("..."));
        assert_eq!(trimmed.background, "short");
        assert_eq!(trimmed.recommendation, "act now");
    }

    #[test]
    fn test_within_budget_keeps_short_reports() {
        let sbar = parse_sbar(GOOD).expect("well-formed report");
        assert_eq!(sbar.clone().within_budget(80), sbar);
    }

    #[test]
    fn test_template_mentions_location_and_contact() {
        let user = UserMetadata {
            location: "12 Elm St".to_string(),
            emergency_contact: "Sam 555-0100".to_string(),
            ..UserMetadata::default()
        };
        let sbar = template_sbar("a person lying on the floor", "HELP", &user);
        let text = sbar.render();
        assert!(text.contains("12 Elm St"));
        assert!(text.contains("Sam 555-0100"));
        assert!(parse_sbar(&text).is_ok());
    }
}
