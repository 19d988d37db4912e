//! LLM backend used by the reasoning collaborator.
//!
//! The [`LlmBackend`] trait is a single prompt-in/text-out call so prompt
//! construction stays in [`super::LlmReasoner`] and backends only move bytes.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use super::{body_excerpt, CollaboratorError};
use crate::config::defaults;

/// Unified trait for LLM backends
#[async_trait]
pub trait LlmBackend: Send + Sync {
    /// Generate a response from the LLM given a prompt
    async fn generate(&self, prompt: &str) -> Result<String, CollaboratorError>;

    /// Get the backend name for logging
    fn backend_name(&self) -> &'static str;
}

// ============================================================================
// Gemini
// ============================================================================

const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Google Gemini `generateContent` over REST.
#[derive(Clone)]
pub struct GeminiBackend {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    contents: [Content<'a>; 1],
}

#[derive(Serialize)]
struct Content<'a> {
    parts: [Part<'a>; 1],
}

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

impl GeminiBackend {
    pub fn new(api_key: &str, model: &str) -> Result<Self, CollaboratorError> {
        Self::with_base_url(GEMINI_BASE_URL, api_key, model)
    }

    /// Point the backend at a different host (proxies, tests).
    pub fn with_base_url(base_url: &str, api_key: &str, model: &str) -> Result<Self, CollaboratorError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(defaults::COLLABORATOR_HTTP_TIMEOUT_SECS))
            .build()?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            model: model.to_string(),
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl LlmBackend for GeminiBackend {
    async fn generate(&self, prompt: &str) -> Result<String, CollaboratorError> {
        let url = format!("{}/models/{}:generateContent", self.base_url, self.model);
        let body = GenerateRequest {
            contents: [Content {
                parts: [Part { text: prompt }],
            }],
        };

        let resp = self
            .http
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(CollaboratorError::Status {
                service: "gemini",
                status: status.as_u16(),
                body: body_excerpt(&text),
            });
        }

        let parsed: GenerateResponse = resp.json().await?;
        let text = extract_text(parsed)
            .ok_or_else(|| CollaboratorError::Parse("Gemini response had no text candidates".to_string()))?;
        debug!(model = %self.model, chars = text.len(), "Gemini response received");
        Ok(text)
    }

    fn backend_name(&self) -> &'static str {
        "gemini"
    }
}

fn extract_text(resp: GenerateResponse) -> Option<String> {
    let text: String = resp
        .candidates
        .into_iter()
        .next()?
        .content?
        .parts
        .into_iter()
        .filter_map(|p| p.text)
        .collect();
    if text.trim().is_empty() {
        None
    } else {
        Some(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_text_joins_parts() {
        let raw = r#"{"candidates":[{"content":{"parts":[{"text":"VAL"},{"text":"ID"}]}}]}"#;
        let resp: GenerateResponse = serde_json::from_str(raw).expect("parses");
        assert_eq!(extract_text(resp).as_deref(), Some("VALID"));
    }

    #[test]
    fn test_extract_text_rejects_empty_candidates() {
        let resp: GenerateResponse = serde_json::from_str(r#"{"candidates":[]}"#).expect("parses");
        assert!(extract_text(resp).is_none());

        let blocked: GenerateResponse =
            serde_json::from_str(r#"{"candidates":[{"finishReason":"SAFETY"}]}"#).expect("parses");
        assert!(extract_text(blocked).is_none());
    }

    #[test]
    fn test_request_body_shape() {
        let body = GenerateRequest {
            contents: [Content {
                parts: [Part { text: "hello" }],
            }],
        };
        let v = serde_json::to_value(&body).expect("serializes");
        assert_eq!(v["contents"][0]["parts"][0]["text"], "hello");
    }
}
