//! Azure Speech text-to-speech over REST.
//!
//! The alert text is wrapped in SSML (fast, loud prosody), synthesized to a
//! WAV file under the configured audio directory, and the public URL path of
//! that file is returned.

use async_trait::async_trait;
use std::path::PathBuf;
use std::time::Duration;
use tracing::info;

use super::{body_excerpt, CollaboratorError, Synthesizer};
use crate::config::{defaults, CollaboratorConfig};

const OUTPUT_FORMAT: &str = "riff-24khz-16bit-mono-pcm";

pub struct AzureSpeechSynthesizer {
    http: reqwest::Client,
    endpoint: String,
    key: String,
    voice: String,
    audio_dir: PathBuf,
    url_prefix: String,
}

impl AzureSpeechSynthesizer {
    pub fn new(key: &str, region: &str, config: &CollaboratorConfig) -> Result<Self, CollaboratorError> {
        let endpoint = format!("https://{region}.tts.speech.microsoft.com/cognitiveservices/v1");
        Self::with_endpoint(&endpoint, key, config)
    }

    pub fn with_endpoint(
        endpoint: &str,
        key: &str,
        config: &CollaboratorConfig,
    ) -> Result<Self, CollaboratorError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(defaults::COLLABORATOR_HTTP_TIMEOUT_SECS))
            .build()?;
        Ok(Self {
            http,
            endpoint: endpoint.to_string(),
            key: key.to_string(),
            voice: config.speech_voice.clone(),
            audio_dir: config.audio_dir.clone(),
            url_prefix: config.audio_url_prefix.trim_end_matches('/').to_string(),
        })
    }
}

/// XML-escape text for inclusion in an SSML document.
pub fn escape_xml(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}

pub fn build_ssml(voice: &str, text: &str) -> String {
    format!(
        "<speak version=\"1.0\" xmlns=\"http://www.w3.org/2001/10/synthesis\" xml:lang=\"en-US\">\
         <voice name=\"{}\"><prosody rate=\"fast\" volume=\"loud\">{}</prosody></voice></speak>",
        escape_xml(voice),
        escape_xml(text)
    )
}

#[async_trait]
impl Synthesizer for AzureSpeechSynthesizer {
    async fn synthesize(&self, text: &str) -> Result<String, CollaboratorError> {
        let resp = self
            .http
            .post(&self.endpoint)
            .header("Ocp-Apim-Subscription-Key", &self.key)
            .header(reqwest::header::CONTENT_TYPE, "application/ssml+xml")
            .header("X-Microsoft-OutputFormat", OUTPUT_FORMAT)
            .header(reqwest::header::USER_AGENT, "guardian-link")
            .body(build_ssml(&self.voice, text))
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(CollaboratorError::Status {
                service: "azure-speech",
                status: status.as_u16(),
                body: body_excerpt(&body),
            });
        }
        let audio = resp.bytes().await?;

        tokio::fs::create_dir_all(&self.audio_dir).await?;
        let file_name = format!("alert_{}.wav", uuid::Uuid::new_v4().simple());
        let path = self.audio_dir.join(&file_name);
        tokio::fs::write(&path, &audio).await?;

        info!(path = %path.display(), bytes = audio.len(), "Alert audio written");
        Ok(format!("{}/{}", self.url_prefix, file_name))
    }

    fn name(&self) -> &'static str {
        "azure-speech"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ssml_escapes_text() {
        let ssml = build_ssml("en-US-AvaNeural", "Fire at <Main & 5th>");
        assert!(ssml.contains("Fire at &lt;Main &amp; 5th&gt;"));
        assert!(ssml.contains("<voice name=\"en-US-AvaNeural\">"));
        assert!(ssml.contains("rate=\"fast\" volume=\"loud\""));
    }

    #[test]
    fn test_region_endpoint() {
        let config = CollaboratorConfig::default();
        let synth = AzureSpeechSynthesizer::new("k", "eastus", &config).unwrap();
        assert_eq!(
            synth.endpoint,
            "https://eastus.tts.speech.microsoft.com/cognitiveservices/v1"
        );
        assert_eq!(synth.url_prefix, "/runtime_audio");
    }
}
