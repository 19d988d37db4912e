//! Prompt construction for the reasoning collaborator.

use async_trait::async_trait;
use std::sync::Arc;

use super::llm::LlmBackend;
use super::{CollaboratorError, Reasoner};
use crate::types::UserMetadata;

/// [`Reasoner`] that turns each question into a prompt for an [`LlmBackend`].
pub struct LlmReasoner {
    backend: Arc<dyn LlmBackend>,
    report_word_budget: usize,
}

impl LlmReasoner {
    pub fn new(backend: Arc<dyn LlmBackend>, report_word_budget: usize) -> Self {
        Self {
            backend,
            report_word_budget,
        }
    }
}

fn validation_prompt(context: &str, signal: &str) -> String {
    format!(
        "Visual Context: {context}\n\
         Sign Detected: {signal}\n\
         Is the sign consistent with the visual context? If the visual context is an immediate \
         physical threat (fire, weapon) and the sign is mismatched, consider it a stressful \
         situation but a valid emergency.\n\
         Return 'VALID' if the emergency is real or plausible. Return 'INVALID' only if it \
         seems like a complete error."
    )
}

fn severity_prompt(context: &str, signal: &str) -> String {
    format!(
        "Visual Context: {context}\n\
         Sign Detected: {signal}\n\
         Rate the severity of this emergency on a scale of 1 to 10 (10 being immediate life threat).\n\
         Output ONLY the number."
    )
}

fn report_prompt(context: &str, user: &UserMetadata, word_budget: usize) -> String {
    format!(
        "Analyze the visual scene '{context}' and the user's medical history '{history}'.\n\
         Generate a professional SBAR report for an emergency dispatcher. Keep it under {word_budget} words.\n\
         YOU MUST USE THE FOLLOWING EXACT HEADERS (in uppercase):\n\
         SITUATION: [content]\n\
         BACKGROUND: [content]\n\
         ASSESSMENT: [content]\n\
         RECOMMENDATION: [content]\n\n\
         User Details:\n\
         Name: {name}\n\
         Location: {location}\n\
         Emergency Contact: {contact}",
        history = user.medical_history,
        name = user.name,
        location = user.location,
        contact = user.emergency_contact,
    )
}

#[async_trait]
impl Reasoner for LlmReasoner {
    async fn validate(&self, context: &str, signal: &str) -> Result<String, CollaboratorError> {
        self.backend.generate(&validation_prompt(context, signal)).await
    }

    async fn score(&self, context: &str, signal: &str) -> Result<String, CollaboratorError> {
        self.backend.generate(&severity_prompt(context, signal)).await
    }

    async fn report(&self, context: &str, user: &UserMetadata) -> Result<String, CollaboratorError> {
        self.backend
            .generate(&report_prompt(context, user, self.report_word_budget))
            .await
    }

    fn name(&self) -> &'static str {
        self.backend.backend_name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Records prompts and echoes a fixed answer.
    struct RecordingBackend {
        prompts: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl LlmBackend for RecordingBackend {
        async fn generate(&self, prompt: &str) -> Result<String, CollaboratorError> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            Ok("VALID".to_string())
        }

        fn backend_name(&self) -> &'static str {
            "recording"
        }
    }

    #[tokio::test]
    async fn test_prompts_carry_context_and_profile() {
        let backend = Arc::new(RecordingBackend {
            prompts: Mutex::new(Vec::new()),
        });
        let reasoner = LlmReasoner::new(backend.clone(), 80);
        let user = UserMetadata {
            name: "Ada".to_string(),
            location: "12 Elm St".to_string(),
            ..UserMetadata::default()
        };

        reasoner.validate("smoke in kitchen", "HELP").await.unwrap();
        reasoner.score("smoke in kitchen", "HELP").await.unwrap();
        reasoner.report("smoke in kitchen", &user).await.unwrap();

        let prompts = backend.prompts.lock().unwrap();
        assert_eq!(prompts.len(), 3);
        assert!(prompts[0].contains("Sign Detected: HELP"));
        assert!(prompts[1].contains("Output ONLY the number"));
        assert!(prompts[2].contains("Keep it under 80 words"));
        assert!(prompts[2].contains("Location: 12 Elm St"));
        assert!(prompts[2].contains("RECOMMENDATION:"));
        assert_eq!(reasoner.name(), "recording");
    }
}
