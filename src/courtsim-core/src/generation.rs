//! Turn generation for AI mode.
//!
//! Produces one short utterance per turn, conditioned on the speaker's
//! persona, role context hints, and the dialogue history so far. The
//! remote path degrades to deterministic canned lines on any failure;
//! there is no retry.

use async_openai::Client;
use async_openai::config::OpenAIConfig;
use async_openai::types::chat::{
    ChatCompletionRequestMessage, ChatCompletionRequestSystemMessage,
    ChatCompletionRequestUserMessage, CreateChatCompletionRequestArgs,
};
use async_trait::async_trait;
use tracing::warn;

use crate::participant::{Participant, Role};

/// Generates the next utterance for a participant. Infallible by
/// contract: implementations fall back rather than error.
#[async_trait]
pub trait TurnGenerator: Send + Sync {
    async fn generate(
        &self,
        participant: &Participant,
        context: &[String],
        history: &[String],
    ) -> String;
}

/// Canned utterance for a role, cycling deterministically with the
/// length of the history so far.
pub fn canned_line(role: Role, history_len: usize) -> String {
    let lines: &[&str] = match role {
        Role::Judge => &[
            "Court is now in session.",
            "Please proceed with your statement.",
            "Objection sustained.",
            "The court will take a brief recess.",
        ],
        Role::Defense => &[
            "Your honor, the defense is prepared to present our case.",
            "We object to this line of questioning.",
            "May I approach the bench?",
            "The defense rests, your honor.",
        ],
        Role::Jury => &[
            "We acknowledge the proceedings.",
            "The jury has reached a verdict.",
            "We have deliberated carefully.",
            "We find the evidence compelling.",
        ],
        _ => &["I am ready to proceed."],
    };

    lines[history_len % lines.len()].to_string()
}

/// Offline generator: always the canned path. Used when no API key is
/// configured.
pub struct MockGenerator;

#[async_trait]
impl TurnGenerator for MockGenerator {
    async fn generate(
        &self,
        participant: &Participant,
        _context: &[String],
        history: &[String],
    ) -> String {
        canned_line(participant.role, history.len())
    }
}

/// OpenAI-compatible generator with the canned fallback.
pub struct OpenAiGenerator {
    client: Client<OpenAIConfig>,
    model: String,
}

impl OpenAiGenerator {
    pub fn new(api_base: impl Into<String>, api_key: impl Into<String>) -> Self {
        let config = OpenAIConfig::new()
            .with_api_key(api_key.into())
            .with_api_base(api_base.into());

        Self {
            client: Client::with_config(config),
            model: "gpt-4".to_string(),
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    async fn request_completion(
        &self,
        participant: &Participant,
        context: &[String],
        history: &[String],
    ) -> Result<String, async_openai::error::OpenAIError> {
        let system_prompt = format!(
            "You are the {} in a courtroom simulation.\n\
             Your persona: {}\n\
             Maintain courtroom decorum and professionalism.\n\
             Respond concisely and stay in character.\n\
             Wait your turn to speak.",
            participant.role.display_name(),
            participant.persona,
        );

        let conversation_context = if history.is_empty() {
            "\n\nBegin your statement:".to_string()
        } else {
            format!(
                "\n\nPrevious dialogue:\n{}\n\nYour response:",
                history.join("\n")
            )
        };

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .max_completion_tokens(150u32)
            .messages(vec![
                ChatCompletionRequestMessage::System(ChatCompletionRequestSystemMessage {
                    content: system_prompt.into(),
                    name: None,
                }),
                ChatCompletionRequestMessage::User(ChatCompletionRequestUserMessage {
                    content: format!("{}{}", context.join("\n"), conversation_context).into(),
                    name: None,
                }),
            ])
            .build()?;

        let response = self.client.chat().create(request).await?;
        Ok(response
            .choices
            .first()
            .and_then(|c| c.message.content.clone())
            .unwrap_or_default())
    }
}

#[async_trait]
impl TurnGenerator for OpenAiGenerator {
    async fn generate(
        &self,
        participant: &Participant,
        context: &[String],
        history: &[String],
    ) -> String {
        match self.request_completion(participant, context, history).await {
            Ok(response) => {
                let sanitized = sanitize_response(&response);
                if sanitized.is_empty() {
                    warn!(
                        speaker = %participant.display_name,
                        "empty generation response; using canned line"
                    );
                    canned_line(participant.role, history.len())
                } else {
                    sanitized
                }
            }
            Err(e) => {
                warn!(
                    speaker = %participant.display_name,
                    error = %e,
                    "turn generation failed; using canned line"
                );
                canned_line(participant.role, history.len())
            }
        }
    }
}

/// Sanitize a generated response: strip reasoning tags and their content,
/// orphaned XML-like tags, markdown asterisks, and collapse whitespace.
fn sanitize_response(response: &str) -> String {
    let tags_to_strip = [
        "thinking",
        "think",
        "reflection",
        "internal",
        "reasoning",
        "scratchpad",
        "plan",
        "analysis",
    ];

    let mut result = response.to_string();

    for tag in &tags_to_strip {
        let pattern = format!(r"(?is)<{tag}[^>]*>.*?</{tag}>", tag = tag);
        if let Ok(re) = regex::Regex::new(&pattern) {
            result = re.replace_all(&result, "").to_string();
        }
    }

    if let Ok(orphan_re) = regex::Regex::new(r"</?[\w]+[^>]*>") {
        result = orphan_re.replace_all(&result, "").to_string();
    }

    result = result.replace('*', "");

    if let Ok(ws_re) = regex::Regex::new(r"\s+") {
        result = ws_re.replace_all(&result, " ").to_string();
    }

    result.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn judge() -> Participant {
        Participant::new("1", Role::Judge, "Judge").with_persona("A presiding judge.")
    }

    #[test]
    fn test_canned_line_cycles_with_history_len() {
        assert_eq!(canned_line(Role::Judge, 0), "Court is now in session.");
        assert_eq!(canned_line(Role::Judge, 1), "Please proceed with your statement.");
        assert_eq!(canned_line(Role::Judge, 4), "Court is now in session.");
    }

    #[test]
    fn test_canned_line_generic_fallback() {
        assert_eq!(canned_line(Role::Witness, 0), "I am ready to proceed.");
        assert_eq!(canned_line(Role::Witness, 7), "I am ready to proceed.");
    }

    #[tokio::test]
    async fn test_mock_generator_is_deterministic() {
        let generator = MockGenerator;
        let history = vec!["Judge: Court is now in session.".to_string()];
        let a = generator.generate(&judge(), &[], &history).await;
        let b = generator.generate(&judge(), &[], &history).await;
        assert_eq!(a, b);
        assert_eq!(a, "Please proceed with your statement.");
    }

    #[test]
    fn test_sanitize_strips_reasoning_tags() {
        let input = "<thinking>Let me think...</thinking>Objection overruled.";
        assert_eq!(sanitize_response(input), "Objection overruled.");
    }

    #[test]
    fn test_sanitize_strips_orphan_tags_and_asterisks() {
        let input = "The *court* finds <em>the defendant</em> not guilty.";
        assert_eq!(
            sanitize_response(input),
            "The court finds the defendant not guilty."
        );
    }

    #[test]
    fn test_sanitize_collapses_whitespace() {
        let input = "Order.\n\n   Order   in the court.";
        assert_eq!(sanitize_response(input), "Order. Order in the court.");
    }

    #[test]
    fn test_sanitize_plain_text_unchanged() {
        let input = "The prosecution may call its first witness.";
        assert_eq!(sanitize_response(input), input);
    }
}
