//! Answer generation via a chat-completion model.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::ChatConfig;
use crate::error::ProviderError;
use crate::provider::OpenAIClient;

/// Produces a natural-language answer for a question and optional context.
#[async_trait]
pub trait AnswerGenerator: Send + Sync {
    /// `context` may be empty, in which case the model answers unaided.
    async fn generate(&self, question: &str, context: &str) -> Result<String, ProviderError>;
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ChatMessage {
    pub role: &'static str,
    pub content: String,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    max_tokens: u32,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Deserialize)]
struct ChatResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Build the two-message prompt: system instruction, then context and question.
pub fn build_messages(system_prompt: &str, question: &str, context: &str) -> Vec<ChatMessage> {
    vec![
        ChatMessage {
            role: "system",
            content: system_prompt.to_string(),
        },
        ChatMessage {
            role: "user",
            content: format!("Context: {}\n\nQuestion: {}", context, question),
        },
    ]
}

/// Chat-completion client for `POST {base_url}/chat/completions`.
pub struct OpenAIChat {
    client: OpenAIClient,
    config: ChatConfig,
}

impl OpenAIChat {
    pub fn new(client: OpenAIClient, config: ChatConfig) -> Self {
        Self { client, config }
    }
}

#[async_trait]
impl AnswerGenerator for OpenAIChat {
    async fn generate(&self, question: &str, context: &str) -> Result<String, ProviderError> {
        let messages = build_messages(&self.config.system_prompt, question, context);
        let request = ChatRequest {
            model: &self.config.model,
            messages: &messages,
            max_tokens: self.config.max_tokens,
        };
        let body = serde_json::to_value(&request)
            .map_err(|e| ProviderError::InvalidInput(e.to_string()))?;

        let json = self.client.post_json("chat/completions", &body).await?;
        let response: ChatResponse = serde_json::from_value(json)
            .map_err(|e| ProviderError::MalformedResponse(e.to_string()))?;

        response
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content.unwrap_or_default())
            .ok_or_else(|| ProviderError::MalformedResponse("no choices in completion".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ProviderConfig, DEFAULT_SYSTEM_PROMPT};
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn prompt_embeds_context_and_question() {
        let messages = build_messages(DEFAULT_SYSTEM_PROMPT, "When is the exam?", "Exam is May 3.");
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, "system");
        assert!(messages[0].content.contains("course materials"));
        assert_eq!(messages[1].role, "user");
        assert_eq!(
            messages[1].content,
            "Context: Exam is May 3.\n\nQuestion: When is the exam?"
        );
    }

    #[test]
    fn prompt_with_empty_context() {
        let messages = build_messages(DEFAULT_SYSTEM_PROMPT, "Hi?", "");
        assert_eq!(messages[1].content, "Context: \n\nQuestion: Hi?");
    }

    fn chat_for(server: &MockServer) -> OpenAIChat {
        let provider = ProviderConfig {
            base_url: server.uri(),
            max_retries: 0,
            ..ProviderConfig::default()
        };
        let client = OpenAIClient::new(&provider, "test-key".to_string()).unwrap();
        OpenAIChat::new(client, ChatConfig::default())
    }

    #[tokio::test]
    async fn returns_first_choice_and_sends_token_cap() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(body_partial_json(serde_json::json!({
                "model": "gpt-4o-mini",
                "max_tokens": 150
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "choices": [
                    {"message": {"role": "assistant", "content": "The exam is on May 3."}},
                    {"message": {"role": "assistant", "content": "ignored"}}
                ]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let answer = chat_for(&server)
            .generate("When is the exam?", "Exam is May 3.")
            .await
            .unwrap();
        assert_eq!(answer, "The exam is on May 3.");
    }

    #[tokio::test]
    async fn empty_choices_is_malformed() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({"choices": []})),
            )
            .mount(&server)
            .await;

        let err = chat_for(&server).generate("q", "").await.unwrap_err();
        assert!(matches!(err, ProviderError::MalformedResponse(_)));
    }

    #[tokio::test]
    async fn quota_error_is_transient() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429).set_body_string("quota exceeded"))
            .mount(&server)
            .await;

        let err = chat_for(&server).generate("q", "").await.unwrap_err();
        assert!(err.is_transient());
    }
}
