//! Completion-provider HTTP client
//!
//! Speaks the OpenRouter-compatible chat-completions protocol. The
//! pipeline never calls this directly; the REPL sends the conversation
//! here and feeds the returned text to `pipeline::run_pipeline`.

use serde::{Deserialize, Serialize};
use thiserror::Error;

const DEFAULT_API_URL: &str = "https://openrouter.ai/api/v1/chat/completions";
const DEFAULT_MODEL: &str = "deepseek/deepseek-chat";
const MAX_TOKENS: u32 = 8192;

/// Rate limit retry configuration
const MAX_RETRIES: u32 = 3;
const INITIAL_BACKOFF_SECS: u64 = 2;
const BACKOFF_MULTIPLIER: u64 = 2;

/// A typed completion failure, as callers need to distinguish them.
#[derive(Debug, Error)]
pub enum CompletionError {
    #[error("network failure: {0}")]
    Network(#[from] reqwest::Error),
    #[error("provider error: {0}")]
    Provider(String),
    #[error("provider returned an empty completion")]
    EmptyResult,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// One conversation turn, oldest first when sent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub content: String,
}

impl Turn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Client {
    api_key: String,
    model: String,
    base_url: String,
    http: reqwest::Client,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<WireMessage<'a>>,
    max_tokens: u32,
    stream: bool,
}

#[derive(Serialize)]
struct WireMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: MessageContent,
}

#[derive(Deserialize)]
struct MessageContent {
    content: String,
}

impl Client {
    pub fn new(api_key: String, model: Option<String>) -> Self {
        Self {
            api_key,
            model: model.unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            base_url: DEFAULT_API_URL.to_string(),
            http: reqwest::Client::new(),
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Send the conversation and return one completion string.
    ///
    /// Retries rate-limited requests with exponential backoff; every
    /// other non-success status maps to [`CompletionError::Provider`].
    pub async fn complete(
        &self,
        system: Option<&str>,
        turns: &[Turn],
    ) -> Result<String, CompletionError> {
        let mut messages = Vec::with_capacity(turns.len() + 1);
        if let Some(system) = system {
            messages.push(WireMessage {
                role: "system",
                content: system,
            });
        }
        for turn in turns {
            messages.push(WireMessage {
                role: match turn.role {
                    Role::User => "user",
                    Role::Assistant => "assistant",
                },
                content: &turn.content,
            });
        }

        let request = ChatRequest {
            model: &self.model,
            messages,
            max_tokens: MAX_TOKENS,
            stream: false,
        };

        let mut retry_count = 0;
        loop {
            let response = self
                .http
                .post(&self.base_url)
                .header("Content-Type", "application/json")
                .header("Authorization", format!("Bearer {}", self.api_key))
                .json(&request)
                .send()
                .await?;

            let status = response.status();
            let text = response.text().await?;

            if status.is_success() {
                let parsed: ChatResponse = serde_json::from_str(&text).map_err(|e| {
                    CompletionError::Provider(format!("unparseable response: {}", e))
                })?;

                let content = parsed
                    .choices
                    .into_iter()
                    .next()
                    .map(|c| c.message.content)
                    .unwrap_or_default();

                if content.trim().is_empty() {
                    return Err(CompletionError::EmptyResult);
                }
                return Ok(content);
            }

            if status.as_u16() == 429 && retry_count < MAX_RETRIES {
                retry_count += 1;
                let backoff = INITIAL_BACKOFF_SECS * BACKOFF_MULTIPLIER.pow(retry_count - 1);
                eprintln!(
                    "  Rate limited. Retrying in {}s (attempt {}/{})",
                    backoff, retry_count, MAX_RETRIES
                );
                tokio::time::sleep(tokio::time::Duration::from_secs(backoff)).await;
                continue;
            }

            let message = match status.as_u16() {
                401 => "Invalid API key. Run 'quill --setup' to update it.".to_string(),
                429 => format!("Rate limited after {} retries. Try again later.", retry_count),
                500..=599 => format!(
                    "Provider server error ({}). The service may be temporarily unavailable.",
                    status
                ),
                _ => format!("API error {}: {}", status, crate::util::truncate(&text, 200)),
            };
            return Err(CompletionError::Provider(message));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_turn_constructors() {
        let t = Turn::user("hi");
        assert_eq!(t.role, Role::User);
        assert_eq!(t.content, "hi");
        assert_eq!(Turn::assistant("ok").role, Role::Assistant);
    }

    #[test]
    fn test_default_model_applied() {
        let client = Client::new("sk-test".to_string(), None);
        assert_eq!(client.model(), DEFAULT_MODEL);
        let client = Client::new("sk-test".to_string(), Some("x/y".to_string()));
        assert_eq!(client.model(), "x/y");
    }

    #[test]
    fn test_role_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Role::User).unwrap(), "\"user\"");
        assert_eq!(
            serde_json::to_string(&Role::Assistant).unwrap(),
            "\"assistant\""
        );
    }
}
