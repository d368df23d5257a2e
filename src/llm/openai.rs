//! OpenAI chat-completions client.

use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{ChatProvider, ChatRequest};
use crate::conversation::Message;
use crate::error::{RagError, Result};

const SERVICE: &str = "chat";

/// Blocking client for OpenAI-compatible `/chat/completions` endpoints.
pub struct OpenAiChat {
    client: Client,
    endpoint: String,
    model: String,
}

impl OpenAiChat {
    /// Builds a chat client bound to one model.
    pub fn new(
        api_key: &str,
        base_url: &str,
        model: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let model = model.into();
        if api_key.trim().is_empty() {
            return Err(RagError::Config("missing OpenAI API key".into()));
        }
        if model.trim().is_empty() {
            return Err(RagError::Config("missing chat model name".into()));
        }
        let mut headers = HeaderMap::new();
        let auth = format!("Bearer {}", api_key.trim());
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&auth)
                .map_err(|_| RagError::Config("invalid OpenAI API key".into()))?,
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let client = Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .build()
            .map_err(|err| RagError::Config(format!("failed to build HTTP client: {err}")))?;
        Ok(Self {
            client,
            endpoint: format!("{}/chat/completions", base_url.trim_end_matches('/')),
            model,
        })
    }

    /// Chat model identifier.
    pub fn model(&self) -> &str {
        &self.model
    }
}

impl ChatProvider for OpenAiChat {
    fn complete(&self, request: &ChatRequest<'_>) -> Result<String> {
        let body = CompletionRequest {
            model: &self.model,
            temperature: request.temperature,
            messages: request.messages,
        };
        debug!(model = %self.model, messages = request.messages.len(), "requesting completion");
        let resp = self
            .client
            .post(&self.endpoint)
            .json(&body)
            .send()
            .map_err(|err| RagError::upstream(SERVICE, err.to_string()))?;
        let status = resp.status();
        if !status.is_success() {
            let text = resp
                .text()
                .unwrap_or_else(|_| "<body unavailable>".to_string());
            return Err(RagError::upstream(SERVICE, format!("{status}: {text}")));
        }
        let parsed: CompletionResponse = resp
            .json()
            .map_err(|err| RagError::malformed(SERVICE, err.to_string()))?;
        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| RagError::malformed(SERVICE, "response has no message content"))
    }
}

#[derive(Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    temperature: f32,
    messages: &'a [Message],
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    choices: Vec<CompletionChoice>,
}

#[derive(Debug, Deserialize)]
struct CompletionChoice {
    message: AssistantMessage,
}

#[derive(Debug, Deserialize)]
struct AssistantMessage {
    content: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conversation::Role;

    #[test]
    fn request_body_matches_chat_completions_shape() {
        let messages = [
            Message::new(Role::System, "be brief"),
            Message::new(Role::User, "hi"),
        ];
        let body = serde_json::to_value(CompletionRequest {
            model: "gpt-4o-mini",
            temperature: 0.5,
            messages: &messages,
        })
        .expect("serialize");
        assert_eq!(
            body,
            serde_json::json!({
                "model": "gpt-4o-mini",
                "temperature": 0.5,
                "messages": [
                    {"role": "system", "content": "be brief"},
                    {"role": "user", "content": "hi"}
                ]
            })
        );
    }

    #[test]
    fn null_content_deserializes() {
        let parsed: CompletionResponse =
            serde_json::from_str(r#"{"choices":[{"message":{"role":"assistant","content":null}}]}"#)
                .expect("parse");
        assert!(parsed.choices[0].message.content.is_none());
    }
}
