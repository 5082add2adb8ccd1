//! OpenAI-compatible chat completion adapter.
//!
//! Works against any server exposing `POST {base_url}/chat/completions`
//! (OpenAI, OpenRouter, Ollama, vLLM). Every transport, status or decoding
//! failure is reported as `ExternalService` so the decision chain can fall
//! through to its next tier.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::domain::error::AgentError;
use crate::ports::suggestion_port::SuggestionRequest;

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_MODEL: &str = "openai/gpt-3.5-turbo";
pub const DEFAULT_TIMEOUT_MS: u64 = 5000;
pub const API_KEY_ENV: &str = "LLM_API_KEY";

const SERVICE: &str = "llm";

#[derive(Debug, Clone, PartialEq)]
pub struct LlmSettings {
    pub enabled: bool,
    pub base_url: String,
    pub api_key: Option<String>,
    pub model: String,
    pub timeout: Duration,
}

impl Default for LlmSettings {
    fn default() -> Self {
        LlmSettings {
            enabled: false,
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: None,
            model: DEFAULT_MODEL.to_string(),
            timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
        }
    }
}

impl LlmSettings {
    pub fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
    }
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
    temperature: f64,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessageResponse,
}

#[derive(Debug, Deserialize)]
struct ChatMessageResponse {
    content: Option<String>,
}

#[cfg_attr(not(feature = "llm"), allow(dead_code))]
fn request_body(model: &str, request: &SuggestionRequest) -> Result<String, AgentError> {
    let body = ChatRequest {
        model,
        messages: vec![ChatMessage {
            role: "user",
            content: &request.prompt,
        }],
        max_tokens: request.max_tokens,
        temperature: request.temperature,
    };
    serde_json::to_string(&body)
        .map_err(|e| AgentError::external(SERVICE, format!("cannot encode request: {e}")))
}

/// Trimmed text of the first choice.
#[cfg_attr(not(feature = "llm"), allow(dead_code))]
fn extract_content(body: &str) -> Result<String, AgentError> {
    let response: ChatResponse = serde_json::from_str(body)
        .map_err(|e| AgentError::external(SERVICE, format!("malformed response: {e}")))?;
    let content = response
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .ok_or_else(|| AgentError::external(SERVICE, "response has no content"))?;
    Ok(content.trim().to_string())
}

#[cfg(feature = "llm")]
pub use client::OpenAiCompatAdapter;

#[cfg(feature = "llm")]
mod client {
    use super::*;
    use crate::ports::suggestion_port::SuggestionPort;
    use tracing::debug;

    pub struct OpenAiCompatAdapter {
        client: reqwest::blocking::Client,
        endpoint: String,
        api_key: Option<String>,
        model: String,
    }

    impl OpenAiCompatAdapter {
        pub fn new(settings: &LlmSettings) -> Result<Self, AgentError> {
            let client = reqwest::blocking::Client::builder()
                .timeout(settings.timeout)
                .build()
                .map_err(|e| AgentError::external(SERVICE, format!("cannot build client: {e}")))?;
            Ok(OpenAiCompatAdapter {
                client,
                endpoint: settings.endpoint(),
                api_key: settings.api_key.clone(),
                model: settings.model.clone(),
            })
        }
    }

    impl SuggestionPort for OpenAiCompatAdapter {
        fn suggest(&self, request: &SuggestionRequest) -> Result<String, AgentError> {
            let mut call = self
                .client
                .post(&self.endpoint)
                .header(reqwest::header::CONTENT_TYPE, "application/json")
                .body(request_body(&self.model, request)?);
            if let Some(key) = &self.api_key {
                call = call.bearer_auth(key);
            }

            let response = call.send().map_err(|e| {
                let reason = if e.is_timeout() {
                    "request timed out".to_string()
                } else {
                    e.to_string()
                };
                AgentError::external(SERVICE, reason)
            })?;

            let status = response.status();
            if !status.is_success() {
                return Err(AgentError::external(SERVICE, format!("HTTP {status}")));
            }
            let body = response
                .text()
                .map_err(|e| AgentError::external(SERVICE, format!("cannot read body: {e}")))?;
            let content = extract_content(&body)?;
            debug!(model = %self.model, reply = %content, "suggestion received");
            Ok(content)
        }
    }
}
