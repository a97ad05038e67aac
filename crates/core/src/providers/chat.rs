//! OpenAI-compatible chat-completions adapter
//!
//! Serves both OpenAI and DeepSeek; the two differ only in credentials,
//! base URL and whether responses need marker cleanup.

use super::{classify_failure, markers, Provider};
use crate::error::{ProviderError, Result};
use crate::split::char_len;
use async_trait::async_trait;
use reqwest::{Client, ClientBuilder};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

/// Request timeout for a correction call
const CORRECT_TIMEOUT: Duration = Duration::from_secs(120);

/// Timeout for the models-list health probe
const HEALTH_TIMEOUT: Duration = Duration::from_secs(5);

/// Output budget headroom over the input length
const MAX_TOKENS_HEADROOM: usize = 500;

/// Static configuration for one chat-completions provider
#[derive(Debug, Clone)]
pub struct ChatProviderConfig {
    /// Provider name used in logs and reports
    pub name: &'static str,
    /// Bearer token
    pub api_key: String,
    /// API base URL, e.g. `https://api.openai.com/v1`
    pub base_url: String,
    /// Model to request
    pub model_name: String,
    /// Whether responses carry echo markers that must be stripped
    pub strip_markers: bool,
}

/// Chat-completions provider adapter
#[derive(Debug, Clone)]
pub struct ChatCompletionsProvider {
    client: Client,
    config: ChatProviderConfig,
}

impl ChatCompletionsProvider {
    /// Create an adapter from its configuration
    pub fn new(config: ChatProviderConfig) -> Result<Self> {
        let client = ClientBuilder::new().timeout(CORRECT_TIMEOUT).build()?;
        Ok(Self { client, config })
    }

    /// The configured model name
    pub fn model_name(&self) -> &str {
        &self.config.model_name
    }

    fn base_url(&self) -> &str {
        self.config.base_url.trim_end_matches('/')
    }
}

#[async_trait]
impl Provider for ChatCompletionsProvider {
    fn name(&self) -> &'static str {
        self.config.name
    }

    async fn correct(
        &self,
        text: &str,
        prompt: &str,
    ) -> std::result::Result<String, ProviderError> {
        let url = format!("{}/chat/completions", self.base_url());
        let request = ChatRequest {
            model: &self.config.model_name,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: prompt,
                },
                ChatMessage {
                    role: "user",
                    content: text,
                },
            ],
            temperature: 0.0,
            max_tokens: char_len(text) + MAX_TOKENS_HEADROOM,
        };

        debug!(
            "{}: sending correction request, model={}, input_chars={}",
            self.config.name,
            self.config.model_name,
            char_len(text)
        );

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.config.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| send_error(self.config.name, &e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let snippet: String = body.chars().take(200).collect();
            return Err(classify_failure(&format!(
                "{} API error: HTTP {} - {}",
                self.config.name, status, snippet
            )));
        }

        let reply: ChatResponse = response.json().await.map_err(|e| {
            ProviderError::other(format!(
                "{} API returned an unparsable response: {}",
                self.config.name, e
            ))
        })?;

        let content = reply
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .unwrap_or_default();
        let content = content.trim();

        if content.is_empty() {
            return Err(ProviderError::other(format!(
                "{} API returned empty content",
                self.config.name
            )));
        }

        if self.config.strip_markers {
            Ok(markers::strip_markers(content))
        } else {
            Ok(content.to_string())
        }
    }

    async fn health_check(&self) -> bool {
        let url = format!("{}/models", self.base_url());
        match self
            .client
            .get(&url)
            .bearer_auth(&self.config.api_key)
            .timeout(HEALTH_TIMEOUT)
            .send()
            .await
        {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                warn!("{}: health check failed: {}", self.config.name, e);
                false
            }
        }
    }
}

fn send_error(name: &str, e: &reqwest::Error) -> ProviderError {
    let message = format!("{} API request failed: {}", name, e);
    if e.is_connect() || e.is_timeout() {
        ProviderError::Connection(message)
    } else {
        classify_failure(&message)
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: usize,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}
