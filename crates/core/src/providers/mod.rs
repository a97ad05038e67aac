//! Model provider adapters
//!
//! A uniform async interface over the supported correction backends: the
//! OpenAI-compatible chat-completions providers (OpenAI, DeepSeek) and a
//! local Ollama endpoint. The tagged [`ProviderKind`] drives the factory;
//! each adapter owns its HTTP client and timeout policy and classifies wire
//! failures into the closed [`ProviderError`] sum.

pub mod chat;
pub mod markers;
pub mod ollama;

pub use chat::{ChatCompletionsProvider, ChatProviderConfig};
pub use ollama::OllamaProvider;

use crate::config::Settings;
use crate::error::{ProofError, ProviderError, Result};
use async_trait::async_trait;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// The supported model providers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderKind {
    /// OpenAI chat completions
    OpenAi,
    /// DeepSeek (OpenAI-compatible wire protocol)
    DeepSeek,
    /// Local Ollama endpoint
    Ollama,
}

impl ProviderKind {
    /// All known providers, in menu order
    pub const ALL: [ProviderKind; 3] = [Self::OpenAi, Self::DeepSeek, Self::Ollama];

    /// Canonical lowercase name
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OpenAi => "openai",
            Self::DeepSeek => "deepseek",
            Self::Ollama => "ollama",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderKind {
    type Err = ProofError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "openai" => Ok(Self::OpenAi),
            "deepseek" => Ok(Self::DeepSeek),
            "ollama" => Ok(Self::Ollama),
            other => Err(ProofError::validation(format!(
                "Unsupported model provider: {}",
                other
            ))),
        }
    }
}

/// Uniform correction provider interface
#[async_trait]
pub trait Provider: Send + Sync {
    /// Provider name for logs and reports
    fn name(&self) -> &'static str;

    /// One-shot correction call
    async fn correct(
        &self,
        text: &str,
        prompt: &str,
    ) -> std::result::Result<String, ProviderError>;

    /// Cheap aliveness probe
    async fn health_check(&self) -> bool;

    /// Correction with up to `max_retries` attempts; attempt N sleeps
    /// `retry_delay * N` seconds before the next one. The last error is
    /// returned on exhaustion.
    async fn correct_with_retry(
        &self,
        text: &str,
        prompt: &str,
        max_retries: u32,
        retry_delay: f64,
    ) -> std::result::Result<String, ProviderError> {
        let attempts = max_retries.max(1);
        let mut last_error = None;

        for attempt in 1..=attempts {
            match self.correct(text, prompt).await {
                Ok(result) => {
                    if attempt > 1 {
                        debug!("{}: succeeded on attempt {}/{}", self.name(), attempt, attempts);
                    }
                    return Ok(result);
                }
                Err(e) => {
                    warn!(
                        "{}: attempt {}/{} failed: {}",
                        self.name(),
                        attempt,
                        attempts,
                        e
                    );
                    last_error = Some(e);
                    if attempt < attempts {
                        let delay = retry_delay * f64::from(attempt);
                        if delay > 0.0 {
                            tokio::time::sleep(Duration::from_secs_f64(delay)).await;
                        }
                    }
                }
            }
        }

        Err(last_error.unwrap_or_else(|| ProviderError::other("no correction attempts made")))
    }
}

/// Build the adapter for a provider kind from the current settings
pub fn create_provider(
    kind: ProviderKind,
    model_name: &str,
    settings: &Settings,
) -> Result<Arc<dyn Provider>> {
    match kind {
        ProviderKind::OpenAi => {
            let api_key = settings
                .openai_api_key
                .clone()
                .ok_or_else(|| ProofError::config("OpenAI API key is required"))?;
            Ok(Arc::new(ChatCompletionsProvider::new(ChatProviderConfig {
                name: "openai",
                api_key,
                base_url: settings.openai_base_url.clone(),
                model_name: model_name.to_string(),
                strip_markers: false,
            })?))
        }
        ProviderKind::DeepSeek => {
            let api_key = settings
                .deepseek_api_key
                .clone()
                .ok_or_else(|| ProofError::config("DeepSeek API key is required"))?;
            Ok(Arc::new(ChatCompletionsProvider::new(ChatProviderConfig {
                name: "deepseek",
                api_key,
                base_url: settings.deepseek_base_url.clone(),
                model_name: model_name.to_string(),
                strip_markers: true,
            })?))
        }
        ProviderKind::Ollama => Ok(Arc::new(OllamaProvider::new(
            settings.ollama_base_url.clone(),
            model_name.to_string(),
        )?)),
    }
}

/// Classify a wire-level failure message into a [`ProviderError`] variant.
///
/// Matching is case-insensitive substring search: network-ish keywords mean
/// the service cannot be reached at all, gateway-ish keywords mean it is
/// temporarily down, anything else stays generic.
pub(crate) fn classify_failure(message: &str) -> ProviderError {
    let lower = message.to_ascii_lowercase();

    const CONNECTION_KEYWORDS: [&str; 6] = [
        "connection",
        "connect",
        "network",
        "dns",
        "timeout",
        "unreachable",
    ];
    const UNAVAILABLE_KEYWORDS: [&str; 5] = [
        "503",
        "502",
        "504",
        "service unavailable",
        "bad gateway",
    ];

    if CONNECTION_KEYWORDS.iter().any(|k| lower.contains(k)) {
        ProviderError::Connection(message.to_string())
    } else if UNAVAILABLE_KEYWORDS.iter().any(|k| lower.contains(k)) {
        ProviderError::ServiceUnavailable(message.to_string())
    } else {
        ProviderError::Other(message.to_string())
    }
}
