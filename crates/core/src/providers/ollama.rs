//! Ollama adapter for local models
//!
//! Talks to the `/api/chat` endpoint with streaming disabled. Local models
//! are slow, so the correction timeout is generous; the health probe against
//! `/api/tags` stays short.

use super::{markers, Provider};
use crate::error::{ProviderError, Result};
use crate::split::char_len;
use async_trait::async_trait;
use reqwest::{Client, ClientBuilder};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::time::Duration;
use tracing::{debug, warn};

/// Default request timeout for a correction call
const CORRECT_TIMEOUT: Duration = Duration::from_secs(300);

/// Timeout for the tags health probe
const HEALTH_TIMEOUT: Duration = Duration::from_secs(5);

/// Floor for the output token budget
const MIN_NUM_PREDICT: usize = 2048;

/// Ollama provider adapter
#[derive(Debug, Clone)]
pub struct OllamaProvider {
    client: Client,
    base_url: String,
    model_name: String,
}

impl OllamaProvider {
    /// Create an adapter for a base URL and model
    pub fn new(base_url: String, model_name: String) -> Result<Self> {
        let client = ClientBuilder::new().timeout(CORRECT_TIMEOUT).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            model_name,
        })
    }

    /// The configured base URL
    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl Provider for OllamaProvider {
    fn name(&self) -> &'static str {
        "ollama"
    }

    async fn correct(
        &self,
        text: &str,
        prompt: &str,
    ) -> std::result::Result<String, ProviderError> {
        let url = format!("{}/api/chat", self.base_url);
        let input_len = char_len(text);
        // Local models echo roughly two output tokens per input character;
        // leave headroom so long sentences are never truncated.
        let num_predict = (input_len * 2 + 1000).max(MIN_NUM_PREDICT);

        debug!(
            "ollama: sending correction request, model={}, input_chars={}, num_predict={}",
            self.model_name, input_len, num_predict
        );

        let payload = json!({
            "model": self.model_name,
            "messages": [
                {"role": "system", "content": prompt},
                {"role": "user", "content": text},
            ],
            "stream": false,
            "options": {
                "temperature": 0.0,
                "num_predict": num_predict,
            },
        });

        let response = self
            .client
            .post(&url)
            .json(&payload)
            .send()
            .await
            .map_err(|e| {
                if e.is_connect() {
                    ProviderError::connection(format!(
                        "cannot connect to Ollama at {}: {}",
                        self.base_url, e
                    ))
                } else if e.is_timeout() {
                    ProviderError::connection(format!(
                        "Ollama request timed out after {}s",
                        CORRECT_TIMEOUT.as_secs()
                    ))
                } else {
                    ProviderError::other(format!("Ollama request failed: {}", e))
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let snippet: String = body.chars().take(200).collect();
            return Err(ProviderError::other(format!(
                "Ollama API returned status {}: {}",
                status, snippet
            )));
        }

        let reply: ChatReply = response.json().await.map_err(|e| {
            ProviderError::other(format!("Ollama returned an unparsable response: {}", e))
        })?;

        let raw = reply.message.map(|m| m.content).unwrap_or_default();
        let cleaned = markers::strip_markers(raw.trim());
        let output_len = char_len(&cleaned);

        if output_len == 0 {
            return Err(ProviderError::other(format!(
                "Ollama returned empty content (raw length {})",
                char_len(&raw)
            )));
        }

        if output_len * 2 < input_len {
            warn!(
                "ollama: response length ({}) is far below input length ({}), possible truncation",
                output_len, input_len
            );
        }

        Ok(cleaned)
    }

    async fn health_check(&self) -> bool {
        let url = format!("{}/api/tags", self.base_url);
        match self
            .client
            .get(&url)
            .timeout(HEALTH_TIMEOUT)
            .send()
            .await
        {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                warn!("ollama: health check failed: {}", e);
                false
            }
        }
    }
}

#[derive(Debug, Deserialize, Serialize)]
struct ChatReply {
    message: Option<ReplyMessage>,
}

#[derive(Debug, Deserialize, Serialize)]
struct ReplyMessage {
    content: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provider_for(server: &mockito::ServerGuard) -> OllamaProvider {
        OllamaProvider::new(server.url(), "qwen".to_string()).unwrap()
    }

    #[tokio::test]
    async fn test_correct_success() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/api/chat")
            .with_status(200)
            .with_body(r#"{"message":{"role":"assistant","content":"这句话没有错误。"}}"#)
            .create_async()
            .await;

        let provider = provider_for(&server);
        let result = provider.correct("这句话没有错误。", "校对").await.unwrap();
        assert_eq!(result, "这句话没有错误。");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_markers_stripped() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/api/chat")
            .with_status(200)
            .with_body(r#"{"message":{"role":"assistant","content":"校对结果：没有错误。"}}"#)
            .create_async()
            .await;

        let provider = provider_for(&server);
        let result = provider.correct("没有错误。", "校对").await.unwrap();
        assert_eq!(result, "没有错误。");
    }

    #[tokio::test]
    async fn test_empty_content_is_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/api/chat")
            .with_status(200)
            .with_body(r#"{"message":{"role":"assistant","content":"  "}}"#)
            .create_async()
            .await;

        let provider = provider_for(&server);
        let err = provider.correct("文本", "校对").await.unwrap_err();
        assert!(matches!(err, ProviderError::Other(_)));
    }

    #[tokio::test]
    async fn test_http_error_is_generic() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/api/chat")
            .with_status(500)
            .with_body("internal")
            .create_async()
            .await;

        let provider = provider_for(&server);
        let err = provider.correct("文本", "校对").await.unwrap_err();
        assert!(matches!(err, ProviderError::Other(_)));
    }

    #[tokio::test]
    async fn test_connection_refused_is_connection_error() {
        // Nothing listens on this port
        let provider = OllamaProvider::new("http://127.0.0.1:1".to_string(), "qwen".to_string())
            .unwrap();
        let err = provider.correct("文本", "校对").await.unwrap_err();
        assert!(matches!(err, ProviderError::Connection(_)));
    }

    #[tokio::test]
    async fn test_health_check() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/api/tags")
            .with_status(200)
            .with_body(r#"{"models":[]}"#)
            .create_async()
            .await;

        let provider = provider_for(&server);
        assert!(provider.health_check().await);
    }

    #[tokio::test]
    async fn test_health_check_unreachable() {
        let provider = OllamaProvider::new("http://127.0.0.1:1".to_string(), "qwen".to_string())
            .unwrap();
        assert!(!provider.health_check().await);
    }
}
