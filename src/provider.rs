//! HTTP client for OpenAI-compatible APIs.
//!
//! Shared by the embedding and chat-completion clients. Every request goes
//! through [`OpenAIClient::post_json`], which applies the retry policy:
//!
//! - HTTP 429 (rate limited) and 5xx (server error) → retry
//! - HTTP 4xx (client error, not 429) → fail immediately
//! - Network errors → retry
//! - Malformed URL or request → fail immediately
//! - Backoff: base, 2×base, 4×base, … (capped at 2^5 × base)

use std::time::Duration;

use serde_json::Value;

use crate::config::ProviderConfig;
use crate::error::ProviderError;

#[derive(Clone)]
pub struct OpenAIClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    max_retries: u32,
    backoff_base: Duration,
}

impl OpenAIClient {
    /// Build a client from config, reading the API key from the environment.
    pub fn from_config(config: &ProviderConfig) -> Result<Self, ProviderError> {
        let api_key = config
            .api_key()
            .ok_or_else(|| ProviderError::MissingCredential(config.api_key_env.clone()))?;
        Self::new(config, api_key)
    }

    pub fn new(config: &ProviderConfig, api_key: String) -> Result<Self, ProviderError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ProviderError::Config(format!("HTTP client: {}", e)))?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key,
            max_retries: config.max_retries,
            backoff_base: Duration::from_secs(1),
        })
    }

    pub fn with_backoff_base(mut self, base: Duration) -> Self {
        self.backoff_base = base;
        self
    }

    /// POST `body` to `{base_url}/{path}` and return the parsed JSON response.
    pub async fn post_json(&self, path: &str, body: &Value) -> Result<Value, ProviderError> {
        let url = format!("{}/{}", self.base_url, path.trim_start_matches('/'));
        let mut last_err = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                let delay = self.backoff_base * (1u32 << (attempt - 1).min(5));
                tracing::debug!(attempt, ?delay, url = %url, "retrying provider request");
                tokio::time::sleep(delay).await;
            }

            let resp = self
                .http
                .post(&url)
                .bearer_auth(&self.api_key)
                .json(body)
                .send()
                .await;

            match resp {
                Ok(response) => {
                    let status = response.status();

                    if status.is_success() {
                        return response
                            .json::<Value>()
                            .await
                            .map_err(|e| ProviderError::MalformedResponse(e.to_string()));
                    }

                    let body_text = response.text().await.unwrap_or_default();

                    // Rate limited or server error: retry
                    if status.as_u16() == 429 || status.is_server_error() {
                        tracing::warn!(status = status.as_u16(), url = %url, "provider request failed");
                        last_err = Some(ProviderError::Transient {
                            status: Some(status.as_u16()),
                            message: body_text,
                        });
                        continue;
                    }

                    // Client error other than 429: fail now
                    return Err(ProviderError::Permanent {
                        status: status.as_u16(),
                        message: body_text,
                    });
                }
                Err(e) => {
                    let err = ProviderError::from(e);
                    if !err.is_transient() {
                        return Err(err);
                    }
                    tracing::warn!(error = %err, url = %url, "provider request failed");
                    last_err = Some(err);
                    continue;
                }
            }
        }

        Err(last_err.unwrap_or_else(|| ProviderError::Transient {
            status: None,
            message: "request failed after retries".to_string(),
        }))
    }
}
