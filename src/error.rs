//! Typed errors for the provider clients and the question pipeline.

use thiserror::Error;

/// Failure from the embedding or chat-completion provider.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("API key not set (expected environment variable {0})")]
    MissingCredential(String),

    /// The client or request could not be built, e.g. a `base_url` without a scheme.
    #[error("provider configuration error: {0}")]
    Config(String),

    /// Network failure, rate limiting, or a server error. Safe to retry.
    #[error("transient provider error{}: {message}", fmt_status(.status))]
    Transient {
        status: Option<u16>,
        message: String,
    },

    /// Authentication or request error. Retrying will not help.
    #[error("provider error (HTTP {status}): {message}")]
    Permanent { status: u16, message: String },

    #[error("malformed provider response: {0}")]
    MalformedResponse(String),
}

fn fmt_status(status: &Option<u16>) -> String {
    status.map(|s| format!(" (HTTP {})", s)).unwrap_or_default()
}

impl ProviderError {
    pub fn is_transient(&self) -> bool {
        matches!(self, ProviderError::Transient { .. })
    }
}

impl From<reqwest::Error> for ProviderError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_builder() {
            ProviderError::Config(err.to_string())
        } else if err.is_decode() {
            ProviderError::MalformedResponse(err.to_string())
        } else {
            ProviderError::Transient {
                status: err.status().map(|s| s.as_u16()),
                message: err.to_string(),
            }
        }
    }
}

/// Errors surfaced to the user for a single question. None of them are fatal.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("vector store not set up (collection '{collection}'); run setup first")]
    NotInitialized { collection: String },

    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error(transparent)]
    Store(#[from] anyhow::Error),
}
