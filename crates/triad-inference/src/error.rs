//! Error types for generation backends.

use thiserror::Error;

/// Errors that can occur while generating text.
#[derive(Error, Debug)]
pub enum InferenceError {
    /// Provider did not answer its health check.
    #[error("provider unavailable: {0}")]
    Unavailable(String),

    /// Provider did not answer in time.
    #[error("{provider} timed out after {secs}s")]
    Timeout { provider: String, secs: u64 },

    /// HTTP request failed or returned a non-success status.
    #[error("{provider} request failed: {message}")]
    Http { provider: String, message: String },

    /// Response body did not have the expected shape.
    #[error("{provider} returned an unexpected response: {message}")]
    Parse { provider: String, message: String },

    /// Invalid backend configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// Every configured provider failed.
    #[error("all inference providers failed: {}", .0.join("; "))]
    AllProvidersFailed(Vec<String>),
}

impl InferenceError {
    /// Returns `true` if trying again later, or elsewhere, could succeed.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, Self::Config(_))
    }
}

/// Result type alias for inference operations.
pub type Result<T> = std::result::Result<T, InferenceError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_failed_lists_causes() {
        let err = InferenceError::AllProvidersFailed(vec![
            "Ollama (qwen3:8b): unavailable".into(),
            "vLLM (http://x): timed out".into(),
        ]);
        assert_eq!(
            err.to_string(),
            "all inference providers failed: Ollama (qwen3:8b): unavailable; vLLM (http://x): timed out"
        );
        assert!(err.is_retryable());
        assert!(!InferenceError::Config("bad".into()).is_retryable());
    }
}
