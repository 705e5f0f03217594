//! HTTP generation providers.
//!
//! Each provider builds its request body and parses its response with pure
//! functions, so the wire formats can be tested without a server.

mod digitalocean;
mod litellm;
mod ollama;
mod vllm;

pub use digitalocean::DigitalOceanProvider;
pub use litellm::LiteLlmProvider;
pub use ollama::{OllamaProvider, DEFAULT_OLLAMA_MODEL, DEFAULT_OLLAMA_URL};
pub use vllm::VllmProvider;

use std::time::Duration;

use serde_json::Value;
use tracing::trace;

use crate::error::{InferenceError, Result};

pub(crate) const DEFAULT_TEMPERATURE: f64 = 0.3;
pub(crate) const DEFAULT_MAX_TOKENS: u32 = 2048;

/// Timeout for one generation request.
pub(crate) const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Timeout for a health check.
const HEALTH_TIMEOUT: Duration = Duration::from_secs(5);

/// Explicit key first, then the environment variable.
pub(crate) fn api_key_or_env(explicit: Option<String>, env_var: &str) -> Option<String> {
    explicit.or_else(|| std::env::var(env_var).ok())
}

pub(crate) fn trim_url(url: &str) -> String {
    url.trim_end_matches('/').to_string()
}

pub(crate) async fn post_json(
    client: &reqwest::Client,
    provider: &str,
    url: &str,
    api_key: Option<&str>,
    body: &Value,
) -> Result<Value> {
    trace!(provider, url, "Sending generation request");

    let mut request = client
        .post(url)
        .header("Content-Type", "application/json")
        .timeout(REQUEST_TIMEOUT)
        .json(body);
    if let Some(key) = api_key {
        request = request.header("Authorization", format!("Bearer {}", key));
    }

    let response = request.send().await.map_err(|e| {
        if e.is_timeout() {
            InferenceError::Timeout {
                provider: provider.to_string(),
                secs: REQUEST_TIMEOUT.as_secs(),
            }
        } else {
            InferenceError::Http {
                provider: provider.to_string(),
                message: e.to_string(),
            }
        }
    })?;

    let status = response.status();
    if !status.is_success() {
        let text = response.text().await.unwrap_or_default();
        return Err(InferenceError::Http {
            provider: provider.to_string(),
            message: format!("status {}: {}", status, text),
        });
    }

    response.json().await.map_err(|e| InferenceError::Parse {
        provider: provider.to_string(),
        message: e.to_string(),
    })
}

pub(crate) async fn health_check(client: &reqwest::Client, url: &str, api_key: Option<&str>) -> bool {
    let mut request = client.get(url).timeout(HEALTH_TIMEOUT);
    if let Some(key) = api_key {
        request = request.header("Authorization", format!("Bearer {}", key));
    }
    match request.send().await {
        Ok(response) => response.status().is_success(),
        Err(e) => {
            trace!(url, error = %e, "Health check failed");
            false
        }
    }
}

/// Follows `path` into `body` and returns the string found there.
pub(crate) fn extract_text(provider: &str, body: &Value, path: &[PathSegment]) -> Result<String> {
    let mut current = body;
    for segment in path {
        let next = match segment {
            PathSegment::Key(key) => current.get(*key),
            PathSegment::Index(i) => current.get(*i),
        };
        current = next.ok_or_else(|| InferenceError::Parse {
            provider: provider.to_string(),
            message: format!("missing {}", segment),
        })?;
    }
    current
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| InferenceError::Parse {
            provider: provider.to_string(),
            message: "response text is not a string".to_string(),
        })
}

#[derive(Debug, Clone, Copy)]
pub(crate) enum PathSegment {
    Key(&'static str),
    Index(usize),
}

impl std::fmt::Display for PathSegment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PathSegment::Key(key) => write!(f, "field `{}`", key),
            PathSegment::Index(i) => write!(f, "index {}", i),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_extract_text_nested() {
        let body = json!({"choices": [{"message": {"content": "4"}}]});
        let text = extract_text(
            "test",
            &body,
            &[
                PathSegment::Key("choices"),
                PathSegment::Index(0),
                PathSegment::Key("message"),
                PathSegment::Key("content"),
            ],
        )
        .unwrap();
        assert_eq!(text, "4");
    }

    #[test]
    fn test_extract_text_missing_field() {
        let err = extract_text("test", &json!({}), &[PathSegment::Key("response")]).unwrap_err();
        assert!(matches!(err, InferenceError::Parse { .. }));
        assert!(err.to_string().contains("missing field `response`"));
    }

    #[test]
    fn test_trim_url() {
        assert_eq!(trim_url("http://host:8000/"), "http://host:8000");
        assert_eq!(trim_url("http://host"), "http://host");
    }
}
