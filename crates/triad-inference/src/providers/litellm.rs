//! LiteLLM proxy (chat completions).

use async_trait::async_trait;
use serde_json::{json, Value};

use super::{
    api_key_or_env, extract_text, health_check, post_json, trim_url, PathSegment,
    DEFAULT_MAX_TOKENS, DEFAULT_TEMPERATURE,
};
use crate::backend::{Generation, GenerationBackend};
use crate::error::Result;

pub const LITELLM_API_KEY_ENV: &str = "LITELLM_API_KEY";

/// LiteLLM `/chat/completions` client.
#[derive(Debug, Clone)]
pub struct LiteLlmProvider {
    client: reqwest::Client,
    api_url: String,
    model: String,
    api_key: Option<String>,
}

impl LiteLlmProvider {
    /// Creates a client. Without an explicit key, `LITELLM_API_KEY` is used.
    pub fn new(api_url: &str, model: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_url: trim_url(api_url),
            model: model.into(),
            api_key: api_key_or_env(api_key, LITELLM_API_KEY_ENV),
        }
    }

    pub fn request_body(&self, prompt: &str, system: Option<&str>) -> Value {
        let mut messages = Vec::new();
        if let Some(system) = system {
            messages.push(json!({"role": "system", "content": system}));
        }
        messages.push(json!({"role": "user", "content": prompt}));

        json!({
            "model": self.model,
            "messages": messages,
            "max_tokens": DEFAULT_MAX_TOKENS,
            "temperature": DEFAULT_TEMPERATURE,
            "stream": false,
        })
    }

    pub fn parse_response(&self, body: &Value) -> Result<String> {
        extract_text(
            &self.name(),
            body,
            &[
                PathSegment::Key("choices"),
                PathSegment::Index(0),
                PathSegment::Key("message"),
                PathSegment::Key("content"),
            ],
        )
    }
}

#[async_trait]
impl GenerationBackend for LiteLlmProvider {
    fn name(&self) -> String {
        format!("LiteLLM ({})", self.api_url)
    }

    async fn generate(&self, prompt: &str, system: Option<&str>) -> Result<Generation> {
        let url = format!("{}/chat/completions", self.api_url);
        let body = post_json(
            &self.client,
            &self.name(),
            &url,
            self.api_key.as_deref(),
            &self.request_body(prompt, system),
        )
        .await?;
        Ok(Generation::new(self.parse_response(&body)?, self.name()))
    }

    async fn is_available(&self) -> bool {
        health_check(&self.client, &format!("{}/health", self.api_url), None).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_include_system() {
        let provider = LiteLlmProvider::new("http://proxy:4000", "qwen3-8b", None);
        let body = provider.request_body("hello", Some("sys"));
        let messages = body["messages"].as_array().unwrap();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0]["role"], "system");
        assert_eq!(messages[1]["content"], "hello");
    }

    #[test]
    fn test_parse_chat_response() {
        let provider = LiteLlmProvider::new("http://proxy:4000", "qwen3-8b", None);
        let body = json!({"choices": [{"message": {"role": "assistant", "content": "hi"}}]});
        assert_eq!(provider.parse_response(&body).unwrap(), "hi");
    }
}
