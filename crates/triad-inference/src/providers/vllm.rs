//! Remote vLLM server (OpenAI-style completions).

use async_trait::async_trait;
use serde_json::{json, Value};

use super::{
    api_key_or_env, extract_text, health_check, post_json, trim_url, PathSegment,
    DEFAULT_MAX_TOKENS, DEFAULT_TEMPERATURE,
};
use crate::backend::{Generation, GenerationBackend};
use crate::error::Result;

pub const VLLM_API_KEY_ENV: &str = "VLLM_API_KEY";
pub const DEFAULT_VLLM_MODEL: &str = "qwen3-8b";

/// vLLM `/v1/completions` client.
#[derive(Debug, Clone)]
pub struct VllmProvider {
    client: reqwest::Client,
    api_url: String,
    model: String,
    api_key: Option<String>,
}

impl VllmProvider {
    /// Creates a client. Without an explicit key, `VLLM_API_KEY` is used.
    pub fn new(api_url: &str, model: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_url: trim_url(api_url),
            model: model.into(),
            api_key: api_key_or_env(api_key, VLLM_API_KEY_ENV),
        }
    }

    /// The completions API has no system role, so the system prompt is
    /// prepended to the prompt.
    pub fn request_body(&self, prompt: &str, system: Option<&str>) -> Value {
        let full_prompt = match system {
            Some(system) => format!("{}\n\n{}", system, prompt),
            None => prompt.to_string(),
        };
        json!({
            "model": self.model,
            "prompt": full_prompt,
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
                PathSegment::Key("text"),
            ],
        )
    }
}

#[async_trait]
impl GenerationBackend for VllmProvider {
    fn name(&self) -> String {
        format!("vLLM ({})", self.api_url)
    }

    async fn generate(&self, prompt: &str, system: Option<&str>) -> Result<Generation> {
        let url = format!("{}/v1/completions", self.api_url);
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
