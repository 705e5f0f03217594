//! Local Ollama server.

use async_trait::async_trait;
use serde_json::{json, Value};

use super::{extract_text, health_check, post_json, trim_url, PathSegment, DEFAULT_TEMPERATURE};
use crate::backend::{Generation, GenerationBackend};
use crate::error::Result;

pub const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";
pub const DEFAULT_OLLAMA_MODEL: &str = "qwen3:8b";

/// Ollama `/api/generate` client.
#[derive(Debug, Clone)]
pub struct OllamaProvider {
    client: reqwest::Client,
    base_url: String,
    model: String,
}

impl OllamaProvider {
    pub fn new(model: impl Into<String>, base_url: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: trim_url(base_url),
            model: model.into(),
        }
    }

    pub fn request_body(&self, prompt: &str, system: Option<&str>) -> Value {
        let mut body = json!({
            "model": self.model,
            "prompt": prompt,
            "stream": false,
            "options": { "temperature": DEFAULT_TEMPERATURE },
        });
        if let Some(system) = system {
            body["system"] = json!(system);
        }
        body
    }

    pub fn parse_response(&self, body: &Value) -> Result<String> {
        extract_text(&self.name(), body, &[PathSegment::Key("response")])
    }
}

impl Default for OllamaProvider {
    fn default() -> Self {
        Self::new(DEFAULT_OLLAMA_MODEL, DEFAULT_OLLAMA_URL)
    }
}

#[async_trait]
impl GenerationBackend for OllamaProvider {
    fn name(&self) -> String {
        format!("Ollama ({})", self.model)
    }

    async fn generate(&self, prompt: &str, system: Option<&str>) -> Result<Generation> {
        let url = format!("{}/api/generate", self.base_url);
        let body = post_json(
            &self.client,
            &self.name(),
            &url,
            None,
            &self.request_body(prompt, system),
        )
        .await?;
        Ok(Generation::new(self.parse_response(&body)?, self.name()))
    }

    async fn is_available(&self) -> bool {
        health_check(&self.client, &format!("{}/api/tags", self.base_url), None).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_body() {
        let provider = OllamaProvider::default();
        let body = provider.request_body("hi", Some("be brief"));
        assert_eq!(body["model"], "qwen3:8b");
        assert_eq!(body["stream"], false);
        assert_eq!(body["system"], "be brief");

        let body = provider.request_body("hi", None);
        assert!(body.get("system").is_none());
    }

    #[test]
    fn test_parse_response() {
        let provider = OllamaProvider::default();
        let text = provider
            .parse_response(&json!({"response": "4", "done": true}))
            .unwrap();
        assert_eq!(text, "4");
        assert_eq!(provider.name(), "Ollama (qwen3:8b)");
    }
}
