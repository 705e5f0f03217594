//! DigitalOcean hosted inference endpoint.

use async_trait::async_trait;
use serde_json::{json, Value};

use super::{
    api_key_or_env, extract_text, health_check, post_json, trim_url, PathSegment,
    DEFAULT_TEMPERATURE,
};
use crate::backend::{Generation, GenerationBackend};
use crate::error::Result;

pub const DO_API_KEY_ENV: &str = "DO_API_KEY";

#[derive(Debug, Clone)]
pub struct DigitalOceanProvider {
    client: reqwest::Client,
    api_url: String,
    api_key: Option<String>,
}

impl DigitalOceanProvider {
    /// Creates a client. Without an explicit key, `DO_API_KEY` is used.
    pub fn new(api_url: &str, api_key: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_url: trim_url(api_url),
            api_key: api_key_or_env(api_key, DO_API_KEY_ENV),
        }
    }

    pub fn request_body(&self, prompt: &str, system: Option<&str>) -> Value {
        json!({
            "prompt": prompt,
            "system": system,
            "temperature": DEFAULT_TEMPERATURE,
        })
    }

    pub fn parse_response(&self, body: &Value) -> Result<String> {
        extract_text(&self.name(), body, &[PathSegment::Key("response")])
    }
}

#[async_trait]
impl GenerationBackend for DigitalOceanProvider {
    fn name(&self) -> String {
        format!("DigitalOcean ({})", self.api_url)
    }

    async fn generate(&self, prompt: &str, system: Option<&str>) -> Result<Generation> {
        let url = format!("{}/generate", self.api_url);
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
        health_check(
            &self.client,
            &format!("{}/health", self.api_url),
            self.api_key.as_deref(),
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_body_keeps_null_system() {
        let provider = DigitalOceanProvider::new("https://app.ondigitalocean.app", None);
        let body = provider.request_body("hi", None);
        assert!(body["system"].is_null());
        assert_eq!(body["prompt"], "hi");
    }
}
