//! The generation capability consumed by roles.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Text produced by a backend, labeled with the provider that produced it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Generation {
    pub text: String,
    pub provider: String,
}

impl Generation {
    pub fn new(text: impl Into<String>, provider: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            provider: provider.into(),
        }
    }
}

/// Something that can turn a prompt into text.
///
/// Implementations may fail; callers treat a failure as a stalled role,
/// never as a crash.
#[async_trait]
pub trait GenerationBackend: Send + Sync {
    /// Human-readable provider label, e.g. `Ollama (qwen3:8b)`.
    fn name(&self) -> String;

    /// Generates a completion for `prompt`, with an optional system prompt.
    async fn generate(&self, prompt: &str, system: Option<&str>) -> Result<Generation>;

    /// Cheap reachability check.
    async fn is_available(&self) -> bool;
}
