//! Generation backends for Triad roles.
//!
//! Roles never talk to a model directly. They consume a
//! [`GenerationBackend`], which turns a prompt into text plus the label of
//! the provider that produced it. This crate provides:
//!
//! - **providers**: HTTP clients for Ollama, vLLM, LiteLLM and DigitalOcean
//! - **layer**: [`InferenceLayer`], ordered failover across providers
//! - **config**: [`InferenceConfig`] and [`create_inference_layer`]
//! - **mock**: [`MockBackend`], a scripted backend for tests and demos
//!
//! # Example
//!
//! ```no_run
//! use triad_inference::{create_inference_layer, GenerationBackend, InferenceConfig};
//!
//! # async fn run() -> triad_inference::Result<()> {
//! let config = InferenceConfig::from_json(r#"{"primary": {"type": "ollama"}}"#)?;
//! let layer = create_inference_layer(&config)?;
//! let generation = layer.generate("What is 2+2?", None).await?;
//! println!("{} said {}", generation.provider, generation.text);
//! # Ok(())
//! # }
//! ```

pub mod backend;
pub mod config;
pub mod error;
pub mod layer;
pub mod mock;
pub mod providers;

pub use backend::{Generation, GenerationBackend};
pub use config::{create_inference_layer, InferenceConfig, ProviderConfig};
pub use error::{InferenceError, Result};
pub use layer::{InferenceLayer, LayerGeneration, LayerStatus, ProviderStatus};
pub use mock::{MockBackend, MockReply};
pub use providers::{DigitalOceanProvider, LiteLlmProvider, OllamaProvider, VllmProvider};
