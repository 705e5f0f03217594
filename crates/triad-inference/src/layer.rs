//! Ordered failover across generation providers.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::backend::{Generation, GenerationBackend};
use crate::error::{InferenceError, Result};

/// Output of [`InferenceLayer::generate_with_details`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayerGeneration {
    pub text: String,
    pub provider: String,
    /// `true` when a backup, not the primary, answered.
    pub fallback_used: bool,
}

/// Health of one provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderStatus {
    pub name: String,
    pub available: bool,
    /// Consecutive failures since the last success.
    pub failures: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayerStatus {
    pub primary: ProviderStatus,
    pub backups: Vec<ProviderStatus>,
}

/// A primary provider plus ordered backups.
///
/// Each call tries providers in order, skipping those whose health check
/// fails, and returns the first success. A provider's failure count is
/// reset when it succeeds.
pub struct InferenceLayer {
    providers: Vec<Arc<dyn GenerationBackend>>,
    failures: Mutex<HashMap<String, u32>>,
}

impl InferenceLayer {
    pub fn new(primary: Arc<dyn GenerationBackend>, backups: Vec<Arc<dyn GenerationBackend>>) -> Self {
        let mut providers = Vec::with_capacity(backups.len() + 1);
        providers.push(primary);
        providers.extend(backups);

        let failures = providers.iter().map(|p| (p.name(), 0)).collect();
        Self {
            providers,
            failures: Mutex::new(failures),
        }
    }

    pub fn provider_count(&self) -> usize {
        self.providers.len()
    }

    fn record_failure(&self, name: &str) {
        if let Ok(mut failures) = self.failures.lock() {
            *failures.entry(name.to_string()).or_insert(0) += 1;
        }
    }

    fn reset_failures(&self, name: &str) {
        if let Ok(mut failures) = self.failures.lock() {
            failures.insert(name.to_string(), 0);
        }
    }

    fn failure_count(&self, name: &str) -> u32 {
        self.failures
            .lock()
            .ok()
            .and_then(|f| f.get(name).copied())
            .unwrap_or(0)
    }

    /// Generates with failover and reports which provider answered.
    ///
    /// # Errors
    /// [`InferenceError::AllProvidersFailed`] with one cause per provider.
    pub async fn generate_with_details(
        &self,
        prompt: &str,
        system: Option<&str>,
    ) -> Result<LayerGeneration> {
        let mut causes = Vec::new();

        for (index, provider) in self.providers.iter().enumerate() {
            let name = provider.name();

            if !provider.is_available().await {
                warn!(provider = %name, "Provider unavailable, trying next");
                self.record_failure(&name);
                causes.push(format!("{}: unavailable", name));
                continue;
            }

            match provider.generate(prompt, system).await {
                Ok(generation) => {
                    self.reset_failures(&name);
                    let fallback_used = index > 0;
                    if fallback_used {
                        info!(provider = %name, "Generated with backup provider");
                    } else {
                        debug!(provider = %name, "Generated with primary provider");
                    }
                    return Ok(LayerGeneration {
                        text: generation.text,
                        provider: generation.provider,
                        fallback_used,
                    });
                }
                Err(e) => {
                    warn!(provider = %name, error = %e, "Provider failed");
                    self.record_failure(&name);
                    causes.push(format!("{}: {}", name, e));
                }
            }
        }

        Err(InferenceError::AllProvidersFailed(causes))
    }

    /// Availability and failure counts of every provider.
    pub async fn status(&self) -> LayerStatus {
        let mut statuses = Vec::with_capacity(self.providers.len());
        for provider in &self.providers {
            let name = provider.name();
            statuses.push(ProviderStatus {
                available: provider.is_available().await,
                failures: self.failure_count(&name),
                name,
            });
        }

        let primary = statuses.remove(0);
        LayerStatus {
            primary,
            backups: statuses,
        }
    }
}

impl std::fmt::Debug for InferenceLayer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<String> = self.providers.iter().map(|p| p.name()).collect();
        f.debug_struct("InferenceLayer")
            .field("providers", &names)
            .finish()
    }
}

#[async_trait]
impl GenerationBackend for InferenceLayer {
    fn name(&self) -> String {
        format!("InferenceLayer ({})", self.providers[0].name())
    }

    async fn generate(&self, prompt: &str, system: Option<&str>) -> Result<Generation> {
        let generation = self.generate_with_details(prompt, system).await?;
        Ok(Generation::new(generation.text, generation.provider))
    }

    async fn is_available(&self) -> bool {
        for provider in &self.providers {
            if provider.is_available().await {
                return true;
            }
        }
        false
    }
}
