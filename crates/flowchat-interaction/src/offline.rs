//! Completion services that need no network.

use async_trait::async_trait;
use flowchat_core::{CompletionError, CompletionService};
use std::sync::Arc;
use tracing::debug;

/// Always unavailable, so every reply becomes a labelled fallback.
#[derive(Debug, Default, Clone, Copy)]
pub struct OfflineCompletion;

#[async_trait]
impl CompletionService for OfflineCompletion {
    fn name(&self) -> &str {
        "offline"
    }

    async fn complete(&self, _prompt: &str) -> Result<String, CompletionError> {
        Err(CompletionError::Unavailable("running offline".into()))
    }
}

/// Tries each provider in order and returns the first success.
///
/// When every provider fails, the last error is returned.
pub struct FallbackCompletion {
    providers: Vec<Arc<dyn CompletionService>>,
    name: String,
}

impl FallbackCompletion {
    pub fn new(providers: Vec<Arc<dyn CompletionService>>) -> Self {
        let name = providers
            .iter()
            .map(|provider| provider.name())
            .collect::<Vec<_>>()
            .join(" -> ");
        Self { providers, name }
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}

#[async_trait]
impl CompletionService for FallbackCompletion {
    fn name(&self) -> &str {
        &self.name
    }

    async fn complete(&self, prompt: &str) -> Result<String, CompletionError> {
        let mut last_error = CompletionError::Unavailable("no completion provider configured".into());
        for provider in &self.providers {
            match provider.complete(prompt).await {
                Ok(text) => return Ok(text),
                Err(err) => {
                    debug!(provider = provider.name(), error = %err, "Provider failed, trying next");
                    last_error = err;
                }
            }
        }
        Err(last_error)
    }
}
