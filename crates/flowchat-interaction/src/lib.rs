//! Completion collaborators for FlowChat.
//!
//! Every client implements [`flowchat_core::CompletionService`]; the core
//! decides what happens when one of them fails.

pub mod chat_endpoint;
pub mod config;
mod http;
pub mod offline;
pub mod openai_client;

pub use chat_endpoint::ChatEndpointClient;
pub use config::{CompletionConfig, OpenAiConfig, ProviderKind};
pub use offline::{FallbackCompletion, OfflineCompletion};
pub use openai_client::OpenAiClient;

use flowchat_core::CompletionService;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Builds the completion service described by `config`.
///
/// With the OpenAI provider and an explicit chat endpoint, the endpoint is
/// tried when OpenAI fails.
pub fn build_completion_service(config: &CompletionConfig) -> Arc<dyn CompletionService> {
    let timeout = Duration::from_secs(config.timeout_secs);

    let service: Arc<dyn CompletionService> = match (config.provider, config.openai.as_ref()) {
        (ProviderKind::Offline, _) => Arc::new(OfflineCompletion),
        (ProviderKind::ChatEndpoint, _) => {
            Arc::new(ChatEndpointClient::new(config.chat_endpoint(), timeout))
        }
        (ProviderKind::OpenAi, Some(openai)) => {
            let primary: Arc<dyn CompletionService> =
                Arc::new(OpenAiClient::from_config(openai, timeout));
            match config.chat_endpoint.as_deref() {
                Some(endpoint) => Arc::new(FallbackCompletion::new(vec![
                    primary,
                    Arc::new(ChatEndpointClient::new(endpoint, timeout)),
                ])),
                None => primary,
            }
        }
        // validated configs never get here; degrade to offline
        (ProviderKind::OpenAi, None) => Arc::new(OfflineCompletion),
    };

    info!(service = service.name(), "Completion service ready");
    service
}
