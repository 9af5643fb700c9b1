//! Completion collaborator interface.
//!
//! The core never talks HTTP itself. It builds prompts, hands them to a
//! `CompletionService`, and substitutes a clearly-labelled placeholder when
//! the service fails so that the conversation graph keeps its shape.

pub mod fallback;
mod prompt;

pub use prompt::{branch_text, context_prompt, merge_prompt, transcript};

use crate::conversation::GeneratedText;
use crate::error::CompletionError;
use async_trait::async_trait;
use tracing::warn;

/// An opaque text-completion service.
///
/// Implementations live outside the core (HTTP clients, test doubles). A
/// failure is an expected condition, never a defect.
#[async_trait]
pub trait CompletionService: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &str;

    /// Generates text for a fully assembled prompt.
    async fn complete(&self, prompt: &str) -> Result<String, CompletionError>;

    /// Synthesizes several labelled branch texts into one continuation.
    async fn complete_merge(&self, branch_texts: &[String]) -> Result<String, CompletionError> {
        self.complete(&merge_prompt(branch_texts)).await
    }
}

/// Calls `complete`, falling back to a deterministic placeholder on failure.
pub async fn complete_or_fallback(service: &dyn CompletionService, prompt: &str) -> GeneratedText {
    match service.complete(prompt).await {
        Ok(text) if !text.trim().is_empty() => GeneratedText::genuine(text),
        Ok(_) => {
            warn!(service = service.name(), "Completion returned blank text, using fallback");
            GeneratedText::fallback(fallback::response(prompt))
        }
        Err(err) => {
            warn!(
                service = service.name(),
                error = %err,
                retryable = err.is_retryable(),
                "Completion failed, using fallback"
            );
            GeneratedText::fallback(fallback::response(prompt))
        }
    }
}

/// Calls `complete_merge`, falling back to a synthesized placeholder on failure.
pub async fn complete_merge_or_fallback(
    service: &dyn CompletionService,
    branch_texts: &[String],
) -> GeneratedText {
    match service.complete_merge(branch_texts).await {
        Ok(text) if !text.trim().is_empty() => GeneratedText::genuine(text),
        Ok(_) => {
            warn!(service = service.name(), "Merge completion returned blank text, using fallback");
            GeneratedText::fallback(fallback::merge_response(branch_texts.len()))
        }
        Err(err) => {
            warn!(
                service = service.name(),
                error = %err,
                branches = branch_texts.len(),
                "Merge completion failed, using fallback"
            );
            GeneratedText::fallback(fallback::merge_response(branch_texts.len()))
        }
    }
}
