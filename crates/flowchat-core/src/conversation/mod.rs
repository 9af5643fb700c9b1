//! Conversation domain module.
//!
//! # Module Structure
//!
//! - `message`: Message types (`Message`, `MessageId`, `MessageRole`)
//! - `model`: The per-conversation message store (`Conversation`)
//! - `thread`: Root-to-message linearization (`resolve_thread`)

mod message;
mod model;
mod thread;

// Re-export public API
pub use message::{GeneratedText, Message, MessageId, MessageRole};
pub use model::Conversation;
pub use thread::{ThreadEntry, annotate_thread, resolve_thread};
