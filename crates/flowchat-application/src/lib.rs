//! Application layer of FlowChat.
//!
//! Wires the core conversation model to a completion service and owns the
//! runtime resources a front end needs, such as the timeline playback task.

pub mod conversation_usecase;
mod in_flight;
mod playback;
mod state;

pub use conversation_usecase::{ConversationSummary, ConversationUseCase, SendOutcome};
pub use playback::PlaybackToggle;
