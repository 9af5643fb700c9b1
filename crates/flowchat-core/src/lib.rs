//! Branching conversation model and merge engine.
//!
//! Conversations are rooted message trees. Users focus one message to read
//! its thread, mark several messages as merge candidates, replay creation
//! order on a timeline, and merge branches into a convergence message whose
//! provenance is recorded without adding structural edges.

pub mod completion;
pub mod conversation;
pub mod error;
pub mod graph;
pub mod merge;
pub mod selection;
pub mod timeline;
pub mod view;

// Re-export common types
pub use completion::CompletionService;
pub use conversation::{Conversation, GeneratedText, Message, MessageId, MessageRole};
pub use error::{CompletionError, FlowchatError, Result};
pub use merge::{MergeEngine, MergePhase};
pub use selection::Selection;
pub use timeline::{PlaybackClock, PlaybackConfig, PlaybackTick, Timeline};
pub use view::ConversationView;
