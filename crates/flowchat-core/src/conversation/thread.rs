use super::message::{Message, MessageId};
use super::model::Conversation;
use crate::error::{FlowchatError, Result};
use tracing::error;

/// Resolves the linear thread from the conversation root down to `id`.
///
/// `None` (no focus) yields an empty thread. The result is a pure function of
/// the conversation's state.
///
/// # Errors
///
/// Returns `NotFound` if `id` is absent or its parent chain does not end at
/// the conversation root. Both indicate a dangling reference.
pub fn resolve_thread<'a>(
    conversation: &'a Conversation,
    id: Option<&MessageId>,
) -> Result<Vec<&'a Message>> {
    let Some(id) = id else {
        return Ok(Vec::new());
    };

    let mut current = conversation
        .find_message(id.as_str())
        .ok_or_else(|| FlowchatError::not_found("message", id.as_str()))?;
    let mut thread = vec![current];

    // A well-formed tree never needs more steps than it has messages.
    while let Some(parent) = conversation.parent_of(current.id.as_str()) {
        if thread.len() > conversation.len() {
            error!(
                conversation_id = conversation.id(),
                message_id = %id,
                "Parent chain does not terminate"
            );
            return Err(FlowchatError::not_found("message", id.as_str()));
        }
        thread.push(parent);
        current = parent;
    }

    if conversation.root_id() != Some(&current.id) {
        error!(
            conversation_id = conversation.id(),
            message_id = %id,
            top = %current.id,
            "Message is not reachable from the conversation root"
        );
        return Err(FlowchatError::not_found("message", id.as_str()));
    }

    thread.reverse();
    Ok(thread)
}

/// One message of a resolved thread plus the annotations the thread view shows.
#[derive(Debug, Clone, PartialEq)]
pub struct ThreadEntry<'a> {
    pub message: &'a Message,
    /// Number of direct replies ("N responses").
    pub response_count: usize,
    /// Number of merged branches, 0 for ordinary messages.
    pub merged_branch_count: usize,
    pub is_focal: bool,
    pub is_bookmarked: bool,
}

/// Decorates a resolved thread for display.
pub fn annotate_thread<'a>(
    conversation: &Conversation,
    thread: &[&'a Message],
    focal: Option<&MessageId>,
) -> Vec<ThreadEntry<'a>> {
    thread
        .iter()
        .map(|&message| ThreadEntry {
            message,
            response_count: message.children.len(),
            merged_branch_count: message.merged_branch_count(),
            is_focal: focal == Some(&message.id),
            is_bookmarked: conversation.is_bookmarked(message.id.as_str()),
        })
        .collect()
}
