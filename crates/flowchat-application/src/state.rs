//! Mutable application state guarded by the use case's lock.

use crate::playback::PlaybackSlot;
use flowchat_core::error::{FlowchatError, Result};
use flowchat_core::{Conversation, ConversationView};

#[derive(Debug, Default)]
pub(crate) struct AppState {
    /// Conversations in creation order.
    pub conversations: Vec<Conversation>,
    /// View of the active conversation; `None` when nothing is active.
    pub view: Option<ConversationView>,
    /// Bumped whenever `view` is replaced.
    pub view_epoch: u64,
    /// Number used for the next default conversation name.
    pub next_number: usize,
    pub playback: PlaybackSlot,
}

impl AppState {
    pub fn new() -> Self {
        Self {
            next_number: 1,
            ..Self::default()
        }
    }

    pub fn active_id(&self) -> Option<&str> {
        self.view.as_ref().map(ConversationView::conversation_id)
    }

    pub fn find(&self, id: &str) -> Option<&Conversation> {
        self.conversations.iter().find(|c| c.id() == id)
    }

    pub fn find_mut(&mut self, id: &str) -> Option<&mut Conversation> {
        self.conversations.iter_mut().find(|c| c.id() == id)
    }

    pub fn position(&self, id: &str) -> Result<usize> {
        self.conversations
            .iter()
            .position(|c| c.id() == id)
            .ok_or_else(|| FlowchatError::not_found("conversation", id))
    }

    /// Replaces the active view, stopping any playback bound to the old one.
    pub fn activate(&mut self, id: Option<&str>) {
        self.playback.stop();
        self.view = id
            .and_then(|id| self.conversations.iter().find(|c| c.id() == id))
            .map(ConversationView::new);
        self.view_epoch += 1;
    }

    pub fn active(&self) -> Result<(&Conversation, &ConversationView)> {
        let view = self.view.as_ref().ok_or_else(no_active_conversation)?;
        let conversation = self
            .conversations
            .iter()
            .find(|c| c.id() == view.conversation_id())
            .ok_or_else(|| dangling_view(view))?;
        Ok((conversation, view))
    }

    pub fn active_mut(&mut self) -> Result<(&mut Conversation, &mut ConversationView)> {
        let view = self.view.as_mut().ok_or_else(no_active_conversation)?;
        let conversation = self
            .conversations
            .iter_mut()
            .find(|c| c.id() == view.conversation_id())
            .ok_or_else(|| dangling_view(view))?;
        Ok((conversation, view))
    }
}

fn no_active_conversation() -> FlowchatError {
    FlowchatError::invalid_input("no active conversation")
}

fn dangling_view(view: &ConversationView) -> FlowchatError {
    FlowchatError::internal(format!(
        "active view refers to missing conversation '{}'",
        view.conversation_id()
    ))
}
