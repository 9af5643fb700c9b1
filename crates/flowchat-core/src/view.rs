//! Conversation-scoped interaction state.

use crate::conversation::{Conversation, Message, MessageId, ThreadEntry, annotate_thread, resolve_thread};
use crate::error::{FlowchatError, Result};
use crate::graph::{GraphOptions, GraphSnapshot, build_graph};
use crate::merge::{MergePhase, effective_merge_count, merge_phase};
use crate::selection::Selection;
use crate::timeline::Timeline;

/// Selection, timeline cursor and graph options of exactly one conversation.
///
/// A view is created fresh whenever the active conversation changes, so no
/// selection can outlive the conversation it refers to. Whether a merge is
/// running belongs to the conversation, not the view, and is passed in.
#[derive(Debug)]
pub struct ConversationView {
    conversation_id: String,
    pub selection: Selection,
    pub timeline: Timeline,
    pub graph_options: GraphOptions,
}

impl ConversationView {
    pub fn new(conversation: &Conversation) -> Self {
        Self {
            conversation_id: conversation.id().to_string(),
            selection: Selection::new(),
            timeline: Timeline::new(),
            graph_options: GraphOptions::default(),
        }
    }

    pub fn conversation_id(&self) -> &str {
        &self.conversation_id
    }

    /// Plain click: focus `id` (must exist) and collapse the multi-selection.
    pub fn focus(&mut self, conversation: &Conversation, id: &MessageId) -> Result<()> {
        self.ensure_owned(conversation)?;
        if !conversation.contains(id.as_str()) {
            return Err(FlowchatError::not_found("message", id.as_str()));
        }
        self.selection.set_focal(Some(id.clone()));
        Ok(())
    }

    /// Ctrl/cmd-click: toggle `id` as a merge candidate.
    pub fn toggle_candidate(&mut self, conversation: &Conversation, id: &MessageId) -> Result<bool> {
        self.ensure_owned(conversation)?;
        if !conversation.contains(id.as_str()) {
            return Err(FlowchatError::not_found("message", id.as_str()));
        }
        Ok(self.selection.toggle_multi(id.clone()))
    }

    /// The thread driving the chat view.
    pub fn thread<'a>(&self, conversation: &'a Conversation) -> Result<Vec<&'a Message>> {
        self.ensure_owned(conversation)?;
        resolve_thread(conversation, self.selection.focal())
    }

    /// The focal thread annotated for display.
    pub fn thread_entries<'a>(&self, conversation: &'a Conversation) -> Result<Vec<ThreadEntry<'a>>> {
        let thread = self.thread(conversation)?;
        Ok(annotate_thread(conversation, &thread, self.selection.focal()))
    }

    pub fn graph(&self, conversation: &Conversation) -> Result<GraphSnapshot> {
        self.ensure_owned(conversation)?;
        Ok(build_graph(conversation, &self.selection, &self.timeline, &self.graph_options))
    }

    pub fn merge_phase(&self, conversation: &Conversation, in_flight: bool) -> MergePhase {
        merge_phase(in_flight, conversation, &self.selection)
    }

    pub fn effective_merge_count(&self) -> usize {
        effective_merge_count(self.selection.multi_selected())
    }

    fn ensure_owned(&self, conversation: &Conversation) -> Result<()> {
        if conversation.id() == self.conversation_id {
            Ok(())
        } else {
            Err(FlowchatError::internal(format!(
                "view of conversation '{}' used with '{}'",
                self.conversation_id,
                conversation.id()
            )))
        }
    }
}
