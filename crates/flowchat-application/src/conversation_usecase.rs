//! Conversation use case.
//!
//! `ConversationUseCase` owns every conversation of a session together with
//! the view of the active one, and sequences the operations a front end
//! performs: managing conversations, selecting messages, sending, merging and
//! driving the timeline.
//!
//! # Thread Safety
//!
//! State lives behind a single `tokio::sync::RwLock`. The lock is never held
//! while the completion service is awaited: sends and merges snapshot what
//! they need, release the lock, and re-acquire it to commit.
//!
//! Exclusion that must survive the lock being released is held in guards
//! (a semaphore permit for sends, a per-conversation claim for merges), so
//! dropping a pending send or merge releases it.

use crate::in_flight::InFlight;
use crate::playback::{PlaybackToggle, run_playback};
use crate::state::AppState;
use flowchat_core::completion::{complete_merge_or_fallback, complete_or_fallback, context_prompt};
use flowchat_core::conversation::resolve_thread;
use flowchat_core::error::{FlowchatError, Result};
use flowchat_core::graph::{GraphSnapshot, MessageFilter};
use flowchat_core::merge::MergePlan;
use flowchat_core::{
    CompletionService, Conversation, ConversationView, GeneratedText, MergePhase, Message,
    MessageId, MessageRole, PlaybackConfig,
};
use std::sync::Arc;
use tokio::sync::{RwLock, Semaphore};
use tracing::{info, warn};

/// One row of the conversation list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversationSummary {
    pub id: String,
    pub name: String,
    pub message_count: usize,
    pub is_active: bool,
}

impl ConversationSummary {
    fn of(conversation: &Conversation, active_id: Option<&str>) -> Self {
        Self {
            id: conversation.id().to_string(),
            name: conversation.name().to_string(),
            message_count: conversation.len(),
            is_active: active_id == Some(conversation.id()),
        }
    }
}

/// Messages written by one plain send.
#[derive(Debug, Clone, PartialEq)]
pub struct SendOutcome {
    pub user_message: Message,
    pub reply: Message,
}

/// Use case for branching conversations.
///
/// Holds every conversation of the session, the view of the active one, the
/// completion service replies and merges are requested from, and the
/// playback task driving the timeline. At most one plain send is pending at a
/// time, and at most one merge per conversation.
pub struct ConversationUseCase {
    state: Arc<RwLock<AppState>>,
    completion: Arc<dyn CompletionService>,
    playback_config: PlaybackConfig,
    send_slot: Arc<Semaphore>,
    merges: InFlight,
}

impl ConversationUseCase {
    pub fn new(completion: Arc<dyn CompletionService>, playback_config: PlaybackConfig) -> Self {
        Self {
            state: Arc::new(RwLock::new(AppState::new())),
            completion,
            playback_config,
            send_slot: Arc::new(Semaphore::new(1)),
            merges: InFlight::default(),
        }
    }

    pub fn completion_service_name(&self) -> &str {
        self.completion.name()
    }

    // ---------------------------------------------------------------------
    // Conversations
    // ---------------------------------------------------------------------

    /// Creates "Conversation N" and makes it active.
    pub async fn create_conversation(&self) -> ConversationSummary {
        let mut state = self.state.write().await;
        let conversation = Conversation::new(format!("Conversation {}", state.next_number));
        state.next_number += 1;

        let summary = ConversationSummary::of(&conversation, Some(conversation.id()));
        info!(conversation_id = %summary.id, name = %summary.name, "Conversation created");
        state.conversations.push(conversation);
        state.activate(Some(&summary.id));
        summary
    }

    pub async fn rename_conversation(&self, id: &str, name: &str) -> Result<()> {
        let mut state = self.state.write().await;
        let conversation = state
            .find_mut(id)
            .ok_or_else(|| FlowchatError::not_found("conversation", id))?;
        conversation.rename(name)?;
        info!(conversation_id = id, name = conversation.name(), "Conversation renamed");
        Ok(())
    }

    /// Activates `id` with a fresh view.
    ///
    /// Returns `false` without touching anything when `id` is already active.
    pub async fn switch_conversation(&self, id: &str) -> Result<bool> {
        let mut state = self.state.write().await;
        if state.active_id() == Some(id) {
            return Ok(false);
        }
        state.position(id)?;
        state.activate(Some(id));
        info!(conversation_id = id, "Switched conversation");
        Ok(true)
    }

    /// Deletes a conversation. Deleting the active one activates the most
    /// recently created remaining conversation, or none.
    ///
    /// Returns the id of the conversation active afterwards.
    pub async fn delete_conversation(&self, id: &str) -> Result<Option<String>> {
        let mut state = self.state.write().await;
        let index = state.position(id)?;
        state.conversations.remove(index);
        info!(conversation_id = id, "Conversation deleted");

        if state.active_id() == Some(id) {
            let next = state.conversations.last().map(|c| c.id().to_string());
            state.activate(next.as_deref());
        }
        Ok(state.active_id().map(str::to_string))
    }

    pub async fn list_conversations(&self) -> Vec<ConversationSummary> {
        let state = self.state.read().await;
        let active_id = state.active_id();
        state
            .conversations
            .iter()
            .map(|c| ConversationSummary::of(c, active_id))
            .collect()
    }

    pub async fn active_conversation_id(&self) -> Option<String> {
        self.state.read().await.active_id().map(str::to_string)
    }

    /// Runs `f` against the active conversation and its view.
    pub async fn with_active<R>(
        &self,
        f: impl FnOnce(&Conversation, &ConversationView) -> R,
    ) -> Result<R> {
        let state = self.state.read().await;
        let (conversation, view) = state.active()?;
        Ok(f(conversation, view))
    }

    // ---------------------------------------------------------------------
    // Selection
    // ---------------------------------------------------------------------

    pub async fn focus(&self, id: &MessageId) -> Result<()> {
        let mut state = self.state.write().await;
        let (conversation, view) = state.active_mut()?;
        view.focus(conversation, id)
    }

    /// Toggles a merge candidate; returns whether it is now selected.
    pub async fn toggle_candidate(&self, id: &MessageId) -> Result<bool> {
        let mut state = self.state.write().await;
        let (conversation, view) = state.active_mut()?;
        view.toggle_candidate(conversation, id)
    }

    pub async fn clear_candidates(&self) -> Result<()> {
        let mut state = self.state.write().await;
        let (_, view) = state.active_mut()?;
        view.selection.clear_multi();
        Ok(())
    }

    pub async fn toggle_bookmark(&self, id: &MessageId) -> Result<bool> {
        let mut state = self.state.write().await;
        let (conversation, _) = state.active_mut()?;
        conversation.toggle_bookmark(id)
    }

    /// The focal thread, root first.
    pub async fn thread(&self) -> Result<Vec<Message>> {
        let state = self.state.read().await;
        let (conversation, view) = state.active()?;
        Ok(view.thread(conversation)?.into_iter().cloned().collect())
    }

    // ---------------------------------------------------------------------
    // Graph
    // ---------------------------------------------------------------------

    pub async fn graph(&self) -> Result<GraphSnapshot> {
        let state = self.state.read().await;
        let (conversation, view) = state.active()?;
        view.graph(conversation)
    }

    pub async fn set_filter(&self, filter: MessageFilter) -> Result<()> {
        let mut state = self.state.write().await;
        let (_, view) = state.active_mut()?;
        view.graph_options.filter = filter;
        Ok(())
    }

    pub async fn set_search_term(&self, term: &str) -> Result<()> {
        let mut state = self.state.write().await;
        let (_, view) = state.active_mut()?;
        view.graph_options.search_term = term.trim().to_string();
        Ok(())
    }

    // ---------------------------------------------------------------------
    // Sending
    // ---------------------------------------------------------------------

    /// Appends the user's message, asks the completion service for a reply
    /// with the focal thread as context, and focuses the reply.
    ///
    /// The user message is placed under the focal message, or under the most
    /// recently created message when nothing is focal, or becomes the root of
    /// an empty conversation. A failed completion yields a fallback reply.
    ///
    /// # Errors
    ///
    /// - `InvalidInput` for blank text, when no conversation is active, or
    ///   when another send is still waiting for its reply
    pub async fn send_message(&self, text: &str) -> Result<SendOutcome> {
        let input = text.trim();
        if input.is_empty() {
            return Err(FlowchatError::invalid_input("message is empty"));
        }

        let _permit = Arc::clone(&self.send_slot)
            .try_acquire_owned()
            .map_err(|_| FlowchatError::invalid_input("a message is already waiting for a reply"))?;

        let (conversation_id, epoch, user_message, prompt) = {
            let mut state = self.state.write().await;
            let epoch = state.view_epoch;
            let (conversation, view) = state.active_mut()?;

            let parent = view
                .selection
                .focal()
                .cloned()
                .or_else(|| conversation.latest_message().map(|m| m.id.clone()));
            let history = resolve_thread(conversation, parent.as_ref())?;
            let prompt = context_prompt(&history, input);

            let user_message = conversation.add_message(parent.as_ref(), MessageRole::User, input)?;
            view.selection.set_focal(Some(user_message.id.clone()));
            let conversation_id = conversation.id().to_string();

            (conversation_id, epoch, user_message, prompt)
        };

        let generated = complete_or_fallback(self.completion.as_ref(), &prompt).await;

        let mut state = self.state.write().await;
        let reply = state
            .find_mut(&conversation_id)
            .ok_or_else(|| FlowchatError::not_found("conversation", &conversation_id))?
            .add_generated(&user_message.id, MessageRole::Assistant, generated)?;

        if state.view_epoch == epoch {
            if let Some(view) = state.view.as_mut() {
                view.selection.set_focal(Some(reply.id.clone()));
            }
        }

        info!(
            conversation_id = %conversation_id,
            message_id = %reply.id,
            fallback = reply.fallback,
            "Reply added"
        );
        Ok(SendOutcome {
            user_message,
            reply,
        })
    }

    // ---------------------------------------------------------------------
    // Merging
    // ---------------------------------------------------------------------

    pub async fn merge_phase(&self) -> Result<MergePhase> {
        let state = self.state.read().await;
        let (conversation, view) = state.active()?;
        let in_flight = self.merges.contains(conversation.id());
        Ok(view.merge_phase(conversation, in_flight))
    }

    /// Merges the selected candidates of the active conversation.
    ///
    /// On success the candidates are cleared and the convergence message
    /// becomes focal. On failure the selection is left as it was. A merge
    /// whose view is replaced while it runs still commits into its
    /// conversation, and that conversation stays busy until it does.
    ///
    /// # Errors
    ///
    /// - `InvalidMerge` when fewer than two existing messages are selected
    /// - `MergeInProgress` when a merge of this conversation is already running
    pub async fn merge(&self) -> Result<Message> {
        let (plan, epoch, _claim) = {
            let mut state = self.state.write().await;
            let epoch = state.view_epoch;
            let (conversation, view) = state.active_mut()?;
            let claim = self.merges.try_claim(conversation.id()).ok_or_else(|| {
                FlowchatError::MergeInProgress {
                    conversation_id: conversation.id().to_string(),
                }
            })?;
            let plan = MergePlan::prepare(conversation, &view.selection)?;
            info!(
                conversation_id = conversation.id(),
                branches = plan.sources().len(),
                "Merge started"
            );
            (plan, epoch, claim)
        };

        let text = complete_merge_or_fallback(self.completion.as_ref(), plan.branch_texts()).await;

        let mut state = self.state.write().await;
        if state.view_epoch == epoch {
            let (conversation, view) = state.active_mut()?;
            let merged = plan.commit(conversation, text)?;
            view.selection.clear_multi();
            view.selection.set_focal(Some(merged.id.clone()));
            Ok(merged)
        } else {
            Self::commit_detached(&mut state, plan, text)
        }
    }

    /// Commits a merge whose view was replaced while it was running.
    fn commit_detached(
        state: &mut AppState,
        plan: MergePlan,
        text: GeneratedText,
    ) -> Result<Message> {
        let conversation_id = plan.conversation_id().to_string();
        let conversation = state
            .find_mut(&conversation_id)
            .ok_or_else(|| FlowchatError::not_found("conversation", &conversation_id))?;
        let merged = conversation.attach_merge(plan.parent_id(), plan.sources(), text)?;
        warn!(
            conversation_id = %conversation_id,
            message_id = %merged.id,
            "Merge finished after its view was closed"
        );
        Ok(merged)
    }

    // ---------------------------------------------------------------------
    // Timeline
    // ---------------------------------------------------------------------

    pub async fn timeline_position(&self) -> Result<f64> {
        let state = self.state.read().await;
        let (_, view) = state.active()?;
        Ok(view.timeline.position())
    }

    /// Moves the cursor manually, stopping playback. Returns the clamped position.
    pub async fn set_timeline(&self, position: f64) -> Result<f64> {
        let mut state = self.state.write().await;
        state.playback.stop();
        let (_, view) = state.active_mut()?;
        Ok(view.timeline.set_position(position))
    }

    /// Stops playback and shows everything.
    pub async fn reset_timeline(&self) -> Result<()> {
        self.set_timeline(1.0).await.map(|_| ())
    }

    pub async fn is_playing(&self) -> bool {
        self.state.read().await.playback.is_playing()
    }

    /// Starts a replay from 0.0, or stops the running one.
    pub async fn toggle_playback(&self) -> Result<PlaybackToggle> {
        let mut state = self.state.write().await;
        if state.playback.is_playing() {
            state.playback.stop();
            info!("Playback stopped");
            return Ok(PlaybackToggle::Stopped);
        }

        let (_, view) = state.active_mut()?;
        view.timeline.set_position(0.0);
        let (generation, token) = state.playback.start();
        tokio::spawn(run_playback(
            Arc::clone(&self.state),
            self.playback_config,
            generation,
            token,
        ));
        info!(
            tick_ms = self.playback_config.tick_period.as_millis() as u64,
            "Playback started"
        );
        Ok(PlaybackToggle::Started)
    }
}
