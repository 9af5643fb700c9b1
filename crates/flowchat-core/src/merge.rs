//! Merge engine: converges several selected branches into one message.
//!
//! A merge runs in three steps so that callers holding a lock can release it
//! while the completion service is working:
//!
//! 1. [`MergeEngine::begin`] validates the selection and snapshots the branch
//!    texts (Idle/Eligible -> Merging)
//! 2. the caller obtains the synthesis text, normally via
//!    [`complete_merge_or_fallback`]
//! 3. [`MergeEngine::commit`] writes the convergence message (Merging -> Idle)
//!
//! [`MergeEngine::perform_merge`] runs all three for callers that own the
//! conversation outright. Callers that track in-flight merges themselves use
//! [`MergePlan::prepare`] and [`MergePlan::commit`] directly.

use crate::completion::{CompletionService, branch_text, complete_merge_or_fallback};
use crate::conversation::{Conversation, GeneratedText, Message, MessageId, resolve_thread};
use crate::error::{FlowchatError, Result};
use crate::selection::Selection;
use tracing::{info, warn};

/// Observable state of the merge state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergePhase {
    /// Fewer than two resolvable candidates.
    Idle,
    /// At least two candidates, all present in the conversation.
    Eligible,
    /// A synthesis request is in flight.
    Merging,
}

/// True iff at least two candidates are selected and every one resolves.
pub fn can_merge(conversation: &Conversation, candidates: &[MessageId]) -> bool {
    candidates.len() >= 2 && candidates.iter().all(|id| conversation.contains(id.as_str()))
}

/// Number of synthesis inputs. Each selected message counts, even when
/// several share an ancestor.
pub fn effective_merge_count(candidates: &[MessageId]) -> usize {
    candidates.len()
}

/// Structural parent for a merge result: the focal message when it exists,
/// otherwise the most recently created candidate.
pub fn merge_parent(conversation: &Conversation, selection: &Selection) -> Option<MessageId> {
    if let Some(focal) = selection.focal().filter(|id| conversation.contains(id.as_str())) {
        return Some(focal.clone());
    }
    selection
        .multi_selected()
        .iter()
        .filter_map(|id| conversation.ordered_index(id.as_str()).map(|index| (index, id)))
        .max_by_key(|(index, _)| *index)
        .map(|(_, id)| id.clone())
}

/// Phase for a conversation whose in-flight state is tracked elsewhere.
pub fn merge_phase(in_flight: bool, conversation: &Conversation, selection: &Selection) -> MergePhase {
    if in_flight {
        MergePhase::Merging
    } else if can_merge(conversation, selection.multi_selected()) {
        MergePhase::Eligible
    } else {
        MergePhase::Idle
    }
}

/// A validated merge waiting for its synthesis text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergePlan {
    conversation_id: String,
    sources: Vec<MessageId>,
    parent_id: MessageId,
    branch_texts: Vec<String>,
}

impl MergePlan {
    /// Validates the selection and snapshots the branch texts. Does not track
    /// whether another merge is running; see [`MergeEngine`].
    ///
    /// # Errors
    ///
    /// - `InvalidMerge` if the selection is not eligible
    /// - `NotFound` if a candidate's thread cannot be resolved
    pub fn prepare(conversation: &Conversation, selection: &Selection) -> Result<Self> {
        let candidates = selection.multi_selected();
        if !can_merge(conversation, candidates) {
            warn!(
                conversation_id = conversation.id(),
                selected = candidates.len(),
                "Merge requested over an ineligible selection"
            );
            return Err(FlowchatError::invalid_merge(format!(
                "need at least 2 existing messages selected, got {} selected",
                candidates.len()
            )));
        }

        let parent_id = merge_parent(conversation, selection)
            .ok_or_else(|| FlowchatError::internal("eligible merge without a parent"))?;

        let branch_texts = candidates
            .iter()
            .enumerate()
            .map(|(index, id)| {
                resolve_thread(conversation, Some(id)).map(|thread| branch_text(index, &thread))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            conversation_id: conversation.id().to_string(),
            sources: candidates.to_vec(),
            parent_id,
            branch_texts,
        })
    }

    /// Writes the convergence message into the conversation it was planned for.
    pub fn commit(self, conversation: &mut Conversation, text: GeneratedText) -> Result<Message> {
        if self.conversation_id != conversation.id() {
            return Err(FlowchatError::internal(format!(
                "merge planned for conversation '{}' committed into '{}'",
                self.conversation_id,
                conversation.id()
            )));
        }

        let message = conversation.attach_merge(&self.parent_id, &self.sources, text)?;
        info!(
            conversation_id = conversation.id(),
            message_id = %message.id,
            parent_id = %self.parent_id,
            branches = self.sources.len(),
            fallback = message.fallback,
            "Merge committed"
        );
        Ok(message)
    }

    pub fn conversation_id(&self) -> &str {
        &self.conversation_id
    }

    pub fn sources(&self) -> &[MessageId] {
        &self.sources
    }

    pub fn parent_id(&self) -> &MessageId {
        &self.parent_id
    }

    /// Labelled branch transcripts, in selection order.
    pub fn branch_texts(&self) -> &[String] {
        &self.branch_texts
    }
}

/// Per-conversation merge state machine. At most one merge is in flight.
#[derive(Debug, Default)]
pub struct MergeEngine {
    in_flight: bool,
}

impl MergeEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_merging(&self) -> bool {
        self.in_flight
    }

    pub fn phase(&self, conversation: &Conversation, selection: &Selection) -> MergePhase {
        merge_phase(self.in_flight, conversation, selection)
    }

    /// Validates the selection and enters the Merging phase.
    ///
    /// # Errors
    ///
    /// - `MergeInProgress` if a merge is already in flight
    /// - `InvalidMerge` if the selection is not eligible
    /// - `NotFound` if a candidate's thread cannot be resolved
    pub fn begin(&mut self, conversation: &Conversation, selection: &Selection) -> Result<MergePlan> {
        if self.in_flight {
            return Err(FlowchatError::MergeInProgress {
                conversation_id: conversation.id().to_string(),
            });
        }
        let plan = MergePlan::prepare(conversation, selection)?;
        self.in_flight = true;
        Ok(plan)
    }

    /// Writes the convergence message and leaves the Merging phase.
    ///
    /// On error the engine still returns to Idle/Eligible; the caller keeps
    /// the selection so the user can retry.
    pub fn commit(
        &mut self,
        conversation: &mut Conversation,
        plan: MergePlan,
        text: GeneratedText,
    ) -> Result<Message> {
        self.in_flight = false;
        plan.commit(conversation, text)
    }

    /// Leaves the Merging phase without writing anything.
    pub fn abort(&mut self) {
        self.in_flight = false;
    }

    /// Validates, synthesizes and commits in one call.
    ///
    /// A completion failure never surfaces here: the merge is committed with a
    /// fallback synthesis instead.
    pub async fn perform_merge(
        &mut self,
        conversation: &mut Conversation,
        selection: &Selection,
        service: &dyn CompletionService,
    ) -> Result<Message> {
        let plan = self.begin(conversation, selection)?;
        let text = complete_merge_or_fallback(service, plan.branch_texts()).await;
        self.commit(conversation, plan, text)
    }
}
