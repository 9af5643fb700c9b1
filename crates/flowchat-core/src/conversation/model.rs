//! Conversation domain model.
//!
//! A `Conversation` is the message store for one branching chat: it owns
//! every message, the creation order, and a structural-parent index. All
//! structural mutations go through this type so that the single-parent tree
//! invariant holds no matter who calls it.

use super::message::{GeneratedText, Message, MessageId, MessageRole};
use crate::error::{FlowchatError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use tracing::debug;
use uuid::Uuid;

/// A named container of messages forming a rooted tree.
///
/// `merged_from` on convergence messages records causal provenance, but a
/// merge never adds a second structural edge: every non-root message has
/// exactly one entry in `parents` and appears in exactly one `children` list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conversation {
    id: String,
    name: String,
    created_at: DateTime<Utc>,
    root_id: Option<MessageId>,
    messages: HashMap<MessageId, Message>,
    /// Message ids in creation order.
    order: Vec<MessageId>,
    /// Structural parent of every non-root message.
    parents: HashMap<MessageId, MessageId>,
    #[serde(default)]
    bookmarks: BTreeSet<MessageId>,
}

impl Conversation {
    /// Creates an empty conversation with a fresh id. The root is pending
    /// until the first `add_message(None, ..)`.
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_id(Uuid::new_v4().to_string(), name)
    }

    pub fn with_id(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            created_at: Utc::now(),
            root_id: None,
            messages: HashMap::new(),
            order: Vec::new(),
            parents: HashMap::new(),
            bookmarks: BTreeSet::new(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Renames the conversation. Blank names are rejected.
    pub fn rename(&mut self, name: impl Into<String>) -> Result<()> {
        let name = name.into();
        let trimmed = name.trim();
        if trimmed.is_empty() {
            return Err(FlowchatError::invalid_input("conversation name must not be empty"));
        }
        self.name = trimmed.to_string();
        Ok(())
    }

    pub fn root_id(&self) -> Option<&MessageId> {
        self.root_id.as_ref()
    }

    pub fn root(&self) -> Option<&Message> {
        self.root_id.as_ref().and_then(|id| self.messages.get(id))
    }

    /// Number of stored messages (the live total used by the timeline).
    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// O(1) lookup by id. Absence is a normal result, never an error.
    pub fn find_message(&self, id: &str) -> Option<&Message> {
        self.messages.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.messages.contains_key(id)
    }

    /// All messages in creation order.
    pub fn all_messages(&self) -> impl Iterator<Item = &Message> + '_ {
        self.order.iter().filter_map(|id| self.messages.get(id))
    }

    /// The most recently created message.
    pub fn latest_message(&self) -> Option<&Message> {
        self.order.last().and_then(|id| self.messages.get(id))
    }

    /// Position of a message in creation order.
    pub fn ordered_index(&self, id: &str) -> Option<usize> {
        self.order.iter().position(|candidate| candidate.as_str() == id)
    }

    /// Structural parent of `id`; `None` for the root or unknown ids.
    pub fn parent_of(&self, id: &str) -> Option<&Message> {
        self.parents.get(id).and_then(|parent| self.messages.get(parent))
    }

    /// Appends a message.
    ///
    /// With `parent_id == None` the message becomes the conversation root,
    /// which is only allowed while the conversation is empty.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if `parent_id` does not exist, or if it is `None`
    /// and a root already exists.
    pub fn add_message(
        &mut self,
        parent_id: Option<&MessageId>,
        role: MessageRole,
        content: impl Into<String>,
    ) -> Result<Message> {
        let message = Message::new(role, content.into(), self.next_timestamp());
        self.insert(parent_id, message)
    }

    /// Appends a generated reply, carrying over its fallback flag.
    pub fn add_generated(
        &mut self,
        parent_id: &MessageId,
        role: MessageRole,
        text: GeneratedText,
    ) -> Result<Message> {
        let mut message = Message::new(role, text.content, self.next_timestamp());
        message.fallback = text.fallback;
        self.insert(Some(parent_id), message)
    }

    /// Creates a convergence message under `parent_id`.
    ///
    /// `source_ids` becomes the message's `merged_from`, in the given order.
    /// The parent gains exactly one child; the sources are not modified.
    ///
    /// # Errors
    ///
    /// - `InvalidMerge` if fewer than two sources are given or a source is absent
    /// - `NotFound` if `parent_id` does not exist
    pub fn attach_merge(
        &mut self,
        parent_id: &MessageId,
        source_ids: &[MessageId],
        text: GeneratedText,
    ) -> Result<Message> {
        if source_ids.len() < 2 {
            return Err(FlowchatError::invalid_merge(format!(
                "a merge needs at least 2 sources, got {}",
                source_ids.len()
            )));
        }
        if let Some(missing) = source_ids.iter().find(|id| !self.contains(id.as_str())) {
            return Err(FlowchatError::invalid_merge(format!(
                "merge source '{missing}' does not exist in conversation '{}'",
                self.id
            )));
        }

        let mut message = Message::new(MessageRole::Assistant, text.content, self.next_timestamp());
        message.merged_from = Some(source_ids.to_vec());
        message.is_merge_root = true;
        message.fallback = text.fallback;
        self.insert(Some(parent_id), message)
    }

    /// Toggles a bookmark and returns whether the message is now bookmarked.
    pub fn toggle_bookmark(&mut self, id: &MessageId) -> Result<bool> {
        if !self.contains(id.as_str()) {
            return Err(FlowchatError::not_found("message", id.as_str()));
        }
        if self.bookmarks.remove(id) {
            Ok(false)
        } else {
            self.bookmarks.insert(id.clone());
            Ok(true)
        }
    }

    pub fn is_bookmarked(&self, id: &str) -> bool {
        self.bookmarks.contains(id)
    }

    pub fn bookmarks(&self) -> &BTreeSet<MessageId> {
        &self.bookmarks
    }

    fn insert(&mut self, parent_id: Option<&MessageId>, message: Message) -> Result<Message> {
        match parent_id {
            Some(parent_id) => {
                let parent = self
                    .messages
                    .get_mut(parent_id.as_str())
                    .ok_or_else(|| FlowchatError::not_found("message", parent_id.as_str()))?;
                parent.children.push(message.id.clone());
                self.parents.insert(message.id.clone(), parent_id.clone());
            }
            None => {
                if let Some(root_id) = &self.root_id {
                    return Err(FlowchatError::not_found(
                        "parent message",
                        format!("<none> (conversation already rooted at {root_id})"),
                    ));
                }
                self.root_id = Some(message.id.clone());
            }
        }

        debug!(
            conversation_id = %self.id,
            message_id = %message.id,
            parent_id = ?parent_id.map(MessageId::as_str),
            role = %message.role,
            merge = message.is_merge_root,
            "Message added"
        );

        self.order.push(message.id.clone());
        self.messages.insert(message.id.clone(), message.clone());
        Ok(message)
    }

    fn next_timestamp(&self) -> DateTime<Utc> {
        let now = Utc::now();
        match self.latest_message() {
            Some(last) if last.timestamp > now => last.timestamp,
            _ => now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seeded() -> (Conversation, Message) {
        let mut conversation = Conversation::new("Test");
        let root = conversation
            .add_message(None, MessageRole::User, "hello")
            .unwrap();
        (conversation, root)
    }

    #[test]
    fn test_first_message_becomes_root() {
        let (conversation, root) = seeded();
        assert_eq!(conversation.root_id(), Some(&root.id));
        assert_eq!(conversation.len(), 1);
        assert!(conversation.parent_of(root.id.as_str()).is_none());
    }

    #[test]
    fn test_second_root_is_rejected() {
        let (mut conversation, _) = seeded();
        let err = conversation
            .add_message(None, MessageRole::User, "another root")
            .unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(conversation.len(), 1);
    }

    #[test]
    fn test_unknown_parent_is_rejected() {
        let (mut conversation, _) = seeded();
        let ghost = MessageId::from("ghost");
        let err = conversation
            .add_message(Some(&ghost), MessageRole::User, "orphan")
            .unwrap_err();
        assert_eq!(err, FlowchatError::not_found("message", "ghost"));
    }

    #[test]
    fn test_add_message_appends_only_to_parent() {
        let (mut conversation, root) = seeded();
        let first = conversation
            .add_message(Some(&root.id), MessageRole::Assistant, "a")
            .unwrap();
        let before: HashMap<MessageId, Message> = conversation
            .all_messages()
            .filter(|m| m.id != root.id)
            .map(|m| (m.id.clone(), m.clone()))
            .collect();

        let second = conversation
            .add_message(Some(&root.id), MessageRole::Assistant, "b")
            .unwrap();

        let root_after = conversation.find_message(root.id.as_str()).unwrap();
        assert_eq!(root_after.children, vec![first.id.clone(), second.id.clone()]);
        for (id, message) in before {
            assert_eq!(conversation.find_message(id.as_str()), Some(&message));
        }
    }

    #[test]
    fn test_all_messages_in_creation_order() {
        let (mut conversation, root) = seeded();
        let a = conversation
            .add_message(Some(&root.id), MessageRole::Assistant, "a")
            .unwrap();
        let b = conversation
            .add_message(Some(&a.id), MessageRole::User, "b")
            .unwrap();

        let ids: Vec<_> = conversation.all_messages().map(|m| m.id.clone()).collect();
        assert_eq!(ids, vec![root.id, a.id, b.id.clone()]);
        assert_eq!(conversation.ordered_index(b.id.as_str()), Some(2));

        let timestamps: Vec<_> = conversation.all_messages().map(|m| m.timestamp).collect();
        assert!(timestamps.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn test_attach_merge_keeps_single_structural_parent() {
        let (mut conversation, root) = seeded();
        let a = conversation
            .add_message(Some(&root.id), MessageRole::Assistant, "a")
            .unwrap();
        let b = conversation
            .add_message(Some(&root.id), MessageRole::Assistant, "b")
            .unwrap();

        let merged = conversation
            .attach_merge(
                &b.id,
                &[a.id.clone(), b.id.clone()],
                GeneratedText::genuine("both"),
            )
            .unwrap();

        assert_eq!(merged.merged_from, Some(vec![a.id.clone(), b.id.clone()]));
        assert!(merged.is_merge_root);
        assert_eq!(conversation.parent_of(merged.id.as_str()).unwrap().id, b.id);
        let listing_parents = conversation
            .all_messages()
            .filter(|m| m.children.contains(&merged.id))
            .count();
        assert_eq!(listing_parents, 1);
        assert!(conversation.find_message(a.id.as_str()).unwrap().children.is_empty());
    }

    #[test]
    fn test_attach_merge_rejects_degenerate_sources() {
        let (mut conversation, root) = seeded();
        let err = conversation
            .attach_merge(&root.id, &[root.id.clone()], GeneratedText::genuine("x"))
            .unwrap_err();
        assert!(err.is_invalid_merge());

        let err = conversation
            .attach_merge(
                &root.id,
                &[root.id.clone(), MessageId::from("ghost")],
                GeneratedText::genuine("x"),
            )
            .unwrap_err();
        assert!(err.is_invalid_merge());
        assert_eq!(conversation.len(), 1);
    }

    #[test]
    fn test_bookmark_toggle() {
        let (mut conversation, root) = seeded();
        assert!(conversation.toggle_bookmark(&root.id).unwrap());
        assert!(conversation.is_bookmarked(root.id.as_str()));
        assert!(!conversation.toggle_bookmark(&root.id).unwrap());
        assert!(conversation.bookmarks().is_empty());
        assert!(conversation
            .toggle_bookmark(&MessageId::from("ghost"))
            .unwrap_err()
            .is_not_found());
    }

    #[test]
    fn test_rename_rejects_blank() {
        let mut conversation = Conversation::new("Old");
        assert!(conversation.rename("   ").is_err());
        conversation.rename("  New name ").unwrap();
        assert_eq!(conversation.name(), "New name");
    }

    #[test]
    fn test_serde_round_trip_preserves_structure() {
        let (mut conversation, root) = seeded();
        conversation
            .add_message(Some(&root.id), MessageRole::Assistant, "reply")
            .unwrap();
        let json = serde_json::to_string(&conversation).unwrap();
        let restored: Conversation = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, conversation);
    }
}
