//! Focal message and merge-candidate selection.

use crate::conversation::{Conversation, MessageId};
use serde::{Deserialize, Serialize};

/// Selection state of the active conversation.
///
/// A plain click sets the focal message and collapses the multi-selection; a
/// ctrl/cmd-click toggles a merge candidate without touching the focus. The
/// multi-selection keeps toggle order so that a merge's `merged_from` is
/// reproducible, but membership is set-like.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selection {
    focal: Option<MessageId>,
    multi: Vec<MessageId>,
}

impl Selection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn focal(&self) -> Option<&MessageId> {
        self.focal.as_ref()
    }

    /// Replaces the focal message and clears the multi-selection.
    pub fn set_focal(&mut self, id: Option<MessageId>) {
        self.focal = id;
        self.multi.clear();
    }

    /// Adds `id` to the multi-selection if absent, removes it otherwise.
    /// Returns whether `id` is selected afterwards.
    pub fn toggle_multi(&mut self, id: MessageId) -> bool {
        if let Some(index) = self.multi.iter().position(|selected| *selected == id) {
            self.multi.remove(index);
            false
        } else {
            self.multi.push(id);
            true
        }
    }

    /// Merge candidates in toggle order.
    pub fn multi_selected(&self) -> &[MessageId] {
        &self.multi
    }

    pub fn is_selected(&self, id: &str) -> bool {
        self.multi.iter().any(|selected| selected.as_str() == id)
    }

    pub fn clear_multi(&mut self) {
        self.multi.clear();
    }

    pub fn clear(&mut self) {
        self.focal = None;
        self.multi.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.focal.is_none() && self.multi.is_empty()
    }

    /// Returns true if every referenced id exists in `conversation`.
    pub fn is_consistent_with(&self, conversation: &Conversation) -> bool {
        self.focal
            .iter()
            .chain(self.multi.iter())
            .all(|id| conversation.contains(id.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_focal_clears_multi() {
        let mut selection = Selection::new();
        selection.toggle_multi(MessageId::from("a"));
        selection.toggle_multi(MessageId::from("b"));

        selection.set_focal(Some(MessageId::from("c")));

        assert_eq!(selection.focal(), Some(&MessageId::from("c")));
        assert!(selection.multi_selected().is_empty());
    }

    #[test]
    fn test_toggle_multi_keeps_focal() {
        let mut selection = Selection::new();
        selection.set_focal(Some(MessageId::from("f")));

        assert!(selection.toggle_multi(MessageId::from("a")));
        assert!(selection.toggle_multi(MessageId::from("b")));
        assert!(!selection.toggle_multi(MessageId::from("a")));

        assert_eq!(selection.focal(), Some(&MessageId::from("f")));
        assert_eq!(selection.multi_selected(), &[MessageId::from("b")]);
        assert!(selection.is_selected("b"));
        assert!(!selection.is_selected("a"));
    }

    #[test]
    fn test_clear() {
        let mut selection = Selection::new();
        selection.set_focal(Some(MessageId::from("f")));
        selection.toggle_multi(MessageId::from("a"));
        selection.clear();
        assert!(selection.is_empty());
    }
}
