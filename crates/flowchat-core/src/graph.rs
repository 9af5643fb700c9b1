//! Node/edge projection consumed by graph renderers.
//!
//! The core never computes coordinates; it only decides which messages and
//! structural edges a renderer may show at the current timeline position.

use crate::conversation::{Conversation, Message, MessageId, MessageRole};
use crate::selection::Selection;
use crate::timeline::Timeline;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

const PREVIEW_CHARS: usize = 80;

/// Restricts which visible messages become graph nodes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageFilter {
    #[default]
    All,
    User,
    Assistant,
    Merged,
}

impl MessageFilter {
    pub fn accepts(self, message: &Message) -> bool {
        match self {
            Self::All => true,
            Self::User => message.role == MessageRole::User,
            Self::Assistant => message.role == MessageRole::Assistant,
            Self::Merged => message.is_merged(),
        }
    }
}

impl fmt::Display for MessageFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::All => "all",
            Self::User => "user",
            Self::Assistant => "assistant",
            Self::Merged => "merged",
        };
        f.write_str(name)
    }
}

impl FromStr for MessageFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "all" => Ok(Self::All),
            "user" => Ok(Self::User),
            "assistant" => Ok(Self::Assistant),
            "merged" => Ok(Self::Merged),
            other => Err(format!(
                "unknown filter '{other}' (expected all, user, assistant or merged)"
            )),
        }
    }
}

/// Display options that are independent of the timeline.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GraphOptions {
    pub filter: MessageFilter,
    pub search_term: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GraphNode {
    pub id: MessageId,
    pub role: MessageRole,
    pub preview: String,
    /// Position in creation order.
    pub ordered_index: usize,
    pub child_count: usize,
    pub merged_branch_count: usize,
    pub is_merge: bool,
    pub is_fallback: bool,
    pub is_focal: bool,
    pub is_selected: bool,
    pub is_bookmarked: bool,
    pub matches_search: bool,
}

/// A structural parent -> child edge. Merge provenance is never an edge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GraphEdge {
    pub source: MessageId,
    pub target: MessageId,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GraphSnapshot {
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<GraphEdge>,
    /// Live message count the timeline was evaluated against.
    pub total_messages: usize,
    /// Messages inside the timeline cut, before filtering.
    pub visible_messages: usize,
}

impl GraphSnapshot {
    pub fn node(&self, id: &str) -> Option<&GraphNode> {
        self.nodes.iter().find(|node| node.id.as_str() == id)
    }
}

/// Projects the conversation into renderer nodes and edges.
pub fn build_graph(
    conversation: &Conversation,
    selection: &Selection,
    timeline: &Timeline,
    options: &GraphOptions,
) -> GraphSnapshot {
    let total = conversation.len();
    let visible = timeline.visible_count(total);
    let needle = options.search_term.trim().to_lowercase();

    let nodes: Vec<GraphNode> = conversation
        .all_messages()
        .take(visible)
        .enumerate()
        .filter(|(_, message)| options.filter.accepts(message))
        .map(|(ordered_index, message)| GraphNode {
            id: message.id.clone(),
            role: message.role,
            preview: preview(&message.content),
            ordered_index,
            child_count: message.children.len(),
            merged_branch_count: message.merged_branch_count(),
            is_merge: message.is_merge_root,
            is_fallback: message.fallback,
            is_focal: selection.focal() == Some(&message.id),
            is_selected: selection.is_selected(message.id.as_str()),
            is_bookmarked: conversation.is_bookmarked(message.id.as_str()),
            matches_search: !needle.is_empty() && message.content.to_lowercase().contains(&needle),
        })
        .collect();

    let shown: HashSet<&str> = nodes.iter().map(|node| node.id.as_str()).collect();
    let shown = &shown;
    let edges = nodes
        .iter()
        .filter_map(|node| conversation.find_message(node.id.as_str()))
        .flat_map(|message| {
            message
                .children
                .iter()
                .filter(move |child| shown.contains(child.as_str()))
                .map(move |child| GraphEdge {
                    source: message.id.clone(),
                    target: child.clone(),
                })
        })
        .collect();

    GraphSnapshot {
        nodes,
        edges,
        total_messages: total,
        visible_messages: visible,
    }
}

fn preview(content: &str) -> String {
    let single_line = content.split_whitespace().collect::<Vec<_>>().join(" ");
    if single_line.chars().count() <= PREVIEW_CHARS {
        single_line
    } else {
        let cut: String = single_line.chars().take(PREVIEW_CHARS).collect();
        format!("{cut}…")
    }
}
