//! Terminal rendering and message references.

use colored::Colorize;
use flowchat_application::ConversationSummary;
use flowchat_core::conversation::ThreadEntry;
use flowchat_core::graph::GraphSnapshot;
use flowchat_core::{Conversation, MessageId, MessageRole};

/// Resolves a user-typed message reference: `#n`/`n` is the n-th message in
/// creation order (1-based), anything else is a unique id prefix.
pub fn resolve_message(conversation: &Conversation, reference: &str) -> Option<MessageId> {
    let reference = reference.trim();
    let numeric = reference.strip_prefix('#').unwrap_or(reference);
    if let Ok(n) = numeric.parse::<usize>() {
        return n
            .checked_sub(1)
            .and_then(|index| conversation.all_messages().nth(index))
            .map(|message| message.id.clone());
    }
    unique_prefix(
        conversation.all_messages().map(|message| message.id.as_str()),
        reference,
    )
    .map(MessageId::from)
}

/// Same rules as [`resolve_message`], over the conversation list.
pub fn resolve_conversation(list: &[ConversationSummary], reference: &str) -> Option<String> {
    let reference = reference.trim();
    let numeric = reference.strip_prefix('#').unwrap_or(reference);
    if let Ok(n) = numeric.parse::<usize>() {
        return n
            .checked_sub(1)
            .and_then(|index| list.get(index))
            .map(|summary| summary.id.clone());
    }
    unique_prefix(list.iter().map(|summary| summary.id.as_str()), reference).map(str::to_string)
}

fn unique_prefix<'a>(ids: impl Iterator<Item = &'a str>, prefix: &str) -> Option<&'a str> {
    if prefix.is_empty() {
        return None;
    }
    let mut matches = ids.filter(|id| id.starts_with(prefix));
    let first = matches.next()?;
    matches.next().is_none().then_some(first)
}

fn short_id(id: &MessageId) -> &str {
    id.as_str().get(..8).unwrap_or(id.as_str())
}

pub fn print_conversations(list: &[ConversationSummary]) {
    if list.is_empty() {
        println!("{}", "No conversations. Type /new to start one.".bright_black());
        return;
    }
    for (index, summary) in list.iter().enumerate() {
        let marker = if summary.is_active { "*" } else { " " };
        let line = format!(
            "{marker} {:>2}. {} ({} messages)",
            index + 1,
            summary.name,
            summary.message_count
        );
        if summary.is_active {
            println!("{}", line.bright_green());
        } else {
            println!("{line}");
        }
    }
}

pub fn print_thread(conversation: &Conversation, entries: &[ThreadEntry<'_>]) {
    if entries.is_empty() {
        println!(
            "{}",
            "No message focused. Send a message or /focus one from /graph.".bright_black()
        );
        return;
    }
    for entry in entries {
        let message = entry.message;
        let number = conversation
            .ordered_index(message.id.as_str())
            .map(|index| index + 1)
            .unwrap_or_default();

        let mut header = format!("#{number} {}", message.role.speaker());
        if entry.merged_branch_count > 0 {
            header.push_str(&format!(" [merged {} branches]", entry.merged_branch_count));
        }
        if entry.response_count > 1 {
            header.push_str(&format!(" [{} responses]", entry.response_count));
        }
        if entry.is_bookmarked {
            header.push_str(" ★");
        }
        if message.fallback {
            header.push_str(" (offline)");
        }

        let header = match message.role {
            MessageRole::User => header.green(),
            MessageRole::Assistant if message.is_merge_root => header.bright_magenta(),
            MessageRole::Assistant => header.bright_blue(),
        };
        println!("{}", if entry.is_focal { header.bold() } else { header });
        for line in message.content.lines() {
            println!("  {line}");
        }
        println!();
    }
}

pub fn print_graph(graph: &GraphSnapshot) {
    println!(
        "{}",
        format!(
            "{} of {} messages visible, {} shown",
            graph.visible_messages,
            graph.total_messages,
            graph.nodes.len()
        )
        .bright_black()
    );

    for node in &graph.nodes {
        let mut flags = String::new();
        flags.push(if node.is_focal { '>' } else { ' ' });
        flags.push(if node.is_selected { '+' } else { ' ' });
        flags.push(if node.is_bookmarked { '★' } else { ' ' });

        let children: Vec<String> = graph
            .edges
            .iter()
            .filter(|edge| edge.source == node.id)
            .filter_map(|edge| graph.node(edge.target.as_str()))
            .map(|child| format!("#{}", child.ordered_index + 1))
            .collect();

        let mut line = format!(
            "{flags} #{:<3} {:<9} {} {}",
            node.ordered_index + 1,
            node.role.speaker(),
            short_id(&node.id),
            node.preview
        );
        if node.is_merge {
            line.push_str(&format!(" [merge of {}]", node.merged_branch_count));
        }
        if !children.is_empty() {
            line.push_str(&format!(" -> {}", children.join(", ")));
        }

        let line = if node.matches_search {
            line.black().on_yellow()
        } else if node.is_merge {
            line.bright_magenta()
        } else if node.is_fallback {
            line.yellow()
        } else {
            line.normal()
        };
        println!("{line}");
    }
}

pub fn print_help() {
    println!("{}", "Commands:".bright_magenta().bold());
    for (_, usage, description) in crate::command::COMMANDS {
        println!("  {:<38} {}", usage.bright_cyan(), description);
    }
    println!("  {:<38} {}", "<text>".bright_cyan(), "send a message");
    println!(
        "{}",
        "Messages are referenced by number (#3) or id prefix.".bright_black()
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    fn conversation() -> (Conversation, Vec<MessageId>) {
        let mut conversation = Conversation::new("r");
        let root = conversation
            .add_message(None, MessageRole::User, "one")
            .unwrap()
            .id;
        let reply = conversation
            .add_message(Some(&root), MessageRole::Assistant, "two")
            .unwrap()
            .id;
        (conversation, vec![root, reply])
    }

    #[test]
    fn test_numeric_references_are_one_based() {
        let (conversation, ids) = conversation();
        assert_eq!(resolve_message(&conversation, "1"), Some(ids[0].clone()));
        assert_eq!(resolve_message(&conversation, "#2"), Some(ids[1].clone()));
        assert_eq!(resolve_message(&conversation, "0"), None);
        assert_eq!(resolve_message(&conversation, "3"), None);
    }

    #[test]
    fn test_prefix_references_must_be_unique() {
        let (conversation, ids) = conversation();
        let full = ids[1].as_str();
        assert_eq!(resolve_message(&conversation, full), Some(ids[1].clone()));
        assert_eq!(resolve_message(&conversation, &full[..12]), Some(ids[1].clone()));
        assert_eq!(resolve_message(&conversation, "zzz"), None);
        assert_eq!(resolve_message(&conversation, ""), None);
    }

    #[test]
    fn test_ambiguous_prefix_is_rejected() {
        let ids = ["abc1", "abc2", "xyz"];
        assert_eq!(unique_prefix(ids.into_iter(), "abc"), None);
        assert_eq!(unique_prefix(ids.into_iter(), "abc2"), Some("abc2"));
    }

    #[test]
    fn test_conversation_references() {
        let list = vec![
            ConversationSummary {
                id: "aaa".to_string(),
                name: "A".to_string(),
                message_count: 0,
                is_active: false,
            },
            ConversationSummary {
                id: "bbb".to_string(),
                name: "B".to_string(),
                message_count: 2,
                is_active: true,
            },
        ];
        assert_eq!(resolve_conversation(&list, "2"), Some("bbb".to_string()));
        assert_eq!(resolve_conversation(&list, "a"), Some("aaa".to_string()));
        assert_eq!(resolve_conversation(&list, "9"), None);
    }
}
