//! Prompt assembly for plain sends and merges.

use crate::conversation::Message;

/// Renders a thread as a `Human:` / `Assistant:` transcript, one line per turn.
pub fn transcript(thread: &[&Message]) -> String {
    thread
        .iter()
        .map(|message| format!("{}: {}", message.role.speaker(), message.content))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Prompt for a plain send: the resolved thread as context plus the new input.
pub fn context_prompt(thread: &[&Message], user_input: &str) -> String {
    format!(
        "Here is our conversation history:\n\n{}\n\nHuman: {}\n\nPlease respond naturally, taking into account the full conversation context above.",
        transcript(thread),
        user_input
    )
}

/// Labels one branch of a merge. `index` is zero-based; labels are one-based.
pub fn branch_text(index: usize, thread: &[&Message]) -> String {
    format!("Branch {}:\n{}", index + 1, transcript(thread))
}

/// Synthesis prompt over labelled branch texts, in selection order.
pub fn merge_prompt(branch_texts: &[String]) -> String {
    format!(
        "Please analyze and synthesize these different conversation branches into a unified response that captures the key insights from each path:\n\n{}\n\nCreate a comprehensive response that merges the best elements from these different directions while maintaining coherence and adding new insights where appropriate.",
        branch_texts.join("\n\n")
    )
}
