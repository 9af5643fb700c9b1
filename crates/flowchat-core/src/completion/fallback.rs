//! Deterministic placeholder responses used when the completion service fails.
//!
//! Every placeholder ends with [`FALLBACK_NOTE`] so it can never be mistaken
//! for a genuine model response.

/// Trailer appended to every placeholder.
pub const FALLBACK_NOTE: &str = "*Note: This is a fallback response generated when the AI service is unavailable.*";

const OPENERS: [&str; 5] = [
    "That's an interesting question! Let me think about this from a few different angles...",
    "I can help you explore that topic. Here are some key considerations...",
    "Great point! This reminds me of several related concepts that might be useful...",
    "Let me break this down into a few main areas to consider...",
    "That's a complex topic with several important aspects to consider...",
];

/// Placeholder for a plain send. The same prompt always yields the same text.
pub fn response(prompt: &str) -> String {
    let opener = OPENERS[stable_index(prompt, OPENERS.len())];
    let lower = prompt.to_lowercase();

    let body = if lower.contains("project") {
        "For project planning, consider these key elements:\n• Scope and objectives\n• Timeline and milestones\n• Required resources\n• Potential challenges\n• Success metrics"
    } else if lower.contains("creative") {
        "Creative approaches often benefit from:\n• Brainstorming without constraints\n• Drawing inspiration from diverse sources\n• Iterating on initial ideas\n• Combining unexpected elements\n• Embracing experimentation"
    } else if lower.contains("tech") {
        "Technology considerations include:\n• Current best practices\n• Scalability requirements\n• Security implications\n• User experience design\n• Maintenance and updates"
    } else {
        "The completion service could not be reached, so this placeholder stands in for the assistant's answer. Send the message again once the service is back."
    };

    format!("{opener}\n\n{body}\n\n{FALLBACK_NOTE}")
}

/// Placeholder for a merge over `branch_count` branches.
pub fn merge_response(branch_count: usize) -> String {
    format!(
        "I've synthesized insights from {branch_count} different conversation paths to provide a comprehensive perspective:

**Key Themes Identified:**
• Multiple approaches to the same core challenge
• Complementary perspectives that build on each other
• Common goals with different implementation strategies

**Integrated Recommendations:**
Based on combining these viewpoints, I suggest an approach that:
1. Takes the strongest elements from each path
2. Addresses the trade-offs between different options
3. Provides a balanced solution that considers multiple factors

**Next Steps:**
The merged perspective suggests focusing on the overlapping areas where these different approaches align, while also considering the unique benefits each individual path offers.

{FALLBACK_NOTE}"
    )
}

/// Returns true if `content` carries the fallback trailer.
pub fn is_fallback_text(content: &str) -> bool {
    content.trim_end().ends_with(FALLBACK_NOTE)
}

// FNV-1a; std's hasher is randomly seeded per process.
fn stable_index(text: &str, len: usize) -> usize {
    let hash = text.bytes().fold(0xcbf2_9ce4_8422_2325_u64, |hash, byte| {
        (hash ^ u64::from(byte)).wrapping_mul(0x0100_0000_01b3)
    });
    (hash % len as u64) as usize
}
