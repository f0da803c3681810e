//! The refinement tree engine.
//!
//! This module contains the search core:
//! - [`IdeaState`]: the immutable content snapshot at each node
//! - [`IdeaNode`] / [`IdeaTree`]: arena-backed tree with cursor, navigation,
//!   and serialization
//! - [`Action`] / [`ActionRunner`]: the four refinement strategies
//! - [`Selector`]: UCT-based automatic action choice
//! - [`ExplorationSession`]: the owned session object exposing the whole
//!   surface behind one mutual-exclusion boundary

mod actions;
mod core;
mod node;
mod selector;
mod session;
mod state;
mod tree;

pub use actions::*;
pub use self::core::*;
pub use node::*;
pub use selector::*;
pub use session::*;
pub use state::*;
pub use tree::*;

/// Extract JSON from a completion string, handling markdown code blocks.
///
/// Attempts extraction in this order:
/// 1. Try the trimmed text as raw JSON (fast path)
/// 2. Extract from ```json ... ``` code blocks
/// 3. Extract from ``` ... ``` code blocks
/// 4. Return an error if none work
pub(crate) fn extract_json_from_completion(completion: &str) -> Result<&str, String> {
    // Fast path: raw JSON
    let trimmed = completion.trim();
    if trimmed.starts_with('{') || trimmed.starts_with('[') {
        return Ok(trimmed);
    }

    // Try ```json ... ``` blocks
    if completion.contains("```json") {
        return completion
            .split("```json")
            .nth(1)
            .and_then(|s| s.split("```").next())
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| "Found ```json block but content was empty or malformed".to_string());
    }

    // Try ``` ... ``` blocks
    if completion.contains("```") {
        return completion
            .split("```")
            .nth(1)
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| "Found ``` block but content was empty or malformed".to_string());
    }

    Err(format!(
        "No JSON found in response. First 100 chars: '{}'",
        completion.chars().take(100).collect::<String>()
    ))
}

/// Truncate a string to at most `max_chars` characters, appending an
/// ellipsis when anything was cut. Safe on multi-byte text.
pub(crate) fn truncate_chars(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text.to_string()
    } else {
        let mut truncated: String = text.chars().take(max_chars).collect();
        truncated.push_str("...");
        truncated
    }
}
