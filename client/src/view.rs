/// View projection: reconciled entries to render-ready rows
use crate::types::{RenderedMessage, ViewEntry};
use std::collections::HashMap;

/// Color used when a sender is absent from the peer cache (e.g. a stale
/// conversation referencing a deleted user).
pub const DEFAULT_AUTHOR_COLOR: &str = "white";

/// Derive the render-ready sequence from reconciled view entries.
///
/// Pure: no network access, no mutation. `colors` maps user ids to avatar
/// colors; unknown senders fall back to [`DEFAULT_AUTHOR_COLOR`].
pub fn project(entries: &[ViewEntry], colors: &HashMap<String, String>) -> Vec<RenderedMessage> {
    entries
        .iter()
        .map(|entry| RenderedMessage {
            id: entry.id.clone(),
            text: entry.text.clone(),
            is_mine: entry.is_mine,
            author_color: colors
                .get(&entry.sender_id)
                .cloned()
                .unwrap_or_else(|| DEFAULT_AUTHOR_COLOR.to_string()),
        })
        .collect()
}
