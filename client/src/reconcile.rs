/// Message reconciliation: confirmed sequences merged with optimistic echoes
///
/// Per conversation the reconciler keeps the authoritative confirmed window
/// (ordered by server-assigned order) and the set of locally pending
/// messages. Pending entries are correlated with their confirmed
/// counterparts exclusively by local id, threaded through the send
/// pipeline's continuation, never by content, since duplicate text from
/// the same sender is legal.
use crate::error::{DuetError, Result};
use crate::types::{LocalId, Message, PendingMessage, PendingStatus, ViewEntry};
use std::collections::HashMap;

#[derive(Debug, Default)]
struct ConversationState {
    /// Confirmed messages, sorted by server order
    confirmed: Vec<Message>,
    /// Locally pending messages, in submission order
    pending: Vec<PendingMessage>,
}

/// Per-session reconciler state for all conversations.
#[derive(Debug, Default)]
pub struct Reconciler {
    conversations: HashMap<String, ConversationState>,
}

impl Reconciler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace a conversation's confirmed window with an authoritative batch.
    ///
    /// The store always returns the full window, so this is a replacement,
    /// not a merge; applying the same batch twice is a no-op.
    pub fn apply_confirmed_batch(&mut self, conversation_id: &str, mut batch: Vec<Message>) {
        batch.sort_by_key(|m| m.order);
        let state = self
            .conversations
            .entry(conversation_id.to_string())
            .or_default();
        state.confirmed = batch;
    }

    /// Queue an optimistic echo. Duplicate local ids are a programming
    /// error at the call site, not an expected runtime condition.
    pub fn add_pending(&mut self, pending: PendingMessage) -> Result<()> {
        let state = self
            .conversations
            .entry(pending.conversation_id.clone())
            .or_default();
        if state.pending.iter().any(|p| p.local_id == pending.local_id) {
            return Err(DuetError::State(format!(
                "pending message {} already queued",
                pending.local_id
            )));
        }
        state.pending.push(pending);
        Ok(())
    }

    /// Resolve a pending entry by local id.
    ///
    /// The entry is removed unconditionally. With a confirmed message the
    /// confirmation is inserted into the confirmed window unless a later
    /// poll already delivered it (dedup by server id).
    pub fn resolve_pending(
        &mut self,
        conversation_id: &str,
        local_id: &LocalId,
        confirmed: Option<Message>,
    ) {
        let state = self
            .conversations
            .entry(conversation_id.to_string())
            .or_default();
        state.pending.retain(|p| &p.local_id != local_id);
        if let Some(message) = confirmed {
            if !state.confirmed.iter().any(|m| m.id == message.id) {
                let at = state.confirmed.partition_point(|m| m.order <= message.order);
                state.confirmed.insert(at, message);
            }
        }
    }

    /// The reconciled view of one conversation: confirmed entries in server
    /// order, then in-flight pending entries. Failed entries are never
    /// rendered.
    pub fn view(&self, conversation_id: &str, active_user_id: &str) -> Vec<ViewEntry> {
        let Some(state) = self.conversations.get(conversation_id) else {
            return Vec::new();
        };
        let mut entries: Vec<ViewEntry> = state
            .confirmed
            .iter()
            .map(|m| ViewEntry {
                id: m.id.clone(),
                sender_id: m.sender_id.clone(),
                text: m.text.clone(),
                is_mine: m.sender_id == active_user_id,
                pending: false,
            })
            .collect();
        for p in &state.pending {
            if p.status != PendingStatus::InFlight {
                continue;
            }
            entries.push(ViewEntry {
                id: p.local_id.to_string(),
                sender_id: p.sender_id.clone(),
                text: p.text.clone(),
                is_mine: p.sender_id == active_user_id,
                pending: true,
            });
        }
        entries
    }

    /// Number of in-flight pending entries for a conversation.
    pub fn pending_count(&self, conversation_id: &str) -> usize {
        self.conversations
            .get(conversation_id)
            .map(|s| {
                s.pending
                    .iter()
                    .filter(|p| p.status == PendingStatus::InFlight)
                    .count()
            })
            .unwrap_or(0)
    }
}
