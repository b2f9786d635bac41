/// Reconciler and projector tests
/// Ordering, idempotency, optimistic-echo resolution, and projection

use duet_client::types::{Message, PendingMessage, PendingStatus, ViewEntry};
use duet_client::view;
use duet_client::{DuetError, Reconciler};
use std::collections::HashMap;

fn msg(id: &str, conversation: &str, sender: &str, text: &str, order: u64) -> Message {
    Message {
        id: id.to_string(),
        conversation_id: conversation.to_string(),
        sender_id: sender.to_string(),
        text: text.to_string(),
        order,
        created_at: String::new(),
    }
}

fn texts(entries: &[ViewEntry]) -> Vec<&str> {
    entries.iter().map(|e| e.text.as_str()).collect()
}

#[test]
fn view_orders_confirmed_then_pending() {
    let mut reconciler = Reconciler::new();
    reconciler.apply_confirmed_batch(
        "c1",
        vec![
            msg("m2", "c1", "u2", "second", 2),
            msg("m1", "c1", "u1", "first", 1),
        ],
    );
    reconciler
        .add_pending(PendingMessage::new("c1", "u1", "third"))
        .unwrap();

    let entries = reconciler.view("c1", "u1");
    assert_eq!(texts(&entries), vec!["first", "second", "third"]);
    assert!(!entries[0].pending);
    assert!(!entries[1].pending);
    assert!(entries[2].pending);
    // confirmed entries non-decreasing in server order, pending strictly after
    assert!(entries[0].is_mine);
    assert!(!entries[1].is_mine);
    assert!(entries[2].is_mine);
}

#[test]
fn apply_confirmed_batch_is_idempotent() {
    let mut reconciler = Reconciler::new();
    let batch = vec![
        msg("m1", "c1", "u1", "hello", 1),
        msg("m2", "c1", "u2", "hi", 2),
    ];
    reconciler.apply_confirmed_batch("c1", batch.clone());
    let first = reconciler.view("c1", "u1");
    reconciler.apply_confirmed_batch("c1", batch);
    let second = reconciler.view("c1", "u1");
    assert_eq!(first, second);
}

#[test]
fn apply_confirmed_batch_replaces_the_window() {
    let mut reconciler = Reconciler::new();
    reconciler.apply_confirmed_batch(
        "c1",
        vec![
            msg("m1", "c1", "u1", "one", 1),
            msg("m2", "c1", "u2", "two", 2),
        ],
    );
    // the store returns the full authoritative window; older entries that
    // fell out of it disappear
    reconciler.apply_confirmed_batch(
        "c1",
        vec![
            msg("m2", "c1", "u2", "two", 2),
            msg("m3", "c1", "u1", "three", 3),
        ],
    );
    assert_eq!(texts(&reconciler.view("c1", "u1")), vec!["two", "three"]);
}

#[test]
fn duplicate_pending_id_is_rejected() {
    let mut reconciler = Reconciler::new();
    let pending = PendingMessage::new("c1", "u1", "hello");
    reconciler.add_pending(pending.clone()).unwrap();
    let err = reconciler.add_pending(pending).unwrap_err();
    assert!(matches!(err, DuetError::State(_)));
    assert_eq!(reconciler.pending_count("c1"), 1);
}

#[test]
fn resolution_inserts_the_confirmation_exactly_once() {
    let mut reconciler = Reconciler::new();
    let pending = PendingMessage::new("c9", "u1", "hi");
    let local = pending.local_id.clone();
    reconciler.add_pending(pending).unwrap();

    reconciler.resolve_pending("c9", &local, Some(msg("m101", "c9", "u1", "hi", 1)));

    let entries = reconciler.view("c9", "u1");
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].id, "m101");
    assert!(entries[0].is_mine);
    assert!(!entries[0].pending);
    assert_eq!(reconciler.pending_count("c9"), 0);
}

#[test]
fn resolution_after_poll_already_delivered_the_echo_does_not_duplicate() {
    let mut reconciler = Reconciler::new();
    let pending = PendingMessage::new("c9", "u1", "hi");
    let local = pending.local_id.clone();
    reconciler.add_pending(pending).unwrap();

    // a poll tick delivers the confirmed counterpart before the send
    // response resolves
    reconciler.apply_confirmed_batch("c9", vec![msg("m101", "c9", "u1", "hi", 1)]);
    reconciler.resolve_pending("c9", &local, Some(msg("m101", "c9", "u1", "hi", 1)));

    let entries = reconciler.view("c9", "u1");
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].id, "m101");
}

#[test]
fn duplicate_texts_from_the_same_sender_do_not_collapse() {
    let mut reconciler = Reconciler::new();
    reconciler.apply_confirmed_batch("c1", vec![msg("m1", "c1", "u1", "ping", 1)]);
    let pending = PendingMessage::new("c1", "u1", "ping");
    let local = pending.local_id.clone();
    reconciler.add_pending(pending).unwrap();

    // two logical messages with identical text: both stay visible
    assert_eq!(texts(&reconciler.view("c1", "u1")), vec!["ping", "ping"]);

    reconciler.resolve_pending("c1", &local, Some(msg("m2", "c1", "u1", "ping", 2)));
    let entries = reconciler.view("c1", "u1");
    assert_eq!(texts(&entries), vec!["ping", "ping"]);
    assert_eq!(entries[1].id, "m2");
}

#[test]
fn failed_send_restores_the_pre_send_view() {
    let mut reconciler = Reconciler::new();
    reconciler.apply_confirmed_batch("c1", vec![msg("m1", "c1", "u2", "hey", 1)]);
    let before = reconciler.view("c1", "u1");

    let pending = PendingMessage::new("c1", "u1", "doomed");
    let local = pending.local_id.clone();
    reconciler.add_pending(pending).unwrap();
    assert_eq!(reconciler.view("c1", "u1").len(), 2);

    reconciler.resolve_pending("c1", &local, None);
    assert_eq!(reconciler.view("c1", "u1"), before);
    assert_eq!(reconciler.pending_count("c1"), 0);
}

#[test]
fn failed_pending_entries_are_never_rendered() {
    let mut reconciler = Reconciler::new();
    let mut pending = PendingMessage::new("c1", "u1", "broken");
    pending.status = PendingStatus::Failed;
    reconciler.add_pending(pending).unwrap();
    assert!(reconciler.view("c1", "u1").is_empty());
}

#[test]
fn resolving_an_unknown_local_id_is_a_no_op() {
    let mut reconciler = Reconciler::new();
    reconciler.apply_confirmed_batch("c1", vec![msg("m1", "c1", "u1", "hello", 1)]);
    let stray = PendingMessage::new("c1", "u1", "gone");
    reconciler.resolve_pending("c1", &stray.local_id, None);
    assert_eq!(reconciler.view("c1", "u1").len(), 1);
}

#[test]
fn view_of_an_unknown_conversation_is_empty() {
    let reconciler = Reconciler::new();
    assert!(reconciler.view("nope", "u1").is_empty());
}

#[test]
fn both_parties_agree_after_confirmation() {
    // user A (u1) sends "hi" in conversation c9; the store confirms it as
    // m101 with order 1; user B (u2) receives it through a poll
    let mut alice = Reconciler::new();
    let pending = PendingMessage::new("c9", "u1", "hi");
    let local = pending.local_id.clone();
    alice.add_pending(pending).unwrap();

    let echoed = alice.view("c9", "u1");
    assert_eq!(echoed.len(), 1);
    assert!(echoed[0].pending);
    assert!(echoed[0].is_mine);
    assert_eq!(echoed[0].text, "hi");

    alice.resolve_pending("c9", &local, Some(msg("m101", "c9", "u1", "hi", 1)));
    let confirmed = alice.view("c9", "u1");
    assert_eq!(confirmed.len(), 1);
    assert_eq!(confirmed[0].id, "m101");
    assert!(confirmed[0].is_mine);

    let mut bob = Reconciler::new();
    bob.apply_confirmed_batch("c9", vec![msg("m101", "c9", "u1", "hi", 1)]);
    let received = bob.view("c9", "u2");
    assert_eq!(received.len(), 1);
    assert_eq!(received[0].id, "m101");
    assert!(!received[0].is_mine);
}

#[test]
fn projection_resolves_colors_and_falls_back_for_unknown_senders() {
    let mut reconciler = Reconciler::new();
    reconciler.apply_confirmed_batch(
        "c1",
        vec![
            msg("m1", "c1", "u1", "mine", 1),
            msg("m2", "c1", "u9", "ghost", 2),
        ],
    );
    let entries = reconciler.view("c1", "u1");

    let mut colors = HashMap::new();
    colors.insert("u1".to_string(), "cyan".to_string());
    let rendered = view::project(&entries, &colors);

    assert_eq!(rendered.len(), 2);
    assert!(rendered[0].is_mine);
    assert_eq!(rendered[0].author_color, "cyan");
    assert!(!rendered[1].is_mine);
    assert_eq!(rendered[1].author_color, view::DEFAULT_AUTHOR_COLOR);
    assert_eq!(rendered[1].id, "m2");
}
