/// Polling loops for conversation and message freshness
///
/// Each loop is owned by the view that mounted it and returns an explicit
/// cancellable handle. `PollHandle::stop` is the only way a loop ends: it
/// sets the stop flag and aborts the task, and the loop re-checks the flag
/// after every fetch, so a response that arrives after stopping is
/// discarded without mutating state.
use crate::session::Session;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::debug;

pub struct PollHandle {
    stopped: Arc<AtomicBool>,
    task: JoinHandle<()>,
}

impl PollHandle {
    /// Stop the loop. No further fetch executes after this returns, and no
    /// state mutation from an already in-flight fetch is applied.
    pub fn stop(&self) {
        self.stopped.store(true, Ordering::SeqCst);
        self.task.abort();
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::Relaxed)
    }
}

/// Poll the active user's conversation list and publish each full
/// replacement list. First fetch happens immediately; a failed tick is
/// skipped silently and the loop continues.
pub fn spawn_conversation_poll(session: &Session) -> PollHandle {
    let stopped = Arc::new(AtomicBool::new(false));
    let flag = stopped.clone();
    let session = session.clone();
    let task = tokio::spawn(async move {
        let mut ticker = interval(session.config().conversation_poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            ticker.tick().await;
            if flag.load(Ordering::Relaxed) {
                break;
            }
            let fetched = session
                .store()
                .list_conversations(&session.me().id)
                .await;
            if flag.load(Ordering::Relaxed) {
                break;
            }
            match fetched {
                Ok(conversations) => session.publish_conversations(conversations),
                Err(error) => debug!("conversation poll tick failed: {}", error),
            }
        }
    });
    PollHandle { stopped, task }
}

/// Poll one open conversation's message window and feed each batch into
/// the reconciler. First fetch happens immediately; a failed tick is
/// skipped silently and the loop continues.
pub fn spawn_message_poll(session: &Session, conversation_id: &str) -> PollHandle {
    let stopped = Arc::new(AtomicBool::new(false));
    let flag = stopped.clone();
    let session = session.clone();
    let conversation_id = conversation_id.to_string();
    let task = tokio::spawn(async move {
        let mut ticker = interval(session.config().message_poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            ticker.tick().await;
            if flag.load(Ordering::Relaxed) {
                break;
            }
            let fetched = session
                .store()
                .list_messages(
                    &conversation_id,
                    session.config().message_fetch_limit,
                    None,
                )
                .await;
            if flag.load(Ordering::Relaxed) {
                break;
            }
            match fetched {
                Ok(batch) => session.apply_message_batch(&conversation_id, batch).await,
                Err(error) => {
                    debug!("message poll tick failed for {}: {}", conversation_id, error)
                }
            }
        }
    });
    PollHandle { stopped, task }
}
