/// Session context: active user, reconciler state, and the send pipeline
///
/// One `Session` exists per signed-in profile. Switching profiles means
/// constructing a fresh session (new reconciler, empty pending sets); the
/// active user id is immutable for the session's lifetime.
use crate::config::Config;
use crate::error::{DuetError, Result};
use crate::reconcile::Reconciler;
use crate::store_client::StoreClient;
use crate::types::{
    ClientEvent, Conversation, LocalId, Message, PendingMessage, RenderedMessage, User, ViewEntry,
};
use crate::view;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{broadcast, Mutex, RwLock};
use tracing::{info, warn};

const EVENT_CHANNEL_CAPACITY: usize = 64;

pub struct Session {
    /// The active user (immutable for the session lifetime)
    me: User,

    /// Client configuration
    config: Config,

    /// Transport to the store service
    store: StoreClient,

    /// Reconciler state, shared with poll loops and send tasks
    reconciler: Arc<Mutex<Reconciler>>,

    /// Cached peer identities for rendering
    peers: Arc<RwLock<HashMap<String, User>>>,

    /// Event channel to the presentation layer
    events: broadcast::Sender<ClientEvent>,
}

impl Session {
    /// Create a new session for a signed-in user.
    pub fn new(config: Config, store: StoreClient, me: User) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        info!("Session started for user {} ({})", me.username, me.id);
        Self {
            me,
            config,
            store,
            reconciler: Arc::new(Mutex::new(Reconciler::new())),
            peers: Arc::new(RwLock::new(HashMap::new())),
            events,
        }
    }

    pub fn me(&self) -> &User {
        &self.me
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn store(&self) -> &StoreClient {
        &self.store
    }

    /// Subscribe to session events.
    pub fn subscribe(&self) -> broadcast::Receiver<ClientEvent> {
        self.events.subscribe()
    }

    /// Send a message with optimistic local echo.
    ///
    /// The text is trimmed; an empty result is rejected with no network
    /// call and no state change. Otherwise the pending entry is queued
    /// synchronously (visible in the view before any round trip) and the
    /// submission runs as a background task. On success the echo is
    /// replaced by the confirmed message; on failure it is removed and a
    /// `SendFailed` event carries the user-visible notice. There is no
    /// automatic retry: a re-send is a new attempt with a new local id.
    pub async fn send_text(&self, conversation_id: &str, text: &str) -> Result<LocalId> {
        let body = text.trim();
        if body.is_empty() {
            return Err(DuetError::Validation("message text is empty".to_string()));
        }

        let pending = PendingMessage::new(conversation_id, &self.me.id, body);
        let local_id = pending.local_id.clone();
        self.reconciler.lock().await.add_pending(pending)?;
        let _ = self.events.send(ClientEvent::MessagePending {
            conversation_id: conversation_id.to_string(),
            local_id: local_id.clone(),
        });

        let session = self.clone();
        let conversation_id = conversation_id.to_string();
        let body = body.to_string();
        let local = local_id.clone();
        tokio::spawn(async move {
            match session
                .store
                .send_message(&conversation_id, &session.me.id, &body)
                .await
            {
                Ok(message) => {
                    session
                        .reconciler
                        .lock()
                        .await
                        .resolve_pending(&conversation_id, &local, Some(message.clone()));
                    let _ = session.events.send(ClientEvent::MessageConfirmed {
                        conversation_id,
                        message,
                    });
                }
                Err(error) => {
                    warn!("send failed for {}: {}", conversation_id, error);
                    session
                        .reconciler
                        .lock()
                        .await
                        .resolve_pending(&conversation_id, &local, None);
                    let _ = session.events.send(ClientEvent::SendFailed {
                        conversation_id,
                        local_id: local,
                        reason: error.to_string(),
                    });
                }
            }
        });

        Ok(local_id)
    }

    /// Create or fetch the conversation with a peer (idempotent per pair
    /// on the store side).
    pub async fn open_conversation(&self, peer_id: &str) -> Result<Conversation> {
        self.store.start_conversation(&self.me.id, peer_id).await
    }

    /// Apply an authoritative message batch from a poll tick.
    pub async fn apply_message_batch(&self, conversation_id: &str, batch: Vec<Message>) {
        self.reconciler
            .lock()
            .await
            .apply_confirmed_batch(conversation_id, batch);
        let _ = self.events.send(ClientEvent::MessagesUpdated {
            conversation_id: conversation_id.to_string(),
        });
    }

    /// Publish a refetched conversation list (full replacement).
    pub fn publish_conversations(&self, conversations: Vec<Conversation>) {
        let _ = self
            .events
            .send(ClientEvent::ConversationsUpdated { conversations });
    }

    /// The reconciled view of a conversation, ownership flags included.
    pub async fn conversation_view(&self, conversation_id: &str) -> Vec<ViewEntry> {
        self.reconciler
            .lock()
            .await
            .view(conversation_id, &self.me.id)
    }

    /// The render-ready view of a conversation, colors resolved from the
    /// peer cache.
    pub async fn rendered_view(&self, conversation_id: &str) -> Vec<RenderedMessage> {
        let entries = self.conversation_view(conversation_id).await;
        let peers = self.peers.read().await;
        let mut colors: HashMap<String, String> = peers
            .iter()
            .map(|(id, user)| (id.clone(), user.avatar_color.clone()))
            .collect();
        colors.insert(self.me.id.clone(), self.me.avatar_color.clone());
        view::project(&entries, &colors)
    }

    /// Refresh the peer cache from the store's user listing.
    pub async fn refresh_peers(&self) -> Result<()> {
        let users = self.store.list_users().await?;
        let mut peers = self.peers.write().await;
        *peers = users.into_iter().map(|u| (u.id.clone(), u)).collect();
        Ok(())
    }

    /// Resolve a user id to its cached identity, refreshing the cache once
    /// on a miss.
    pub async fn resolve_peer(&self, user_id: &str) -> Result<User> {
        if let Some(user) = self.peers.read().await.get(user_id) {
            return Ok(user.clone());
        }
        self.refresh_peers().await?;
        self.peers
            .read()
            .await
            .get(user_id)
            .cloned()
            .ok_or_else(|| DuetError::NotFound(format!("user {} not found", user_id)))
    }

    /// All known users, freshly fetched, sorted by name.
    pub async fn list_users(&self) -> Result<Vec<User>> {
        self.refresh_peers().await?;
        let peers = self.peers.read().await;
        let mut users: Vec<User> = peers.values().cloned().collect();
        users.sort_by(|a, b| a.username.cmp(&b.username));
        Ok(users)
    }

    /// Find a user by display name.
    pub async fn find_user_by_name(&self, username: &str) -> Result<User> {
        if username == self.me.username {
            return Err(DuetError::Validation(
                "cannot open a conversation with yourself".to_string(),
            ));
        }
        self.refresh_peers().await?;
        self.peers
            .read()
            .await
            .values()
            .find(|u| u.username == username)
            .cloned()
            .ok_or_else(|| DuetError::NotFound(format!("user {:?} not found", username)))
    }
}

impl Clone for Session {
    fn clone(&self) -> Self {
        Self {
            me: self.me.clone(),
            config: self.config.clone(),
            store: self.store.clone(),
            reconciler: self.reconciler.clone(),
            peers: self.peers.clone(),
            events: self.events.clone(),
        }
    }
}
