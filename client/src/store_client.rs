/// Typed HTTP client for the store service
///
/// One method per remote operation. Non-success responses are surfaced
/// verbatim as `DuetError::Remote` with the server's error message; no
/// retries happen at this layer.
use crate::error::{DuetError, Result};
use crate::types::{Conversation, Message, User};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Clone)]
pub struct StoreClient {
    base_url: String,
    http: reqwest::Client,
}

#[derive(Serialize)]
struct CreateUserRequest<'a> {
    username: &'a str,
    avatar_color: &'a str,
}

#[derive(Serialize)]
struct StartConversationRequest<'a> {
    user_a: &'a str,
    user_b: &'a str,
}

#[derive(Serialize)]
struct SendMessageRequest<'a> {
    conversation_id: &'a str,
    sender_id: &'a str,
    text: &'a str,
}

#[derive(Deserialize)]
struct UserEnvelope {
    user: User,
}

#[derive(Deserialize)]
struct UsersEnvelope {
    users: Vec<User>,
}

#[derive(Deserialize)]
struct ConversationEnvelope {
    conversation: Conversation,
}

#[derive(Deserialize)]
struct ConversationsEnvelope {
    conversations: Vec<Conversation>,
}

#[derive(Deserialize)]
struct MessageEnvelope {
    message: Message,
}

#[derive(Deserialize)]
struct MessagesEnvelope {
    messages: Vec<Message>,
}

#[derive(Deserialize)]
struct ErrorBody {
    error: String,
}

impl StoreClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let base_url = validated_base(base_url)?;
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { base_url, http })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn create_user(&self, username: &str, avatar_color: &str) -> Result<User> {
        let resp: UserEnvelope = self
            .post_json(
                "/api/users",
                &CreateUserRequest {
                    username,
                    avatar_color,
                },
            )
            .await?;
        Ok(resp.user)
    }

    pub async fn list_users(&self) -> Result<Vec<User>> {
        let resp: UsersEnvelope = self.get_json("/api/users".to_string()).await?;
        Ok(resp.users)
    }

    /// Create or fetch the conversation between two users.
    ///
    /// The store service is idempotent per unordered pair: both argument
    /// orders return the same conversation.
    pub async fn start_conversation(&self, user_a: &str, user_b: &str) -> Result<Conversation> {
        let resp: ConversationEnvelope = self
            .post_json(
                "/api/conversations",
                &StartConversationRequest { user_a, user_b },
            )
            .await?;
        Ok(resp.conversation)
    }

    pub async fn list_conversations(&self, user_id: &str) -> Result<Vec<Conversation>> {
        let resp: ConversationsEnvelope = self
            .get_json(format!("/api/users/{}/conversations", user_id))
            .await?;
        Ok(resp.conversations)
    }

    pub async fn send_message(
        &self,
        conversation_id: &str,
        sender_id: &str,
        text: &str,
    ) -> Result<Message> {
        let resp: MessageEnvelope = self
            .post_json(
                "/api/messages",
                &SendMessageRequest {
                    conversation_id,
                    sender_id,
                    text,
                },
            )
            .await?;
        Ok(resp.message)
    }

    /// Fetch the newest-bounded window (ascending order, at most `limit`
    /// entries) of a conversation, optionally only orders below `before`.
    pub async fn list_messages(
        &self,
        conversation_id: &str,
        limit: usize,
        before: Option<u64>,
    ) -> Result<Vec<Message>> {
        let mut path = format!(
            "/api/conversations/{}/messages?limit={}",
            conversation_id, limit
        );
        if let Some(before) = before {
            path.push_str(&format!("&before={}", before));
        }
        let resp: MessagesEnvelope = self.get_json(path).await?;
        Ok(resp.messages)
    }

    async fn get_json<T: DeserializeOwned>(&self, path: String) -> Result<T> {
        let resp = self
            .http
            .get(format!("{}{}", self.base_url, path))
            .send()
            .await?;
        handle_json_response(resp).await
    }

    async fn post_json<TReq: Serialize, TResp: DeserializeOwned>(
        &self,
        path: &str,
        payload: &TReq,
    ) -> Result<TResp> {
        let resp = self
            .http
            .post(format!("{}{}", self.base_url, path))
            .json(payload)
            .send()
            .await?;
        handle_json_response(resp).await
    }
}

async fn handle_json_response<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T> {
    let status = resp.status();
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorBody>(&body)
            .map(|e| e.error)
            .unwrap_or(body);
        return Err(DuetError::Remote {
            status: status.as_u16(),
            message,
        });
    }
    let body = resp.bytes().await?;
    Ok(serde_json::from_slice(&body)?)
}

fn validated_base(base_url: &str) -> Result<String> {
    let trimmed = base_url.trim();
    if !(trimmed.starts_with("http://") || trimmed.starts_with("https://")) {
        return Err(DuetError::Config(format!(
            "store URL must start with http:// or https://, got {:?}",
            base_url
        )));
    }
    Ok(trimmed.trim_end_matches('/').to_string())
}
