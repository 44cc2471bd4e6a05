use serde::{Deserialize, Serialize};

/// Lifecycle of the single push connection. Exactly one value holds at any
/// time; observers receive transitions through `PushChannel::watch_status`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionStatus {
    Disconnected,
    Connecting,
    Connected,
    Error,
}

pub const EVENT_NEW_MESSAGE: &str = "new_message";
pub const KIND_SEND_CHANNEL_MESSAGE: &str = "send_channel_message";

/// One user-authored message awaiting delivery. Exists only for the duration
/// of a single send attempt; it is not persisted if both transports fail.
#[derive(Debug, Clone, Serialize)]
pub struct OutboundEnvelope {
    pub kind: &'static str,
    pub channel_id: String,
    pub body: String,
}

impl OutboundEnvelope {
    pub fn channel_message(channel_id: &str, body: &str) -> Self {
        Self {
            kind: KIND_SEND_CHANNEL_MESSAGE,
            channel_id: channel_id.to_string(),
            body: body.to_string(),
        }
    }
}

/// Tagged payload arriving on the push transport. Unknown fields are
/// tolerated; unknown event kinds are dropped by the dispatcher.
#[derive(Debug, Clone, Deserialize)]
pub struct InboundEvent {
    pub event: String,
    #[serde(default)]
    pub channel_id: Option<String>,
}

/// Notification to the view layer that a channel's cached messages are stale
/// and should be refetched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invalidation {
    pub channel_id: String,
}

/// Final outcome of `Dispatcher::send_message`. Callers are deliberately not
/// told which transport carried the message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    Delivered,
    Failed,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginResponse {
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
}

impl LoginResponse {
    /// Servers disagree on the token field name; take the first non-empty
    /// candidate in preference order.
    pub fn bearer_token(&self) -> Option<&str> {
        [&self.access_token, &self.token, &self.id]
            .into_iter()
            .filter_map(|v| v.as_deref())
            .map(str::trim)
            .find(|s| !s.is_empty())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Channel {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserSummary {
    pub id: String,
    pub username: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub is_online: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageRecord {
    #[serde(alias = "id")]
    pub message_id: String,
    pub body: String,
    #[serde(default)]
    pub author_username: Option<String>,
    #[serde(default)]
    pub author_display_name: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
}

impl MessageRecord {
    pub fn sender_label(&self) -> &str {
        self.author_display_name
            .as_deref()
            .or(self.author_username.as_deref())
            .filter(|s| !s.trim().is_empty())
            .unwrap_or("unknown")
    }
}
