//! Wire/persistence data model shared between client and server: users,
//! chats, and the chat message log.

use {crate::packet::DataPacket, serde::{Deserialize, Serialize}, uuid::Uuid};

/// Default page size for chat message pagination.
pub const CHAT_PAGE_SIZE_DEFAULT: usize = 8;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub uuid: Uuid,
    pub username: String,
    pub password_hash: String,
}

impl User {
    pub fn new(username: String, password_hash: String) -> Self {
        Self { uuid: Uuid::new_v4(), username, password_hash }
    }

    /// Case-insensitive username match.
    pub fn username_matches(&self, other: &str) -> bool {
        self.username.eq_ignore_ascii_case(other)
    }
}

/// A chat's metadata, as persisted by the server and summarized to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chat {
    pub uuid: Uuid,
    pub creator_uuid: Uuid,
    pub name: String,
    /// Ordered set: insertion order matters, duplicates never occur.
    pub participants: Vec<Uuid>,
    /// Invariant: every element also appears in `participants`.
    pub participants_e2e: Vec<Uuid>,
    pub last_message_ts: i64,
}

impl Chat {
    pub fn new(creator_uuid: Uuid, name: String, mut participants: Vec<Uuid>) -> Self {
        if !participants.contains(&creator_uuid) {
            participants.insert(0, creator_uuid);
        }
        Self {
            uuid: Uuid::new_v4(),
            creator_uuid,
            name,
            participants,
            participants_e2e: Vec::new(),
            last_message_ts: 0,
        }
    }

    /// Add `uuid` to `participants_e2e` if not already present. No-op
    /// otherwise, per property 6.
    pub fn mark_e2e_ready(&mut self, uuid: Uuid) {
        if !self.participants_e2e.contains(&uuid) {
            self.participants_e2e.push(uuid);
        }
    }

    /// Remove `uuid` from `participants_e2e`. No-op if absent.
    pub fn mark_e2e_missing(&mut self, uuid: Uuid) {
        self.participants_e2e.retain(|u| *u != uuid);
    }

    pub fn needs_e2e(&self) -> Vec<Uuid> {
        self.participants
            .iter()
            .filter(|u| !self.participants_e2e.contains(u))
            .copied()
            .collect()
    }

    pub fn is_participant(&self, uuid: Uuid) -> bool {
        self.participants.contains(&uuid)
    }
}

/// Sender of a [`ChatMessage`]: either a real user or the server itself
/// (system messages such as the chat-creation announcement).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MessageSender {
    User(Uuid),
    Server,
}

/// Content of a [`ChatMessage`]: plaintext for server-originated system
/// messages, an opaque [`DataPacket`] for everything user-originated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum MessageContent {
    Plain(String),
    Packet(DataPacket),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub content: MessageContent,
    pub sender: MessageSender,
    pub timestamp: i64,
}

impl ChatMessage {
    pub fn system(text: impl Into<String>, timestamp: i64) -> Self {
        Self { content: MessageContent::Plain(text.into()), sender: MessageSender::Server, timestamp }
    }

    pub fn from_user(sender_uuid: Uuid, packet: DataPacket, timestamp: i64) -> Self {
        Self { content: MessageContent::Packet(packet), sender: MessageSender::User(sender_uuid), timestamp }
    }
}

/// A chat's message log: append-only, paginated in fixed-size windows.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MessageLog {
    messages: Vec<ChatMessage>,
}

impl MessageLog {
    pub fn push(&mut self, message: ChatMessage) {
        self.messages.push(message);
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn all(&self) -> &[ChatMessage] {
        &self.messages
    }

    /// `floor((len - 1) / page_size)`, clamped to 0 for an empty log.
    pub fn last_page_index(&self, page_size: usize) -> usize {
        self.messages.len().saturating_sub(1) / page_size.max(1)
    }

    /// The slice of messages on `page`, or an empty slice past the end.
    pub fn page(&self, page: usize, page_size: usize) -> &[ChatMessage] {
        let page_size = page_size.max(1);
        let start = page * page_size;
        if start >= self.messages.len() {
            return &[];
        }
        let end = (start + page_size).min(self.messages.len());
        &self.messages[start..end]
    }
}

/// `{uuid, name}` summary sent in `REQUEST_CHATS_LIST_FILLED`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatSummary {
    pub uuid: Uuid,
    pub name: String,
}

/// Rendered message sent to a client: `{content, sender_uuid, sender_name,
/// timestamp, is_own}`, with `from_server` added for system messages.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageView {
    pub content: MessageContent,
    pub sender_uuid: Option<Uuid>,
    pub sender_name: String,
    pub timestamp: i64,
    pub is_own: bool,
    pub from_server: bool,
}

/// A `%[creator]%`-substituted system message text, or `"Deleted User"` if
/// the creator's account no longer exists.
pub fn substitute_creator_token(text: &str, creator_username: Option<&str>) -> String {
    text.replace("%[creator]%", creator_username.unwrap_or("Deleted User"))
}
