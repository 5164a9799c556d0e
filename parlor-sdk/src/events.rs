//! Typed client/server event enums.
//!
//! The abstract transport (`crate::transport`) carries a tag plus named
//! fields; here that's realized directly as Rust enums, one variant per
//! row of the server-bound and client-bound event tables, so dispatch is
//! exhaustive-match rather than string-keyed lookup.

use {
    crate::{model::{ChatSummary, MessageView}, packet::DataPacket},
    serde::{Deserialize, Serialize},
    uuid::Uuid,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HandshakeAction {
    InitRecv,
    InitSend,
    FinalSend,
    FinalRecv,
}

/// Payload carried alongside a handshake action. `InitRecv`/`InitSend`
/// carry none; `FinalSend` carries the newcomer's ephemeral public key;
/// `FinalRecv` carries the chat key pair wrapped for that ephemeral key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum HandshakeData {
    None,
    FinalSend { r_pub_pem: Vec<u8> },
    FinalRecv { s_pub_packet: DataPacket, s_priv_packet: DataPacket },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HandshakeEnvelope {
    pub handshake_id: String,
    pub action: HandshakeAction,
    pub data: HandshakeData,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserSummary {
    pub uuid: Uuid,
    pub username: String,
}

/// Events a client sends to the server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ClientEvent {
    AttemptLogin { username: String, password_hash: String },
    AttemptSignUp { username: String, password_hash: String },
    RequestChatsList,
    RequestInitialMessages { chat_uuid: Uuid },
    RequestGetMessages { chat_uuid: Uuid, messages_page: usize },
    RequestSendMessage { chat_uuid: Uuid, message_content: DataPacket },
    RequestSearchForUsers { query: String, get_max: usize, result_action: String },
    RequestCreateChat { chat_name: String, participants: Vec<Uuid> },
    RequestMissingKeys { chat_uuid: Uuid },
    E2eHandshake(HandshakeEnvelope),
}

/// Events the server sends to a client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ServerEvent {
    LoginResult { success: bool, uuid: Option<Uuid> },
    SignUpResult { success: bool, uuid: Option<Uuid> },
    RequestChatsListFilled { chats: Vec<ChatSummary> },
    NewChatCreated { chat: ChatSummary },
    RequestInitialMessagesFilled { chat_uuid: Uuid, loaded_to_page: usize, messages: Vec<MessageView> },
    RequestGetMessagesFilled { chat_uuid: Uuid, loaded_to_page: usize, messages: Vec<MessageView> },
    RequestSendMessageFilled { chat_uuid: Uuid, loaded_to_page: usize, message: MessageView },
    RequestSearchForUsersFilled { results: Vec<UserSummary>, result_action: String },
    CreateNewKeys { encryption_key_id: String },
    E2eHandshake(HandshakeEnvelope),
}
