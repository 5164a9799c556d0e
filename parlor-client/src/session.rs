//! The client session: owns the transport, the local key store, and the
//! handshake manager, and mediates between them. Two cooperative
//! contexts share this value in spirit (§5): request methods are called
//! from the UI side, `pump()` drains the network side; both run on the
//! caller's single task here rather than across a thread boundary, since
//! a terminal UI has no separate render thread to protect.

use {
    crate::{error::ClientError, handshake::HandshakeManager, keystore::KeyStore},
    parlor_sdk::{
        crypto::{asymmetric, RsaKeyPair},
        events::{ClientEvent, HandshakeAction, ServerEvent},
        ids::key_id_for_chat,
        model::MessageContent,
        packet::DataPacket,
        transport::ClientTransport,
    },
    uuid::Uuid,
};

pub struct Client<T: ClientTransport> {
    transport: T,
    keystore: KeyStore,
    handshakes: HandshakeManager,
    pub uuid: Option<Uuid>,
}

impl<T: ClientTransport> Client<T> {
    pub fn new(transport: T, keystore: KeyStore) -> Self {
        Self { transport, keystore, handshakes: HandshakeManager::default(), uuid: None }
    }

    pub fn is_logged_in(&self) -> bool {
        self.uuid.is_some()
    }

    pub async fn login(&mut self, username: &str, password_hash: &str) -> Result<(), ClientError> {
        self.transport
            .send(ClientEvent::AttemptLogin { username: username.to_string(), password_hash: password_hash.to_string() })
            .await?;
        Ok(())
    }

    pub async fn sign_up(&mut self, username: &str, password_hash: &str) -> Result<(), ClientError> {
        self.transport
            .send(ClientEvent::AttemptSignUp {
                username: username.to_string(),
                password_hash: password_hash.to_string(),
            })
            .await?;
        Ok(())
    }

    pub async fn request_chats_list(&mut self) -> Result<(), ClientError> {
        self.transport.send(ClientEvent::RequestChatsList).await?;
        Ok(())
    }

    pub async fn request_initial_messages(&mut self, chat_uuid: Uuid) -> Result<(), ClientError> {
        self.transport.send(ClientEvent::RequestInitialMessages { chat_uuid }).await?;
        Ok(())
    }

    pub async fn request_get_messages(&mut self, chat_uuid: Uuid, messages_page: usize) -> Result<(), ClientError> {
        self.transport.send(ClientEvent::RequestGetMessages { chat_uuid, messages_page }).await?;
        Ok(())
    }

    pub async fn send_message(&mut self, chat_uuid: Uuid, message_content: DataPacket) -> Result<(), ClientError> {
        self.transport.send(ClientEvent::RequestSendMessage { chat_uuid, message_content }).await?;
        Ok(())
    }

    pub async fn search_for_users(&mut self, query: &str, get_max: usize, result_action: &str) -> Result<(), ClientError> {
        self.transport
            .send(ClientEvent::RequestSearchForUsers {
                query: query.to_string(),
                get_max,
                result_action: result_action.to_string(),
            })
            .await?;
        Ok(())
    }

    pub async fn create_chat(&mut self, chat_name: &str, participants: Vec<Uuid>) -> Result<(), ClientError> {
        self.transport
            .send(ClientEvent::RequestCreateChat { chat_name: chat_name.to_string(), participants })
            .await?;
        Ok(())
    }

    pub async fn request_missing_keys(&mut self, chat_uuid: Uuid) -> Result<(), ClientError> {
        self.transport.send(ClientEvent::RequestMissingKeys { chat_uuid }).await?;
        Ok(())
    }

    /// Encrypts `plaintext` for `chat_uuid` using its local public key,
    /// ready for `send_message`.
    pub fn encrypt_message(&self, chat_uuid: Uuid, plaintext: &str) -> Result<DataPacket, ClientError> {
        let key_id = key_id_for_chat(chat_uuid);
        let (public_pem, _) =
            self.keystore.get(&key_id).ok_or_else(|| ClientError::Protocol(format!("no local key pair for {key_id}")))?;
        let public = asymmetric::public_from_pem(&public_pem)?;
        let mut packet = DataPacket::plain(plaintext.as_bytes().to_vec());
        packet.encrypt(&public)?;
        Ok(packet)
    }

    /// Decrypts `content` for display, replacing it with `"???"` on any
    /// crypto failure instead of propagating an error (§7).
    pub fn render_content(&self, chat_uuid: Uuid, content: MessageContent) -> String {
        match content {
            MessageContent::Plain(text) => text,
            MessageContent::Packet(mut packet) => {
                let key_id = key_id_for_chat(chat_uuid);
                let Some((_, private_pem)) = self.keystore.get(&key_id) else { return "???".to_string() };
                let Ok(private) = asymmetric::private_from_pem(&private_pem) else { return "???".to_string() };
                if packet.decrypt(&private).is_err() {
                    return "???".to_string();
                }
                String::from_utf8(packet.into_payload()).unwrap_or_else(|_| "???".to_string())
            }
        }
    }

    /// Drains the transport, handles handshake and key-store side effects
    /// internally, and returns whatever is left for the UI to render
    /// along with the connected flag.
    pub async fn pump(&mut self) -> Result<(Vec<ServerEvent>, bool), ClientError> {
        let (events, connected) = self.transport.pump().await?;
        let mut surfaced = Vec::with_capacity(events.len());

        for event in events {
            match event {
                ServerEvent::LoginResult { success, uuid } => {
                    if success {
                        self.uuid = uuid;
                    }
                    surfaced.push(ServerEvent::LoginResult { success, uuid });
                }
                ServerEvent::SignUpResult { success, uuid } => {
                    if success {
                        self.uuid = uuid;
                    }
                    surfaced.push(ServerEvent::SignUpResult { success, uuid });
                }
                ServerEvent::CreateNewKeys { encryption_key_id } => {
                    self.on_create_new_keys(&encryption_key_id)?;
                }
                ServerEvent::E2eHandshake(envelope) => {
                    self.on_handshake_event(envelope).await?;
                }
                other => surfaced.push(other),
            }
        }
        Ok((surfaced, connected))
    }

    fn on_create_new_keys(&mut self, encryption_key_id: &str) -> Result<(), ClientError> {
        if self.keystore.has(encryption_key_id) {
            return Ok(());
        }
        let pair = RsaKeyPair::generate()?;
        let public_pem = asymmetric::public_to_pem(&pair.public)?;
        let private_pem = asymmetric::private_to_pem(&pair.private)?;
        self.keystore.put(encryption_key_id.to_string(), public_pem, private_pem);
        self.keystore.save()?;
        Ok(())
    }

    async fn on_handshake_event(&mut self, envelope: parlor_sdk::events::HandshakeEnvelope) -> Result<(), ClientError> {
        match envelope.action {
            HandshakeAction::InitSend => {
                self.handshakes.begin_sender(&mut self.keystore, &envelope.handshake_id)?;
            }
            HandshakeAction::InitRecv => {
                let reply = self.handshakes.begin_receiver(&envelope.handshake_id)?;
                self.transport.send(ClientEvent::E2eHandshake(reply)).await?;
            }
            HandshakeAction::FinalSend => {
                let reply = self.handshakes.on_final_send(&self.keystore, &envelope)?;
                self.transport.send(ClientEvent::E2eHandshake(reply)).await?;
            }
            HandshakeAction::FinalRecv => {
                self.handshakes.on_final_recv(&mut self.keystore, &envelope)?;
            }
        }
        Ok(())
    }
}
