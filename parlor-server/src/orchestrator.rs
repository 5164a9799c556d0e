//! E2E orchestrator (C8): decides when a chat needs a handshake, picks a
//! custodian, and queues chats with no online custodian until one shows
//! up.

use {
    crate::{chat_manager::ChatManager, handshake::HandshakeRegistry, user_manager::UserManager},
    parlor_sdk::model::Chat,
    std::collections::HashSet,
    uuid::Uuid,
};

#[derive(Default)]
pub struct Orchestrator {
    pending_chats: HashSet<Uuid>,
}

impl Orchestrator {
    pub fn is_pending(&self, chat_uuid: Uuid) -> bool {
        self.pending_chats.contains(&chat_uuid)
    }

    /// Runs the check-e2e algorithm for one chat: starts handshakes for
    /// every connected participant missing the key pair, provided some
    /// other participant who has it is online; otherwise queues the chat.
    pub fn check_e2e(&mut self, chat: &mut Chat, users: &UserManager, handshakes: &mut HandshakeRegistry) {
        let need = chat.needs_e2e();
        if need.is_empty() {
            self.pending_chats.remove(&chat.uuid);
            return;
        }

        let conn_sender = chat
            .participants_e2e
            .iter()
            .find_map(|&uuid| users.connection_for(uuid));

        let Some(conn_sender) = conn_sender else {
            self.pending_chats.insert(chat.uuid);
            return;
        };

        for uuid in need {
            if let Some(conn_receiver) = users.connection_for(uuid) {
                handshakes.create(chat.uuid, conn_sender, conn_receiver);
            }
        }
    }

    /// Trigger: a participant sent `REQUEST_MISSING_KEYS`.
    pub fn on_request_missing_keys(&mut self, chat: &mut Chat, user_uuid: Uuid) {
        chat.mark_e2e_missing(user_uuid);
    }

    /// Trigger: the server relayed a handshake's terminal `FINAL_RECV`.
    pub fn on_handshake_complete(&mut self, chat: &mut Chat, sender_uuid: Uuid, receiver_uuid: Uuid) {
        chat.mark_e2e_ready(sender_uuid);
        chat.mark_e2e_ready(receiver_uuid);
        if self.pending_chats.contains(&chat.uuid) && chat.needs_e2e().is_empty() {
            self.pending_chats.remove(&chat.uuid);
        }
    }

    /// Trigger: a user logged in and is a participant in a pending chat.
    pub fn check_e2e_on_login(
        &mut self,
        login_uuid: Uuid,
        chats: &mut ChatManager,
        users: &UserManager,
        handshakes: &mut HandshakeRegistry,
    ) {
        let relevant: Vec<Uuid> = self
            .pending_chats
            .iter()
            .copied()
            .filter(|&uuid| chats.get(uuid).is_some_and(|c| c.is_participant(login_uuid)))
            .collect();

        for chat_uuid in relevant {
            if let Some(chat) = chats.get_mut(chat_uuid) {
                self.check_e2e(chat, users, handshakes);
            }
        }
    }
}
