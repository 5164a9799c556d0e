//! Server-side handshake engine (C7, server half): a relay that remembers
//! `(conn_sender, conn_receiver)` per handshake-id and forwards
//! `FINAL_SEND`/`FINAL_RECV` strictly in the directions the protocol
//! allows. The server never looks inside the wrapped key material.

use {
    crate::error::ServerError,
    parlor_sdk::{
        ids::{handshake_id, key_id_for_chat, smallest_unused_tag},
        transport::ConnectionId,
    },
    std::{
        collections::HashMap,
        time::{Duration, Instant},
    },
    uuid::Uuid,
};

/// Idle handshakes are evicted after this long, since disconnect alone
/// never cleans them up (§9's "no eviction on disconnect" is a known
/// limitation this bounds rather than removes).
pub const HANDSHAKE_IDLE_TIMEOUT: Duration = Duration::from_secs(60);

struct ServerHandshake {
    chat_uuid: Uuid,
    conn_sender: ConnectionId,
    conn_receiver: ConnectionId,
    initiated: bool,
    created_at: Instant,
}

#[derive(Default)]
pub struct HandshakeRegistry {
    handshakes: HashMap<String, ServerHandshake>,
    waiting_for_init: Vec<String>,
}

impl HandshakeRegistry {
    /// Start a new handshake for `chat_uuid` between `conn_sender`
    /// (custodian) and `conn_receiver` (newcomer). Marks it
    /// waiting-for-init; the caller drains that queue once per pump.
    pub fn create(&mut self, chat_uuid: Uuid, conn_sender: ConnectionId, conn_receiver: ConnectionId) -> String {
        let key_id = key_id_for_chat(chat_uuid);
        let used_tags: Vec<u32> = self
            .handshakes
            .keys()
            .filter_map(|id| id.strip_prefix(&key_id)?.strip_prefix('+')?.parse().ok())
            .collect();
        let tag = smallest_unused_tag(&used_tags);
        let id = handshake_id(chat_uuid, tag);

        self.handshakes.insert(
            id.clone(),
            ServerHandshake { chat_uuid, conn_sender, conn_receiver, initiated: false, created_at: Instant::now() },
        );
        self.waiting_for_init.push(id.clone());
        id
    }

    /// Drains handshakes awaiting their `INIT_SEND`/`INIT_RECV` pair,
    /// returning `(handshake_id, conn_sender, conn_receiver)` for each.
    pub fn drain_waiting_for_init(&mut self) -> Vec<(String, ConnectionId, ConnectionId)> {
        let ids = std::mem::take(&mut self.waiting_for_init);
        ids.into_iter()
            .filter_map(|id| {
                let hs = self.handshakes.get_mut(&id)?;
                hs.initiated = true;
                Some((id, hs.conn_sender, hs.conn_receiver))
            })
            .collect()
    }

    /// Newcomer relays `FINAL_SEND` to the server; returns the custodian's
    /// connection to forward it to. Fails if `handshake_id` is unknown or
    /// `from` isn't the registered receiver.
    pub fn relay_final_send(&self, handshake_id: &str, from: ConnectionId) -> Result<ConnectionId, ServerError> {
        let hs = self
            .handshakes
            .get(handshake_id)
            .ok_or_else(|| ServerError::NotFound(format!("handshake {handshake_id}")))?;
        if hs.conn_receiver != from {
            return Err(ServerError::Protocol(format!(
                "FINAL_SEND for {handshake_id} from unexpected connection"
            )));
        }
        Ok(hs.conn_sender)
    }

    /// Custodian relays `FINAL_RECV` to the server; returns
    /// `(conn_receiver, chat_uuid, conn_sender)` so the caller can forward
    /// the event and emit `handshake_complete`. The handshake is removed —
    /// it's terminal once this relay succeeds.
    pub fn relay_final_recv(
        &mut self,
        handshake_id: &str,
        from: ConnectionId,
    ) -> Result<(ConnectionId, Uuid, ConnectionId), ServerError> {
        let hs = self
            .handshakes
            .get(handshake_id)
            .ok_or_else(|| ServerError::NotFound(format!("handshake {handshake_id}")))?;
        if hs.conn_sender != from {
            return Err(ServerError::Protocol(format!(
                "FINAL_RECV for {handshake_id} from unexpected connection"
            )));
        }
        let (conn_receiver, chat_uuid, conn_sender) = (hs.conn_receiver, hs.chat_uuid, hs.conn_sender);
        self.handshakes.remove(handshake_id);
        Ok((conn_receiver, chat_uuid, conn_sender))
    }

    /// Evicts handshakes older than [`HANDSHAKE_IDLE_TIMEOUT`], returning
    /// their ids for the caller to log.
    pub fn evict_idle(&mut self) -> Vec<String> {
        let now = Instant::now();
        let expired: Vec<String> = self
            .handshakes
            .iter()
            .filter(|(_, hs)| now.duration_since(hs.created_at) > HANDSHAKE_IDLE_TIMEOUT)
            .map(|(id, _)| id.clone())
            .collect();
        for id in &expired {
            self.handshakes.remove(id);
        }
        expired
    }
}
