//! Client-side handshake engine (C7, client half): a tiny per-handshake-id
//! state machine mirroring the server relay's three-message protocol.
//! SENDER is the custodian already holding (or about to lazily generate)
//! the chat's key pair; RECEIVER is the newcomer waiting to be handed it.

use {
    crate::{error::ClientError, keystore::KeyStore},
    parlor_sdk::{
        crypto::{asymmetric, RsaKeyPair},
        events::{HandshakeAction, HandshakeData, HandshakeEnvelope},
        ids::{chat_uuid_from_handshake_id, key_id_for_chat},
        packet::DataPacket,
    },
    std::collections::HashMap,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Side {
    Sender,
    Receiver,
}

struct Pending {
    side: Side,
    /// The newcomer's ephemeral pair, held between `INIT_RECV` and the
    /// matching `FINAL_RECV`. Always `None` on the sender side.
    ephemeral: Option<RsaKeyPair>,
}

#[derive(Default)]
pub struct HandshakeManager {
    pending: HashMap<String, Pending>,
}

fn chat_key_id(handshake_id: &str) -> Result<String, ClientError> {
    let chat_uuid = chat_uuid_from_handshake_id(handshake_id)
        .ok_or_else(|| ClientError::Protocol(format!("malformed handshake id {handshake_id}")))?;
    Ok(key_id_for_chat(chat_uuid))
}

impl HandshakeManager {
    /// `INIT_SEND`: lazily generates the chat's key pair if this is the
    /// first handshake for its key-id, then waits for `FINAL_SEND`.
    pub fn begin_sender(&mut self, keystore: &mut KeyStore, handshake_id: &str) -> Result<(), ClientError> {
        let key_id = chat_key_id(handshake_id)?;
        if !keystore.has(&key_id) {
            let pair = RsaKeyPair::generate()?;
            let public_pem = asymmetric::public_to_pem(&pair.public)?;
            let private_pem = asymmetric::private_to_pem(&pair.private)?;
            keystore.put(key_id, public_pem, private_pem);
            keystore.save()?;
        }
        self.pending.insert(handshake_id.to_string(), Pending { side: Side::Sender, ephemeral: None });
        Ok(())
    }

    /// `INIT_RECV`: generates an ephemeral pair and returns the
    /// `FINAL_SEND` envelope to emit immediately.
    pub fn begin_receiver(&mut self, handshake_id: &str) -> Result<HandshakeEnvelope, ClientError> {
        let ephemeral = RsaKeyPair::generate()?;
        let r_pub_pem = asymmetric::public_to_pem(&ephemeral.public)?;
        self.pending.insert(handshake_id.to_string(), Pending { side: Side::Receiver, ephemeral: Some(ephemeral) });
        Ok(HandshakeEnvelope {
            handshake_id: handshake_id.to_string(),
            action: HandshakeAction::FinalSend,
            data: HandshakeData::FinalSend { r_pub_pem: r_pub_pem.into_bytes() },
        })
    }

    /// `FINAL_SEND` relayed to the custodian: wraps the chat key pair for
    /// the newcomer's ephemeral public key, returning the terminal
    /// `FINAL_RECV` envelope.
    pub fn on_final_send(
        &mut self,
        keystore: &KeyStore,
        envelope: &HandshakeEnvelope,
    ) -> Result<HandshakeEnvelope, ClientError> {
        self.pending
            .remove(&envelope.handshake_id)
            .filter(|p| p.side == Side::Sender)
            .ok_or_else(|| ClientError::Protocol(format!("unexpected FINAL_SEND for {}", envelope.handshake_id)))?;

        let HandshakeData::FinalSend { r_pub_pem } = &envelope.data else {
            return Err(ClientError::Protocol("FINAL_SEND without r_pub_pem".into()));
        };
        let r_pub_pem = String::from_utf8(r_pub_pem.clone())
            .map_err(|_| ClientError::Protocol("r_pub_pem is not valid utf-8".into()))?;
        let r_pub = asymmetric::public_from_pem(&r_pub_pem)?;

        let key_id = chat_key_id(&envelope.handshake_id)?;
        let (public_pem, private_pem) =
            keystore.get(&key_id).ok_or_else(|| ClientError::Protocol(format!("no local key pair for {key_id}")))?;

        let mut s_pub_packet = DataPacket::plain(public_pem.into_bytes());
        s_pub_packet.encrypt(&r_pub)?;
        let mut s_priv_packet = DataPacket::plain(private_pem.into_bytes());
        s_priv_packet.encrypt(&r_pub)?;

        Ok(HandshakeEnvelope {
            handshake_id: envelope.handshake_id.clone(),
            action: HandshakeAction::FinalRecv,
            data: HandshakeData::FinalRecv { s_pub_packet, s_priv_packet },
        })
    }

    /// `FINAL_RECV` relayed to the newcomer: decrypts with the ephemeral
    /// private key, installs the chat key pair, and flushes the store.
    pub fn on_final_recv(&mut self, keystore: &mut KeyStore, envelope: &HandshakeEnvelope) -> Result<(), ClientError> {
        let pending = self
            .pending
            .remove(&envelope.handshake_id)
            .filter(|p| p.side == Side::Receiver)
            .ok_or_else(|| ClientError::Protocol(format!("unexpected FINAL_RECV for {}", envelope.handshake_id)))?;
        let ephemeral = pending.ephemeral.ok_or_else(|| {
            ClientError::Protocol(format!("receiver handshake {} missing ephemeral key", envelope.handshake_id))
        })?;

        let HandshakeData::FinalRecv { s_pub_packet, s_priv_packet } = &envelope.data else {
            return Err(ClientError::Protocol("FINAL_RECV without wrapped packets".into()));
        };
        let mut s_pub_packet = s_pub_packet.clone();
        let mut s_priv_packet = s_priv_packet.clone();
        s_pub_packet.decrypt(&ephemeral.private)?;
        s_priv_packet.decrypt(&ephemeral.private)?;

        let public_pem = String::from_utf8(s_pub_packet.into_payload())
            .map_err(|_| ClientError::Protocol("decrypted public key is not valid utf-8".into()))?;
        let private_pem = String::from_utf8(s_priv_packet.into_payload())
            .map_err(|_| ClientError::Protocol("decrypted private key is not valid utf-8".into()))?;

        keystore.put(chat_key_id(&envelope.handshake_id)?, public_pem, private_pem);
        keystore.save()?;
        Ok(())
    }
}
