//! `DataPacket`: the hybrid RSA+Fernet envelope carried by every
//! user-originated chat message.
//!
//! A packet stores its payload in one of two states, tracked by
//! `encrypted`: plaintext (payload holds the raw bytes, `sym_key` empty)
//! or sealed (payload holds a Fernet token, `sym_key` holds that token's
//! key, RSA-wrapped for the chat's public key). Encrypting an
//! already-encrypted packet, or decrypting an already-plaintext one, is a
//! no-op rather than an error — callers don't need to track packet state
//! themselves.

use {
    crate::crypto::{asymmetric, error::CryptoError, symmetric::SymmetricKey},
    rsa::{RsaPrivateKey, RsaPublicKey},
    serde::{Deserialize, Serialize},
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataPacket {
    payload: Vec<u8>,
    sym_key: Vec<u8>,
    encrypted: bool,
}

impl DataPacket {
    /// Wrap plaintext bytes in an unsealed packet.
    pub fn plain(bytes: Vec<u8>) -> Self {
        Self { payload: bytes, sym_key: Vec::new(), encrypted: false }
    }

    pub fn is_encrypted(&self) -> bool {
        self.encrypted
    }

    /// Seal this packet's payload for `public_key`. A no-op if already sealed.
    pub fn encrypt(&mut self, public_key: &RsaPublicKey) -> Result<(), CryptoError> {
        if self.encrypted {
            return Ok(());
        }
        let sym = SymmetricKey::generate_random()?;
        let token = sym.encrypt(&self.payload);
        let wrapped_key = asymmetric::encrypt(sym.to_fernet_key().as_bytes(), public_key)?;

        self.payload = token.into_bytes();
        self.sym_key = wrapped_key;
        self.encrypted = true;
        Ok(())
    }

    /// Unseal this packet's payload using `private_key`. A no-op if already
    /// plaintext.
    pub fn decrypt(&mut self, private_key: &RsaPrivateKey) -> Result<(), CryptoError> {
        if !self.encrypted {
            return Ok(());
        }
        let key_bytes = asymmetric::decrypt(&self.sym_key, private_key)?;
        let key_str = String::from_utf8(key_bytes)
            .map_err(|_| CryptoError::InvalidCiphertext)?;
        let sym = SymmetricKey::from_fernet_key(&key_str)?;

        let token = String::from_utf8(self.payload.clone())
            .map_err(|_| CryptoError::InvalidCiphertext)?;
        let plain = sym.decrypt(&token)?;

        self.payload = plain;
        self.sym_key = Vec::new();
        self.encrypted = false;
        Ok(())
    }

    /// Borrow the current payload, whatever state it's in. Callers that
    /// need plaintext must call [`DataPacket::decrypt`] first.
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    pub fn into_payload(self) -> Vec<u8> {
        self.payload
    }

    /// Serialize this packet to its wire form (three length-prefixed byte
    /// sequences: payload, sym_key, encrypted flag).
    pub fn to_wire(&self) -> Result<Vec<u8>, CryptoError> {
        bincode::serialize(self).map_err(|e| CryptoError::Unsupported(e.to_string()))
    }

    pub fn from_wire(bytes: &[u8]) -> Result<Self, CryptoError> {
        bincode::deserialize(bytes).map_err(|e| CryptoError::Unsupported(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::RsaKeyPair;

    #[test]
    fn round_trips_through_encrypt_decrypt() {
        let pair = RsaKeyPair::generate().unwrap();
        let mut packet = DataPacket::plain(b"hello parlor".to_vec());

        packet.encrypt(&pair.public).unwrap();
        assert!(packet.is_encrypted());
        assert_ne!(packet.payload(), b"hello parlor");

        packet.decrypt(&pair.private).unwrap();
        assert!(!packet.is_encrypted());
        assert_eq!(packet.payload(), b"hello parlor");
    }

    #[test]
    fn encrypt_is_idempotent() {
        let pair = RsaKeyPair::generate().unwrap();
        let mut packet = DataPacket::plain(b"hello".to_vec());
        packet.encrypt(&pair.public).unwrap();
        let after_first = packet.clone();
        packet.encrypt(&pair.public).unwrap();
        assert_eq!(packet, after_first);
    }

    #[test]
    fn decrypt_is_idempotent() {
        let mut packet = DataPacket::plain(b"hello".to_vec());
        packet.decrypt(&RsaKeyPair::generate().unwrap().private).unwrap();
        assert_eq!(packet.payload(), b"hello");
    }

    #[test]
    fn wire_round_trip() {
        let pair = RsaKeyPair::generate().unwrap();
        let mut packet = DataPacket::plain(b"hello parlor".to_vec());
        packet.encrypt(&pair.public).unwrap();

        let wire = packet.to_wire().unwrap();
        let mut back = DataPacket::from_wire(&wire).unwrap();
        assert_eq!(back, packet);

        back.decrypt(&pair.private).unwrap();
        assert_eq!(back.payload(), b"hello parlor");
    }
}
