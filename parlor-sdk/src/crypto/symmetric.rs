//! Fernet-backed symmetric encryption, with an optional password-derived key.
//!
//! Mirrors `Symmetric` in the Python original: a bare key is a random
//! Fernet key; a password-derived key runs PBKDF2-HMAC-SHA256 for 100,000
//! rounds over a *fixed* salt, trading away salt randomness for the
//! ability to rederive the same key from the same password later.

use {super::error::CryptoError, fernet::Fernet, sha2::Sha256};

const PBKDF2_ROUNDS: u32 = 100_000;
const KEY_LEN: usize = 32;

/// Fixed salt used when a symmetric key is derived from a password.
///
/// Reusing a salt is normally a mistake, but this exists so that a chat
/// password yields the same key on every client without distributing a
/// separate salt alongside it. Carried over unchanged from the original.
const FIXED_SALT: [u8; 16] = [
    0x85, 0x94, 0xa2, 0x20, 0x9e, 0xc4, 0x33, 0xa1, 0x31, 0xdb, 0xbc, 0x1f, 0x48, 0xf6, 0x0e, 0xbc,
];

/// A symmetric key plus the Fernet instance built from it.
pub struct SymmetricKey {
    fernet: Fernet,
    key_bytes: [u8; KEY_LEN],
}

impl SymmetricKey {
    /// Generate a new random symmetric key.
    pub fn generate_random() -> Result<Self, CryptoError> {
        let raw = Fernet::generate_key();
        Self::from_fernet_key(&raw)
    }

    /// Derive a symmetric key from a password using PBKDF2-HMAC-SHA256 with
    /// the fixed salt.
    pub fn from_password(password: &[u8]) -> Result<Self, CryptoError> {
        let mut key_bytes = [0u8; KEY_LEN];
        pbkdf2::pbkdf2_hmac::<Sha256>(password, &FIXED_SALT, PBKDF2_ROUNDS, &mut key_bytes);
        let encoded = base64_url_encode(&key_bytes);
        let fernet = Fernet::new(&encoded)
            .ok_or_else(|| CryptoError::BadKey("derived key is not a valid fernet key".into()))?;
        Ok(Self { fernet, key_bytes })
    }

    /// Reconstruct a key from its urlsafe-base64 Fernet representation.
    pub fn from_fernet_key(encoded: &str) -> Result<Self, CryptoError> {
        let fernet =
            Fernet::new(encoded).ok_or_else(|| CryptoError::BadKey("malformed fernet key".into()))?;
        let raw = base64_url_decode(encoded)
            .map_err(|e| CryptoError::BadKey(e.to_string()))?;
        let key_bytes: [u8; KEY_LEN] = raw
            .try_into()
            .map_err(|_| CryptoError::BadKey("fernet key is not 32 bytes".into()))?;
        Ok(Self { fernet, key_bytes })
    }

    /// This key's urlsafe-base64 Fernet representation, suitable for
    /// embedding in a [`crate::packet::DataPacket`].
    pub fn to_fernet_key(&self) -> String {
        base64_url_encode(&self.key_bytes)
    }

    pub fn encrypt(&self, plaintext: &[u8]) -> String {
        self.fernet.encrypt(plaintext)
    }

    pub fn decrypt(&self, token: &str) -> Result<Vec<u8>, CryptoError> {
        self.fernet.decrypt(token).map_err(|_| CryptoError::InvalidCiphertext)
    }
}

fn base64_url_encode(bytes: &[u8]) -> String {
    use base64::{engine::general_purpose::URL_SAFE, Engine};
    URL_SAFE.encode(bytes)
}

fn base64_url_decode(s: &str) -> Result<Vec<u8>, base64::DecodeError> {
    use base64::{engine::general_purpose::URL_SAFE, Engine};
    URL_SAFE.decode(s)
}
