//! RSA-OAEP(SHA-256) key generation, encryption and PEM (de)serialization.
//!
//! Mirrors `Asymmetric` in the Python original: 2048-bit keys, public
//! exponent 65537, OAEP with MGF1-SHA-256 and an empty label. Public keys
//! are serialized as SPKI PEM, private keys as unencrypted PKCS#8 PEM.

use {
    super::error::CryptoError,
    rand::rngs::OsRng,
    rsa::{
        pkcs8::{DecodePrivateKey, DecodePublicKey, EncodePrivateKey, EncodePublicKey, LineEnding},
        Oaep,
        RsaPrivateKey,
        RsaPublicKey,
    },
    sha2::Sha256,
};

pub const KEY_SIZE_BITS: usize = 2048;

/// A freshly generated or reconstructed RSA key pair.
pub struct RsaKeyPair {
    pub public: RsaPublicKey,
    pub private: RsaPrivateKey,
}

impl RsaKeyPair {
    /// Generate a new 2048-bit RSA key pair (public exponent 65537).
    pub fn generate() -> Result<Self, CryptoError> {
        let private = RsaPrivateKey::new(&mut OsRng, KEY_SIZE_BITS)
            .map_err(|e| CryptoError::BadKey(e.to_string()))?;
        let public = RsaPublicKey::from(&private);
        Ok(Self { public, private })
    }
}

fn oaep() -> Oaep {
    Oaep::new::<Sha256>()
}

/// Encrypt `plaintext` with `public_key` using RSA-OAEP(SHA-256, empty label).
pub fn encrypt(plaintext: &[u8], public_key: &RsaPublicKey) -> Result<Vec<u8>, CryptoError> {
    public_key
        .encrypt(&mut OsRng, oaep(), plaintext)
        .map_err(|_| CryptoError::InvalidCiphertext)
}

/// Decrypt `ciphertext` with `private_key` using RSA-OAEP(SHA-256, empty label).
pub fn decrypt(ciphertext: &[u8], private_key: &RsaPrivateKey) -> Result<Vec<u8>, CryptoError> {
    private_key
        .decrypt(oaep(), ciphertext)
        .map_err(|_| CryptoError::InvalidCiphertext)
}

/// Serialize a public key as SPKI PEM.
pub fn public_to_pem(key: &RsaPublicKey) -> Result<String, CryptoError> {
    key.to_public_key_pem(LineEnding::LF)
        .map_err(|e| CryptoError::BadKey(e.to_string()))
}

/// Serialize a private key as unencrypted PKCS#8 PEM.
pub fn private_to_pem(key: &RsaPrivateKey) -> Result<String, CryptoError> {
    key.to_pkcs8_pem(LineEnding::LF)
        .map(|zeroizing| zeroizing.to_string())
        .map_err(|e| CryptoError::BadKey(e.to_string()))
}

/// Parse a public key from SPKI PEM.
pub fn public_from_pem(pem: &str) -> Result<RsaPublicKey, CryptoError> {
    RsaPublicKey::from_public_key_pem(pem).map_err(|e| CryptoError::BadKey(e.to_string()))
}

/// Parse a private key from unencrypted PKCS#8 PEM.
pub fn private_from_pem(pem: &str) -> Result<RsaPrivateKey, CryptoError> {
    RsaPrivateKey::from_pkcs8_pem(pem).map_err(|e| CryptoError::BadKey(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_pem() {
        let pair = RsaKeyPair::generate().unwrap();
        let pub_pem = public_to_pem(&pair.public).unwrap();
        let priv_pem = private_to_pem(&pair.private).unwrap();

        let pub_back = public_from_pem(&pub_pem).unwrap();
        let priv_back = private_from_pem(&priv_pem).unwrap();

        let msg = b"hello parlor";
        let ct = encrypt(msg, &pub_back).unwrap();
        let pt = decrypt(&ct, &priv_back).unwrap();
        assert_eq!(pt, msg);
    }

    #[test]
    fn decrypt_fails_with_wrong_key() {
        let a = RsaKeyPair::generate().unwrap();
        let b = RsaKeyPair::generate().unwrap();
        let ct = encrypt(b"secret", &a.public).unwrap();
        assert!(decrypt(&ct, &b.private).is_err());
    }
}
