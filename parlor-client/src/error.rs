use thiserror::Error;

/// The error kinds a client operation can fail with. `CryptoError` during
/// message decryption is intentionally not surfaced through this type —
/// the rendering layer catches it and substitutes `"???"` instead,
/// matching the server's own policy for that kind.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ClientError {
    #[error("crypto error: {0}")]
    Crypto(#[from] parlor_sdk::CryptoError),
    #[error("transport error: {0}")]
    Transport(#[from] parlor_sdk::transport::TransportError),
    #[error("key store error: {0}")]
    KeyStore(String),
    #[error("protocol error: {0}")]
    Protocol(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
