use thiserror::Error;

/// Failure modes for every primitive in [`super::asymmetric`] and
/// [`super::symmetric`], and for [`crate::packet::DataPacket`] built on top
/// of them.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CryptoError {
    #[error("bad key: {0}")]
    BadKey(String),
    #[error("invalid ciphertext")]
    InvalidCiphertext,
    #[error("unsupported operation: {0}")]
    Unsupported(String),
}
