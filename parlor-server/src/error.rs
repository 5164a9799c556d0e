use thiserror::Error;

/// The error kinds a dispatched event can fail with. The dispatch policy
/// for each kind lives in `dispatch.rs`, not here — this type only names
/// the failure.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ServerError {
    #[error("authentication failed: {0}")]
    AuthFailure(String),
    #[error("unauthorized")]
    Unauthorized,
    #[error("not found: {0}")]
    NotFound(String),
    #[error("crypto error: {0}")]
    Crypto(#[from] parlor_sdk::CryptoError),
    #[error("protocol error: {0}")]
    Protocol(String),
    #[error("transport error: {0}")]
    Transport(#[from] parlor_sdk::transport::TransportError),
    #[error("persistence error: {0}")]
    Persistence(String),
}

impl From<std::io::Error> for ServerError {
    fn from(e: std::io::Error) -> Self {
        ServerError::Persistence(e.to_string())
    }
}

impl From<serde_json::Error> for ServerError {
    fn from(e: serde_json::Error) -> Self {
        ServerError::Persistence(e.to_string())
    }
}
