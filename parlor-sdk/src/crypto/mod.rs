pub mod asymmetric;
pub mod error;
pub mod symmetric;

pub use asymmetric::RsaKeyPair;
pub use error::CryptoError;
pub use symmetric::SymmetricKey;
