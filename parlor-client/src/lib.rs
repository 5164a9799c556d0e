//! Parlor client library: local key store, handshake state machine, and
//! the session wrapper the `parlor` binary's REPL drives.

pub mod error;
pub mod handshake;
pub mod keystore;
pub mod machine_id;
pub mod repl;
pub mod session;
pub mod settings;
