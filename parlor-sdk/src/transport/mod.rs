//! Event transport traits (C6): a framed, tagged duplex carrier between
//! the server and each client, realized here as async Rust traits rather
//! than a language-agnostic byte protocol description.

pub mod memory;
pub mod tcp;

use {
    crate::events::{ClientEvent, ServerEvent},
    async_trait::async_trait,
    thiserror::Error,
};

/// Opaque handle to one client connection, stable for its lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(pub u64);

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum TransportError {
    #[error("transport io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("peer is gone")]
    Closed,
    #[error("malformed frame: {0}")]
    Codec(String),
}

/// One call's worth of transport activity, in the order the server's main
/// loop (C9) needs it: newly accepted connections, parsed events in
/// per-connection order, then connections that dropped since last call.
#[derive(Debug, Default)]
pub struct PumpResult {
    pub newly_connected: Vec<ConnectionId>,
    pub events: Vec<(ConnectionId, ClientEvent)>,
    pub disconnected: Vec<ConnectionId>,
}

#[async_trait]
pub trait ServerTransport: Send {
    async fn pump(&mut self) -> Result<PumpResult, TransportError>;

    /// Best-effort, in-order delivery. A disconnected peer silently drops
    /// the send rather than surfacing an error to the caller.
    async fn send(&mut self, conn: ConnectionId, event: ServerEvent) -> Result<(), TransportError>;
}

#[async_trait]
pub trait ClientTransport: Send {
    /// Returns newly arrived events and whether the connection is still
    /// alive.
    async fn pump(&mut self) -> Result<(Vec<ServerEvent>, bool), TransportError>;

    async fn send(&mut self, event: ClientEvent) -> Result<(), TransportError>;
}
