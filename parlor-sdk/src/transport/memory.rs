//! In-memory event transport used by integration tests: paired
//! `tokio::sync::mpsc` channels instead of sockets, so protocol logic can
//! be exercised without binding ports. A client's disconnect is modeled
//! the same way a dropped TCP socket shows up: dropping the
//! [`MemoryClientTransport`] value is itself the disconnect signal.

use {
    super::{ClientTransport, ConnectionId, PumpResult, ServerTransport, TransportError},
    crate::events::{ClientEvent, ServerEvent},
    async_trait::async_trait,
    std::{
        collections::HashMap,
        sync::atomic::{AtomicU64, Ordering},
        sync::Arc,
    },
    tokio::sync::mpsc,
};

enum RawMsg {
    Connected(ConnectionId, mpsc::UnboundedSender<ServerEvent>),
    Event(ConnectionId, ClientEvent),
    Disconnected(ConnectionId),
}

pub struct MemoryServerTransport {
    next_id: Arc<AtomicU64>,
    hub_tx: mpsc::UnboundedSender<RawMsg>,
    incoming_rx: mpsc::UnboundedReceiver<RawMsg>,
    writers: HashMap<ConnectionId, mpsc::UnboundedSender<ServerEvent>>,
}

impl MemoryServerTransport {
    pub fn new() -> Self {
        let (hub_tx, incoming_rx) = mpsc::unbounded_channel();
        Self { next_id: Arc::new(AtomicU64::new(1)), hub_tx, incoming_rx, writers: HashMap::new() }
    }

    /// Connect a new client to this server.
    pub fn connect(&self) -> MemoryClientTransport {
        let id = ConnectionId(self.next_id.fetch_add(1, Ordering::SeqCst));
        let (to_client_tx, to_client_rx) = mpsc::unbounded_channel();
        let _ = self.hub_tx.send(RawMsg::Connected(id, to_client_tx));
        MemoryClientTransport {
            id,
            incoming_rx: to_client_rx,
            outgoing_tx: self.hub_tx.clone(),
            connected: true,
        }
    }

    fn apply(&mut self, msg: RawMsg, result: &mut PumpResult) {
        match msg {
            RawMsg::Connected(id, sender) => {
                self.writers.insert(id, sender);
                result.newly_connected.push(id);
            }
            RawMsg::Event(id, event) => result.events.push((id, event)),
            RawMsg::Disconnected(id) => {
                self.writers.remove(&id);
                result.disconnected.push(id);
            }
        }
    }
}

impl Default for MemoryServerTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ServerTransport for MemoryServerTransport {
    async fn pump(&mut self) -> Result<PumpResult, TransportError> {
        let mut result = PumpResult::default();
        while let Ok(msg) = self.incoming_rx.try_recv() {
            self.apply(msg, &mut result);
        }
        Ok(result)
    }

    async fn send(&mut self, conn: ConnectionId, event: ServerEvent) -> Result<(), TransportError> {
        if let Some(sender) = self.writers.get(&conn) {
            let _ = sender.send(event);
        }
        Ok(())
    }
}

pub struct MemoryClientTransport {
    id: ConnectionId,
    incoming_rx: mpsc::UnboundedReceiver<ServerEvent>,
    outgoing_tx: mpsc::UnboundedSender<RawMsg>,
    connected: bool,
}

#[async_trait]
impl ClientTransport for MemoryClientTransport {
    async fn pump(&mut self) -> Result<(Vec<ServerEvent>, bool), TransportError> {
        let mut events = Vec::new();
        loop {
            match self.incoming_rx.try_recv() {
                Ok(event) => events.push(event),
                Err(mpsc::error::TryRecvError::Empty) => break,
                Err(mpsc::error::TryRecvError::Disconnected) => {
                    self.connected = false;
                    break;
                }
            }
        }
        Ok((events, self.connected))
    }

    async fn send(&mut self, event: ClientEvent) -> Result<(), TransportError> {
        self.outgoing_tx
            .send(RawMsg::Event(self.id, event))
            .map_err(|_| TransportError::Closed)
    }
}

impl Drop for MemoryClientTransport {
    fn drop(&mut self) {
        let _ = self.outgoing_tx.send(RawMsg::Disconnected(self.id));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::ClientEvent;

    #[tokio::test]
    async fn connect_then_send_reaches_server_pump() {
        let mut server = MemoryServerTransport::new();
        let mut client = server.connect();

        let result = server.pump().await.unwrap();
        assert_eq!(result.newly_connected.len(), 1);
        let conn = result.newly_connected[0];

        client
            .send(ClientEvent::RequestChatsList)
            .await
            .unwrap();
        let result = server.pump().await.unwrap();
        assert_eq!(result.events.len(), 1);
        assert_eq!(result.events[0].0, conn);
    }

    #[tokio::test]
    async fn dropping_client_surfaces_as_disconnect() {
        let mut server = MemoryServerTransport::new();
        let client = server.connect();
        server.pump().await.unwrap();
        drop(client);

        let result = server.pump().await.unwrap();
        assert_eq!(result.disconnected.len(), 1);
    }
}
