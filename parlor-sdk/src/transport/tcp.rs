//! TCP realization of the event transport: each frame is a big-endian
//! `u32` byte length followed by that many bytes of `bincode`-encoded
//! event. Resolves the open question of how `DataPacket`'s wire form
//! interacts with framing — it doesn't need to, since the event enum
//! (and the `DataPacket`s nested inside it) round-trip through one
//! `bincode` call per frame.

use {
    super::{ClientTransport, ConnectionId, PumpResult, ServerTransport, TransportError},
    crate::events::{ClientEvent, ServerEvent},
    async_trait::async_trait,
    std::{
        collections::HashMap,
        sync::{
            atomic::{AtomicBool, AtomicU64, Ordering},
            Arc,
        },
    },
    tokio::{
        io::{AsyncReadExt, AsyncWriteExt},
        net::{
            tcp::{OwnedReadHalf, OwnedWriteHalf},
            TcpListener, TcpStream, ToSocketAddrs,
        },
        sync::mpsc,
    },
};

const MAX_FRAME_LEN: u32 = 16 * 1024 * 1024;

async fn write_frame(writer: &mut OwnedWriteHalf, bytes: &[u8]) -> Result<(), TransportError> {
    writer.write_all(&(bytes.len() as u32).to_be_bytes()).await?;
    writer.write_all(bytes).await?;
    writer.flush().await?;
    Ok(())
}

/// Reads one frame. `Ok(None)` means clean EOF (peer closed its write side).
async fn read_frame(reader: &mut OwnedReadHalf) -> Result<Option<Vec<u8>>, TransportError> {
    let mut len_buf = [0u8; 4];
    if let Err(e) = reader.read_exact(&mut len_buf).await {
        return if e.kind() == std::io::ErrorKind::UnexpectedEof { Ok(None) } else { Err(e.into()) };
    }
    let len = u32::from_be_bytes(len_buf);
    if len > MAX_FRAME_LEN {
        return Err(TransportError::Codec(format!("frame of {len} bytes exceeds limit")));
    }
    let mut body = vec![0u8; len as usize];
    reader.read_exact(&mut body).await?;
    Ok(Some(body))
}

enum ServerRawMsg {
    Connected(ConnectionId, mpsc::UnboundedSender<ServerEvent>),
    Event(ConnectionId, ClientEvent),
    Disconnected(ConnectionId),
}

pub struct TcpServerTransport {
    incoming_rx: mpsc::UnboundedReceiver<ServerRawMsg>,
    writers: HashMap<ConnectionId, mpsc::UnboundedSender<ServerEvent>>,
}

impl TcpServerTransport {
    pub async fn bind(addr: impl ToSocketAddrs) -> Result<Self, TransportError> {
        let listener = TcpListener::bind(addr).await?;
        let (tx, rx) = mpsc::unbounded_channel();
        let next_id = Arc::new(AtomicU64::new(1));

        tokio::spawn(async move {
            loop {
                let (stream, peer) = match listener.accept().await {
                    Ok(pair) => pair,
                    Err(_) => break,
                };
                let id = ConnectionId(next_id.fetch_add(1, Ordering::SeqCst));
                log::debug!("accepted connection {id:?} from {peer}");
                let (read_half, write_half) = stream.into_split();
                let (wtx, wrx) = mpsc::unbounded_channel::<ServerEvent>();

                if tx.send(ServerRawMsg::Connected(id, wtx)).is_err() {
                    break;
                }
                spawn_server_writer(write_half, wrx);
                spawn_server_reader(id, read_half, tx.clone());
            }
        });

        Ok(Self { incoming_rx: rx, writers: HashMap::new() })
    }

    fn apply(&mut self, msg: ServerRawMsg, result: &mut PumpResult) {
        match msg {
            ServerRawMsg::Connected(id, sender) => {
                self.writers.insert(id, sender);
                result.newly_connected.push(id);
            }
            ServerRawMsg::Event(id, event) => result.events.push((id, event)),
            ServerRawMsg::Disconnected(id) => {
                self.writers.remove(&id);
                result.disconnected.push(id);
            }
        }
    }
}

#[async_trait]
impl ServerTransport for TcpServerTransport {
    async fn pump(&mut self) -> Result<PumpResult, TransportError> {
        let mut result = PumpResult::default();
        match self.incoming_rx.recv().await {
            Some(msg) => self.apply(msg, &mut result),
            None => return Err(TransportError::Closed),
        }
        while let Ok(msg) = self.incoming_rx.try_recv() {
            self.apply(msg, &mut result);
        }
        Ok(result)
    }

    async fn send(&mut self, conn: ConnectionId, event: ServerEvent) -> Result<(), TransportError> {
        if let Some(sender) = self.writers.get(&conn) {
            // Disconnects are discovered through the reader task, not here;
            // a send racing a disconnect is simply dropped.
            let _ = sender.send(event);
        }
        Ok(())
    }
}

fn spawn_server_writer(mut write_half: OwnedWriteHalf, mut rx: mpsc::UnboundedReceiver<ServerEvent>) {
    tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            let Ok(bytes) = bincode::serialize(&event) else { continue };
            if write_frame(&mut write_half, &bytes).await.is_err() {
                break;
            }
        }
    });
}

fn spawn_server_reader(id: ConnectionId, mut read_half: OwnedReadHalf, tx: mpsc::UnboundedSender<ServerRawMsg>) {
    tokio::spawn(async move {
        loop {
            match read_frame(&mut read_half).await {
                Ok(Some(bytes)) => match bincode::deserialize::<ClientEvent>(&bytes) {
                    Ok(event) => {
                        if tx.send(ServerRawMsg::Event(id, event)).is_err() {
                            break;
                        }
                    }
                    Err(_) => continue,
                },
                Ok(None) | Err(_) => {
                    log::debug!("connection {id:?} disconnected");
                    let _ = tx.send(ServerRawMsg::Disconnected(id));
                    break;
                }
            }
        }
    });
}

enum ClientRawMsg {
    Event(ServerEvent),
    Disconnected,
}

pub struct TcpClientTransport {
    incoming_rx: mpsc::UnboundedReceiver<ClientRawMsg>,
    write_tx: mpsc::UnboundedSender<ClientEvent>,
    connected: Arc<AtomicBool>,
}

impl TcpClientTransport {
    pub async fn connect(addr: impl ToSocketAddrs) -> Result<Self, TransportError> {
        let stream = TcpStream::connect(addr).await?;
        let (read_half, mut write_half) = stream.into_split();
        let (in_tx, in_rx) = mpsc::unbounded_channel();
        let (out_tx, mut out_rx) = mpsc::unbounded_channel::<ClientEvent>();
        let connected = Arc::new(AtomicBool::new(true));

        let reader_connected = connected.clone();
        tokio::spawn(async move {
            let mut read_half = read_half;
            loop {
                match read_frame(&mut read_half).await {
                    Ok(Some(bytes)) => match bincode::deserialize::<ServerEvent>(&bytes) {
                        Ok(event) => {
                            if in_tx.send(ClientRawMsg::Event(event)).is_err() {
                                break;
                            }
                        }
                        Err(_) => continue,
                    },
                    Ok(None) | Err(_) => {
                        reader_connected.store(false, Ordering::SeqCst);
                        let _ = in_tx.send(ClientRawMsg::Disconnected);
                        break;
                    }
                }
            }
        });

        tokio::spawn(async move {
            while let Some(event) = out_rx.recv().await {
                let Ok(bytes) = bincode::serialize(&event) else { continue };
                if write_frame(&mut write_half, &bytes).await.is_err() {
                    break;
                }
            }
        });

        Ok(Self { incoming_rx: in_rx, write_tx: out_tx, connected })
    }
}

#[async_trait]
impl ClientTransport for TcpClientTransport {
    async fn pump(&mut self) -> Result<(Vec<ServerEvent>, bool), TransportError> {
        let mut events = Vec::new();
        while let Ok(msg) = self.incoming_rx.try_recv() {
            match msg {
                ClientRawMsg::Event(event) => events.push(event),
                ClientRawMsg::Disconnected => self.connected.store(false, Ordering::SeqCst),
            }
        }
        Ok((events, self.connected.load(Ordering::SeqCst)))
    }

    async fn send(&mut self, event: ClientEvent) -> Result<(), TransportError> {
        self.write_tx.send(event).map_err(|_| TransportError::Closed)
    }
}
