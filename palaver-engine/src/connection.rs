//! Client-server connection management
//!
//! Owns the transport lifecycle: dialing, automatic reconnect with constant
//! backoff, outbound packet-id stamping, and routing of inbound frames to
//! the synchronization engine as [`ConnectionEvent`]s.

use std::time::Duration;

use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_util::codec::Framed;
use url::Url;
use uuid::Uuid;

use palaver_protocol::{ClientCodec, ClientCommand, ClientPacket, ServerPacket};
use palaver_utils::{PalaverError, Result};

/// Connection state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    Reconnecting,
}

/// What the connection task reports back to the engine
#[derive(Debug)]
pub enum ConnectionEvent {
    /// A connection to the server is established (also fires on reconnect)
    Up,
    /// The connection dropped; the task keeps redialing
    Down,
    /// A frame arrived
    Packet(ServerPacket),
}

/// Opening frame sent after dialing, naming the user this connection is for
#[derive(Debug, serde::Serialize, serde::Deserialize, PartialEq, Eq)]
pub struct ClientHello {
    pub user_id: Uuid,
}

/// Client connection to the chat server
pub struct Connection {
    /// Connection endpoint (tcp://host:port)
    endpoint: String,
    /// Fixed delay before the first dial
    connect_delay: Duration,
    /// Fixed delay between redials (constant backoff)
    reconnect_delay: Duration,
    /// Current state
    state: ConnectionState,
    /// Request-id counter; stamped onto every outbound frame, never reset
    next_packet_id: u64,
    /// Channel for outgoing packets
    tx: mpsc::Sender<ClientPacket>,
    /// Handle to the connection task
    task_handle: Option<tokio::task::JoinHandle<()>>,
}

impl Connection {
    /// Create a new connection (not yet connected)
    pub fn new(endpoint: String, connect_delay: Duration, reconnect_delay: Duration) -> Self {
        let (tx, _) = mpsc::channel(64);
        Self {
            endpoint,
            connect_delay,
            reconnect_delay,
            state: ConnectionState::Disconnected,
            next_packet_id: 0,
            tx,
            task_handle: None,
        }
    }

    /// Get current connection state
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Open the connection for the given user
    ///
    /// Calling while a connection exists is a no-op that logs a warning.
    /// The task dials after the configured startup delay and keeps redialing
    /// with constant backoff until [`Connection::disconnect`] is called;
    /// `events` receives `Up`/`Down` transitions and every inbound frame.
    pub fn connect(&mut self, user_id: Uuid, events: mpsc::Sender<ConnectionEvent>) -> Result<()> {
        if self.task_handle.is_some() {
            tracing::warn!("connect() called while already connected; disconnect first");
            return Ok(());
        }

        let addr = host_port(&self.endpoint)?;
        self.state = ConnectionState::Connecting;

        let (tx, rx) = mpsc::channel(64);
        self.tx = tx;

        let handle = tokio::spawn(connection_task(
            addr,
            user_id,
            self.connect_delay,
            self.reconnect_delay,
            rx,
            events,
        ));
        self.task_handle = Some(handle);
        Ok(())
    }

    /// Close the connection; safe to call when already disconnected
    pub fn disconnect(&mut self) {
        if let Some(handle) = self.task_handle.take() {
            handle.abort();
        }
        self.state = ConnectionState::Disconnected;
    }

    /// Record that the task established (or re-established) the transport
    pub fn mark_connected(&mut self) {
        self.state = ConnectionState::Connected;
    }

    /// Record that the transport dropped and the task is redialing
    pub fn mark_reconnecting(&mut self) {
        self.state = ConnectionState::Reconnecting;
    }

    /// Stamp a fresh request id onto the command and enqueue it
    ///
    /// Returns the assigned id, or `None` when not connected: the command is
    /// dropped with a log line rather than queued, so callers never need to
    /// guard connection state first.
    pub fn send(&mut self, command: ClientCommand) -> Option<u64> {
        if self.state != ConnectionState::Connected {
            tracing::warn!(
                command = command.type_name(),
                "attempt to send while disconnected; dropping"
            );
            return None;
        }

        self.next_packet_id += 1;
        let id = self.next_packet_id;
        let packet = ClientPacket { id, data: command };
        tracing::debug!(id, command = packet.data.type_name(), "sending command");

        if self.tx.try_send(packet).is_err() {
            tracing::warn!(id, "outbound queue unavailable; dropping command");
            return None;
        }
        Some(id)
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        self.disconnect();
    }
}

/// Extract `host:port` from a tcp:// endpoint
fn host_port(endpoint: &str) -> Result<String> {
    let url = Url::parse(endpoint)
        .map_err(|e| PalaverError::connection(format!("invalid endpoint '{}': {}", endpoint, e)))?;

    if url.scheme() != "tcp" {
        return Err(PalaverError::connection(format!(
            "unsupported endpoint scheme '{}'",
            url.scheme()
        )));
    }
    let host = url
        .host_str()
        .ok_or_else(|| PalaverError::connection("missing host in endpoint"))?;
    let port = url
        .port()
        .ok_or_else(|| PalaverError::connection("missing port in endpoint"))?;

    Ok(format!("{}:{}", host, port))
}

/// Background task owning the socket
///
/// Dials, identifies the user with a hello frame, then shuttles frames until
/// the stream breaks; after a fixed delay it dials again. Runs until the
/// engine drops its event receiver or aborts the task.
async fn connection_task(
    addr: String,
    user_id: Uuid,
    connect_delay: Duration,
    reconnect_delay: Duration,
    mut outgoing: mpsc::Receiver<ClientPacket>,
    events: mpsc::Sender<ConnectionEvent>,
) {
    tokio::time::sleep(connect_delay).await;

    loop {
        let stream = match TcpStream::connect(&addr).await {
            Ok(stream) => stream,
            Err(e) => {
                tracing::warn!("failed to connect to {}: {}; retrying", addr, e);
                tokio::time::sleep(reconnect_delay).await;
                continue;
            }
        };

        let mut framed = Framed::new(stream, ClientCodec::new());

        if let Err(e) = send_hello(&mut framed, user_id).await {
            tracing::warn!("failed to send hello: {}; retrying", e);
            tokio::time::sleep(reconnect_delay).await;
            continue;
        }

        tracing::info!("connected to {}", addr);
        if events.send(ConnectionEvent::Up).await.is_err() {
            return;
        }

        loop {
            tokio::select! {
                Some(packet) = outgoing.recv() => {
                    if let Err(e) = framed.send(packet).await {
                        tracing::error!("failed to send packet: {}", e);
                        break;
                    }
                }

                result = framed.next() => {
                    match result {
                        Some(Ok(packet)) => {
                            tracing::debug!(
                                packet_type = packet.data.type_name(),
                                "received server packet"
                            );
                            if events.send(ConnectionEvent::Packet(packet)).await.is_err() {
                                return;
                            }
                        }
                        Some(Err(e)) => {
                            tracing::error!("failed to decode frame: {}", e);
                            break;
                        }
                        None => {
                            tracing::info!("server closed connection");
                            break;
                        }
                    }
                }
            }
        }

        if events.send(ConnectionEvent::Down).await.is_err() {
            return;
        }
        tokio::time::sleep(reconnect_delay).await;
    }
}

/// Write the identifying hello frame
async fn send_hello(
    framed: &mut Framed<TcpStream, ClientCodec>,
    user_id: Uuid,
) -> std::io::Result<()> {
    use tokio::io::AsyncWriteExt;

    let mut line = serde_json::to_vec(&ClientHello { user_id })
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
    line.push(b'\n');
    let stream = framed.get_mut();
    stream.write_all(&line).await?;
    stream.flush().await
}
