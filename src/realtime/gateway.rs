use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, RwLock};
use tracing::{debug, info, warn};

use super::{ClientEvent, ServerEvent};

pub type ConnectionId = u64;

/// Events queued per connection before further deliveries to it are dropped.
pub const OUTBOX_CAPACITY: usize = 32;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum GatewayError {
    #[error("Unknown connection: {0}")]
    UnknownConnection(ConnectionId),

    #[error("Gateway is shut down")]
    ShutDown,
}

struct Connection {
    outbox: mpsc::Sender<ServerEvent>,
    rooms: HashSet<String>,
}

#[derive(Default)]
struct Registry {
    connections: HashMap<ConnectionId, Connection>,
    rooms: HashMap<String, HashSet<ConnectionId>>,
    closed: bool,
}

/// Room registry owned by the running server.
///
/// Each connection gets a bounded outbox; relays push into the outboxes of
/// every member of a room while holding the read lock, so one caller's relays
/// reach a given connection in call order. A connection whose outbox is full
/// misses the event.
#[derive(Clone, Default)]
pub struct Gateway {
    registry: Arc<RwLock<Registry>>,
    next_id: Arc<AtomicU64>,
}

impl Gateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a connection and return its id with the receiving end of its outbox.
    pub async fn connect(&self) -> Result<(ConnectionId, mpsc::Receiver<ServerEvent>), GatewayError> {
        let (outbox, inbox) = mpsc::channel(OUTBOX_CAPACITY);
        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;

        let mut registry = self.registry.write().await;
        if registry.closed {
            return Err(GatewayError::ShutDown);
        }
        registry.connections.insert(
            id,
            Connection {
                outbox,
                rooms: HashSet::new(),
            },
        );

        debug!("Connection {} registered", id);
        Ok((id, inbox))
    }

    /// Add the connection to a room. Joining twice is a no-op; returns whether
    /// the connection was newly added.
    pub async fn join(&self, connection: ConnectionId, room: &str) -> Result<bool, GatewayError> {
        let mut registry = self.registry.write().await;
        let Registry {
            connections, rooms, ..
        } = &mut *registry;

        let conn = connections
            .get_mut(&connection)
            .ok_or(GatewayError::UnknownConnection(connection))?;

        let added = conn.rooms.insert(room.to_string());
        rooms.entry(room.to_string()).or_default().insert(connection);

        if added {
            info!("Connection {} joined room {}", connection, room);
        }
        Ok(added)
    }

    /// Deliver `message` to every connection currently in the room, the
    /// sender included. Returns how many connections accepted it.
    pub async fn relay(&self, room: &str, message: Value) -> usize {
        let registry = self.registry.read().await;
        let Some(members) = registry.rooms.get(room) else {
            return 0;
        };

        let mut reached = 0;
        for id in members {
            let Some(conn) = registry.connections.get(id) else {
                continue;
            };
            if deliver(*id, &conn.outbox, ServerEvent::ReceiveMessage(message.clone())) {
                reached += 1;
            }
        }

        debug!("Relayed message to {} connection(s) in room {}", reached, room);
        reached
    }

    /// Push an event to a single connection.
    pub async fn send_to(&self, connection: ConnectionId, event: ServerEvent) -> Result<(), GatewayError> {
        let registry = self.registry.read().await;
        let conn = registry
            .connections
            .get(&connection)
            .ok_or(GatewayError::UnknownConnection(connection))?;
        deliver(connection, &conn.outbox, event);
        Ok(())
    }

    /// Remove the connection from all of its rooms, dropping rooms left empty.
    pub async fn disconnect(&self, connection: ConnectionId) {
        let mut registry = self.registry.write().await;
        let Some(conn) = registry.connections.remove(&connection) else {
            return;
        };

        for room in conn.rooms {
            if let Some(members) = registry.rooms.get_mut(&room) {
                members.remove(&connection);
                if members.is_empty() {
                    registry.rooms.remove(&room);
                }
            }
        }

        info!("Connection {} disconnected", connection);
    }

    /// Handle one text frame from a client.
    pub async fn handle_frame(&self, connection: ConnectionId, text: &str) {
        let event = match serde_json::from_str::<ClientEvent>(text) {
            Ok(event) => event,
            Err(e) => {
                warn!("Connection {} sent an unparseable frame: {}", connection, e);
                let _ = self
                    .send_to(connection, ServerEvent::error(format!("Invalid frame: {}", e)))
                    .await;
                return;
            }
        };

        match event {
            ClientEvent::JoinRoom(room) => {
                if let Err(e) = self.join(connection, &room).await {
                    warn!("Join failed for connection {}: {}", connection, e);
                }
            }
            ClientEvent::SendMessage(outgoing) => {
                self.relay(&outgoing.conversation_id, outgoing.message).await;
            }
        }
    }

    /// Drop every connection and room. Dropped outboxes end the socket tasks.
    pub async fn shutdown(&self) {
        let mut registry = self.registry.write().await;
        let count = registry.connections.len();
        registry.connections.clear();
        registry.rooms.clear();
        registry.closed = true;
        info!("Realtime gateway shut down ({} connection(s) dropped)", count);
    }

    pub async fn connection_count(&self) -> usize {
        self.registry.read().await.connections.len()
    }

    pub async fn room_size(&self, room: &str) -> usize {
        self.registry
            .read()
            .await
            .rooms
            .get(room)
            .map(HashSet::len)
            .unwrap_or(0)
    }
}

/// Queue an event without waiting. A full or closed outbox drops it.
fn deliver(connection: ConnectionId, outbox: &mpsc::Sender<ServerEvent>, event: ServerEvent) -> bool {
    match outbox.try_send(event) {
        Ok(()) => true,
        Err(TrySendError::Full(_)) => {
            warn!("Outbox full for connection {}, dropping event", connection);
            false
        }
        // The socket is already going away
        Err(TrySendError::Closed(_)) => false,
    }
}
