//! Outbound delivery to live connections
//!
//! Each connection has a bounded queue drained by its writer task. Delivery
//! never blocks the orchestrator: a full or closed queue drops the event.

use std::collections::{HashMap, HashSet};

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::{debug, warn};

use impostor_core::{ConnectionId, Gateway, ServerEvent};

#[derive(Debug, Default)]
pub struct ConnectionHub {
    outbound: HashMap<ConnectionId, mpsc::Sender<ServerEvent>>,
    /// Room code -> subscribed connections
    rooms: HashMap<String, HashSet<ConnectionId>>,
}

impl ConnectionHub {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, conn: ConnectionId, tx: mpsc::Sender<ServerEvent>) {
        self.outbound.insert(conn, tx);
    }

    /// Forget a connection and any subscriptions it still holds
    pub fn deregister(&mut self, conn: ConnectionId) {
        self.outbound.remove(&conn);
        self.rooms.retain(|_, members| {
            members.remove(&conn);
            !members.is_empty()
        });
    }

    pub fn connection_count(&self) -> usize {
        self.outbound.len()
    }

    pub fn subscriber_count(&self, room: &str) -> usize {
        self.rooms.get(room).map_or(0, HashSet::len)
    }

    fn deliver(&self, conn: ConnectionId, event: ServerEvent) {
        let Some(tx) = self.outbound.get(&conn) else {
            debug!(conn = %conn, event = event.name(), "No outbound queue for connection");
            return;
        };
        match tx.try_send(event) {
            Ok(()) => {}
            Err(TrySendError::Full(event)) => {
                warn!(conn = %conn, event = event.name(), "Outbound queue full; dropping event");
            }
            Err(TrySendError::Closed(event)) => {
                debug!(conn = %conn, event = event.name(), "Connection gone; dropping event");
            }
        }
    }
}

impl Gateway for ConnectionHub {
    fn send(&mut self, conn: ConnectionId, event: ServerEvent) {
        self.deliver(conn, event);
    }

    fn broadcast(&mut self, room: &str, event: ServerEvent) {
        let Some(members) = self.rooms.get(room) else {
            return;
        };
        for conn in members {
            self.deliver(*conn, event.clone());
        }
    }

    fn subscribe(&mut self, conn: ConnectionId, room: &str) {
        self.rooms.entry(room.to_string()).or_default().insert(conn);
    }

    fn unsubscribe(&mut self, conn: ConnectionId, room: &str) {
        if let Some(members) = self.rooms.get_mut(room) {
            members.remove(&conn);
            if members.is_empty() {
                self.rooms.remove(room);
            }
        }
    }
}
