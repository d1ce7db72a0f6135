//! Player and role models

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Transport-assigned connection identifier. Not stable across reconnection.
pub type ConnectionId = Uuid;

/// Secret role for the current round
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Impostor,
    Crew,
}

impl Role {
    pub fn is_impostor(self) -> bool {
        self == Role::Impostor
    }
}

/// A seat in a room
///
/// `name` is the durable identity. `id` is rebound whenever the player
/// reconnects, so nothing outside this struct should hold on to it.
#[derive(Debug, Clone)]
pub struct Player {
    pub id: ConnectionId,
    pub name: String,
    /// Opaque client payload, passed through untouched
    pub avatar: serde_json::Value,
    pub is_host: bool,
    pub connected: bool,
    pub role: Option<Role>,
    pub score: u32,
}

impl Player {
    pub fn new(id: ConnectionId, name: String, avatar: serde_json::Value) -> Self {
        Self {
            id,
            name,
            avatar,
            is_host: false,
            connected: true,
            role: None,
            score: 0,
        }
    }

    pub fn view(&self) -> PlayerView {
        PlayerView {
            id: self.id,
            name: self.name.clone(),
            avatar: self.avatar.clone(),
            is_host: self.is_host,
            connected: self.connected,
            score: self.score,
        }
    }
}

/// Roster entry as sent to clients
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerView {
    pub id: ConnectionId,
    pub name: String,
    #[serde(default)]
    pub avatar: serde_json::Value,
    pub is_host: bool,
    pub connected: bool,
    pub score: u32,
}
