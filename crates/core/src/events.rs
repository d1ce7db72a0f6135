//! Outbound events
//!
//! Serialized as `{"event": "<name>", "data": <payload>}`.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{ConnectionId, PlayerView, Role};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ServerEvent {
    /// Sent to the creator of a room
    RoomCreated(RoomEntered),
    /// Sent to a connection that joined or rejoined a room
    RoomJoined(RoomEntered),
    /// Roster changed
    UpdatePlayers(Vec<PlayerView>),
    /// Unicast; payload differs per recipient
    GameStarted(GameStarted),
    /// Unicast to every player
    DebateStarted(DebateStarted),
    VotingResults(VotingResults),
    /// Room went back to the lobby
    RoundReset(RoundReset),
    /// User-facing rejection
    ErrorMessage(String),
    Pong,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomEntered {
    pub room_code: String,
    pub players: Vec<PlayerView>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameStarted {
    pub round_id: Uuid,
    pub round: u32,
    pub role: Role,
    /// The real word, or a masked placeholder for impostors
    pub word: String,
    pub category: String,
    pub players: Vec<PlayerView>,
    pub impostor_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DebateStarted {
    pub round_id: Uuid,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RevealedImpostor {
    /// Current connection, absent if the player has since left
    pub id: Option<ConnectionId>,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VotingResults {
    pub round_id: Uuid,
    pub impostor_caught: bool,
    pub most_voted_player: Option<PlayerView>,
    pub impostors: Vec<RevealedImpostor>,
    pub is_tie: bool,
    /// Votes received, keyed by target connection
    pub votes_detail: HashMap<ConnectionId, u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoundReset {
    pub room_code: String,
}

impl ServerEvent {
    pub fn error(message: impl Into<String>) -> Self {
        ServerEvent::ErrorMessage(message.into())
    }

    /// Event name as it appears on the wire
    pub fn name(&self) -> &'static str {
        match self {
            ServerEvent::RoomCreated(_) => "room_created",
            ServerEvent::RoomJoined(_) => "room_joined",
            ServerEvent::UpdatePlayers(_) => "update_players",
            ServerEvent::GameStarted(_) => "game_started",
            ServerEvent::DebateStarted(_) => "debate_started",
            ServerEvent::VotingResults(_) => "voting_results",
            ServerEvent::RoundReset(_) => "round_reset",
            ServerEvent::ErrorMessage(_) => "error_message",
            ServerEvent::Pong => "pong",
        }
    }
}
