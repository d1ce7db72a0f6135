//! Network protocol message types
//!
//! Both directions are JSON objects of the form
//! `{"event": "<snake_case name>", "data": <payload>}`, length-prefixed on the
//! wire. Outbound events live in the core crate as [`ServerEvent`].

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use impostor_core::models::{RoundOverride, SettingsRequest};

pub use impostor_core::events::ServerEvent;

/// Actions a client can send
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ClientMessage {
    CreateRoom(CreateRoom),
    JoinRoom(JoinRoom),
    /// Host only
    StartGame(StartGame),
    StartDebate(RoomRef),
    VotePlayer(VotePlayer),
    LeaveRoom,
    /// Host only, from a resolved round
    ReturnToLobby(RoomRef),
    /// Keepalive; answered with `pong`
    Ping,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRoom {
    pub nickname: String,
    /// Opaque to the server; echoed in player lists
    #[serde(default, alias = "avatarConfig")]
    pub avatar: serde_json::Value,
    #[serde(default)]
    pub settings: Option<SettingsRequest>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinRoom {
    #[serde(alias = "roomId")]
    pub room_code: String,
    pub nickname: String,
    #[serde(default, alias = "avatarConfig")]
    pub avatar: serde_json::Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartGame {
    #[serde(alias = "roomId")]
    pub room_code: String,
    #[serde(default)]
    pub config: Option<RoundOverride>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomRef {
    #[serde(alias = "roomId")]
    pub room_code: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VotePlayer {
    #[serde(alias = "roomId")]
    pub room_code: String,
    #[serde(alias = "votedPlayerId")]
    pub voted_id: Uuid,
}

impl ClientMessage {
    pub fn create_room(nickname: impl Into<String>, settings: Option<SettingsRequest>) -> Self {
        ClientMessage::CreateRoom(CreateRoom {
            nickname: nickname.into(),
            avatar: serde_json::Value::Null,
            settings,
        })
    }

    pub fn join_room(room_code: impl Into<String>, nickname: impl Into<String>) -> Self {
        ClientMessage::JoinRoom(JoinRoom {
            room_code: room_code.into(),
            nickname: nickname.into(),
            avatar: serde_json::Value::Null,
        })
    }

    pub fn start_game(room_code: impl Into<String>, config: Option<RoundOverride>) -> Self {
        ClientMessage::StartGame(StartGame {
            room_code: room_code.into(),
            config,
        })
    }

    pub fn start_debate(room_code: impl Into<String>) -> Self {
        ClientMessage::StartDebate(RoomRef {
            room_code: room_code.into(),
        })
    }

    pub fn vote(room_code: impl Into<String>, voted_id: Uuid) -> Self {
        ClientMessage::VotePlayer(VotePlayer {
            room_code: room_code.into(),
            voted_id,
        })
    }

    pub fn return_to_lobby(room_code: impl Into<String>) -> Self {
        ClientMessage::ReturnToLobby(RoomRef {
            room_code: room_code.into(),
        })
    }

    /// Name used in logs
    pub fn action(&self) -> &'static str {
        match self {
            ClientMessage::CreateRoom(_) => "create_room",
            ClientMessage::JoinRoom(_) => "join_room",
            ClientMessage::StartGame(_) => "start_game",
            ClientMessage::StartDebate(_) => "start_debate",
            ClientMessage::VotePlayer(_) => "vote_player",
            ClientMessage::LeaveRoom => "leave_room",
            ClientMessage::ReturnToLobby(_) => "return_to_lobby",
            ClientMessage::Ping => "ping",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_create_room_accepts_avatar_alias() {
        let raw = json!({
            "event": "create_room",
            "data": {
                "nickname": "ana",
                "avatarConfig": {"hat": 3},
                "settings": {"maxPlayers": 6, "categories": ["ropa"]}
            }
        });
        let msg: ClientMessage = serde_json::from_value(raw).unwrap();

        let ClientMessage::CreateRoom(create) = msg else {
            panic!("Wrong message type");
        };
        assert_eq!(create.avatar["hat"], 3);
        let settings = create.settings.unwrap();
        assert_eq!(settings.max_players, Some(6));
        assert_eq!(settings.impostor_count, None);
    }

    #[test]
    fn test_join_without_avatar() {
        let raw = json!({
            "event": "join_room",
            "data": {"roomCode": "abcd", "nickname": "bea"}
        });
        let msg: ClientMessage = serde_json::from_value(raw).unwrap();
        assert_eq!(msg, ClientMessage::join_room("abcd", "bea"));
    }

    #[test]
    fn test_start_game_category_alias() {
        let raw = json!({
            "event": "start_game",
            "data": {"roomCode": "ABCD", "config": {"categoryId": "animales"}}
        });
        let msg: ClientMessage = serde_json::from_value(raw).unwrap();

        let ClientMessage::StartGame(start) = msg else {
            panic!("Wrong message type");
        };
        assert_eq!(start.config.unwrap().category.as_deref(), Some("animales"));
    }

    #[test]
    fn test_unit_actions() {
        let leave: ClientMessage = serde_json::from_str(r#"{"event":"leave_room"}"#).unwrap();
        assert_eq!(leave, ClientMessage::LeaveRoom);

        let json = serde_json::to_value(ClientMessage::Ping).unwrap();
        assert_eq!(json["event"], "ping");
    }

    #[test]
    fn test_vote_shape() {
        let id = Uuid::new_v4();
        let json = serde_json::to_value(ClientMessage::vote("ABCD", id)).unwrap();
        assert_eq!(json["event"], "vote_player");
        assert_eq!(json["data"]["votedId"], id.to_string());
    }

    #[test]
    fn test_unknown_event_rejected() {
        let result = serde_json::from_str::<ClientMessage>(r#"{"event":"dance","data":{}}"#);
        assert!(result.is_err());
    }
}
