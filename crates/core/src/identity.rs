//! Identity resolution
//!
//! Maps a live connection to the seat it occupies. The seat names the player
//! by nickname, which is what survives reconnection.

use std::collections::HashMap;

use crate::error::{Error, Result};
use crate::models::ConnectionId;

pub const MAX_NICKNAME_LEN: usize = 24;

/// A (room, nickname) pair
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Seat {
    pub room: String,
    pub name: String,
}

#[derive(Debug, Default)]
pub struct IdentityResolver {
    seats: HashMap<ConnectionId, Seat>,
}

impl IdentityResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seat(&mut self, conn: ConnectionId, room: &str, name: &str) {
        self.seats.insert(
            conn,
            Seat {
                room: room.to_string(),
                name: name.to_string(),
            },
        );
    }

    pub fn seat_of(&self, conn: ConnectionId) -> Option<&Seat> {
        self.seats.get(&conn)
    }

    /// Resolve a connection that claims to act in `room`
    pub fn resolve(&self, conn: ConnectionId, room: &str) -> Result<&Seat> {
        self.seats
            .get(&conn)
            .filter(|seat| seat.room == room)
            .ok_or(Error::UnknownConnection)
    }

    pub fn release(&mut self, conn: ConnectionId) -> Option<Seat> {
        self.seats.remove(&conn)
    }

    /// Drop every seat in a room; returns how many were dropped
    pub fn release_room(&mut self, room: &str) -> usize {
        let before = self.seats.len();
        self.seats.retain(|_, seat| seat.room != room);
        before - self.seats.len()
    }

    pub fn len(&self) -> usize {
        self.seats.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seats.is_empty()
    }
}

/// Trim and validate a nickname
pub fn normalize_nickname(raw: &str) -> Result<String> {
    let name = raw.trim();
    if name.is_empty() {
        return Err(Error::InvalidNickname("nickname is empty".into()));
    }
    if name.chars().count() > MAX_NICKNAME_LEN {
        return Err(Error::InvalidNickname(format!(
            "nickname is longer than {} characters",
            MAX_NICKNAME_LEN
        )));
    }
    Ok(name.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_resolve_checks_room() {
        let mut ids = IdentityResolver::new();
        let conn = Uuid::new_v4();
        ids.seat(conn, "ABCD", "ana");

        assert_eq!(ids.resolve(conn, "ABCD").unwrap().name, "ana");
        assert!(matches!(
            ids.resolve(conn, "WXYZ"),
            Err(Error::UnknownConnection)
        ));
        assert!(ids.resolve(Uuid::new_v4(), "ABCD").is_err());
    }

    #[test]
    fn test_release_room() {
        let mut ids = IdentityResolver::new();
        ids.seat(Uuid::new_v4(), "ABCD", "ana");
        ids.seat(Uuid::new_v4(), "ABCD", "bea");
        ids.seat(Uuid::new_v4(), "WXYZ", "caro");

        assert_eq!(ids.release_room("ABCD"), 2);
        assert_eq!(ids.len(), 1);
    }

    #[test]
    fn test_nickname_rules() {
        assert_eq!(normalize_nickname("  ana ").unwrap(), "ana");
        assert!(normalize_nickname("   ").is_err());
        assert!(normalize_nickname(&"x".repeat(MAX_NICKNAME_LEN + 1)).is_err());
        assert!(normalize_nickname(&"ñ".repeat(MAX_NICKNAME_LEN)).is_ok());
    }
}
