//! Developer guardrails and invariants
//!
//! Debug assertions for detecting impossible room states during development.
//! These checks are compiled out in release builds.

use std::collections::HashSet;

use crate::game::{impostor_quota, Phase, Room};
use crate::registry::RoomRegistry;

/// Validate that a room's state is internally consistent
pub fn assert_room_invariants(room: &Room) {
    let players = room.players();

    // A live room is never empty
    debug_assert!(!players.is_empty(), "Room {} exists with no players", room.code());

    let host_count = players.iter().filter(|p| p.is_host).count();
    debug_assert!(
        host_count == 1,
        "Room {} has {} hosts, expected exactly 1",
        room.code(),
        host_count
    );

    let names: HashSet<&str> = players.iter().map(|p| p.name.as_str()).collect();
    debug_assert!(
        names.len() == players.len(),
        "Room {} has duplicate nicknames",
        room.code()
    );

    let ids: HashSet<_> = players.iter().map(|p| p.id).collect();
    debug_assert!(
        ids.len() == players.len(),
        "Room {} has duplicate connection ids",
        room.code()
    );

    debug_assert!(
        room.phase() == Phase::Lobby || room.round().is_some(),
        "Room {} is in phase {} without a round",
        room.code(),
        room.phase()
    );

    if let Some(round) = room.round() {
        let resolved = room.phase() == Phase::Resolved;
        debug_assert!(
            room.phase() == Phase::Lobby || round.is_resolved() == resolved,
            "Room {} is in phase {} with a round that does not match",
            room.code(),
            room.phase()
        );
    }

    for (voter, target) in room.ballot_names() {
        debug_assert!(
            room.player_named(voter).is_some() && room.player_named(target).is_some(),
            "Room {} has a ballot referencing a missing player",
            room.code()
        );
    }
}

/// Validate impostor selection at round start
pub fn assert_round_start_invariants(room: &Room) {
    let Some(round) = room.round() else {
        return;
    };
    let count = round.impostor_count();

    debug_assert!(count >= 1, "Room {} started a round with no impostor", room.code());
    debug_assert!(
        count <= impostor_quota(usize::MAX, room.players().len()),
        "Room {} has {} impostors for {} players",
        room.code(),
        count,
        room.players().len()
    );
    debug_assert!(
        round.impostors.iter().all(|n| room.player_named(n).is_some()),
        "Room {} picked an impostor outside the roster",
        room.code()
    );
}

/// Validate a registry entry after a handler finished with it
pub fn assert_registry_invariants(registry: &RoomRegistry, code: &str) {
    if let Some(room) = registry.get(code) {
        debug_assert!(
            room.code() == code,
            "Room stored under {} reports code {}",
            code,
            room.code()
        );
        assert_room_invariants(room);
    }
}
