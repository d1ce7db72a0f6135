//! Presence and reconnection
//!
//! Every connection loss mints a fresh [`LossToken`] and arms a grace timer
//! for it. Only the token currently recorded for a (room, player) pair can
//! remove that player; reconnecting clears the record and cancels the timer,
//! so a timer that fires late finds nothing to act on.

use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Identifies one connection-loss event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LossToken(u64);

impl fmt::Display for LossToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "loss#{}", self.0)
    }
}

/// Cancellable one-shot timers, provided by the runtime.
///
/// When a timer fires the runtime must hand `(room, token)` back to
/// [`Orchestrator::grace_expired`](crate::Orchestrator::grace_expired).
pub trait GraceTimers {
    fn arm(&mut self, room: &str, token: LossToken, after: Duration);
    fn cancel(&mut self, room: &str, token: LossToken);
}

#[derive(Debug, Clone)]
struct PendingLoss {
    room: String,
    name: String,
}

/// Tracks disconnected players waiting out their grace period
#[derive(Debug)]
pub struct PresenceManager {
    grace: Duration,
    next_token: u64,
    pending: HashMap<LossToken, PendingLoss>,
}

impl PresenceManager {
    pub fn new(grace: Duration) -> Self {
        Self {
            grace,
            next_token: 1,
            pending: HashMap::new(),
        }
    }

    pub fn grace_period(&self) -> Duration {
        self.grace
    }

    /// A zero grace period removes disconnected players immediately
    pub fn is_immediate(&self) -> bool {
        self.grace.is_zero()
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    fn token_for(&self, room: &str, name: &str) -> Option<LossToken> {
        self.pending
            .iter()
            .find(|(_, p)| p.room == room && p.name == name)
            .map(|(token, _)| *token)
    }

    /// Record a connection loss and arm its timer
    pub fn connection_lost(
        &mut self,
        room: &str,
        name: &str,
        timers: &mut impl GraceTimers,
    ) -> LossToken {
        // A second loss for the same seat supersedes the first
        if let Some(stale) = self.token_for(room, name) {
            self.pending.remove(&stale);
            timers.cancel(room, stale);
        }

        let token = LossToken(self.next_token);
        self.next_token += 1;
        self.pending.insert(
            token,
            PendingLoss {
                room: room.to_string(),
                name: name.to_string(),
            },
        );
        timers.arm(room, token, self.grace);
        token
    }

    /// Discard the pending loss for a seat that came back
    pub fn reconnected(
        &mut self,
        room: &str,
        name: &str,
        timers: &mut impl GraceTimers,
    ) -> Option<LossToken> {
        let token = self.token_for(room, name)?;
        self.pending.remove(&token);
        timers.cancel(room, token);
        Some(token)
    }

    /// A timer fired. Returns the player to remove, or `None` if the token
    /// is no longer current.
    pub fn expired(&mut self, room: &str, token: LossToken) -> Option<String> {
        match self.pending.get(&token) {
            Some(pending) if pending.room == room => {
                self.pending.remove(&token).map(|p| p.name)
            }
            _ => None,
        }
    }

    /// Cancel everything pending for a room that is going away
    pub fn forget_room(&mut self, room: &str, timers: &mut impl GraceTimers) -> usize {
        let tokens: Vec<LossToken> = self
            .pending
            .iter()
            .filter(|(_, p)| p.room == room)
            .map(|(token, _)| *token)
            .collect();
        for token in &tokens {
            self.pending.remove(token);
            timers.cancel(room, *token);
        }
        tokens.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Timers {
        armed: Vec<(String, LossToken)>,
        cancelled: Vec<(String, LossToken)>,
    }

    impl GraceTimers for Timers {
        fn arm(&mut self, room: &str, token: LossToken, _after: Duration) {
            self.armed.push((room.to_string(), token));
        }

        fn cancel(&mut self, room: &str, token: LossToken) {
            self.cancelled.push((room.to_string(), token));
        }
    }

    #[test]
    fn test_expiry_removes_once() {
        let mut presence = PresenceManager::new(Duration::from_secs(30));
        let mut timers = Timers::default();

        let token = presence.connection_lost("ABCD", "ana", &mut timers);
        assert_eq!(timers.armed, vec![("ABCD".to_string(), token)]);

        assert_eq!(presence.expired("ABCD", token).as_deref(), Some("ana"));
        assert_eq!(presence.expired("ABCD", token), None);
    }

    #[test]
    fn test_reconnect_invalidates_token() {
        let mut presence = PresenceManager::new(Duration::from_secs(30));
        let mut timers = Timers::default();

        let token = presence.connection_lost("ABCD", "ana", &mut timers);
        assert_eq!(presence.reconnected("ABCD", "ana", &mut timers), Some(token));
        assert_eq!(timers.cancelled, vec![("ABCD".to_string(), token)]);
        assert_eq!(presence.expired("ABCD", token), None);
    }

    #[test]
    fn test_superseded_loss_cannot_fire() {
        let mut presence = PresenceManager::new(Duration::from_secs(30));
        let mut timers = Timers::default();

        let first = presence.connection_lost("ABCD", "ana", &mut timers);
        presence.reconnected("ABCD", "ana", &mut timers);
        let second = presence.connection_lost("ABCD", "ana", &mut timers);

        assert_ne!(first, second);
        assert_eq!(presence.expired("ABCD", first), None);
        assert_eq!(presence.expired("ABCD", second).as_deref(), Some("ana"));
    }

    #[test]
    fn test_token_bound_to_room() {
        let mut presence = PresenceManager::new(Duration::from_secs(30));
        let mut timers = Timers::default();

        let token = presence.connection_lost("ABCD", "ana", &mut timers);
        assert_eq!(presence.expired("WXYZ", token), None);
        assert_eq!(presence.pending_count(), 1);
    }

    #[test]
    fn test_forget_room() {
        let mut presence = PresenceManager::new(Duration::from_secs(30));
        let mut timers = Timers::default();

        presence.connection_lost("ABCD", "ana", &mut timers);
        presence.connection_lost("ABCD", "bea", &mut timers);
        presence.connection_lost("WXYZ", "caro", &mut timers);

        assert_eq!(presence.forget_room("ABCD", &mut timers), 2);
        assert_eq!(presence.pending_count(), 1);
        assert_eq!(timers.cancelled.len(), 2);
    }
}
