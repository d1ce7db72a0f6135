//! Orchestrator - routes player actions and presence events to rooms
//!
//! Owns the room registry, the identity resolver and the presence manager.
//! Every handler runs to completion before the next one starts; the runtime
//! must serialize calls (one owner task, or a lock around the orchestrator).
//!
//! Handlers never return errors. User-facing rejections are sent back to the
//! originating connection as `error_message`; everything else is logged and
//! dropped.

use chrono::Utc;
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::GameRules;
use crate::dictionary::Dictionary;
use crate::error::{Error, ErrorKind, Result};
use crate::events::{DebateStarted, RoomEntered, RoundReset, ServerEvent};
use crate::game::{Admission, Phase, Room};
use crate::gateway::Effects;
use crate::identity::{normalize_nickname, IdentityResolver, Seat};
use crate::invariants;
use crate::models::{ConnectionId, RoundOverride, SettingsRequest};
use crate::presence::{LossToken, PresenceManager};
use crate::registry::{normalize_code, RoomRegistry};

pub struct Orchestrator {
    registry: RoomRegistry,
    identities: IdentityResolver,
    presence: PresenceManager,
    rules: GameRules,
    dictionary: Box<dyn Dictionary>,
    rng: StdRng,
}

impl Orchestrator {
    pub fn new(rules: GameRules, dictionary: Box<dyn Dictionary>) -> Self {
        Self::with_rng(rules, dictionary, StdRng::from_entropy())
    }

    /// Construct with a caller-supplied RNG (seeded in tests)
    pub fn with_rng(rules: GameRules, dictionary: Box<dyn Dictionary>, rng: StdRng) -> Self {
        Self {
            registry: RoomRegistry::new(rules.room_code_length),
            identities: IdentityResolver::new(),
            presence: PresenceManager::new(rules.grace_period),
            rules,
            dictionary,
            rng,
        }
    }

    pub fn rules(&self) -> &GameRules {
        &self.rules
    }

    pub fn registry(&self) -> &RoomRegistry {
        &self.registry
    }

    pub fn room(&self, code: &str) -> Option<&Room> {
        self.registry.get(&normalize_code(code))
    }

    pub fn seat_of(&self, conn: ConnectionId) -> Option<&Seat> {
        self.identities.seat_of(conn)
    }

    pub fn presence(&self) -> &PresenceManager {
        &self.presence
    }

    // ---- inbound actions ----

    pub fn create_room<E: Effects>(
        &mut self,
        fx: &mut E,
        conn: ConnectionId,
        nickname: &str,
        avatar: serde_json::Value,
        settings: Option<SettingsRequest>,
    ) {
        let result = self.try_create_room(fx, conn, nickname, avatar, settings);
        settle(fx, conn, "create_room", result);
    }

    pub fn join_room<E: Effects>(
        &mut self,
        fx: &mut E,
        conn: ConnectionId,
        code: &str,
        nickname: &str,
        avatar: serde_json::Value,
    ) {
        let result = self.try_join_room(fx, conn, code, nickname, avatar);
        settle(fx, conn, "join_room", result);
    }

    pub fn start_game<E: Effects>(
        &mut self,
        fx: &mut E,
        conn: ConnectionId,
        code: &str,
        overrides: Option<RoundOverride>,
    ) {
        let result = self.try_start_game(fx, conn, code, overrides);
        settle(fx, conn, "start_game", result);
    }

    pub fn start_debate<E: Effects>(&mut self, fx: &mut E, conn: ConnectionId, code: &str) {
        let result = self.try_start_debate(fx, conn, code);
        settle(fx, conn, "start_debate", result);
    }

    pub fn vote<E: Effects>(&mut self, fx: &mut E, conn: ConnectionId, code: &str, voted: Uuid) {
        let result = self.try_vote(fx, conn, code, voted);
        settle(fx, conn, "vote_player", result);
    }

    pub fn return_to_lobby<E: Effects>(&mut self, fx: &mut E, conn: ConnectionId, code: &str) {
        let result = self.try_return_to_lobby(fx, conn, code);
        settle(fx, conn, "return_to_lobby", result);
    }

    /// Voluntary exit: no grace period
    pub fn leave_room<E: Effects>(&mut self, fx: &mut E, conn: ConnectionId) {
        let result = match self.identities.release(conn) {
            Some(seat) => {
                fx.unsubscribe(conn, &seat.room);
                info!(room = %seat.room, player = %seat.name, "Player left");
                self.remove_seat(fx, &seat.room, &seat.name)
            }
            None => Err(Error::UnknownConnection),
        };
        settle(fx, conn, "leave_room", result);
    }

    // ---- presence ----

    /// The transport lost a connection
    pub fn connection_closed<E: Effects>(&mut self, fx: &mut E, conn: ConnectionId) {
        let Some(seat) = self.identities.release(conn) else {
            debug!(conn = %conn, "Unseated connection closed");
            return;
        };
        fx.unsubscribe(conn, &seat.room);

        let result = if self.presence.is_immediate() {
            info!(room = %seat.room, player = %seat.name, "Player disconnected; removing");
            self.remove_seat(fx, &seat.room, &seat.name)
        } else {
            self.hold_seat(fx, &seat)
        };
        if let Err(e) = result {
            warn!(conn = %conn, room = %seat.room, error = %e, "Disconnect cleanup failed");
        }
    }

    /// A grace timer fired
    pub fn grace_expired<E: Effects>(&mut self, fx: &mut E, code: &str, token: LossToken) {
        let Some(name) = self.presence.expired(code, token) else {
            debug!(room = %code, token = %token, "Ignoring stale grace timer");
            return;
        };
        let still_gone = self
            .registry
            .get(code)
            .is_some_and(|room| room.is_disconnected(&name));
        if !still_gone {
            debug!(room = %code, player = %name, "Grace timer fired for a present player");
            return;
        }

        info!(room = %code, player = %name, "Grace period expired; removing player");
        if let Err(e) = self.remove_seat(fx, code, &name) {
            warn!(room = %code, player = %name, error = %e, "Grace removal failed");
        }
    }

    // ---- handlers ----

    fn try_create_room<E: Effects>(
        &mut self,
        fx: &mut E,
        conn: ConnectionId,
        nickname: &str,
        avatar: serde_json::Value,
        settings: Option<SettingsRequest>,
    ) -> Result<()> {
        self.ensure_unseated(conn)?;
        let name = normalize_nickname(nickname)?;

        let known = self.dictionary.categories();
        let settings = self
            .rules
            .room_defaults
            .merged(&settings.unwrap_or_default())
            .normalized(&known);
        let code = self.registry.create(settings, &mut self.rng)?;

        let room = self.registry.require(&code)?;
        if let Err(e) = room.admit(conn, name.clone(), avatar) {
            self.registry.destroy(&code);
            return Err(e);
        }
        let players = room.roster();

        self.identities.seat(conn, &code, &name);
        fx.subscribe(conn, &code);
        fx.send(
            conn,
            ServerEvent::RoomCreated(RoomEntered {
                room_code: code.clone(),
                players,
            }),
        );

        info!(room = %code, host = %name, "Room created");
        invariants::assert_registry_invariants(&self.registry, &code);
        Ok(())
    }

    fn try_join_room<E: Effects>(
        &mut self,
        fx: &mut E,
        conn: ConnectionId,
        code: &str,
        nickname: &str,
        avatar: serde_json::Value,
    ) -> Result<()> {
        self.ensure_unseated(conn)?;
        let code = normalize_code(code);
        let name = normalize_nickname(nickname)?;

        let room = self.registry.require(&code)?;
        let admission = room.admit(conn, name.clone(), avatar)?;
        let players = room.roster();

        self.identities.seat(conn, &code, &name);
        fx.subscribe(conn, &code);

        match admission {
            Admission::Joined { .. } => {
                info!(room = %code, player = %name, "Player joined");
            }
            Admission::Rejoined { previous } => {
                let token = self.presence.reconnected(&code, &name, fx);
                info!(
                    room = %code,
                    player = %name,
                    previous = %previous,
                    cancelled = ?token,
                    "Player reconnected"
                );
            }
        }

        fx.broadcast(&code, ServerEvent::UpdatePlayers(players.clone()));
        fx.send(
            conn,
            ServerEvent::RoomJoined(RoomEntered {
                room_code: code.clone(),
                players,
            }),
        );
        if let Admission::Rejoined { .. } = admission {
            self.resync(fx, &code, conn);
        }

        invariants::assert_registry_invariants(&self.registry, &code);
        Ok(())
    }

    /// Replay the current round to a player who just came back
    fn resync<E: Effects>(&self, fx: &mut E, code: &str, conn: ConnectionId) {
        let Some(room) = self.registry.get(code) else {
            return;
        };
        if let Some(view) = room.game_started_for(conn) {
            fx.send(conn, ServerEvent::GameStarted(view));
        }
        match room.phase() {
            Phase::Debate => {
                if let Some(round) = room.round() {
                    fx.send(
                        conn,
                        ServerEvent::DebateStarted(DebateStarted { round_id: round.id }),
                    );
                }
            }
            Phase::Resolved => {
                if let Some(results) = room.results() {
                    fx.send(conn, ServerEvent::VotingResults(results));
                }
            }
            Phase::Lobby | Phase::Active => {}
        }
    }

    fn try_start_game<E: Effects>(
        &mut self,
        fx: &mut E,
        conn: ConnectionId,
        code: &str,
        overrides: Option<RoundOverride>,
    ) -> Result<()> {
        let code = normalize_code(code);
        self.identities.resolve(conn, &code)?;

        let known = self.dictionary.categories();
        let room = self
            .registry
            .get_mut(&code)
            .ok_or(Error::UnknownConnection)?;
        let settings = overrides.map(|o| room.settings().overridden(&o).normalized(&known));

        let round = room.start_game(conn, settings, self.dictionary.as_ref(), &mut self.rng)?;
        let number = round.number;
        let category = round.category.clone();
        let impostors = round.impostors.clone();

        info!(
            room = %code,
            round = number,
            category = %category,
            players = room.players().len(),
            impostors = impostors.len(),
            "Round started"
        );
        debug!(room = %code, impostors = ?impostors, "Impostors assigned");

        for player in room.players().iter().filter(|p| p.connected) {
            if let Some(view) = room.game_started_for(player.id) {
                fx.send(player.id, ServerEvent::GameStarted(view));
            }
        }

        invariants::assert_round_start_invariants(room);
        invariants::assert_room_invariants(room);
        Ok(())
    }

    fn try_start_debate<E: Effects>(
        &mut self,
        fx: &mut E,
        conn: ConnectionId,
        code: &str,
    ) -> Result<()> {
        let code = normalize_code(code);
        self.identities.resolve(conn, &code)?;
        let room = self
            .registry
            .get_mut(&code)
            .ok_or(Error::UnknownConnection)?;

        let round_id = room.start_debate(conn)?;
        // Unicast so recently reconnected players get it too
        for player in room.players().iter().filter(|p| p.connected) {
            fx.send(player.id, ServerEvent::DebateStarted(DebateStarted { round_id }));
        }

        info!(room = %code, round_id = %round_id, "Debate started");
        Ok(())
    }

    fn try_vote<E: Effects>(
        &mut self,
        fx: &mut E,
        conn: ConnectionId,
        code: &str,
        voted: Uuid,
    ) -> Result<()> {
        let code = normalize_code(code);
        self.identities.resolve(conn, &code)?;
        let room = self
            .registry
            .get_mut(&code)
            .ok_or(Error::UnknownConnection)?;

        let resolved = room.cast_vote(conn, voted)?;
        debug!(
            room = %code,
            ballots = room.ballots().len(),
            connected = room.connected_count(),
            "Vote recorded"
        );

        if resolved {
            self.announce_results(fx, &code);
        }
        Ok(())
    }

    fn try_return_to_lobby<E: Effects>(
        &mut self,
        fx: &mut E,
        conn: ConnectionId,
        code: &str,
    ) -> Result<()> {
        let code = normalize_code(code);
        self.identities.resolve(conn, &code)?;
        let room = self
            .registry
            .get_mut(&code)
            .ok_or(Error::UnknownConnection)?;

        room.return_to_lobby(conn)?;
        let players = room.roster();

        fx.broadcast(
            &code,
            ServerEvent::RoundReset(RoundReset {
                room_code: code.clone(),
            }),
        );
        fx.broadcast(&code, ServerEvent::UpdatePlayers(players));
        info!(room = %code, "Room returned to lobby");
        Ok(())
    }

    fn announce_results<E: Effects>(&self, fx: &mut E, code: &str) {
        let Some(room) = self.registry.get(code) else {
            return;
        };
        let (Some(results), Some(round)) = (room.results(), room.round()) else {
            return;
        };
        info!(
            room = %code,
            round = round.number,
            impostor_caught = results.impostor_caught,
            is_tie = results.is_tie,
            round_secs = (Utc::now() - round.started_at).num_seconds(),
            "Round resolved"
        );
        fx.broadcast(code, ServerEvent::VotingResults(results));
    }

    // ---- seat bookkeeping ----

    fn ensure_unseated(&self, conn: ConnectionId) -> Result<()> {
        match self.identities.seat_of(conn) {
            Some(seat) => Err(Error::AlreadyInRoom(seat.room.clone())),
            None => Ok(()),
        }
    }

    /// Keep a disconnected player's seat and start their grace period
    fn hold_seat<E: Effects>(&mut self, fx: &mut E, seat: &Seat) -> Result<()> {
        let room = self
            .registry
            .get_mut(&seat.room)
            .ok_or(Error::UnknownConnection)?;
        room.mark_disconnected(&seat.name)?;
        let players = room.roster();

        let token = self.presence.connection_lost(&seat.room, &seat.name, fx);
        info!(
            room = %seat.room,
            player = %seat.name,
            token = %token,
            grace_secs = self.presence.grace_period().as_secs(),
            "Player disconnected; seat held"
        );

        fx.broadcast(&seat.room, ServerEvent::UpdatePlayers(players));
        invariants::assert_registry_invariants(&self.registry, &seat.room);
        Ok(())
    }

    /// Remove a player for good, destroying the room if it empties
    fn remove_seat<E: Effects>(&mut self, fx: &mut E, code: &str, name: &str) -> Result<()> {
        let room = self
            .registry
            .get_mut(code)
            .ok_or(Error::UnknownConnection)?;
        let departure = room.remove_player(name)?;
        let empty = room.is_empty();
        let players = room.roster();

        if empty {
            self.destroy_room(fx, code);
            return Ok(());
        }

        if let Some(host) = &departure.new_host {
            info!(room = %code, from = %departure.player.name, to = %host, "Host transferred");
        }
        fx.broadcast(code, ServerEvent::UpdatePlayers(players));
        if departure.resolved {
            self.announce_results(fx, code);
        }

        invariants::assert_registry_invariants(&self.registry, code);
        Ok(())
    }

    fn destroy_room<E: Effects>(&mut self, fx: &mut E, code: &str) {
        let Some(room) = self.registry.destroy(code) else {
            return;
        };
        let cancelled = self.presence.forget_room(code, fx);
        let released = self.identities.release_room(code);
        let lifetime = Utc::now() - room.created_at();

        info!(
            room = %code,
            rounds = room.rounds_played(),
            lifetime_secs = lifetime.num_seconds(),
            cancelled_timers = cancelled,
            released_seats = released,
            "Room destroyed"
        );
    }
}

/// Report the outcome of a handler according to its error kind
fn settle<E: Effects>(fx: &mut E, conn: ConnectionId, action: &'static str, result: Result<()>) {
    let Err(err) = result else {
        return;
    };
    match err.kind() {
        ErrorKind::UserRejection | ErrorKind::Capacity => {
            info!(conn = %conn, action, error = %err, "Action rejected");
            fx.send(conn, ServerEvent::error(err.to_string()));
        }
        ErrorKind::AuthorizationNoop => {
            debug!(conn = %conn, action, "Ignoring action from non-host");
        }
        ErrorKind::StaleReference => {
            debug!(conn = %conn, action, error = %err, "Dropping stale action");
        }
        ErrorKind::Config => {
            warn!(conn = %conn, action, error = %err, "Unexpected error");
        }
    }
}
