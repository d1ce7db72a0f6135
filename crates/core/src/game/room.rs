//! Room state machine
//!
//! A room moves `Lobby -> Active -> Debate -> Resolved`. Host status,
//! impostors and ballots are all held by player name. The connection id lives
//! only on [`Player`], so rebinding a reconnecting player is one field write
//! and no stale id can survive elsewhere.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rand::seq::SliceRandom;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::dictionary::{Dictionary, RANDOM_CATEGORY};
use crate::error::{Error, Result};
use crate::events::{GameStarted, RevealedImpostor, VotingResults};
use crate::game::roles::{choose_impostors, impostor_quota};
use crate::game::tally::{tally, Outcome};
use crate::models::{
    ConnectionId, Player, PlayerView, Role, RoomSettings, Round, MASKED_WORD,
};
use crate::MIN_PLAYERS;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    /// Accepting joins, no round data
    Lobby,
    /// Roles assigned, word hidden from impostors
    Active,
    /// Voting open
    Debate,
    /// Vote tallied
    Resolved,
}

impl Phase {
    pub fn as_str(self) -> &'static str {
        match self {
            Phase::Lobby => "lobby",
            Phase::Active => "active",
            Phase::Debate => "debate",
            Phase::Resolved => "resolved",
        }
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a connection entered a room
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// New player appended to the roster
    Joined { host: bool },
    /// A disconnected player was rebound to the new connection
    Rejoined { previous: ConnectionId },
}

/// A player leaving the roster for good
#[derive(Debug)]
pub struct Departure {
    pub player: Player,
    /// Who inherited host status, if it moved
    pub new_host: Option<String>,
    /// The departure completed the vote quorum
    pub resolved: bool,
}

#[derive(Debug)]
pub struct Room {
    code: String,
    phase: Phase,
    /// Join order; drives host succession
    players: Vec<Player>,
    settings: RoomSettings,
    round: Option<Round>,
    /// Voter name -> target name
    votes: HashMap<String, String>,
    rounds_played: u32,
    created_at: DateTime<Utc>,
}

impl Room {
    pub fn new(code: String, settings: RoomSettings) -> Self {
        Self {
            code,
            phase: Phase::Lobby,
            players: Vec::new(),
            settings,
            round: None,
            votes: HashMap::new(),
            rounds_played: 0,
            created_at: Utc::now(),
        }
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn players(&self) -> &[Player] {
        &self.players
    }

    pub fn settings(&self) -> &RoomSettings {
        &self.settings
    }

    pub fn round(&self) -> Option<&Round> {
        self.round.as_ref()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn rounds_played(&self) -> u32 {
        self.rounds_played
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    pub fn host(&self) -> Option<&Player> {
        self.players.iter().find(|p| p.is_host)
    }

    /// Current connection of the host
    pub fn host_id(&self) -> Option<ConnectionId> {
        self.host().map(|p| p.id)
    }

    pub fn player(&self, id: ConnectionId) -> Option<&Player> {
        self.players.iter().find(|p| p.id == id)
    }

    pub fn player_named(&self, name: &str) -> Option<&Player> {
        self.players.iter().find(|p| p.name == name)
    }

    pub fn connected_count(&self) -> usize {
        self.players.iter().filter(|p| p.connected).count()
    }

    pub fn roster(&self) -> Vec<PlayerView> {
        self.players.iter().map(Player::view).collect()
    }

    /// Current connection ids of this round's impostors still in the room
    pub fn impostor_ids(&self) -> Vec<ConnectionId> {
        let Some(round) = &self.round else {
            return Vec::new();
        };
        round
            .impostors
            .iter()
            .filter_map(|name| self.player_named(name))
            .map(|p| p.id)
            .collect()
    }

    /// Ballots as (voter, target) connection ids
    pub fn ballots(&self) -> Vec<(ConnectionId, ConnectionId)> {
        self.votes
            .iter()
            .filter_map(|(voter, target)| {
                Some((self.player_named(voter)?.id, self.player_named(target)?.id))
            })
            .collect()
    }

    /// Raw (voter, target) names as recorded, including any that no
    /// longer resolve to a seat
    pub(crate) fn ballot_names(&self) -> impl Iterator<Item = (&str, &str)> {
        self.votes.iter().map(|(v, t)| (v.as_str(), t.as_str()))
    }

    /// Seat a connection.
    ///
    /// A name belonging to a disconnected player rebinds that player to `id`
    /// in any phase. A new name is only accepted in the lobby.
    pub fn admit(
        &mut self,
        id: ConnectionId,
        name: String,
        avatar: serde_json::Value,
    ) -> Result<Admission> {
        if let Some(existing) = self.players.iter_mut().find(|p| p.name == name) {
            if existing.connected {
                return Err(Error::NicknameTaken(name));
            }
            let previous = std::mem::replace(&mut existing.id, id);
            existing.connected = true;
            return Ok(Admission::Rejoined { previous });
        }

        if self.phase != Phase::Lobby {
            return Err(Error::GameInProgress);
        }
        if self.players.len() >= self.settings.max_players {
            return Err(Error::RoomFull);
        }

        let host = self.players.is_empty();
        let mut player = Player::new(id, name, avatar);
        player.is_host = host;
        self.players.push(player);
        Ok(Admission::Joined { host })
    }

    /// Assign roles and a word. Allowed from `Lobby` and `Resolved`.
    ///
    /// `settings`, when given, replaces the room settings before the round
    /// is set up and sticks for later rounds.
    pub fn start_game(
        &mut self,
        caller: ConnectionId,
        settings: Option<RoomSettings>,
        dictionary: &dyn Dictionary,
        rng: &mut dyn RngCore,
    ) -> Result<&Round> {
        if self.host_id() != Some(caller) {
            return Err(Error::NotHost);
        }
        if matches!(self.phase, Phase::Active | Phase::Debate) {
            return Err(Error::GameInProgress);
        }
        if self.players.len() < MIN_PLAYERS {
            return Err(Error::NotEnoughPlayers { min: MIN_PLAYERS });
        }
        if let Some(settings) = settings {
            self.settings = settings;
        }

        let category = self.choose_category(rng);
        let entry = dictionary.pick(&category, rng);

        let quota = impostor_quota(self.settings.impostor_count, self.players.len());
        let seats = choose_impostors(self.players.len(), quota, rng);
        let mut impostors = Vec::with_capacity(seats.len());
        for (index, player) in self.players.iter_mut().enumerate() {
            if seats.binary_search(&index).is_ok() {
                player.role = Some(Role::Impostor);
                impostors.push(player.name.clone());
            } else {
                player.role = Some(Role::Crew);
            }
        }

        self.rounds_played += 1;
        self.votes.clear();
        self.phase = Phase::Active;
        Ok(self.round.insert(Round::new(
            self.rounds_played,
            entry.word,
            entry.category,
            impostors,
        )))
    }

    fn choose_category(&self, rng: &mut dyn RngCore) -> String {
        if self.settings.allows_random() {
            return RANDOM_CATEGORY.to_string();
        }
        let configured: Vec<&String> = self.settings.categories.iter().collect();
        configured
            .choose(rng)
            .map(|c| c.to_string())
            .unwrap_or_else(|| RANDOM_CATEGORY.to_string())
    }

    /// The round as seen by one player
    pub fn game_started_for(&self, id: ConnectionId) -> Option<GameStarted> {
        let round = self.round.as_ref()?;
        let player = self.player(id)?;
        let role = player.role?;
        let word = if role.is_impostor() {
            MASKED_WORD.to_string()
        } else {
            round.word.clone()
        };

        Some(GameStarted {
            round_id: round.id,
            round: round.number,
            role,
            word,
            category: round.category.clone(),
            players: self.roster(),
            impostor_count: round.impostor_count(),
        })
    }

    /// Open voting. Any seated player may call this.
    pub fn start_debate(&mut self, caller: ConnectionId) -> Result<Uuid> {
        if self.player(caller).is_none() {
            return Err(Error::UnknownConnection);
        }
        if self.phase != Phase::Active {
            return Err(Error::WrongPhase(self.phase.as_str()));
        }
        let round_id = self.round.as_ref().map(|r| r.id).ok_or(Error::WrongPhase("lobby"))?;

        self.votes.clear();
        self.phase = Phase::Debate;
        Ok(round_id)
    }

    /// Record or overwrite a ballot. Returns `true` if this ballot resolved
    /// the round.
    pub fn cast_vote(&mut self, voter: ConnectionId, target: ConnectionId) -> Result<bool> {
        if self.phase != Phase::Debate {
            return Err(Error::WrongPhase(self.phase.as_str()));
        }
        let voter = self
            .players
            .iter()
            .find(|p| p.id == voter && p.connected)
            .ok_or(Error::UnknownConnection)?
            .name
            .clone();
        let target = self.player(target).ok_or(Error::UnknownPlayer)?.name.clone();

        self.votes.insert(voter, target);
        Ok(self.try_resolve())
    }

    /// Resolve once every connected player has a ballot in.
    fn try_resolve(&mut self) -> bool {
        if self.phase != Phase::Debate || self.votes.is_empty() {
            return false;
        }
        if self.votes.len() < self.connected_count() {
            return false;
        }

        let ballots: Vec<String> = self
            .players
            .iter()
            .filter_map(|p| self.votes.get(&p.name).cloned())
            .collect();
        let tally = tally(ballots);

        let Some(round) = self.round.as_mut() else {
            return false;
        };
        let impostor_caught = tally.winner().is_some_and(|name| round.is_impostor(name));
        round.outcome = Some(Outcome {
            tally,
            impostor_caught,
        });
        self.phase = Phase::Resolved;
        true
    }

    /// The stored outcome rendered against current connection ids
    pub fn results(&self) -> Option<VotingResults> {
        let round = self.round.as_ref()?;
        let outcome = round.outcome.as_ref()?;

        let most_voted_player = outcome
            .tally
            .winner()
            .and_then(|name| self.player_named(name))
            .map(Player::view);
        let impostors = round
            .impostors
            .iter()
            .map(|name| RevealedImpostor {
                id: self.player_named(name).map(|p| p.id),
                name: name.clone(),
            })
            .collect();
        let votes_detail = outcome
            .tally
            .counts()
            .iter()
            .filter_map(|(name, n)| self.player_named(name).map(|p| (p.id, *n)))
            .collect();

        Some(VotingResults {
            round_id: round.id,
            impostor_caught: outcome.impostor_caught,
            most_voted_player,
            impostors,
            is_tie: outcome.tally.is_tie(),
            votes_detail,
        })
    }

    /// Keep the seat but flag it as gone
    pub fn mark_disconnected(&mut self, name: &str) -> Result<()> {
        let player = self
            .players
            .iter_mut()
            .find(|p| p.name == name)
            .ok_or(Error::UnknownPlayer)?;
        player.connected = false;
        Ok(())
    }

    pub fn is_disconnected(&self, name: &str) -> bool {
        self.player_named(name).is_some_and(|p| !p.connected)
    }

    /// Remove a player for good.
    ///
    /// Their ballot and any ballot naming them are discarded. Host status
    /// moves to the earliest-joined connected player, or the earliest-joined
    /// player if nobody is connected.
    pub fn remove_player(&mut self, name: &str) -> Result<Departure> {
        let index = self
            .players
            .iter()
            .position(|p| p.name == name)
            .ok_or(Error::UnknownPlayer)?;
        let player = self.players.remove(index);

        self.votes.remove(&player.name);
        self.votes.retain(|_, target| *target != player.name);

        let mut new_host = None;
        if player.is_host {
            let next = self
                .players
                .iter()
                .position(|p| p.connected)
                .or(if self.players.is_empty() { None } else { Some(0) });
            if let Some(next) = next {
                self.players[next].is_host = true;
                new_host = Some(self.players[next].name.clone());
            }
        }

        let resolved = self.try_resolve();
        Ok(Departure {
            player,
            new_host,
            resolved,
        })
    }

    /// Host-only: leave `Resolved` for `Lobby` so new players can join
    pub fn return_to_lobby(&mut self, caller: ConnectionId) -> Result<()> {
        if self.host_id() != Some(caller) {
            return Err(Error::NotHost);
        }
        if self.phase != Phase::Resolved {
            return Err(Error::WrongPhase(self.phase.as_str()));
        }

        self.round = None;
        self.votes.clear();
        for player in &mut self.players {
            player.role = None;
        }
        self.phase = Phase::Lobby;
        Ok(())
    }
}
