//! Impostor Core Library
//!
//! Rooms, roles, presence and vote tallying for the impostor word game.
//! Nothing in this crate performs I/O on its own: outbound traffic goes
//! through [`Gateway`] and timers through [`GraceTimers`], which the network
//! layer implements.

pub mod config;
pub mod dictionary;
pub mod error;
pub mod events;
pub mod game;
pub mod gateway;
pub mod identity;
pub mod invariants;
pub mod models;
pub mod orchestrator;
pub mod presence;
pub mod registry;

pub use config::{GameRules, RoomDefaults, ServerConfig, CONFIG_ENV};
pub use dictionary::{Dictionary, Entry, WordBank, RANDOM_CATEGORY};
pub use error::{Error, ErrorKind, Result};
pub use events::ServerEvent;
pub use game::{Phase, Room};
pub use gateway::{Effects, Gateway};
pub use identity::{IdentityResolver, Seat};
pub use models::*;
pub use orchestrator::Orchestrator;
pub use presence::{GraceTimers, LossToken, PresenceManager};
pub use registry::RoomRegistry;

/// Fewest players a round can start with
pub const MIN_PLAYERS: usize = 3;
