//! Error types for the game core
//!
//! Every failure is scoped to one room or one connection. The [`ErrorKind`]
//! of an error decides whether the originating client hears about it.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Room {0} does not exist")]
    RoomNotFound(String),

    #[error("Room is full")]
    RoomFull,

    #[error("Game already started")]
    GameInProgress,

    #[error("At least {min} players are needed to start")]
    NotEnoughPlayers { min: usize },

    #[error("Nickname {0} is already taken in this room")]
    NicknameTaken(String),

    #[error("Invalid nickname: {0}")]
    InvalidNickname(String),

    #[error("Connection is already seated in room {0}")]
    AlreadyInRoom(String),

    #[error("Only the host can do that")]
    NotHost,

    #[error("Unknown connection")]
    UnknownConnection,

    #[error("Unknown player")]
    UnknownPlayer,

    #[error("Action not valid in phase {0}")]
    WrongPhase(&'static str),

    #[error("No free room code after {attempts} attempts")]
    CodeSpaceExhausted { attempts: usize },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config parse error: {0}")]
    Parse(#[from] toml::de::Error),
}

/// How an error is surfaced
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Reported to the originating connection, room state unchanged
    UserRejection,
    /// Non-host attempted a host-only action; silently ignored
    AuthorizationNoop,
    /// Refers to a connection, player or room that is gone; dropped
    StaleReference,
    /// Registry could not allocate
    Capacity,
    /// Startup configuration problem
    Config,
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::RoomNotFound(_)
            | Error::RoomFull
            | Error::GameInProgress
            | Error::NotEnoughPlayers { .. }
            | Error::NicknameTaken(_)
            | Error::InvalidNickname(_)
            | Error::AlreadyInRoom(_) => ErrorKind::UserRejection,
            Error::NotHost => ErrorKind::AuthorizationNoop,
            Error::UnknownConnection | Error::UnknownPlayer | Error::WrongPhase(_) => {
                ErrorKind::StaleReference
            }
            Error::CodeSpaceExhausted { .. } => ErrorKind::Capacity,
            Error::Io(_) | Error::Parse(_) => ErrorKind::Config,
        }
    }

    /// Whether the originating client should receive an `error_message`
    pub fn is_user_facing(&self) -> bool {
        matches!(self.kind(), ErrorKind::UserRejection | ErrorKind::Capacity)
    }
}

pub type Result<T> = std::result::Result<T, Error>;
