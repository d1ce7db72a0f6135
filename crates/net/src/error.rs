//! Network error types

use std::io;
use std::time::Duration;

/// Network result type
pub type Result<T> = std::result::Result<T, Error>;

/// Network errors
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Connection closed")]
    ConnectionClosed,

    #[error("Protocol error: {0}")]
    Protocol(String),

    /// A well-framed payload that is not a known message
    #[error("Invalid message: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("No frame received within {0:?}")]
    IdleTimeout(Duration),

    #[error("Not connected")]
    NotConnected,

    #[error("Server stopped")]
    ServerStopped,
}
