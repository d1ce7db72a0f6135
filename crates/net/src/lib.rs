//! Impostor Network Library
//!
//! TCP transport for the game server.
//!
//! # Architecture
//!
//! - **Server**: Accepts connections and feeds one orchestrator task
//! - **Client**: Connects to a server; used by tests and bots
//! - **Protocol**: Length-prefixed JSON `{event, data}` messages
//!
//! # Usage
//!
//! ```ignore
//! let server = Server::start(&config, Box::new(WordBank::builtin())).await?;
//!
//! let mut client = Client::connect(server.addr()).await?;
//! client.send(ClientMessage::create_room("ana", None)).await?;
//! while let Some(event) = client.next_event().await {
//!     match event {
//!         ServerEvent::RoomCreated(entered) => { /* share entered.room_code */ }
//!         _ => {}
//!     }
//! }
//! ```

pub mod client;
pub mod error;
mod frame;
pub mod hub;
pub mod protocol;
pub mod server;
mod timers;

pub use client::{Client, ConnectionState, KEEPALIVE_INTERVAL};
pub use error::{Error, Result};
pub use hub::ConnectionHub;
pub use protocol::{ClientMessage, ServerEvent};
pub use server::{Server, ServerStats};
