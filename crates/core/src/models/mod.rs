//! Data models for the game core

mod player;
mod round;
mod settings;

pub use player::*;
pub use round::*;
pub use settings::*;
