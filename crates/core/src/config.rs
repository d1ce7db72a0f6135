//! Server configuration
//!
//! Loaded from TOML. Every field has a default, so a missing or empty file
//! still yields a runnable server.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::models::RoomSettings;

/// Environment variable naming a config file
pub const CONFIG_ENV: &str = "IMPOSTOR_CONFIG";

const CONFIG_FILE_NAME: &str = "server.toml";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: IpAddr,
    pub port: u16,
    /// Seconds a disconnected player keeps their seat. 0 removes at once.
    pub grace_period_secs: u64,
    /// Seconds without any inbound frame before a connection is treated as
    /// lost. Clients keep quiet connections alive with `ping`. 0 disables.
    pub idle_timeout_secs: u64,
    pub room_code_length: usize,
    pub max_connections: usize,
    pub room_defaults: RoomDefaults,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: 3001,
            grace_period_secs: 30,
            idle_timeout_secs: 60,
            room_code_length: 4,
            max_connections: 512,
            room_defaults: RoomDefaults::default(),
        }
    }
}

/// Settings applied to a new room before the creator's overrides
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoomDefaults {
    pub max_players: usize,
    pub impostor_count: usize,
    pub categories: Vec<String>,
}

impl Default for RoomDefaults {
    fn default() -> Self {
        let settings = RoomSettings::default();
        Self {
            max_players: settings.max_players,
            impostor_count: settings.impostor_count,
            categories: settings.categories.into_iter().collect(),
        }
    }
}

impl From<&RoomDefaults> for RoomSettings {
    fn from(defaults: &RoomDefaults) -> Self {
        RoomSettings {
            max_players: defaults.max_players,
            categories: defaults.categories.iter().cloned().collect(),
            impostor_count: defaults.impostor_count,
        }
    }
}

impl ServerConfig {
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        Ok(toml::from_str(raw)?)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_toml_str(&raw)
    }

    /// `<config dir>/server.toml` for the current platform
    pub fn default_path() -> Option<PathBuf> {
        ProjectDirs::from("dev", "impostor", "impostor")
            .map(|dirs| dirs.config_dir().join(CONFIG_FILE_NAME))
    }

    /// Find and load the config.
    ///
    /// Order: `explicit`, then `$IMPOSTOR_CONFIG`, then the platform config
    /// file if it exists, then defaults. A path that was asked for by name
    /// must exist. Returns the path actually read, if any.
    pub fn discover(explicit: Option<PathBuf>) -> Result<(Self, Option<PathBuf>)> {
        let named = explicit.or_else(|| std::env::var_os(CONFIG_ENV).map(PathBuf::from));
        if let Some(path) = named {
            let config = Self::load(&path)?;
            return Ok((config, Some(path)));
        }

        match Self::default_path() {
            Some(path) if path.is_file() => {
                let config = Self::load(&path)?;
                Ok((config, Some(path)))
            }
            _ => Ok((Self::default(), None)),
        }
    }

    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind, self.port)
    }

    pub fn idle_timeout(&self) -> Option<Duration> {
        (self.idle_timeout_secs > 0).then(|| Duration::from_secs(self.idle_timeout_secs))
    }

    pub fn rules(&self) -> GameRules {
        GameRules {
            grace_period: Duration::from_secs(self.grace_period_secs),
            room_code_length: self.room_code_length,
            room_defaults: RoomSettings::from(&self.room_defaults),
        }
    }
}

/// The parts of the config the game core consumes
#[derive(Debug, Clone, PartialEq)]
pub struct GameRules {
    pub grace_period: Duration,
    pub room_code_length: usize,
    pub room_defaults: RoomSettings,
}

impl Default for GameRules {
    fn default() -> Self {
        ServerConfig::default().rules()
    }
}
