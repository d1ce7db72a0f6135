//! Room settings and the client-supplied requests that shape them

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::dictionary::RANDOM_CATEGORY;
use crate::MIN_PLAYERS;

/// Effective configuration of one room
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomSettings {
    pub max_players: usize,
    /// Never empty; may contain [`RANDOM_CATEGORY`]
    pub categories: BTreeSet<String>,
    pub impostor_count: usize,
}

impl Default for RoomSettings {
    fn default() -> Self {
        Self {
            max_players: 10,
            categories: BTreeSet::from([RANDOM_CATEGORY.to_string()]),
            impostor_count: 1,
        }
    }
}

impl RoomSettings {
    /// Overlay a client request on top of these settings
    pub fn merged(&self, request: &SettingsRequest) -> Self {
        let mut settings = self.clone();
        if let Some(max_players) = request.max_players {
            settings.max_players = max_players;
        }
        if let Some(categories) = &request.categories {
            settings.categories = categories.iter().cloned().collect();
        }
        if let Some(impostor_count) = request.impostor_count {
            settings.impostor_count = impostor_count;
        }
        settings
    }

    /// Overlay a per-game override
    pub fn overridden(&self, overrides: &RoundOverride) -> Self {
        let mut settings = self.clone();
        if let Some(category) = &overrides.category {
            settings.categories = BTreeSet::from([category.clone()]);
        }
        if let Some(impostor_count) = overrides.impostor_count {
            settings.impostor_count = impostor_count;
        }
        settings
    }

    /// Clamp out-of-range values and drop categories the dictionary doesn't know.
    ///
    /// Invalid settings are corrected here, never reported.
    pub fn normalized(mut self, known_categories: &[&str]) -> Self {
        self.max_players = self.max_players.max(MIN_PLAYERS);
        self.impostor_count = self.impostor_count.max(1);
        self.categories.retain(|c| {
            c == RANDOM_CATEGORY || known_categories.iter().any(|known| known == c)
        });
        if self.categories.is_empty() {
            self.categories.insert(RANDOM_CATEGORY.to_string());
        }
        self
    }

    pub fn allows_random(&self) -> bool {
        self.categories.contains(RANDOM_CATEGORY)
    }
}

/// Settings sent with `create_room`; absent fields fall back to server defaults
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SettingsRequest {
    pub max_players: Option<usize>,
    pub categories: Option<Vec<String>>,
    pub impostor_count: Option<usize>,
}

/// Optional config sent with `start_game`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RoundOverride {
    #[serde(alias = "categoryId")]
    pub category: Option<String>,
    pub impostor_count: Option<usize>,
}
