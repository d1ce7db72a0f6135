//! Round model

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::game::Outcome;

/// Placeholder impostors receive instead of the word
pub const MASKED_WORD: &str = "???";

/// One play-through from role assignment to vote resolution
#[derive(Debug, Clone)]
pub struct Round {
    pub id: Uuid,
    /// 1-based count of rounds played in this room
    pub number: u32,
    pub word: String,
    pub category: String,
    /// Impostor names, in join order
    pub impostors: Vec<String>,
    pub started_at: DateTime<Utc>,
    /// Set exactly once, when the vote resolves
    pub outcome: Option<Outcome>,
}

impl Round {
    pub fn new(number: u32, word: String, category: String, impostors: Vec<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            number,
            word,
            category,
            impostors,
            started_at: Utc::now(),
            outcome: None,
        }
    }

    pub fn is_impostor(&self, name: &str) -> bool {
        self.impostors.iter().any(|n| n == name)
    }

    pub fn impostor_count(&self) -> usize {
        self.impostors.len()
    }

    pub fn is_resolved(&self) -> bool {
        self.outcome.is_some()
    }
}
