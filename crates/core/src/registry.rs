//! Room registry - owns every live room, keyed by room code
//!
//! `create` and `destroy` are the only operations that change which rooms
//! exist.

use std::collections::HashMap;

use rand::Rng;

use crate::error::{Error, Result};
use crate::game::Room;
use crate::models::RoomSettings;

const CODE_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// Give up generating a code after this many collisions
const MAX_CODE_ATTEMPTS: usize = 64;

#[derive(Debug)]
pub struct RoomRegistry {
    rooms: HashMap<String, Room>,
    code_length: usize,
}

impl RoomRegistry {
    pub fn new(code_length: usize) -> Self {
        Self {
            rooms: HashMap::new(),
            code_length: code_length.max(1),
        }
    }

    /// Create an empty lobby under a fresh code
    pub fn create<R: Rng + ?Sized>(&mut self, settings: RoomSettings, rng: &mut R) -> Result<String> {
        for _ in 0..MAX_CODE_ATTEMPTS {
            let code = generate_code(self.code_length, rng);
            if !self.rooms.contains_key(&code) {
                self.rooms.insert(code.clone(), Room::new(code.clone(), settings));
                return Ok(code);
            }
        }
        Err(Error::CodeSpaceExhausted {
            attempts: MAX_CODE_ATTEMPTS,
        })
    }

    pub fn get(&self, code: &str) -> Option<&Room> {
        self.rooms.get(code)
    }

    pub fn get_mut(&mut self, code: &str) -> Option<&mut Room> {
        self.rooms.get_mut(code)
    }

    /// Like `get_mut`, but a missing room is a user-facing rejection
    pub fn require(&mut self, code: &str) -> Result<&mut Room> {
        self.rooms
            .get_mut(code)
            .ok_or_else(|| Error::RoomNotFound(code.to_string()))
    }

    pub fn destroy(&mut self, code: &str) -> Option<Room> {
        self.rooms.remove(code)
    }

    pub fn contains(&self, code: &str) -> bool {
        self.rooms.contains_key(code)
    }

    pub fn len(&self) -> usize {
        self.rooms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rooms.is_empty()
    }
}

/// Room codes are matched case-insensitively
pub fn normalize_code(code: &str) -> String {
    code.trim().to_ascii_uppercase()
}

fn generate_code<R: Rng + ?Sized>(length: usize, rng: &mut R) -> String {
    (0..length)
        .map(|_| CODE_ALPHABET[rng.gen_range(0..CODE_ALPHABET.len())] as char)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_create_and_destroy() {
        let mut registry = RoomRegistry::new(4);
        let mut rng = StdRng::seed_from_u64(1);

        let code = registry.create(RoomSettings::default(), &mut rng).unwrap();
        assert_eq!(code.len(), 4);
        assert!(code.chars().all(|c| c.is_ascii_uppercase()));
        assert!(registry.get(&code).unwrap().is_empty());

        assert!(registry.destroy(&code).is_some());
        assert!(!registry.contains(&code));
        assert!(matches!(registry.require(&code), Err(Error::RoomNotFound(_))));
    }

    #[test]
    fn test_codes_unique() {
        let mut registry = RoomRegistry::new(4);
        let mut rng = StdRng::seed_from_u64(2);
        for _ in 0..500 {
            registry.create(RoomSettings::default(), &mut rng).unwrap();
        }
        assert_eq!(registry.len(), 500);
    }

    #[test]
    fn test_exhaustion_reported() {
        // One-letter codes: 26 rooms fill the space
        let mut registry = RoomRegistry::new(1);
        let mut rng = StdRng::seed_from_u64(3);
        let mut created = 0;
        let mut exhausted = false;
        for _ in 0..40 {
            match registry.create(RoomSettings::default(), &mut rng) {
                Ok(_) => created += 1,
                Err(Error::CodeSpaceExhausted { .. }) => exhausted = true,
                Err(e) => panic!("unexpected error: {e}"),
            }
        }
        assert!(created <= 26);
        assert!(exhausted);
    }

    #[test]
    fn test_normalize_code() {
        assert_eq!(normalize_code(" abcd "), "ABCD");
    }
}
