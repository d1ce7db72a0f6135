//! Word dictionary
//!
//! The game only needs "give me a word for this category". [`WordBank`] is the
//! built-in table; anything implementing [`Dictionary`] can replace it.

use rand::seq::SliceRandom;
use rand::RngCore;

/// Category key meaning "let the dictionary choose"
pub const RANDOM_CATEGORY: &str = "random";

/// A word together with the category it was drawn from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub word: String,
    pub category: String,
}

pub trait Dictionary: Send {
    /// All category keys, excluding [`RANDOM_CATEGORY`]
    fn categories(&self) -> Vec<&str>;

    /// Draw a word. `RANDOM_CATEGORY` or an unknown key selects a category
    /// uniformly at random.
    fn pick(&self, category: &str, rng: &mut dyn RngCore) -> Entry;
}

/// Static category -> word list table
#[derive(Debug, Clone)]
pub struct WordBank {
    lists: Vec<(&'static str, &'static [&'static str])>,
}

impl WordBank {
    /// Returns `None` if no category has at least one word
    pub fn new(lists: Vec<(&'static str, &'static [&'static str])>) -> Option<Self> {
        let lists: Vec<_> = lists.into_iter().filter(|(_, words)| !words.is_empty()).collect();
        if lists.is_empty() {
            return None;
        }
        Some(Self { lists })
    }

    pub fn builtin() -> Self {
        Self {
            lists: BUILTIN.to_vec(),
        }
    }
}

impl Default for WordBank {
    fn default() -> Self {
        Self::builtin()
    }
}

impl Dictionary for WordBank {
    fn categories(&self) -> Vec<&str> {
        self.lists.iter().map(|(key, _)| *key).collect()
    }

    fn pick(&self, category: &str, rng: &mut dyn RngCore) -> Entry {
        let known = self.lists.iter().find(|(key, _)| *key == category);
        // `lists` is non-empty by construction and every list has a word
        let (key, words) = match known {
            Some(list) => *list,
            None => *self.lists.choose(rng).unwrap_or(&self.lists[0]),
        };
        let word = words.choose(rng).copied().unwrap_or(words[0]);

        Entry {
            word: word.to_string(),
            category: key.to_string(),
        }
    }
}

const BUILTIN: &[(&str, &[&str])] = &[
    (
        "venezolano",
        &[
            "Hallaca", "Sifrino", "Patacón", "Cachapa", "Tequeños", "CLAP", "Enchufado", "Pepito",
            "Saime", "Chicha", "Malta", "Frescolita", "Encava", "Polar", "Toddy",
            "Maria Corina Machado", "Diosdado Cabello", "Henrique Capriles",
        ],
    ),
    (
        "animales",
        &[
            "Panda", "Jirafa", "Elefante", "León", "Tigre", "Delfín", "Tiburón", "Canguro",
            "Koala", "Pingüino", "Águila", "Lobo",
        ],
    ),
    (
        "cultura_pop",
        &[
            "Star Wars", "Harry Potter", "Marvel", "DC", "Stranger Things", "Game of Thrones",
            "Netflix", "Disney+", "Donald Trump", "Elon Musk", "Sidney Sweeney",
        ],
    ),
    (
        "fiestas",
        &[
            "Navidad", "Año Nuevo", "Reyes Magos", "San Valentín", "Halloween", "Carnavales",
            "Cumpleaños", "Quinceaños", "Boda", "Graduación", "Baby Shower",
        ],
    ),
    (
        "objetos",
        &[
            "iPhone", "AirPods", "PlayStation", "Xbox", "Nintendo Switch", "Laptop",
            "Audífonos Bluetooth", "Smartwatch", "Cámara GoPro", "Tablet", "Kindle",
        ],
    ),
    (
        "comida_internacional",
        &[
            "Pizza", "Hamburguesa", "Sushi", "Tacos", "Ramen", "Lasagna", "Paella", "Burrito",
            "Shawarma", "Hot Dog",
        ],
    ),
    (
        "ropa",
        &[
            "Jeans", "Hoodie", "Chaqueta de Cuero", "Franela Oversize", "Zapatillas Nike",
            "Zapatos Jordan", "Vestido", "Traje", "Gorra", "Lentes de Sol",
        ],
    ),
    // Deliberately close pairs to confuse the impostor
    (
        "dificil",
        &[
            "Hallaca", "Sifrino", "Sidney Sweeney", "Panda", "Koala", "Oso Polar", "Star Wars",
            "Star Trek", "Guardianes de la Galaxia", "Navidad", "Año Nuevo", "Nochebuena",
        ],
    ),
];

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_pick_known_category() {
        let bank = WordBank::builtin();
        let mut rng = StdRng::seed_from_u64(7);

        let entry = bank.pick("ropa", &mut rng);
        assert_eq!(entry.category, "ropa");
        assert!(!entry.word.is_empty());
    }

    #[test]
    fn test_random_and_unknown_fall_back() {
        let bank = WordBank::builtin();
        let mut rng = StdRng::seed_from_u64(7);
        let categories = bank.categories();

        let random = bank.pick(RANDOM_CATEGORY, &mut rng);
        assert!(categories.contains(&random.category.as_str()));

        let unknown = bank.pick("planetas", &mut rng);
        assert!(categories.contains(&unknown.category.as_str()));
    }

    #[test]
    fn test_empty_bank_rejected() {
        assert!(WordBank::new(vec![("vacio", &[])]).is_none());
        let bank = WordBank::new(vec![("uno", &["solo"])]).unwrap();
        assert_eq!(bank.categories(), vec!["uno"]);
    }
}
