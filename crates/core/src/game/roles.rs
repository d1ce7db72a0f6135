//! Impostor selection

use rand::seq::SliceRandom;
use rand::Rng;

/// Clamp a requested impostor count to `[1, floor((players - 1) / 2)]`.
///
/// Crew always keeps a strict majority once there are three players.
pub fn impostor_quota(requested: usize, player_count: usize) -> usize {
    let ceiling = (player_count.saturating_sub(1) / 2).max(1);
    requested.clamp(1, ceiling)
}

/// Pick `quota` distinct seat indices uniformly at random, returned sorted.
pub fn choose_impostors<R: Rng + ?Sized>(player_count: usize, quota: usize, rng: &mut R) -> Vec<usize> {
    let mut seats: Vec<usize> = (0..player_count).collect();
    seats.shuffle(rng);
    seats.truncate(quota.min(player_count));
    seats.sort_unstable();
    seats
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_quota_bounds() {
        assert_eq!(impostor_quota(1, 3), 1);
        assert_eq!(impostor_quota(5, 3), 1);
        assert_eq!(impostor_quota(0, 8), 1);
        assert_eq!(impostor_quota(3, 8), 3);
        assert_eq!(impostor_quota(4, 8), 3);
        assert_eq!(impostor_quota(2, 5), 2);
    }

    #[test]
    fn test_choose_distinct() {
        let mut rng = StdRng::seed_from_u64(42);
        for _ in 0..200 {
            let picked = choose_impostors(7, 3, &mut rng);
            assert_eq!(picked.len(), 3);
            assert!(picked.windows(2).all(|w| w[0] < w[1]));
            assert!(picked.iter().all(|&i| i < 7));
        }
    }

    #[test]
    fn test_every_seat_reachable() {
        let mut rng = StdRng::seed_from_u64(9);
        let mut hits = [0u32; 4];
        for _ in 0..4000 {
            for i in choose_impostors(4, 1, &mut rng) {
                hits[i] += 1;
            }
        }
        // Expect ~1000 each
        assert!(hits.iter().all(|&h| h > 800 && h < 1200), "{:?}", hits);
    }
}
