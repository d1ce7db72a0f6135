//! Vote tally
//!
//! A tie at the maximum never produces a winner.

/// Per-target vote counts with the resolved leader
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tally<K> {
    counts: Vec<(K, u32)>,
    leader: Option<K>,
    is_tie: bool,
}

impl<K> Tally<K> {
    /// The sole most-voted target; `None` on a tie or with no ballots
    pub fn winner(&self) -> Option<&K> {
        self.leader.as_ref()
    }

    pub fn is_tie(&self) -> bool {
        self.is_tie
    }

    /// Counts in order of first ballot
    pub fn counts(&self) -> &[(K, u32)] {
        &self.counts
    }
}

/// Count ballots, one item per ballot naming its target.
pub fn tally<K, I>(ballots: I) -> Tally<K>
where
    K: PartialEq + Clone,
    I: IntoIterator<Item = K>,
{
    let mut counts: Vec<(K, u32)> = Vec::new();
    for target in ballots {
        match counts.iter_mut().find(|(k, _)| *k == target) {
            Some((_, n)) => *n += 1,
            None => counts.push((target, 1)),
        }
    }

    let mut max = 0;
    let mut leader = None;
    let mut is_tie = false;
    for (target, n) in &counts {
        if *n > max {
            max = *n;
            leader = Some(target.clone());
            is_tie = false;
        } else if *n == max {
            is_tie = true;
        }
    }

    Tally {
        counts,
        leader: if is_tie { None } else { leader },
        is_tie,
    }
}

/// Stored result of a resolved round
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome {
    /// Keyed by player name
    pub tally: Tally<String>,
    pub impostor_caught: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clear_winner() {
        let t = tally(["a", "b", "a"]);
        assert_eq!(t.winner(), Some(&"a"));
        assert!(!t.is_tie());
        assert_eq!(t.counts(), &[("a", 2), ("b", 1)]);
    }

    #[test]
    fn test_two_way_tie() {
        let t = tally(["a", "b"]);
        assert_eq!(t.winner(), None);
        assert!(t.is_tie());
    }

    #[test]
    fn test_tie_broken_by_later_ballot() {
        // a and b tie at 1, then b pulls ahead
        let t = tally(["a", "b", "b"]);
        assert_eq!(t.winner(), Some(&"b"));
        assert!(!t.is_tie());
    }

    #[test]
    fn test_tie_below_max_ignored() {
        let t = tally(["c", "a", "b", "c"]);
        assert_eq!(t.winner(), Some(&"c"));
        assert!(!t.is_tie());
    }

    #[test]
    fn test_no_ballots() {
        let t = tally(Vec::<&str>::new());
        assert_eq!(t.winner(), None);
        assert!(!t.is_tie());
    }
}
