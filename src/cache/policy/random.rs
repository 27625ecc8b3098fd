//! RR (Random Replacement) policy.

use std::collections::VecDeque;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::EvictionPolicy;

/// Evicts a uniformly random key, ignoring recency.
///
/// Seed it with [`RandomPolicy::with_seed`] for reproducible eviction.
#[derive(Debug)]
pub struct RandomPolicy {
    rng: StdRng,
}

impl RandomPolicy {
    /// Policy seeded from OS entropy.
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    /// Deterministic policy for tests and benchmarks.
    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl Default for RandomPolicy {
    fn default() -> Self {
        Self::new()
    }
}

impl<K> EvictionPolicy<K> for RandomPolicy {
    fn name(&self) -> &'static str {
        "rr"
    }

    fn select_victim(&mut self, keys: &VecDeque<K>) -> Option<usize> {
        if keys.is_empty() {
            None
        } else {
            Some(self.rng.gen_range(0..keys.len()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_random_in_bounds() {
        let mut policy = RandomPolicy::with_seed(7);
        let keys: VecDeque<u32> = (0..5).collect();
        for _ in 0..100 {
            let victim = policy.select_victim(&keys).unwrap();
            assert!(victim < keys.len());
        }
    }

    #[test]
    fn test_random_is_reproducible() {
        let keys: VecDeque<u32> = (0..16).collect();
        let mut a = RandomPolicy::with_seed(42);
        let mut b = RandomPolicy::with_seed(42);
        let picks_a: Vec<_> = (0..10).map(|_| a.select_victim(&keys)).collect();
        let picks_b: Vec<_> = (0..10).map(|_| b.select_victim(&keys)).collect();
        assert_eq!(picks_a, picks_b);
    }

    #[test]
    fn test_random_not_always_oldest() {
        let mut policy = RandomPolicy::with_seed(1);
        let keys: VecDeque<u32> = (0..8).collect();
        let picks: Vec<_> = (0..50).map(|_| policy.select_victim(&keys).unwrap()).collect();
        assert!(picks.iter().any(|&p| p != 0));
    }
}
