//! LRU (Least Recently Used) replacement policy.

use std::collections::VecDeque;

use super::EvictionPolicy;

/// Evicts the key at the front of the recency order.
#[derive(Debug, Default, Clone, Copy)]
pub struct LruPolicy;

impl LruPolicy {
    pub fn new() -> Self {
        Self
    }
}

impl<K> EvictionPolicy<K> for LruPolicy {
    fn name(&self) -> &'static str {
        "lru"
    }

    fn select_victim(&mut self, keys: &VecDeque<K>) -> Option<usize> {
        if keys.is_empty() {
            None
        } else {
            Some(0)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lru_picks_oldest() {
        let mut policy = LruPolicy::new();
        let keys: VecDeque<u32> = VecDeque::from(vec![3, 1, 2]);
        assert_eq!(policy.select_victim(&keys), Some(0));
    }

    #[test]
    fn test_lru_empty() {
        let mut policy = LruPolicy::new();
        let keys: VecDeque<u32> = VecDeque::new();
        assert_eq!(policy.select_victim(&keys), None);
    }
}
