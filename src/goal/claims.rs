//! Claim sets: admission control for actors and goals within a sweep

use std::hash::Hash;

use ahash::AHashSet;

/// Set of ids already allocated
///
/// `claim` refuses an id that is already held, so a caller that checks the
/// return value can never hand the same actor (or goal) out twice without an
/// intervening `release` or `clear`.
#[derive(Debug, Clone)]
pub struct ClaimSet<T: Eq + Hash + Copy> {
    held: AHashSet<T>,
}

impl<T: Eq + Hash + Copy> Default for ClaimSet<T> {
    fn default() -> Self {
        Self {
            held: AHashSet::new(),
        }
    }
}

impl<T: Eq + Hash + Copy> ClaimSet<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns false if `id` was already claimed
    pub fn claim(&mut self, id: T) -> bool {
        self.held.insert(id)
    }

    /// Returns false if `id` was not claimed
    pub fn release(&mut self, id: T) -> bool {
        self.held.remove(&id)
    }

    pub fn contains(&self, id: T) -> bool {
        self.held.contains(&id)
    }

    pub fn clear(&mut self) {
        self.held.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.held.is_empty()
    }

    pub fn len(&self) -> usize {
        self.held.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = T> + '_ {
        self.held.iter().copied()
    }
}
