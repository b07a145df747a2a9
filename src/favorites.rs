//! Favorites bookkeeping: the favorited ids and the ids with a request in flight.

use crate::lock;
use crate::models::{MovieId, MovieRef};
use std::collections::{BTreeSet, HashSet};
use std::sync::{Arc, Mutex};

/// Movie ids the current user has favorited, as of the last successful
/// server round-trip
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FavoriteSet(BTreeSet<MovieId>);

impl FavoriteSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_refs<'a>(refs: impl IntoIterator<Item = &'a MovieRef>) -> Self {
        Self(refs.into_iter().map(|r| r.id().clone()).collect())
    }

    pub fn contains(&self, id: &MovieId) -> bool {
        self.0.contains(id)
    }

    pub fn insert(&mut self, id: MovieId) -> bool {
        self.0.insert(id)
    }

    pub fn remove(&mut self, id: &MovieId) -> bool {
        self.0.remove(id)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &MovieId> {
        self.0.iter()
    }
}

/// Ids with a mutating request in flight.
///
/// An id is held by exactly one `BusyGuard` at a time; dropping the guard
/// releases it whether the request succeeded or not.
#[derive(Debug, Clone, Default)]
pub struct BusySet {
    ids: Arc<Mutex<HashSet<MovieId>>>,
}

impl BusySet {
    pub fn new() -> Self {
        Self::default()
    }

    /// `None` when a request for `id` is already outstanding
    pub fn try_acquire(&self, id: &MovieId) -> Option<BusyGuard> {
        if !lock(&self.ids).insert(id.clone()) {
            return None;
        }
        Some(BusyGuard {
            ids: Arc::clone(&self.ids),
            id: id.clone(),
        })
    }

    pub fn contains(&self, id: &MovieId) -> bool {
        lock(&self.ids).contains(id)
    }

    pub fn is_empty(&self) -> bool {
        lock(&self.ids).is_empty()
    }
}

#[derive(Debug)]
pub struct BusyGuard {
    ids: Arc<Mutex<HashSet<MovieId>>>,
    id: MovieId,
}

impl BusyGuard {
    pub fn id(&self) -> &MovieId {
        &self.id
    }
}

impl Drop for BusyGuard {
    fn drop(&mut self) {
        lock(&self.ids).remove(&self.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_guard_is_exclusive_per_id() {
        let busy = BusySet::new();
        let a = MovieId::new("a");
        let b = MovieId::new("b");

        let guard = busy.try_acquire(&a).unwrap();
        assert!(busy.contains(&a));
        assert!(busy.try_acquire(&a).is_none());
        // Other ids are independent
        let other = busy.try_acquire(&b).unwrap();
        assert_eq!(other.id(), &b);

        drop(guard);
        assert!(!busy.contains(&a));
        assert!(busy.try_acquire(&a).is_some());
    }

    #[test]
    fn test_guard_released_on_early_return() {
        fn attempt(busy: &BusySet, id: &MovieId) -> Result<(), String> {
            let _guard = busy.try_acquire(id).ok_or("busy")?;
            Err("request failed".to_string())
        }

        let busy = BusySet::new();
        let id = MovieId::new("a");
        assert!(attempt(&busy, &id).is_err());
        assert!(busy.is_empty());
    }

    #[test]
    fn test_favorite_set_from_mixed_refs() {
        let refs = MovieRef::list_from(Some(&serde_json::json!(["a", { "_id": "b" }, "a"])));
        let set = FavoriteSet::from_refs(&refs);
        assert_eq!(set.len(), 2);
        assert!(set.contains(&MovieId::new("a")));
        assert!(set.contains(&MovieId::new("b")));
    }
}
