//! Linked-map registry.
//!
//! Several map instances on one page may share global state (cross-map
//! collectibles). Instead of discovering peers through ambient global
//! caches, each instance is handed an explicit registry scoped by an
//! externally supplied session key and registers itself by id.

use std::collections::BTreeSet;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkedMapRegistry {
    session_key: String,
    maps: BTreeSet<String>,
}

impl LinkedMapRegistry {
    pub fn new(session_key: impl Into<String>) -> Self {
        Self {
            session_key: session_key.into(),
            maps: BTreeSet::new(),
        }
    }

    pub fn session_key(&self) -> &str {
        &self.session_key
    }

    /// Returns `false` if the id was already registered.
    pub fn register(&mut self, map_id: impl Into<String>) -> bool {
        self.maps.insert(map_id.into())
    }

    pub fn unregister(&mut self, map_id: &str) -> bool {
        self.maps.remove(map_id)
    }

    pub fn contains(&self, map_id: &str) -> bool {
        self.maps.contains(map_id)
    }

    pub fn len(&self) -> usize {
        self.maps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.maps.is_empty()
    }

    /// Peers of `exclude`, in id order.
    pub fn linked_maps(&self, exclude: &str) -> Vec<&str> {
        self.maps
            .iter()
            .filter(|id| id.as_str() != exclude)
            .map(String::as_str)
            .collect()
    }
}
