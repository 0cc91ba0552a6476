//! Uniqueness registry
//!
//! Tracks every value handed out by unique generation, one set per pattern.
//! The registry lives as long as the engine that owns it; clones of a
//! [`SharedRegistry`] handle see the same sets.

use crate::domain::Value;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

/// Registry shared between engines and threads
pub type SharedRegistry = Arc<Mutex<UniqueRegistry>>;

/// Previously generated values, keyed by pattern name
#[derive(Debug, Default)]
pub struct UniqueRegistry {
    seen: HashMap<String, HashSet<String>>,
}

impl UniqueRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// New registry behind a shared handle
    pub fn shared() -> SharedRegistry {
        Arc::new(Mutex::new(Self::new()))
    }

    /// Record a value for `pattern`. Returns `false` if it was already used.
    pub fn insert(&mut self, pattern: &str, value: &Value) -> bool {
        self.seen
            .entry(pattern.to_string())
            .or_default()
            .insert(value.registry_key())
    }

    pub fn contains(&self, pattern: &str, value: &Value) -> bool {
        self.seen
            .get(pattern)
            .is_some_and(|set| set.contains(&value.registry_key()))
    }

    /// Number of values recorded for `pattern`
    pub fn len(&self, pattern: &str) -> usize {
        self.seen.get(pattern).map_or(0, HashSet::len)
    }

    pub fn is_empty(&self) -> bool {
        self.seen.values().all(HashSet::is_empty)
    }

    /// Forget every recorded value
    pub fn reset(&mut self) {
        self.seen.clear();
    }
}
