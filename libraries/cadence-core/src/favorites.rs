//! Favorite tracks
//!
//! Membership is keyed by `title||artist`, so a favorite survives its track
//! moving to a different source.

use crate::types::Track;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Set of favorite track keys
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Favorites {
    keys: BTreeSet<String>,
}

impl Favorites {
    /// Create an empty favorites set
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or remove `track`, returning whether it is now a favorite
    pub fn toggle(&mut self, track: &Track) -> bool {
        let key = track.membership_key();
        if self.keys.remove(&key) {
            tracing::debug!("Removed favorite {}", key);
            false
        } else {
            tracing::debug!("Added favorite {}", key);
            self.keys.insert(key);
            true
        }
    }

    /// Whether `track` is a favorite
    pub fn contains(&self, track: &Track) -> bool {
        self.keys.contains(&track.membership_key())
    }

    /// Number of favorites
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Whether there are no favorites
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Favorite keys in sorted order
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.keys.iter().map(String::as_str)
    }
}
