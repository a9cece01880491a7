//! Named track collections
//!
//! User-curated groups of tracks. Held in memory; hosts decide whether and
//! where to persist them (the type is serde-serializable).

use crate::error::{CoreError, Result};
use crate::types::Track;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Named collections of tracks
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Collections {
    entries: BTreeMap<String, Vec<Track>>,
}

impl Collections {
    /// Create an empty set of collections
    pub fn new() -> Self {
        Self::default()
    }

    /// Create `name` if missing, returning whether it was created
    pub fn ensure(&mut self, name: &str) -> Result<bool> {
        let name = validate_name(name)?;
        if self.entries.contains_key(name) {
            return Ok(false);
        }
        self.entries.insert(name.to_string(), Vec::new());
        tracing::debug!("Created collection {}", name);
        Ok(true)
    }

    /// Add `track` to `name`, creating the collection if needed
    ///
    /// Returns `false` if the exact track was already present.
    pub fn add(&mut self, name: &str, track: Track) -> Result<bool> {
        self.ensure(name)?;
        let tracks = self.entries.entry(name.trim().to_string()).or_default();
        if tracks.contains(&track) {
            return Ok(false);
        }
        tracks.push(track);
        Ok(true)
    }

    /// Remove every entry of `name` with the same title and artist as `track`
    ///
    /// Returns the number of entries removed.
    pub fn remove(&mut self, name: &str, track: &Track) -> usize {
        let Some(tracks) = self.entries.get_mut(name.trim()) else {
            return 0;
        };
        let before = tracks.len();
        tracks.retain(|t| t.title != track.title || t.artist != track.artist);
        before - tracks.len()
    }

    /// Delete a collection, returning whether it existed
    pub fn delete(&mut self, name: &str) -> bool {
        self.entries.remove(name.trim()).is_some()
    }

    /// Collection names in sorted order
    pub fn names(&self) -> Vec<&str> {
        self.entries.keys().map(String::as_str).collect()
    }

    /// Tracks in `name`, empty if the collection does not exist
    pub fn tracks(&self, name: &str) -> &[Track] {
        self.entries.get(name.trim()).map_or(&[], Vec::as_slice)
    }
}

fn validate_name(name: &str) -> Result<&str> {
    let name = name.trim();
    if name.is_empty() {
        return Err(CoreError::invalid_input("collection name must not be blank"));
    }
    Ok(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::AudioSource;

    fn track(title: &str, url: &str) -> Track {
        Track::new(title, "Artist", AudioSource::remote(url))
    }

    #[test]
    fn add_creates_collection_and_skips_exact_duplicates() {
        let mut collections = Collections::new();

        assert!(collections.add("Road trip", track("a", "http://x/a")).unwrap());
        assert!(!collections.add("Road trip", track("a", "http://x/a")).unwrap());
        assert!(collections.add("Road trip", track("b", "http://x/b")).unwrap());

        assert_eq!(collections.names(), vec!["Road trip"]);
        assert_eq!(collections.tracks("Road trip").len(), 2);
    }

    #[test]
    fn remove_matches_on_title_and_artist() {
        let mut collections = Collections::new();
        collections.add("mix", track("a", "http://x/a")).unwrap();
        collections.add("mix", track("a", "http://mirror/a")).unwrap();
        collections.add("mix", track("b", "http://x/b")).unwrap();

        assert_eq!(collections.remove("mix", &track("a", "http://other")), 2);
        assert_eq!(collections.tracks("mix"), &[track("b", "http://x/b")]);
        assert_eq!(collections.remove("missing", &track("a", "")), 0);
    }

    #[test]
    fn names_are_sorted_and_delete_reports_existence() {
        let mut collections = Collections::new();
        assert!(collections.ensure("zeta").unwrap());
        assert!(collections.ensure("alpha").unwrap());
        assert!(!collections.ensure("alpha").unwrap());

        assert_eq!(collections.names(), vec!["alpha", "zeta"]);
        assert!(collections.delete("zeta"));
        assert!(!collections.delete("zeta"));
        assert!(collections.tracks("zeta").is_empty());
    }

    #[test]
    fn blank_names_are_rejected() {
        let mut collections = Collections::new();
        let err = collections.ensure("   ").unwrap_err();
        assert!(matches!(err, CoreError::InvalidInput(_)));
        assert!(collections.add("", track("a", "http://x/a")).is_err());
    }
}
