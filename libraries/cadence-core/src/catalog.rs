//! Track catalog
//!
//! Ordered list of tracks supplied to the player, with substring search.
//! Catalogs come from a TOML document (`[[tracks]]` tables) or the bundled
//! seed data.

use crate::error::Result;
use crate::types::{AudioSource, Playlist, Track};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Ordered track catalog
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Catalog {
    #[serde(default)]
    tracks: Vec<Track>,
}

impl Catalog {
    /// Create a catalog from tracks
    pub fn new(tracks: Vec<Track>) -> Self {
        Self { tracks }
    }

    /// Bundled sample catalog with public streaming previews
    pub fn seed() -> Self {
        let sample = |title: &str, secs: u32| {
            Track::new(
                title,
                "SampleLib Ensemble",
                AudioSource::remote(format!(
                    "https://samplelib.com/lib/preview/mp3/sample-{}s.mp3",
                    secs
                )),
            )
            .with_duration_secs(secs)
        };

        Self::new(vec![
            sample("Sunrise Prelude", 6),
            sample("Moonlight Echoes", 9),
            sample("Stardust Journey", 12),
            sample("Aurora Dreams", 15),
        ])
    }

    /// Parse a catalog from a TOML document
    pub fn from_toml_str(document: &str) -> Result<Self> {
        let catalog: Catalog = toml::from_str(document)?;
        tracing::debug!("Parsed catalog with {} tracks", catalog.tracks.len());
        Ok(catalog)
    }

    /// Load a catalog from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let document = std::fs::read_to_string(path)?;
        let catalog = Self::from_toml_str(&document)?;
        tracing::info!(
            "Loaded catalog from {} ({} tracks)",
            path.display(),
            catalog.len()
        );
        Ok(catalog)
    }

    /// All tracks in catalog order
    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    /// Number of tracks
    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    /// Whether the catalog is empty
    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    /// Tracks whose title or artist contains `query`, ignoring case
    ///
    /// A blank query matches nothing.
    pub fn search(&self, query: &str) -> Vec<&Track> {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return Vec::new();
        }

        self.tracks
            .iter()
            .filter(|track| {
                track.title.to_lowercase().contains(&needle)
                    || track.artist.to_lowercase().contains(&needle)
            })
            .collect()
    }

    /// The whole catalog as a playlist
    pub fn to_playlist(&self) -> Playlist {
        Playlist::new(self.tracks.clone())
    }
}
