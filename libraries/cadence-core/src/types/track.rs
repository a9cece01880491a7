/// Track domain type
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Where a track's audio comes from
///
/// Resolution into a playable locator happens in the playback layer; this is
/// only the raw reference as supplied by the library.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AudioSource {
    /// Identifier of a resource bundled with the application
    Bundled(String),

    /// Remote locator (expected to be an http(s) URL)
    Remote(String),
}

impl AudioSource {
    /// Create a bundled-resource source
    pub fn bundled(name: impl Into<String>) -> Self {
        Self::Bundled(name.into())
    }

    /// Create a remote source
    pub fn remote(locator: impl Into<String>) -> Self {
        Self::Remote(locator.into())
    }
}

impl fmt::Display for AudioSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AudioSource::Bundled(name) => write!(f, "bundled:{}", name),
            AudioSource::Remote(locator) => f.write_str(locator),
        }
    }
}

/// Audio track
///
/// Tracks carry no identifier: two tracks with identical fields are the same
/// track as far as "is this the one playing" checks are concerned.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Track {
    /// Track title
    pub title: String,

    /// Artist name
    pub artist: String,

    /// Artwork locator
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artwork: Option<String>,

    /// Audio source
    pub source: AudioSource,

    /// Duration hint in seconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_secs: Option<u32>,
}

impl Track {
    /// Create a new track with minimal metadata
    pub fn new(title: impl Into<String>, artist: impl Into<String>, source: AudioSource) -> Self {
        Self {
            title: title.into(),
            artist: artist.into(),
            artwork: None,
            source,
            duration_secs: None,
        }
    }

    /// Set the artwork locator
    #[must_use]
    pub fn with_artwork(mut self, artwork: impl Into<String>) -> Self {
        self.artwork = Some(artwork.into());
        self
    }

    /// Set the duration hint
    #[must_use]
    pub fn with_duration_secs(mut self, secs: u32) -> Self {
        self.duration_secs = Some(secs);
        self
    }

    /// Get the duration hint as a Duration
    pub fn duration_hint(&self) -> Option<Duration> {
        self.duration_secs
            .filter(|secs| *secs > 0)
            .map(|secs| Duration::from_secs(u64::from(secs)))
    }

    /// Key used for favorite and collection membership
    pub fn membership_key(&self) -> String {
        format!("{}||{}", self.title, self.artist)
    }

    /// Title for display, with a placeholder for blank titles
    pub fn display_title(&self) -> &str {
        if self.title.trim().is_empty() {
            "Unknown title"
        } else {
            &self.title
        }
    }

    /// Artist for display, with a placeholder for blank artists
    pub fn display_artist(&self) -> &str {
        if self.artist.trim().is_empty() {
            "Unknown artist"
        } else {
            &self.artist
        }
    }
}

impl fmt::Display for Track {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} - {}", self.display_artist(), self.display_title())
    }
}
