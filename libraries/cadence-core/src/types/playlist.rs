/// Playlist domain type
use crate::types::Track;
use serde::{Deserialize, Serialize};

/// Ordered sequence of tracks
///
/// The same track may appear more than once. Playlists are replaced
/// wholesale; there is no in-place editing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Playlist {
    tracks: Vec<Track>,
}

impl Playlist {
    /// Create a playlist from tracks
    pub fn new(tracks: Vec<Track>) -> Self {
        Self { tracks }
    }

    /// Number of tracks
    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    /// Whether the playlist has no tracks
    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    /// Track at `index`
    pub fn get(&self, index: usize) -> Option<&Track> {
        self.tracks.get(index)
    }

    /// All tracks in order
    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    /// Iterate tracks in order
    pub fn iter(&self) -> std::slice::Iter<'_, Track> {
        self.tracks.iter()
    }

    /// Index of the first occurrence of `track`
    pub fn position(&self, track: &Track) -> Option<usize> {
        self.tracks.iter().position(|t| t == track)
    }

    /// Clamp `index` into `0..len`, or `None` for an empty playlist
    pub fn clamp_index(&self, index: usize) -> Option<usize> {
        if self.tracks.is_empty() {
            None
        } else {
            Some(index.min(self.tracks.len() - 1))
        }
    }

    /// Consume into the underlying tracks
    pub fn into_tracks(self) -> Vec<Track> {
        self.tracks
    }
}

impl From<Vec<Track>> for Playlist {
    fn from(tracks: Vec<Track>) -> Self {
        Self::new(tracks)
    }
}

impl FromIterator<Track> for Playlist {
    fn from_iter<I: IntoIterator<Item = Track>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a Playlist {
    type Item = &'a Track;
    type IntoIter = std::slice::Iter<'a, Track>;

    fn into_iter(self) -> Self::IntoIter {
        self.tracks.iter()
    }
}
