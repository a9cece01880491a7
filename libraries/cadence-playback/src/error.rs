//! Error types for playback coordination

use cadence_core::Track;
use thiserror::Error;

/// Playback errors surfaced through the coordinator's `last_error`
///
/// These are values, not control flow: intents never return them, the
/// coordinator stores the most recent one for the presentation layer to show
/// and clear.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlaybackError {
    /// Caller supplied zero tracks
    #[error("Playlist is empty")]
    EmptyPlaylist,

    /// The only track's source could not be turned into a playable locator
    #[error("Cannot play \"{title}\": {reason}")]
    UnresolvedSource { title: String, reason: String },

    /// Every track of a multi-track playlist was unresolvable
    #[error("None of the {} tracks could be played", skipped.len())]
    NoPlayableTracks { skipped: Vec<Track> },

    /// The media engine handle could not be obtained
    #[error("Engine connection failed: {0}")]
    EngineConnection(String),

    /// The media engine failed after connection
    #[error("Engine error: {0}")]
    EngineRuntime(String),
}

impl PlaybackError {
    /// Whether this error came from the media engine
    pub fn is_engine_error(&self) -> bool {
        matches!(self, Self::EngineConnection(_) | Self::EngineRuntime(_))
    }
}

/// Result type for playback operations
pub type Result<T> = std::result::Result<T, PlaybackError>;
