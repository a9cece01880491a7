//! Core types for playback coordination

use crate::error::PlaybackError;
use cadence_core::{Playlist, Track};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Repeat mode
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RepeatMode {
    /// Stop when the item list ends
    #[default]
    Off,

    /// Loop the entire item list
    All,

    /// Loop the current item only
    One,
}

impl RepeatMode {
    /// Next mode in the Off → All → One → Off rotation
    pub fn cycle(self) -> Self {
        match self {
            RepeatMode::Off => RepeatMode::All,
            RepeatMode::All => RepeatMode::One,
            RepeatMode::One => RepeatMode::Off,
        }
    }
}

/// Transport phase
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransportPhase {
    /// No playlist loaded
    #[default]
    Idle,

    /// Playlist submitted, engine not yet reporting playback
    Loading,

    /// Engine is producing audio
    Playing,

    /// Playlist loaded, playback halted
    Paused,
}

/// Playhead position as reported by the engine
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Progress {
    /// Elapsed position in the current item
    pub position: Duration,

    /// Total duration of the current item (zero when unknown)
    pub duration: Duration,

    /// Buffered position in the current item
    pub buffered: Duration,
}

impl Progress {
    /// Clamp positions into `[0, duration]` when the duration is known
    #[must_use]
    pub fn clamped(self) -> Self {
        if self.duration.is_zero() {
            return self;
        }
        Self {
            position: self.position.min(self.duration),
            duration: self.duration,
            buffered: self.buffered.min(self.duration),
        }
    }

    /// Fraction of the item played, in `[0, 1]`
    pub fn fraction(&self) -> f64 {
        if self.duration.is_zero() {
            0.0
        } else {
            (self.position.as_secs_f64() / self.duration.as_secs_f64()).clamp(0.0, 1.0)
        }
    }
}

/// Mirrored engine transport state
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransportState {
    /// Transport phase
    pub phase: TransportPhase,

    /// Whether the engine reports audible playback
    pub is_playing: bool,

    /// Latest polled playhead
    pub progress: Progress,

    /// Whether the engine traverses items in shuffled order
    pub shuffle_enabled: bool,

    /// Engine repeat mode
    pub repeat_mode: RepeatMode,
}

/// Observable coordinator snapshot
///
/// Published through a watch channel after every intent, engine notification
/// and poll. `current_index` is always a valid index into `playlist` when set.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlayerState {
    /// Effective playlist (tracks whose source resolved)
    pub playlist: Playlist,

    /// Index of the current track in `playlist`
    pub current_index: Option<usize>,

    /// Current track
    pub current_track: Option<Track>,

    /// Transport state
    pub transport: TransportState,

    /// Tracks skipped at the last load because their source did not resolve
    pub unplayable: Vec<Track>,

    /// Most recent error, until cleared
    pub last_error: Option<PlaybackError>,
}

impl PlayerState {
    /// Whether the engine reports audible playback
    pub fn is_playing(&self) -> bool {
        self.transport.is_playing
    }

    /// Whether `track` is the one currently selected
    pub fn is_current(&self, track: &Track) -> bool {
        self.current_track.as_ref() == Some(track)
    }
}

/// Configuration for the playback coordinator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoordinatorConfig {
    /// Position polling cadence in milliseconds (default: 500)
    pub poll_interval_ms: u64,

    /// Delay before the single reconnect attempt in milliseconds (default: 1000)
    pub reconnect_delay_ms: u64,
}

impl CoordinatorConfig {
    /// Position polling cadence
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }

    /// Delay before the reconnect attempt
    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_delay_ms)
    }
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 500,
            reconnect_delay_ms: 1000,
        }
    }
}
