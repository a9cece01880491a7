//! Cadence - Playback Coordination
//!
//! Platform-agnostic playback coordination for Cadence.
//!
//! This crate provides:
//! - A playback coordinator that mirrors a media engine into observable state
//! - The media engine contract (`MediaEngine`, `EngineConnector`)
//! - Engine sessions with a single reconnect attempt
//! - Audio source resolution (bundled resources, http(s) streams)
//! - Repeat modes (Off, All, One) and shuffle passthrough
//! - A sleep timer
//! - An in-process virtual engine (feature `virtual-engine`, on by default)
//!
//! # Architecture
//!
//! The coordinator runs as a single tokio task that owns all playback state.
//! Handles send fire-and-forget intents; the task forwards them to the engine,
//! applies engine notifications, polls the playhead, and publishes a
//! [`PlayerState`] snapshot through a watch channel. Errors are never
//! returned from intents: the most recent one is kept in
//! [`PlayerState::last_error`] until cleared.
//!
//! The engine is injected through an [`EngineConnector`]; nothing here knows
//! about a particular platform's audio stack.
//!
//! # Example
//!
//! ```rust
//! use cadence_core::{AudioSource, Track};
//! use cadence_playback::engine::virtual_engine::{
//!     VirtualConnector, VirtualEngine, VirtualEngineConfig,
//! };
//! use cadence_playback::{CoordinatorConfig, PlaybackCoordinator};
//! use std::sync::Arc;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let engine = VirtualEngine::spawn(VirtualEngineConfig::default());
//! let connector = Arc::new(VirtualConnector::new(engine));
//! let coordinator = PlaybackCoordinator::new(connector, CoordinatorConfig::default());
//!
//! let tracks = vec![
//!     Track::new("Song1", "Artist1", AudioSource::remote("http://x/1.mp3")),
//!     Track::new("Song2", "Artist2", AudioSource::remote("http://x/2.mp3")),
//! ];
//! coordinator.load_playlist(tracks.clone(), 0);
//!
//! let state = coordinator.wait_for(|s| s.is_playing()).await;
//! assert_eq!(state.current_track.as_ref(), Some(&tracks[0]));
//!
//! coordinator.shutdown().await;
//! # }
//! ```

#![forbid(unsafe_code)]

pub mod coordinator;
pub mod engine;
mod error;
pub mod resolve;
pub mod session;
pub mod sleep_timer;
pub mod types;

pub use coordinator::PlaybackCoordinator;
pub use engine::{
    EngineConnector, EngineError, EngineEvent, EngineItem, EngineResult, ItemId, MediaEngine,
    Subscription,
};
pub use error::{PlaybackError, Result};
pub use resolve::{BundleResolver, ResolveError, SourceResolver};
pub use session::PlaybackSession;
pub use sleep_timer::SleepTimer;
pub use types::{
    CoordinatorConfig, PlayerState, Progress, RepeatMode, TransportPhase, TransportState,
};

#[cfg(feature = "virtual-engine")]
pub use engine::virtual_engine::{VirtualConnector, VirtualEngine, VirtualEngineConfig};
