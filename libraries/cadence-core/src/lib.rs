//! Cadence Core
//!
//! Platform-agnostic data model and library collaborators for Cadence.
//!
//! This crate provides the values the playback coordinator works with and the
//! collaborators that supply them:
//! - **Domain Types**: `Track`, `AudioSource`, `Playlist`
//! - **Catalog**: ordered track lists with substring search and a bundled seed
//! - **Favorites / Collections**: in-memory membership sets keyed by track
//! - **Error Handling**: `CoreError` and `Result`
//!
//! # Example
//!
//! ```rust
//! use cadence_core::{AudioSource, Catalog, Playlist, Track};
//!
//! let catalog = Catalog::seed();
//! let hits = catalog.search("aurora");
//! assert_eq!(hits.len(), 1);
//!
//! let track = Track::new("Song1", "Artist1", AudioSource::remote("http://x/1.mp3"));
//! let playlist = Playlist::new(vec![track.clone(), track]);
//! assert_eq!(playlist.len(), 2);
//! ```

#![forbid(unsafe_code)]

pub mod catalog;
pub mod collections;
pub mod error;
pub mod favorites;
pub mod types;

pub use catalog::Catalog;
pub use collections::Collections;
pub use error::{CoreError, Result};
pub use favorites::Favorites;
pub use types::{AudioSource, Playlist, Track};
