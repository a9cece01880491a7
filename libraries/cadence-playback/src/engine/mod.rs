//! Media engine contract
//!
//! The engine is the platform audio pipeline: it decodes and renders items,
//! owns the item sequence, and reports state changes asynchronously. The
//! coordinator only ever talks to it through [`MediaEngine`], obtained from an
//! injected [`EngineConnector`].

#[cfg(feature = "virtual-engine")]
pub mod virtual_engine;

use crate::types::{Progress, RepeatMode};
use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc;
use url::Url;

/// Engine errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    /// The engine handle could not be obtained
    #[error("Connection failed: {0}")]
    Connection(String),

    /// An engine command failed
    #[error("Command failed: {0}")]
    Command(String),

    /// Item index outside the submitted item list
    #[error("Item index out of bounds: {0}")]
    InvalidIndex(usize),

    /// The engine was released
    #[error("Engine released")]
    Released,
}

/// Result type for engine operations
pub type EngineResult<T> = std::result::Result<T, EngineError>;

/// Engine item identifier
///
/// Identifiers are unique per submission; an identifier from a superseded
/// item list never names an item of the current one.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ItemId(String);

impl ItemId {
    /// Create an identifier
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Identifier text
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Item submitted to the engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineItem {
    /// Identifier reported back in [`EngineEvent::ItemChanged`]
    pub id: ItemId,

    /// Resolved playable locator
    pub uri: Url,

    /// Display title
    pub title: String,

    /// Display artist
    pub artist: String,

    /// Artwork locator
    pub artwork: Option<String>,

    /// Duration hint
    pub duration: Option<Duration>,
}

/// Engine state-change notification
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    /// Audible playback started or stopped
    IsPlayingChanged(bool),

    /// Current item changed (`None` when the item list is empty)
    ItemChanged(Option<ItemId>),

    /// Shuffle flag changed
    ShuffleChanged(bool),

    /// Repeat mode changed
    RepeatChanged(RepeatMode),

    /// Playback failure
    ///
    /// A fatal error leaves the engine idle; it must be reloaded before it
    /// plays again.
    Error { message: String, fatal: bool },
}

/// Cancellable handle over an engine's notification stream
///
/// Dropping or cancelling the handle unregisters the subscriber.
pub struct Subscription {
    events: mpsc::UnboundedReceiver<EngineEvent>,
    on_cancel: Option<Box<dyn FnOnce() + Send>>,
}

impl Subscription {
    /// Create a subscription and the sender the engine publishes into
    ///
    /// Engines detect a cancelled subscriber through
    /// [`mpsc::UnboundedSender::is_closed`].
    pub fn channel() -> (mpsc::UnboundedSender<EngineEvent>, Self) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            tx,
            Self {
                events: rx,
                on_cancel: None,
            },
        )
    }

    /// Run `hook` once when the subscription is cancelled or dropped
    #[must_use]
    pub fn with_cancel_hook(mut self, hook: impl FnOnce() + Send + 'static) -> Self {
        self.on_cancel = Some(Box::new(hook));
        self
    }

    /// Next notification, or `None` once the engine stops publishing
    pub async fn next(&mut self) -> Option<EngineEvent> {
        self.events.recv().await
    }

    /// Unregister from the engine
    pub fn cancel(&mut self) {
        self.events.close();
        if let Some(hook) = self.on_cancel.take() {
            hook();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.cancel();
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription").finish_non_exhaustive()
    }
}

/// Platform media engine
///
/// Implementors wrap the platform's audio pipeline. All methods take `&self`;
/// implementations synchronize internally. Navigation follows the engine's
/// own shuffle order and repeat mode.
#[async_trait]
pub trait MediaEngine: Send + Sync {
    /// Replace the item list and select `start_index`
    async fn set_items(&self, items: Vec<EngineItem>, start_index: usize) -> EngineResult<()>;

    /// Prepare the current item for playback
    async fn prepare(&self) -> EngineResult<()>;

    /// Request playback
    async fn play(&self) -> EngineResult<()>;

    /// Halt playback, keeping the position
    async fn pause(&self) -> EngineResult<()>;

    /// Whether audio is being produced
    async fn is_playing(&self) -> bool;

    /// Move the playhead within the current item
    async fn seek(&self, position: Duration) -> EngineResult<()>;

    /// Select item `index` (submission order) at `position`
    async fn seek_to_item(&self, index: usize, position: Duration) -> EngineResult<()>;

    /// Whether a manual `next` would move
    async fn has_next(&self) -> bool;

    /// Whether a manual `previous` would move
    async fn has_previous(&self) -> bool;

    /// Move to the next item
    async fn next(&self) -> EngineResult<()>;

    /// Move to the previous item
    async fn previous(&self) -> EngineResult<()>;

    /// Whether shuffled traversal is enabled
    async fn shuffle_enabled(&self) -> bool;

    /// Enable or disable shuffled traversal
    async fn set_shuffle_enabled(&self, enabled: bool) -> EngineResult<()>;

    /// Current repeat mode
    async fn repeat_mode(&self) -> RepeatMode;

    /// Set the repeat mode
    async fn set_repeat_mode(&self, mode: RepeatMode) -> EngineResult<()>;

    /// Current playhead
    async fn progress(&self) -> Progress;

    /// Bring up whatever hosts the engine (for example a background service)
    async fn ensure_running(&self) -> EngineResult<()> {
        Ok(())
    }

    /// Register for state-change notifications
    async fn subscribe(&self) -> Subscription;

    /// Release the engine; later commands fail with [`EngineError::Released`]
    async fn release(&self);
}

/// Source of engine handles
///
/// Connection is asynchronous: the handle may not exist until a platform
/// service has started.
#[async_trait]
pub trait EngineConnector: Send + Sync {
    /// Obtain an engine handle
    async fn connect(&self) -> EngineResult<Arc<dyn MediaEngine>>;
}
