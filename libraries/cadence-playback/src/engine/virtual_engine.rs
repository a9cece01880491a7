//! In-process media engine
//!
//! `VirtualEngine` keeps an item list, a play order and a clock, and behaves
//! like a platform player without producing audio:
//! - manual next/previous ignore repeat-one; repeat-all wraps
//! - shuffle walks a random permutation that starts at the current item
//! - items advance on their own once their duration elapses
//! - position follows the tokio clock, so paused-time tests stay deterministic
//!
//! The CLI host plays through it and the integration tests drive the
//! coordinator against it.

use crate::engine::{
    EngineConnector, EngineError, EngineEvent, EngineItem, EngineResult, MediaEngine, Subscription,
};
use crate::types::{Progress, RepeatMode};
use async_trait::async_trait;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Mutex};
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

/// How far ahead of the playhead items count as buffered
const BUFFER_AHEAD: Duration = Duration::from_secs(30);

/// Configuration for the virtual engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VirtualEngineConfig {
    /// Duration of items without a duration hint, in seconds (default: 180)
    pub default_item_secs: u64,

    /// Driver cadence for auto-advance checks, in milliseconds (default: 100)
    pub tick_ms: u64,
}

impl VirtualEngineConfig {
    /// Duration of items without a duration hint
    pub fn default_item_duration(&self) -> Duration {
        Duration::from_secs(self.default_item_secs)
    }

    /// Driver cadence
    pub fn tick(&self) -> Duration {
        Duration::from_millis(self.tick_ms.max(1))
    }
}

impl Default for VirtualEngineConfig {
    fn default() -> Self {
        Self {
            default_item_secs: 180,
            tick_ms: 100,
        }
    }
}

struct EngineState {
    items: Vec<EngineItem>,
    /// Item indices in traversal order
    order: Vec<usize>,
    /// Position in `order`
    cursor: usize,
    play_when_ready: bool,
    prepared: bool,
    ended: bool,
    shuffle: bool,
    repeat: RepeatMode,
    offset: Duration,
    resumed_at: Option<Instant>,
    default_duration: Duration,
    subscribers: Vec<mpsc::UnboundedSender<EngineEvent>>,
    released: bool,
    failure: Option<String>,
    loads: usize,
    progress_reads: usize,
}

impl EngineState {
    fn new(default_duration: Duration) -> Self {
        Self {
            items: Vec::new(),
            order: Vec::new(),
            cursor: 0,
            play_when_ready: false,
            prepared: false,
            ended: false,
            shuffle: false,
            repeat: RepeatMode::Off,
            offset: Duration::ZERO,
            resumed_at: None,
            default_duration,
            subscribers: Vec::new(),
            released: false,
            failure: None,
            loads: 0,
            progress_reads: 0,
        }
    }

    fn current_index(&self) -> Option<usize> {
        self.order.get(self.cursor).copied()
    }

    fn current(&self) -> Option<&EngineItem> {
        self.current_index().and_then(|i| self.items.get(i))
    }

    fn is_playing(&self) -> bool {
        self.play_when_ready && self.prepared && !self.ended && self.current().is_some()
    }

    fn duration(&self) -> Duration {
        self.current().map_or(Duration::ZERO, |item| {
            item.duration.unwrap_or(self.default_duration)
        })
    }

    fn position(&self, now: Instant) -> Duration {
        let elapsed = self
            .resumed_at
            .map_or(Duration::ZERO, |at| now.saturating_duration_since(at));
        (self.offset + elapsed).min(self.duration())
    }

    fn next_cursor(&self) -> Option<usize> {
        if self.order.is_empty() {
            None
        } else if self.cursor + 1 < self.order.len() {
            Some(self.cursor + 1)
        } else if self.repeat == RepeatMode::All {
            Some(0)
        } else {
            None
        }
    }

    fn previous_cursor(&self) -> Option<usize> {
        if self.order.is_empty() {
            None
        } else if self.cursor > 0 {
            Some(self.cursor - 1)
        } else if self.repeat == RepeatMode::All {
            Some(self.order.len() - 1)
        } else {
            None
        }
    }

    fn emit(&mut self, event: &EngineEvent) {
        self.subscribers.retain(|tx| tx.send(event.clone()).is_ok());
    }

    fn move_to(&mut self, cursor: usize) {
        self.cursor = cursor;
        self.offset = Duration::ZERO;
        self.ended = false;
        let id = self.current().map(|item| item.id.clone());
        self.emit(&EngineEvent::ItemChanged(id));
    }

    fn rebuild_order(&mut self, first: Option<usize>) {
        self.order = if self.shuffle {
            shuffled_order(self.items.len(), first)
        } else {
            (0..self.items.len()).collect()
        };
        self.cursor = first
            .and_then(|index| self.order.iter().position(|&i| i == index))
            .unwrap_or(0);
    }

    /// Run `f` with the clock frozen, then resume it and report any change
    /// in audible playback.
    fn apply<T>(&mut self, now: Instant, f: impl FnOnce(&mut Self) -> T) -> T {
        let was_playing = self.is_playing();
        self.offset = self.position(now);
        self.resumed_at = None;

        let result = f(self);

        let playing = self.is_playing();
        if playing {
            self.resumed_at = Some(now);
        }
        if playing != was_playing {
            self.emit(&EngineEvent::IsPlayingChanged(playing));
        }
        result
    }
}

fn shuffled_order(len: usize, first: Option<usize>) -> Vec<usize> {
    let mut rest: Vec<usize> = (0..len).filter(|&i| Some(i) != first).collect();
    rest.shuffle(&mut rand::thread_rng());
    first.filter(|&i| i < len).into_iter().chain(rest).collect()
}

/// In-process media engine
pub struct VirtualEngine {
    state: Mutex<EngineState>,
    config: VirtualEngineConfig,
    driver: CancellationToken,
}

impl VirtualEngine {
    /// Create an engine and start its auto-advance driver
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn(config: VirtualEngineConfig) -> Arc<Self> {
        let engine = Arc::new(Self {
            state: Mutex::new(EngineState::new(config.default_item_duration())),
            config,
            driver: CancellationToken::new(),
        });

        let weak = Arc::downgrade(&engine);
        let token = engine.driver.clone();
        let mut ticks = tokio::time::interval(engine.config.tick());
        ticks.set_missed_tick_behavior(MissedTickBehavior::Skip);

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    () = token.cancelled() => break,
                    _ = ticks.tick() => {
                        let Some(engine) = weak.upgrade() else { break };
                        engine.advance().await;
                    }
                }
            }
            tracing::debug!("Virtual engine driver stopped");
        });

        engine
    }

    /// Engine configuration
    pub fn config(&self) -> &VirtualEngineConfig {
        &self.config
    }

    /// Advance past a finished item according to the repeat mode
    async fn advance(&self) {
        let mut state = self.state.lock().await;
        let now = Instant::now();
        if state.released || !state.is_playing() || state.position(now) < state.duration() {
            return;
        }

        state.apply(now, |s| {
            if s.repeat == RepeatMode::One {
                s.move_to(s.cursor);
            } else if let Some(cursor) = s.next_cursor() {
                s.move_to(cursor);
            } else {
                s.offset = s.duration();
                s.ended = true;
            }
        });
        tracing::trace!("Virtual engine advanced to {:?}", state.current_index());
    }

    async fn update<T>(&self, f: impl FnOnce(&mut EngineState) -> EngineResult<T>) -> EngineResult<T> {
        let mut state = self.state.lock().await;
        if state.released {
            return Err(EngineError::Released);
        }
        if let Some(message) = &state.failure {
            return Err(EngineError::Command(message.clone()));
        }
        state.apply(Instant::now(), f)
    }

    /// Publish a playback failure
    ///
    /// A fatal failure drops the engine back to unprepared, as a platform
    /// player does after a decoder or network error.
    pub async fn inject_error(&self, message: impl Into<String>, fatal: bool) {
        let message = message.into();
        let mut state = self.state.lock().await;
        state.apply(Instant::now(), |s| {
            s.emit(&EngineEvent::Error {
                message: message.clone(),
                fatal,
            });
            if fatal {
                s.prepared = false;
            }
        });
        tracing::debug!("Injected engine error: {} (fatal: {})", message, fatal);
    }

    /// Make every command fail with `message` until cleared with `None`
    pub async fn set_command_failure(&self, message: Option<String>) {
        self.state.lock().await.failure = message;
    }

    /// Number of live subscribers
    pub async fn subscriber_count(&self) -> usize {
        let mut state = self.state.lock().await;
        state.subscribers.retain(|tx| !tx.is_closed());
        state.subscribers.len()
    }

    /// Whether `release` was called
    pub async fn is_released(&self) -> bool {
        self.state.lock().await.released
    }

    /// Submitted items in submission order
    pub async fn items(&self) -> Vec<EngineItem> {
        self.state.lock().await.items.clone()
    }

    /// Submission index of the current item
    pub async fn current_item_index(&self) -> Option<usize> {
        self.state.lock().await.current_index()
    }

    /// Item indices in traversal order
    pub async fn play_order(&self) -> Vec<usize> {
        self.state.lock().await.order.clone()
    }

    /// Number of `set_items` calls
    pub async fn load_count(&self) -> usize {
        self.state.lock().await.loads
    }

    /// Number of `progress` reads
    pub async fn progress_reads(&self) -> usize {
        self.state.lock().await.progress_reads
    }
}

impl Drop for VirtualEngine {
    fn drop(&mut self) {
        self.driver.cancel();
    }
}

#[async_trait]
impl MediaEngine for VirtualEngine {
    async fn set_items(&self, items: Vec<EngineItem>, start_index: usize) -> EngineResult<()> {
        self.update(|s| {
            if !items.is_empty() && start_index >= items.len() {
                return Err(EngineError::InvalidIndex(start_index));
            }
            s.loads += 1;
            s.items = items;
            s.prepared = false;
            let first = (!s.items.is_empty()).then_some(start_index);
            s.rebuild_order(first);
            s.move_to(s.cursor);
            Ok(())
        })
        .await
    }

    async fn prepare(&self) -> EngineResult<()> {
        self.update(|s| {
            s.prepared = !s.items.is_empty();
            Ok(())
        })
        .await
    }

    async fn play(&self) -> EngineResult<()> {
        self.update(|s| {
            s.play_when_ready = true;
            Ok(())
        })
        .await
    }

    async fn pause(&self) -> EngineResult<()> {
        self.update(|s| {
            s.play_when_ready = false;
            Ok(())
        })
        .await
    }

    async fn is_playing(&self) -> bool {
        self.state.lock().await.is_playing()
    }

    async fn seek(&self, position: Duration) -> EngineResult<()> {
        self.update(|s| {
            if s.current().is_some() {
                s.offset = position.min(s.duration());
                s.ended = false;
            }
            Ok(())
        })
        .await
    }

    async fn seek_to_item(&self, index: usize, position: Duration) -> EngineResult<()> {
        self.update(|s| {
            let cursor = s
                .order
                .iter()
                .position(|&i| i == index)
                .ok_or(EngineError::InvalidIndex(index))?;
            if cursor == s.cursor {
                s.ended = false;
            } else {
                s.move_to(cursor);
            }
            s.offset = position.min(s.duration());
            Ok(())
        })
        .await
    }

    async fn has_next(&self) -> bool {
        self.state.lock().await.next_cursor().is_some()
    }

    async fn has_previous(&self) -> bool {
        self.state.lock().await.previous_cursor().is_some()
    }

    async fn next(&self) -> EngineResult<()> {
        self.update(|s| {
            if let Some(cursor) = s.next_cursor() {
                s.move_to(cursor);
            }
            Ok(())
        })
        .await
    }

    async fn previous(&self) -> EngineResult<()> {
        self.update(|s| {
            if let Some(cursor) = s.previous_cursor() {
                s.move_to(cursor);
            }
            Ok(())
        })
        .await
    }

    async fn shuffle_enabled(&self) -> bool {
        self.state.lock().await.shuffle
    }

    async fn set_shuffle_enabled(&self, enabled: bool) -> EngineResult<()> {
        self.update(|s| {
            if s.shuffle != enabled {
                s.shuffle = enabled;
                let current = s.current_index();
                s.rebuild_order(current);
                s.emit(&EngineEvent::ShuffleChanged(enabled));
            }
            Ok(())
        })
        .await
    }

    async fn repeat_mode(&self) -> RepeatMode {
        self.state.lock().await.repeat
    }

    async fn set_repeat_mode(&self, mode: RepeatMode) -> EngineResult<()> {
        self.update(|s| {
            if s.repeat != mode {
                s.repeat = mode;
                s.emit(&EngineEvent::RepeatChanged(mode));
            }
            Ok(())
        })
        .await
    }

    async fn progress(&self) -> Progress {
        let mut state = self.state.lock().await;
        state.progress_reads += 1;
        if state.current().is_none() {
            return Progress::default();
        }

        let duration = state.duration();
        let position = state.position(Instant::now());
        Progress {
            position,
            duration,
            buffered: (position + BUFFER_AHEAD).min(duration),
        }
    }

    async fn ensure_running(&self) -> EngineResult<()> {
        if self.state.lock().await.released {
            return Err(EngineError::Released);
        }
        Ok(())
    }

    async fn subscribe(&self) -> Subscription {
        let (tx, subscription) = Subscription::channel();
        let mut state = self.state.lock().await;
        if !state.released {
            state.subscribers.push(tx);
        }
        subscription
    }

    async fn release(&self) {
        let mut state = self.state.lock().await;
        if state.released {
            return;
        }
        state.released = true;
        state.play_when_ready = false;
        state.resumed_at = None;
        state.subscribers.clear();
        drop(state);

        self.driver.cancel();
        tracing::debug!("Virtual engine released");
    }
}

/// Connector handing out a shared [`VirtualEngine`]
///
/// Can be told to fail its first few attempts to exercise reconnect paths.
pub struct VirtualConnector {
    engine: Arc<VirtualEngine>,
    failures_left: AtomicUsize,
    attempts: AtomicUsize,
    delay: Duration,
}

impl VirtualConnector {
    /// Connector that always succeeds
    pub fn new(engine: Arc<VirtualEngine>) -> Self {
        Self {
            engine,
            failures_left: AtomicUsize::new(0),
            attempts: AtomicUsize::new(0),
            delay: Duration::ZERO,
        }
    }

    /// Fail the first `n` connection attempts
    #[must_use]
    pub fn failing_first(self, n: usize) -> Self {
        self.failures_left.store(n, Ordering::SeqCst);
        self
    }

    /// Take `delay` to answer each connection attempt
    #[must_use]
    pub fn with_connect_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Number of connection attempts so far
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    /// The engine this connector hands out
    pub fn engine(&self) -> &Arc<VirtualEngine> {
        &self.engine
    }
}

#[async_trait]
impl EngineConnector for VirtualConnector {
    async fn connect(&self) -> EngineResult<Arc<dyn MediaEngine>> {
        let attempt = self.attempts.fetch_add(1, Ordering::SeqCst) + 1;
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        let fail = self
            .failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if fail {
            tracing::debug!("Virtual engine refused connection attempt {}", attempt);
            return Err(EngineError::Connection(
                "virtual engine unavailable".to_string(),
            ));
        }

        let engine: Arc<dyn MediaEngine> = self.engine.clone();
        Ok(engine)
    }
}
