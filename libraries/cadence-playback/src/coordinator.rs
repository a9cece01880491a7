//! Playback coordinator
//!
//! The coordinator is the single in-process view of what is playing. A
//! background task owns all state and serializes four inputs: intents from
//! [`PlaybackCoordinator`] handles, engine notifications, position poll ticks
//! and cancellation. Observers read [`PlayerState`] snapshots from a watch
//! channel; intents never return errors, failures land in
//! [`PlayerState::last_error`].

use crate::engine::{EngineConnector, EngineEvent, EngineItem, ItemId, MediaEngine, Subscription};
use crate::error::PlaybackError;
use crate::resolve::{BundleResolver, SourceResolver};
use crate::session::PlaybackSession;
use crate::types::{CoordinatorConfig, PlayerState, Progress, TransportPhase};
use cadence_core::{Playlist, Track};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::{CancellationToken, DropGuard};

/// User intents forwarded to the coordinator task
#[derive(Debug)]
enum Intent {
    LoadPlaylist { playlist: Playlist, start_index: usize },
    PlayAt(usize),
    TogglePlayPause,
    Play,
    Pause,
    Next,
    Previous,
    Seek(Duration),
    ToggleShuffle,
    CycleRepeatMode,
    ClearError,
}

/// Handle to a running playback coordinator
///
/// Handles are cheap to clone. The coordinator tears down (stops polling,
/// drops its engine subscription, releases the engine) when [`shutdown`] is
/// called or the last handle is dropped.
///
/// [`shutdown`]: PlaybackCoordinator::shutdown
#[derive(Clone)]
pub struct PlaybackCoordinator {
    intents: mpsc::UnboundedSender<Intent>,
    state: watch::Receiver<PlayerState>,
    cancel: CancellationToken,
    _guard: Arc<DropGuard>,
}

impl PlaybackCoordinator {
    /// Start a coordinator using the default [`BundleResolver`]
    ///
    /// Must be called from within a tokio runtime.
    pub fn new(connector: Arc<dyn EngineConnector>, config: CoordinatorConfig) -> Self {
        Self::with_resolver(connector, Arc::new(BundleResolver::new()), config)
    }

    /// Start a coordinator with a custom source resolver
    ///
    /// Must be called from within a tokio runtime.
    pub fn with_resolver(
        connector: Arc<dyn EngineConnector>,
        resolver: Arc<dyn SourceResolver>,
        config: CoordinatorConfig,
    ) -> Self {
        let (intent_tx, intent_rx) = mpsc::unbounded_channel();
        let (state_tx, state_rx) = watch::channel(PlayerState::default());
        let cancel = CancellationToken::new();

        let actor = Actor {
            session: PlaybackSession::new(connector, config.reconnect_delay()),
            config,
            resolver,
            published: state_tx,
            snapshot: PlayerState::default(),
            items: HashMap::new(),
            generation: 0,
        };
        tokio::spawn(actor.run(intent_rx, cancel.clone()));

        Self {
            intents: intent_tx,
            state: state_rx,
            _guard: Arc::new(cancel.clone().drop_guard()),
            cancel,
        }
    }

    fn send(&self, intent: Intent) {
        if self.intents.send(intent).is_err() {
            tracing::debug!("Coordinator stopped, intent dropped");
        }
    }

    /// Replace the playlist and start playing at `start_index`
    ///
    /// The index is clamped into range. Tracks whose source does not resolve
    /// are skipped and listed in [`PlayerState::unplayable`].
    pub fn load_playlist(&self, tracks: impl Into<Playlist>, start_index: usize) {
        self.send(Intent::LoadPlaylist {
            playlist: tracks.into(),
            start_index,
        });
    }

    /// Jump to track `index` of the current playlist; out of range is ignored
    pub fn play_at(&self, index: usize) {
        self.send(Intent::PlayAt(index));
    }

    /// Pause if playing, play otherwise
    pub fn toggle_play_pause(&self) {
        self.send(Intent::TogglePlayPause);
    }

    /// Resume playback
    pub fn play(&self) {
        self.send(Intent::Play);
    }

    /// Pause playback
    pub fn pause(&self) {
        self.send(Intent::Pause);
    }

    /// Skip forward if the engine has a next item
    pub fn next(&self) {
        self.send(Intent::Next);
    }

    /// Skip back if the engine has a previous item
    pub fn previous(&self) {
        self.send(Intent::Previous);
    }

    /// Move the playhead to `position` in the current track
    pub fn seek(&self, position: Duration) {
        self.send(Intent::Seek(position));
    }

    /// Flip shuffled traversal
    pub fn toggle_shuffle(&self) {
        self.send(Intent::ToggleShuffle);
    }

    /// Rotate repeat mode Off → All → One → Off
    pub fn cycle_repeat_mode(&self) {
        self.send(Intent::CycleRepeatMode);
    }

    /// Forget the last error
    pub fn clear_error(&self) {
        self.send(Intent::ClearError);
    }

    /// Current snapshot
    pub fn state(&self) -> PlayerState {
        self.state.borrow().clone()
    }

    /// Receiver notified on every snapshot change
    pub fn subscribe(&self) -> watch::Receiver<PlayerState> {
        self.state.clone()
    }

    /// Wait until `predicate` holds for the snapshot, and return it
    ///
    /// Returns the final snapshot if the coordinator stops first.
    pub async fn wait_for(&self, predicate: impl FnMut(&PlayerState) -> bool) -> PlayerState {
        let mut rx = self.state.clone();
        let result = rx.wait_for(predicate).await.map(|state| state.clone());
        match result {
            Ok(state) => state,
            Err(_) => rx.borrow().clone(),
        }
    }

    /// Tear down and wait until the engine is released
    pub async fn shutdown(&self) {
        self.cancel.cancel();
        let mut rx = self.state.clone();
        while rx.changed().await.is_ok() {}
        tracing::debug!("Coordinator shut down");
    }

    /// Whether the coordinator task has stopped
    pub fn is_closed(&self) -> bool {
        self.intents.is_closed()
    }
}

impl std::fmt::Debug for PlaybackCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlaybackCoordinator")
            .field("state", &*self.state.borrow())
            .finish_non_exhaustive()
    }
}

/// Coordinator task state
struct Actor {
    config: CoordinatorConfig,
    resolver: Arc<dyn SourceResolver>,
    session: PlaybackSession,
    published: watch::Sender<PlayerState>,
    snapshot: PlayerState,
    /// Items of the current load, rebuilt wholesale per load
    items: HashMap<ItemId, (usize, Track)>,
    generation: u64,
}

/// Next engine notification, or never when unsubscribed
async fn next_event(subscription: &mut Option<Subscription>) -> Option<EngineEvent> {
    match subscription {
        Some(subscription) => subscription.next().await,
        None => std::future::pending().await,
    }
}

impl Actor {
    async fn run(mut self, mut intents: mpsc::UnboundedReceiver<Intent>, cancel: CancellationToken) {
        let connected = tokio::select! {
            () = cancel.cancelled() => {
                tracing::info!("Coordinator cancelled before engine connection");
                return;
            }
            result = self.session.connect() => result,
        };

        let mut subscription = match connected {
            Ok(engine) => Some(engine.subscribe().await),
            Err(err) => {
                self.surface(err);
                self.publish();
                None
            }
        };

        let mut poll = tokio::time::interval(self.config.poll_interval());
        poll.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                () = cancel.cancelled() => break,
                intent = intents.recv() => match intent {
                    Some(intent) => self.handle_intent(intent).await,
                    None => break,
                },
                event = next_event(&mut subscription) => match event {
                    Some(event) => self.handle_event(event),
                    None => {
                        tracing::warn!("Engine notification stream ended");
                        subscription = None;
                    }
                },
                _ = poll.tick(), if self.session.is_connected() => self.poll().await,
            }
            self.publish();
        }

        if let Some(mut subscription) = subscription.take() {
            subscription.cancel();
        }
        self.session.release().await;
        tracing::info!("Coordinator stopped");
    }

    /// Publish the snapshot if it changed
    fn publish(&self) {
        let snapshot = &self.snapshot;
        self.published.send_if_modified(|current| {
            if current == snapshot {
                false
            } else {
                current.clone_from(snapshot);
                true
            }
        });
    }

    fn surface(&mut self, err: PlaybackError) {
        tracing::warn!("Playback error: {}", err);
        self.snapshot.last_error = Some(err);
    }

    /// Connected engine, or surface the connection failure
    fn engine(&mut self) -> Option<Arc<dyn MediaEngine>> {
        match self.session.engine().map(Arc::clone) {
            Ok(engine) => Some(engine),
            Err(err) => {
                self.surface(err);
                None
            }
        }
    }

    /// Surface a failed engine command
    fn check<T>(&mut self, result: crate::engine::EngineResult<T>) -> Option<T> {
        match result {
            Ok(value) => Some(value),
            Err(e) => {
                self.surface(PlaybackError::EngineRuntime(e.to_string()));
                None
            }
        }
    }

    async fn handle_intent(&mut self, intent: Intent) {
        tracing::debug!("Intent: {:?}", intent);

        let intent = match intent {
            Intent::ClearError => {
                self.snapshot.last_error = None;
                return;
            }
            Intent::LoadPlaylist {
                playlist,
                start_index,
            } => {
                self.load_playlist(playlist, start_index).await;
                return;
            }
            Intent::PlayAt(index) if index >= self.snapshot.playlist.len() => {
                tracing::debug!("Ignoring play_at({}) outside playlist", index);
                return;
            }
            other => other,
        };

        let Some(engine) = self.engine() else {
            return;
        };

        match intent {
            Intent::PlayAt(index) => {
                let result = engine.seek_to_item(index, Duration::ZERO).await;
                if self.check(result).is_some() {
                    let result = engine.play().await;
                    self.check(result);
                }
            }
            Intent::TogglePlayPause => {
                let result = if engine.is_playing().await {
                    engine.pause().await
                } else {
                    engine.play().await
                };
                self.check(result);
            }
            Intent::Play => {
                let result = engine.play().await;
                self.check(result);
            }
            Intent::Pause => {
                let result = engine.pause().await;
                self.check(result);
            }
            Intent::Next => {
                if engine.has_next().await {
                    let result = engine.next().await;
                    self.check(result);
                }
            }
            Intent::Previous => {
                if engine.has_previous().await {
                    let result = engine.previous().await;
                    self.check(result);
                }
            }
            Intent::Seek(position) => {
                let result = engine.seek(position).await;
                if self.check(result).is_some() {
                    self.poll().await;
                }
            }
            Intent::ToggleShuffle => {
                let enabled = engine.shuffle_enabled().await;
                let result = engine.set_shuffle_enabled(!enabled).await;
                self.check(result);
            }
            Intent::CycleRepeatMode => {
                let mode = engine.repeat_mode().await.cycle();
                let result = engine.set_repeat_mode(mode).await;
                self.check(result);
            }
            Intent::LoadPlaylist { .. } | Intent::ClearError => {}
        }
    }

    async fn load_playlist(&mut self, playlist: Playlist, start_index: usize) {
        let Some(start) = playlist.clamp_index(start_index) else {
            self.surface(PlaybackError::EmptyPlaylist);
            return;
        };

        let mut playable: Vec<(usize, Track, url::Url)> = Vec::with_capacity(playlist.len());
        let mut skipped = Vec::new();
        let mut last_reason = String::new();
        for (index, track) in playlist.into_tracks().into_iter().enumerate() {
            match self.resolver.resolve(&track.source) {
                Ok(uri) => playable.push((index, track, uri)),
                Err(e) => {
                    tracing::warn!("Skipping \"{}\": {}", track.display_title(), e);
                    last_reason = e.to_string();
                    skipped.push(track);
                }
            }
        }

        if playable.is_empty() {
            let err = if skipped.len() == 1 {
                PlaybackError::UnresolvedSource {
                    title: skipped[0].title.clone(),
                    reason: last_reason,
                }
            } else {
                PlaybackError::NoPlayableTracks { skipped }
            };
            self.surface(err);
            return;
        }

        let Some(engine) = self.engine() else {
            return;
        };

        // A skipped start track hands over to the next playable one
        let effective_start = playable
            .iter()
            .position(|(index, _, _)| *index >= start)
            .unwrap_or(playable.len() - 1);

        self.generation += 1;
        let generation = self.generation;
        let mut items = HashMap::with_capacity(playable.len());
        let mut engine_items = Vec::with_capacity(playable.len());
        let mut tracks = Vec::with_capacity(playable.len());
        for (position, (_, track, uri)) in playable.into_iter().enumerate() {
            let id = ItemId::new(format!("item-{}-{}", generation, position));
            engine_items.push(EngineItem {
                id: id.clone(),
                uri,
                title: track.display_title().to_string(),
                artist: track.display_artist().to_string(),
                artwork: track.artwork.clone(),
                duration: track.duration_hint(),
            });
            items.insert(id, (position, track.clone()));
            tracks.push(track);
        }

        self.session.ensure_running().await;
        let result = engine.set_items(engine_items, effective_start).await;
        if self.check(result).is_none() {
            return;
        }

        tracing::info!(
            "Loaded {} of {} tracks, starting at {}",
            tracks.len(),
            tracks.len() + skipped.len(),
            effective_start
        );

        self.items = items;
        self.snapshot.current_track = tracks.get(effective_start).cloned();
        self.snapshot.current_index = Some(effective_start);
        self.snapshot.playlist = Playlist::new(tracks);
        self.snapshot.unplayable = skipped;
        self.snapshot.transport.phase = TransportPhase::Loading;
        self.snapshot.transport.progress = Progress::default();

        let result = engine.prepare().await;
        if self.check(result).is_some() {
            let result = engine.play().await;
            self.check(result);
        }
    }

    fn handle_event(&mut self, event: EngineEvent) {
        tracing::debug!("Engine event: {:?}", event);
        let transport = &mut self.snapshot.transport;

        match event {
            EngineEvent::IsPlayingChanged(playing) => {
                transport.is_playing = playing;
                if !self.snapshot.playlist.is_empty() {
                    transport.phase = if playing {
                        TransportPhase::Playing
                    } else {
                        TransportPhase::Paused
                    };
                }
            }
            EngineEvent::ItemChanged(Some(id)) => match self.items.get(&id) {
                Some((index, track)) => {
                    self.snapshot.current_index = Some(*index);
                    self.snapshot.current_track = Some(track.clone());
                }
                None => tracing::debug!("Ignoring stale item {}", id),
            },
            EngineEvent::ItemChanged(None) => {}
            EngineEvent::ShuffleChanged(enabled) => transport.shuffle_enabled = enabled,
            EngineEvent::RepeatChanged(mode) => transport.repeat_mode = mode,
            EngineEvent::Error { message, fatal } => {
                if fatal {
                    tracing::error!("Fatal engine error: {}", message);
                    self.items.clear();
                    self.snapshot.playlist = Playlist::default();
                    self.snapshot.current_index = None;
                    self.snapshot.current_track = None;
                    self.snapshot.unplayable.clear();
                    self.snapshot.transport.phase = TransportPhase::Idle;
                    self.snapshot.transport.is_playing = false;
                    self.snapshot.transport.progress = Progress::default();
                }
                self.surface(PlaybackError::EngineRuntime(message));
            }
        }
    }

    async fn poll(&mut self) {
        let Ok(engine) = self.session.engine() else {
            return;
        };
        let progress = engine.progress().await.clamped();
        self.snapshot.transport.progress = progress;
    }
}
