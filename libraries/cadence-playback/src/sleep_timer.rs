//! Sleep timer
//!
//! Pauses playback once a delay has elapsed. Starting a new timer replaces
//! the running one.

use crate::coordinator::PlaybackCoordinator;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::Instant;

/// Timer that pauses a coordinator after a delay
#[derive(Debug)]
pub struct SleepTimer {
    coordinator: PlaybackCoordinator,
    end: Arc<watch::Sender<Option<Instant>>>,
    task: Option<JoinHandle<()>>,
}

impl SleepTimer {
    /// Create an idle timer for `coordinator`
    pub fn new(coordinator: PlaybackCoordinator) -> Self {
        let (end, _) = watch::channel(None);
        Self {
            coordinator,
            end: Arc::new(end),
            task: None,
        }
    }

    /// Pause playback after `delay`, replacing any running timer
    ///
    /// Returns `false` without touching the running timer when `delay` is
    /// too far in the future to schedule.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(&mut self, delay: Duration) -> bool {
        let Some(end_time) = Instant::now().checked_add(delay) else {
            tracing::warn!("Sleep timer delay {:?} is out of range, ignoring", delay);
            return false;
        };

        self.abort();
        self.end.send_replace(Some(end_time));
        tracing::info!("Sleep timer set for {:?}", delay);

        let coordinator = self.coordinator.clone();
        let end = Arc::clone(&self.end);
        self.task = Some(tokio::spawn(async move {
            tokio::time::sleep_until(end_time).await;
            tracing::info!("Sleep timer elapsed, pausing playback");
            coordinator.pause();
            end.send_replace(None);
        }));
        true
    }

    /// Stop the running timer without pausing
    pub fn cancel(&mut self) {
        if self.abort() {
            tracing::info!("Sleep timer cancelled");
        }
        self.end.send_replace(None);
    }

    /// When the running timer will pause playback
    pub fn end_time(&self) -> Option<Instant> {
        *self.end.borrow()
    }

    /// Time left on the running timer
    pub fn remaining(&self) -> Option<Duration> {
        self.end_time()
            .map(|end| end.saturating_duration_since(Instant::now()))
    }

    /// Whether a timer is running
    pub fn is_active(&self) -> bool {
        self.end_time().is_some()
    }

    fn abort(&mut self) -> bool {
        match self.task.take() {
            Some(task) if !task.is_finished() => {
                task.abort();
                true
            }
            _ => false,
        }
    }
}

impl Drop for SleepTimer {
    fn drop(&mut self) {
        self.abort();
    }
}
