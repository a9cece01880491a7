//! Engine session
//!
//! Binds the coordinator to a media engine that may not be available yet.
//! Connection is attempted once and retried once after a delay; after that
//! the session stays disconnected and reports the failure.

use crate::engine::{EngineConnector, MediaEngine};
use crate::error::{PlaybackError, Result};
use std::sync::Arc;
use std::time::Duration;

/// Connection to a media engine
pub struct PlaybackSession {
    connector: Arc<dyn EngineConnector>,
    engine: Option<Arc<dyn MediaEngine>>,
    failure: Option<PlaybackError>,
    reconnect_delay: Duration,
}

impl PlaybackSession {
    /// Create a disconnected session
    pub fn new(connector: Arc<dyn EngineConnector>, reconnect_delay: Duration) -> Self {
        Self {
            connector,
            engine: None,
            failure: None,
            reconnect_delay,
        }
    }

    /// Connect, retrying once after the reconnect delay
    ///
    /// Returns the existing handle if already connected, and the recorded
    /// failure if both attempts already failed.
    pub async fn connect(&mut self) -> Result<Arc<dyn MediaEngine>> {
        if let Some(engine) = &self.engine {
            return Ok(Arc::clone(engine));
        }
        if let Some(failure) = &self.failure {
            return Err(failure.clone());
        }

        let first = match self.connector.connect().await {
            Ok(engine) => {
                tracing::info!("Media engine connected");
                self.engine = Some(Arc::clone(&engine));
                return Ok(engine);
            }
            Err(e) => e,
        };

        tracing::warn!(
            "Media engine connection failed ({}), retrying in {:?}",
            first,
            self.reconnect_delay
        );
        tokio::time::sleep(self.reconnect_delay).await;

        match self.connector.connect().await {
            Ok(engine) => {
                tracing::info!("Media engine connected on retry");
                self.engine = Some(Arc::clone(&engine));
                Ok(engine)
            }
            Err(e) => {
                tracing::error!("Media engine connection failed again: {}", e);
                let failure = PlaybackError::EngineConnection(e.to_string());
                self.failure = Some(failure.clone());
                Err(failure)
            }
        }
    }

    /// Connected engine handle
    pub fn engine(&self) -> Result<&Arc<dyn MediaEngine>> {
        match (&self.engine, &self.failure) {
            (Some(engine), _) => Ok(engine),
            (None, Some(failure)) => Err(failure.clone()),
            (None, None) => Err(PlaybackError::EngineConnection(
                "not connected".to_string(),
            )),
        }
    }

    /// Whether an engine handle is held
    pub fn is_connected(&self) -> bool {
        self.engine.is_some()
    }

    /// Ask the engine to bring up its host before a load
    ///
    /// Failures are logged only; the subsequent load reports its own errors.
    pub async fn ensure_running(&self) {
        if let Some(engine) = &self.engine {
            if let Err(e) = engine.ensure_running().await {
                tracing::warn!("Failed to start engine host: {}", e);
            }
        }
    }

    /// Release the engine handle
    pub async fn release(&mut self) {
        if let Some(engine) = self.engine.take() {
            engine.release().await;
            tracing::info!("Media engine released");
        }
    }
}

impl std::fmt::Debug for PlaybackSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlaybackSession")
            .field("connected", &self.engine.is_some())
            .field("failure", &self.failure)
            .field("reconnect_delay", &self.reconnect_delay)
            .finish_non_exhaustive()
    }
}
