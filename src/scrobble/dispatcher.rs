//! Fans one play event out to every configured backend.
//!
//! Each backend call runs concurrently and is bounded by its own timeout.
//! The whole fan-out is spawned onto the runtime, so callers can drop the
//! returned handle (fire-and-forget) or await it to inspect the outcomes.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::FutureExt;
use futures::future::join_all;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::{ListenBrainzScrobbler, ScrobbleError, Scrobbler};
use crate::config::ScrobbleConfig;
use crate::model::{BackendKind, Track, User};

/// One play tick or explicit submission.
#[derive(Debug, Clone)]
pub struct ScrobbleEvent {
    pub user: Arc<User>,
    pub track: Arc<Track>,
    pub stamp: DateTime<Utc>,
    pub submission: bool,
}

/// Result of one backend attempt.
#[derive(Debug)]
pub struct DispatchOutcome {
    pub backend: &'static str,
    pub result: Result<(), ScrobbleError>,
}

/// The fixed, ordered set of backends established at startup.
#[derive(Clone)]
pub struct ScrobbleDispatcher {
    scrobblers: Vec<Arc<dyn Scrobbler>>,
    timeout: Duration,
}

impl ScrobbleDispatcher {
    pub fn new(scrobblers: Vec<Arc<dyn Scrobbler>>, timeout: Duration) -> Self {
        Self {
            scrobblers,
            timeout,
        }
    }

    /// Build the configured backends around one shared HTTP client.
    pub fn from_config(config: &ScrobbleConfig, client: reqwest::Client) -> Self {
        let scrobblers = config
            .backends
            .iter()
            .map(|kind| -> Arc<dyn Scrobbler> {
                match kind {
                    BackendKind::ListenBrainz => {
                        Arc::new(ListenBrainzScrobbler::new(client.clone()))
                    }
                }
            })
            .collect();
        Self::new(scrobblers, config.timeout())
    }

    pub fn len(&self) -> usize {
        self.scrobblers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scrobblers.is_empty()
    }

    /// Send `event` to every backend. Outcomes come back in configuration order.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn dispatch(&self, event: ScrobbleEvent) -> JoinHandle<Vec<DispatchOutcome>> {
        let scrobblers = self.scrobblers.clone();
        let timeout = self.timeout;
        debug!(
            user = %event.user.name,
            track = %event.track.title,
            submission = event.submission,
            backends = scrobblers.len(),
            "dispatching scrobble"
        );
        tokio::spawn(async move {
            let attempts = scrobblers
                .iter()
                .map(|scrobbler| attempt(scrobbler.as_ref(), &event, timeout));
            join_all(attempts).await
        })
    }
}

impl Default for ScrobbleDispatcher {
    fn default() -> Self {
        Self::new(Vec::new(), ScrobbleConfig::default().timeout())
    }
}

/// Build the HTTP client shared by every backend.
pub fn http_client(config: &ScrobbleConfig) -> reqwest::Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(config.timeout())
        .user_agent(config.user_agent())
        .build()
}

async fn attempt(
    scrobbler: &dyn Scrobbler,
    event: &ScrobbleEvent,
    timeout: Duration,
) -> DispatchOutcome {
    let backend = scrobbler.name();
    let call = AssertUnwindSafe(scrobbler.scrobble(
        &event.user,
        &event.track,
        event.stamp,
        event.submission,
    ))
    .catch_unwind();

    let result = match tokio::time::timeout(timeout, call).await {
        Ok(Ok(result)) => result,
        Ok(Err(_)) => Err(ScrobbleError::Panicked { backend }),
        Err(_) => Err(ScrobbleError::TimedOut { backend, timeout }),
    };

    match &result {
        Ok(()) => debug!(backend, user = %event.user.name, "scrobble delivered"),
        Err(e) if e.is_auth() => warn!(
            backend,
            user = %event.user.name,
            "scrobble refused, user must re-authorize: {}",
            e
        ),
        Err(e) => warn!(backend, user = %event.user.name, "scrobble failed: {}", e),
    }
    DispatchOutcome { backend, result }
}
