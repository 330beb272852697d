//! Scrobbling - reports plays to external listen-tracking services.
//!
//! # Architecture
//!
//! - [`Scrobbler`] is the single-operation capability every backend implements
//! - [`ScrobbleDispatcher`] holds the backends configured at startup and fans
//!   each [`ScrobbleEvent`] out to all of them
//! - [`listenbrainz`] is the ListenBrainz backend
//!
//! Scrobbling is a best-effort side channel: delivery is at-most-once, there is
//! no queue and no retry, and a backend failure never reaches the request that
//! produced the event.

pub mod dispatcher;
pub mod listenbrainz;

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::model::{Track, User};

pub use dispatcher::{DispatchOutcome, ScrobbleDispatcher, ScrobbleEvent};
pub use listenbrainz::ListenBrainzScrobbler;

/// Errors a backend can report for one scrobble.
#[derive(Debug, thiserror::Error)]
pub enum ScrobbleError {
    /// The backend refused the user's token; the user should re-authorize.
    #[error("{backend}: unauthorized, token rejected")]
    Unauthorized { backend: &'static str },

    /// The backend answered with an error status.
    #[error("{backend}: rejected with HTTP {status}")]
    Rejected {
        backend: &'static str,
        status: u16,
        /// Raw response (status line, headers, body) for diagnostics
        response: String,
    },

    /// The backend could not be reached (DNS, connect, timeout).
    #[error("{backend}: transport error: {source}")]
    Transport {
        backend: &'static str,
        #[source]
        source: reqwest::Error,
    },

    #[error("failed to encode payload: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("{backend}: backend panicked")]
    Panicked { backend: &'static str },

    /// The dispatcher gave up waiting for the backend.
    #[error("{backend}: no answer within {timeout:?}")]
    TimedOut {
        backend: &'static str,
        timeout: Duration,
    },
}

impl ScrobbleError {
    /// True when the user needs to re-authorize with the backend.
    pub fn is_auth(&self) -> bool {
        matches!(self, Self::Unauthorized { .. })
    }
}

/// A listen-tracking backend.
#[async_trait]
pub trait Scrobbler: Send + Sync {
    /// Backend name used in logs.
    fn name(&self) -> &'static str;

    /// Report one play. `submission = false` is a now-playing notice.
    async fn scrobble(
        &self,
        user: &User,
        track: &Track,
        stamp: DateTime<Utc>,
        submission: bool,
    ) -> Result<(), ScrobbleError>;
}
