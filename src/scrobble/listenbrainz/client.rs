//! ListenBrainz HTTP client
//!
//! Submits listens to a ListenBrainz-compatible server.
//! See: https://listenbrainz.readthedocs.io/en/latest/users/api/core.html
//!
//! The server URL and token are per user, so one client instance serves
//! every user and shares the connection pool it was given.

use std::fmt::Write as _;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::StatusCode;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use tracing::warn;

use super::dto::Submission;
use crate::model::{BackendKind, Track, User};
use crate::scrobble::{ScrobbleError, Scrobbler};

/// Public ListenBrainz instance.
pub const BASE_URL: &str = "https://api.listenbrainz.org";

const SUBMIT_PATH: &str = "/1/submit-listens";

const NAME: &str = "listenbrainz";

/// ListenBrainz backend
pub struct ListenBrainzScrobbler {
    http_client: reqwest::Client,
}

impl ListenBrainzScrobbler {
    /// Create a backend that sends through `http_client`.
    ///
    /// The client should carry a request timeout; see
    /// [`http_client`](crate::scrobble::dispatcher::http_client).
    pub fn new(http_client: reqwest::Client) -> Self {
        Self { http_client }
    }
}

fn submit_url(base_url: &str) -> String {
    format!("{}{}", base_url.trim_end_matches('/'), SUBMIT_PATH)
}

#[async_trait]
impl Scrobbler for ListenBrainzScrobbler {
    fn name(&self) -> &'static str {
        NAME
    }

    async fn scrobble(
        &self,
        user: &User,
        track: &Track,
        stamp: DateTime<Utc>,
        submission: bool,
    ) -> Result<(), ScrobbleError> {
        // Users without a URL and token simply don't use this backend
        let Some(creds) = user
            .credentials_for(BackendKind::ListenBrainz)
            .filter(|c| c.is_complete())
        else {
            return Ok(());
        };

        let body = serde_json::to_vec(&Submission::new(track, stamp.timestamp(), submission))?;

        let response = self
            .http_client
            .post(submit_url(&creds.url))
            .header(CONTENT_TYPE, "application/json")
            .header(AUTHORIZATION, format!("Token {}", creds.token))
            .body(body)
            .send()
            .await
            .map_err(|source| ScrobbleError::Transport {
                backend: NAME,
                source,
            })?;

        classify(response).await
    }
}

/// Map the response status to an outcome. Success bodies are not read.
async fn classify(response: reqwest::Response) -> Result<(), ScrobbleError> {
    let status = response.status();

    if status == StatusCode::UNAUTHORIZED {
        return Err(ScrobbleError::Unauthorized { backend: NAME });
    }

    // Anything from 400 up counts, including non-standard codes above 599
    if status.as_u16() >= 400 {
        let dump = dump_response(response).await;
        warn!("received bad listenbrainz response:\n{}", dump);
        return Err(ScrobbleError::Rejected {
            backend: NAME,
            status: status.as_u16(),
            response: dump,
        });
    }

    Ok(())
}

/// Render status line, headers and body the way they came over the wire.
async fn dump_response(response: reqwest::Response) -> String {
    let mut dump = String::new();
    let _ = write!(dump, "{:?} {}\r\n", response.version(), response.status());
    for (name, value) in response.headers() {
        let _ = write!(
            dump,
            "{}: {}\r\n",
            name,
            value.to_str().unwrap_or("<non-ascii>")
        );
    }
    dump.push_str("\r\n");
    match response.text().await {
        Ok(body) => dump.push_str(&body),
        Err(e) => {
            let _ = write!(dump, "<unreadable body: {e}>");
        }
    }
    dump
}
