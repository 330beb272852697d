//! Core data models shared by the protocol layer and the scrobble backends.
//!
//! Defines the identity ([`User`]) and the library entities ([`Track`], [`Album`]).
//! These are snapshots handed in by collaborators; nothing here is persisted
//! or cached.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// A listen-tracking service the server can report plays to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    ListenBrainz,
}

impl BackendKind {
    pub fn name(self) -> &'static str {
        match self {
            Self::ListenBrainz => "listenbrainz",
        }
    }
}

impl std::fmt::Display for BackendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Base URL and token for one backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendCredentials {
    pub backend: BackendKind,
    pub url: String,
    pub token: String,
}

impl BackendCredentials {
    /// Both halves are needed before a backend can be called.
    pub fn is_complete(&self) -> bool {
        !self.url.is_empty() && !self.token.is_empty()
    }
}

/// An authenticated user, as resolved before a handler runs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct User {
    /// Login name
    pub name: String,
    /// Per-backend credentials (zero or more)
    pub credentials: Vec<BackendCredentials>,
}

impl User {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            credentials: Vec::new(),
        }
    }

    /// Attach credentials for a backend, replacing any previous pair.
    pub fn with_credentials(
        mut self,
        backend: BackendKind,
        url: impl Into<String>,
        token: impl Into<String>,
    ) -> Self {
        self.credentials.retain(|c| c.backend != backend);
        self.credentials.push(BackendCredentials {
            backend,
            url: url.into(),
            token: token.into(),
        });
        self
    }

    pub fn credentials_for(&self, backend: BackendKind) -> Option<&BackendCredentials> {
        self.credentials.iter().find(|c| c.backend == backend)
    }
}

/// An album. Referenced by [`Track`], never owned by this crate.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Album {
    pub title: String,
}

/// A track snapshot.
///
/// Empty strings and zero numbers mean "unknown"; backends omit them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Track {
    /// Protocol id (e.g. `tr-12`)
    pub id: String,
    pub title: String,
    pub artist: String,
    /// Playing time
    pub length: Duration,
    /// Position on the album, 0 when unknown
    pub track_number: u32,
    /// MusicBrainz track id
    pub track_mbid: String,
    /// MusicBrainz recording id
    pub recording_mbid: String,
    /// MusicBrainz release id
    pub release_mbid: String,
    pub album: Album,
    /// Location on disk, if the library knows it
    pub path: Option<PathBuf>,
}
