//! ListenBrainz integration
//!
//! Reports listens and now-playing notices to a ListenBrainz server, using the
//! base URL and token stored on each user.
//!
//! API docs: https://listenbrainz.readthedocs.io/en/latest/users/api/core.html

pub mod dto;
mod client;

pub use client::{BASE_URL, ListenBrainzScrobbler};
