//! Request body of the ListenBrainz `submit-listens` endpoint.
//!
//! Zero numbers and empty strings are left out of the serialized form,
//! never sent as `null` or `0`.

use serde::Serialize;

use crate::model::Track;

pub const LISTEN_TYPE_SINGLE: &str = "single";
pub const LISTEN_TYPE_PLAYING_NOW: &str = "playing_now";

fn is_zero(n: &u64) -> bool {
    *n == 0
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Submission {
    pub listen_type: &'static str,
    pub payload: Vec<Listen>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Listen {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub listened_at: Option<i64>,
    pub track_metadata: TrackMetadata,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrackMetadata {
    pub additional_info: AdditionalInfo,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub artist_name: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub track_name: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub release_name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AdditionalInfo {
    #[serde(rename = "tracknumber", skip_serializing_if = "is_zero")]
    pub track_number: u64,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub track_mbid: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub recording_mbid: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub release_mbid: String,
    /// Seconds
    #[serde(skip_serializing_if = "is_zero")]
    pub track_length: u64,
}

impl TrackMetadata {
    pub fn from_track(track: &Track) -> Self {
        Self {
            additional_info: AdditionalInfo {
                track_number: u64::from(track.track_number),
                track_mbid: track.track_mbid.clone(),
                recording_mbid: track.recording_mbid.clone(),
                release_mbid: track.release_mbid.clone(),
                track_length: track.length.as_secs(),
            },
            artist_name: track.artist.clone(),
            track_name: track.title.clone(),
            release_name: track.album.title.clone(),
        }
    }
}

impl Submission {
    /// One listen: timestamped `single` for submissions, untimed `playing_now` otherwise.
    pub fn new(track: &Track, listened_at: i64, submission: bool) -> Self {
        let (listen_type, listened_at) = if submission {
            (LISTEN_TYPE_SINGLE, Some(listened_at))
        } else {
            (LISTEN_TYPE_PLAYING_NOW, None)
        };
        Self {
            listen_type,
            payload: vec![Listen {
                listened_at,
                track_metadata: TrackMetadata::from_track(track),
            }],
        }
    }
}
