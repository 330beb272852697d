//! Configuration system using TOML files.
//!
//! Config is read from the OS-standard config directory unless a path is
//! given on the command line:
//! - Windows: %APPDATA%\subsonic-bridge\config.toml
//! - macOS: ~/Library/Application Support/subsonic-bridge/config.toml
//! - Linux: ~/.config/subsonic-bridge/config.toml
//!
//! Everything here is read once at startup and never reloaded.

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::model::{Album, BackendKind, Track, User};
use crate::subsonic::encode::DEFAULT_CALLBACK;

/// Application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,

    pub scrobble: ScrobbleConfig,

    /// Accounts allowed to use the API
    pub users: Vec<UserConfig>,

    /// Stations served by `getInternetRadioStations`
    pub radio_stations: Vec<RadioStation>,

    /// Static track catalog
    pub tracks: Vec<TrackConfig>,
}

/// HTTP server settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address to listen on
    pub listen: SocketAddr,

    /// Music folders, in `musicFolderId` order
    pub music_paths: Vec<PathBuf>,

    /// JSONP callback used when the request has none
    pub default_callback: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: SocketAddr::from(([127, 0, 0, 1], 4747)),
            music_paths: Vec::new(),
            default_callback: DEFAULT_CALLBACK.to_string(),
        }
    }
}

/// Scrobble fan-out settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScrobbleConfig {
    /// Backends to notify, in order
    pub backends: Vec<BackendKind>,

    /// Upper bound for one backend call, in seconds
    pub timeout_secs: u64,

    /// User-Agent sent to backends (empty = crate name and version)
    pub user_agent: String,
}

impl Default for ScrobbleConfig {
    fn default() -> Self {
        Self {
            backends: vec![BackendKind::ListenBrainz],
            timeout_secs: 5,
            user_agent: String::new(),
        }
    }
}

impl ScrobbleConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }

    pub fn user_agent(&self) -> String {
        if self.user_agent.is_empty() {
            concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")).to_string()
        } else {
            self.user_agent.clone()
        }
    }
}

/// One account
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct UserConfig {
    pub name: String,
    pub password: String,
    pub listenbrainz_url: Option<String>,
    pub listenbrainz_token: Option<String>,
}

impl UserConfig {
    /// The identity handed to handlers; the password stays here.
    pub fn to_user(&self) -> User {
        let user = User::new(&self.name);
        match (&self.listenbrainz_url, &self.listenbrainz_token) {
            (url, Some(token)) => user.with_credentials(
                BackendKind::ListenBrainz,
                url.as_deref()
                    .unwrap_or(crate::scrobble::listenbrainz::BASE_URL),
                token,
            ),
            (_, None) => user,
        }
    }
}

/// An internet radio station
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RadioStation {
    pub id: i64,
    pub name: String,
    pub stream_url: String,
    #[serde(default)]
    pub homepage_url: Option<String>,
}

/// A catalog entry
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackConfig {
    pub id: String,
    pub title: String,
    pub artist: String,
    pub album: String,
    pub length_secs: u64,
    pub track_number: u32,
    pub track_mbid: String,
    pub recording_mbid: String,
    pub release_mbid: String,
    pub path: Option<PathBuf>,
}

impl TrackConfig {
    pub fn to_track(&self) -> Track {
        Track {
            id: self.id.clone(),
            title: self.title.clone(),
            artist: self.artist.clone(),
            length: Duration::from_secs(self.length_secs),
            track_number: self.track_number,
            track_mbid: self.track_mbid.clone(),
            recording_mbid: self.recording_mbid.clone(),
            release_mbid: self.release_mbid.clone(),
            album: Album {
                title: self.album.clone(),
            },
            path: self.path.clone(),
        }
    }
}

// ============================================================================
// Config File Operations
// ============================================================================

/// Get the config directory path
pub fn config_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("subsonic-bridge"))
}

/// Get the full path to the default config file
pub fn config_path() -> Option<PathBuf> {
    config_dir().map(|d| d.join("config.toml"))
}

/// Load configuration from an explicit path.
pub fn load_from(path: &Path) -> Result<Config, ConfigError> {
    let contents =
        std::fs::read_to_string(path).map_err(|e| ConfigError::Read(path.to_path_buf(), e))?;
    let config =
        toml::from_str(&contents).map_err(|e| ConfigError::Parse(path.to_path_buf(), e))?;
    tracing::info!("Loaded config from {:?}", path);
    Ok(config)
}

/// Load configuration from `path`, or from the default location.
///
/// A missing default file yields the defaults; an explicit path must exist.
pub fn load(path: Option<&Path>) -> Result<Config, ConfigError> {
    if let Some(path) = path {
        return load_from(path);
    }

    let Some(path) = config_path() else {
        tracing::warn!("Could not determine config directory, using defaults");
        return Ok(Config::default());
    };

    if !path.exists() {
        tracing::info!("No config file found at {:?}, using defaults", path);
        return Ok(Config::default());
    }

    load_from(&path)
}

// ============================================================================
// Error Types
// ============================================================================

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {0:?}: {1}")]
    Read(PathBuf, std::io::Error),

    #[error("Failed to parse config file {0:?}: {1}")]
    Parse(PathBuf, toml::de::Error),
}

// ============================================================================
// Tests
// ============================================================================
