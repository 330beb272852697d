//! The `scrobble` command.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use clap::{ArgGroup, Args};
use tokio::runtime::Runtime;

use crate::config::Config;
use crate::error::{Error, Result, ResultExt};
use crate::model::{Album, Track, User};
use crate::scrobble::dispatcher::http_client;
use crate::scrobble::{ScrobbleDispatcher, ScrobbleEvent};

#[derive(Args, Debug)]
#[command(group(ArgGroup::new("track").required(true).args(["id", "title"])))]
pub struct ScrobbleArgs {
    /// Configured user to scrobble as
    #[arg(short, long)]
    pub user: String,
    /// Catalog track id
    #[arg(long)]
    pub id: Option<String>,
    /// Track title (ad-hoc track)
    #[arg(long)]
    pub title: Option<String>,
    /// Artist name
    #[arg(long, default_value = "")]
    pub artist: String,
    /// Album title
    #[arg(long, default_value = "")]
    pub album: String,
    /// Track length in seconds
    #[arg(long, default_value_t = 0)]
    pub length: u64,
    /// Send a now-playing notice instead of a listen
    #[arg(long)]
    pub now_playing: bool,
}

/// Dispatch one scrobble and report every backend's outcome.
pub fn cmd_scrobble(rt: &Runtime, config: &Config, args: &ScrobbleArgs) -> anyhow::Result<()> {
    let event = build_event(config, args)?;
    let client = http_client(&config.scrobble).with_context("building HTTP client")?;
    let dispatcher = ScrobbleDispatcher::from_config(&config.scrobble, client);

    if dispatcher.is_empty() {
        println!("No scrobble backends configured.");
        return Ok(());
    }

    let outcomes = rt.block_on(async { dispatcher.dispatch(event).await })?;

    let mut first_failure = None;
    for outcome in outcomes {
        match outcome.result {
            Ok(()) => println!("  ✓ {}", outcome.backend),
            Err(e) => {
                println!("  ✗ {}: {}", outcome.backend, e);
                if e.is_auth() {
                    println!("    Check the token configured for {:?}.", args.user);
                }
                first_failure.get_or_insert(e);
            }
        }
    }

    match first_failure {
        Some(e) => Err(Error::Scrobble(e).into()),
        None => Ok(()),
    }
}

fn build_event(config: &Config, args: &ScrobbleArgs) -> Result<ScrobbleEvent> {
    let user = find_user(config, &args.user)?;
    let track = match (&args.id, &args.title) {
        (Some(id), _) => config
            .tracks
            .iter()
            .find(|t| t.id == *id)
            .map(|t| t.to_track())
            .ok_or_else(|| Error::unknown_track(id))?,
        (None, title) => Track {
            title: title.clone().unwrap_or_default(),
            artist: args.artist.clone(),
            length: Duration::from_secs(args.length),
            album: Album {
                title: args.album.clone(),
            },
            ..Default::default()
        },
    };

    Ok(ScrobbleEvent {
        user: Arc::new(user),
        track: Arc::new(track),
        stamp: Utc::now(),
        submission: !args.now_playing,
    })
}

fn find_user(config: &Config, name: &str) -> Result<User> {
    config
        .users
        .iter()
        .find(|u| u.name == name)
        .map(|u| u.to_user())
        .ok_or_else(|| Error::unknown_user(name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{TrackConfig, UserConfig};

    fn config() -> Config {
        let mut config = Config::default();
        config.users.push(UserConfig {
            name: "alice".into(),
            listenbrainz_token: Some("abc".into()),
            ..Default::default()
        });
        config.tracks.push(TrackConfig {
            id: "tr-1".into(),
            title: "Song".into(),
            ..Default::default()
        });
        config
    }

    fn args(id: Option<&str>, title: Option<&str>) -> ScrobbleArgs {
        ScrobbleArgs {
            user: "alice".into(),
            id: id.map(String::from),
            title: title.map(String::from),
            artist: "Band".into(),
            album: String::new(),
            length: 200,
            now_playing: true,
        }
    }

    #[test]
    fn test_event_from_catalog_track() {
        let event = build_event(&config(), &args(Some("tr-1"), None)).unwrap();
        assert_eq!(event.track.title, "Song");
        assert_eq!(event.user.name, "alice");
        assert!(!event.submission);
    }

    #[test]
    fn test_event_from_adhoc_track() {
        let event = build_event(&config(), &args(None, Some("Other"))).unwrap();
        assert_eq!(event.track.title, "Other");
        assert_eq!(event.track.artist, "Band");
        assert_eq!(event.track.length, Duration::from_secs(200));
    }

    #[test]
    fn test_unknown_user_and_track() {
        let mut a = args(Some("tr-1"), None);
        a.user = "bob".into();
        assert!(matches!(build_event(&config(), &a), Err(Error::UnknownUser(_))));

        let a = args(Some("tr-404"), None);
        assert!(matches!(build_event(&config(), &a), Err(Error::UnknownTrack(_))));
    }
}
