//! The `serve` command.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;
use tokio::runtime::Runtime;
use tracing::{info, warn};

use crate::config::Config;
use crate::error::{Result, ResultExt};
use crate::library::MemoryLibrary;
use crate::scrobble::ScrobbleDispatcher;
use crate::scrobble::dispatcher::http_client;
use crate::subsonic::{Controller, ResponseEncoder, UserDirectory, router};

/// Assemble the controller from a loaded config.
pub fn build_controller(config: &Config) -> Result<Controller> {
    let client = http_client(&config.scrobble).with_context("building HTTP client")?;
    let dispatcher = ScrobbleDispatcher::from_config(&config.scrobble, client);

    let mut users = UserDirectory::default();
    for user in &config.users {
        users.insert(&user.password, user.to_user());
    }

    for path in &config.server.music_paths {
        if !path.is_dir() {
            warn!("Music path {:?} is not a directory", path);
        }
    }

    let library = MemoryLibrary::new(config.tracks.iter().map(|t| t.to_track()));
    info!(
        users = config.users.len(),
        tracks = library.len(),
        backends = dispatcher.len(),
        "controller ready"
    );

    Ok(Controller::builder()
        .music_paths(config.server.music_paths.clone())
        .radio_stations(config.radio_stations.clone())
        .encoder(ResponseEncoder::new(&config.server.default_callback))
        .scrobblers(dispatcher)
        .library(Arc::new(library))
        .users(users)
        .build())
}

/// Serve the API until Ctrl-C.
pub fn cmd_serve(rt: &Runtime, config: Config, listen: Option<SocketAddr>) -> anyhow::Result<()> {
    let addr = listen.unwrap_or(config.server.listen);
    let ctrl = Arc::new(build_controller(&config)?);

    rt.block_on(async move {
        let listener = TcpListener::bind(addr)
            .await
            .with_context(format!("binding {addr}"))?;
        info!("Listening on http://{}/rest", addr);

        axum::serve(listener, router(ctrl))
            .with_graceful_shutdown(shutdown_signal())
            .await
            .with_context("serving")?;

        info!("Server stopped");
        Ok::<_, anyhow::Error>(())
    })
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutting down");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{RadioStation, UserConfig};

    #[test]
    fn test_build_controller_from_config() {
        let mut config = Config::default();
        config.users.push(UserConfig {
            name: "alice".into(),
            password: "sesame".into(),
            listenbrainz_token: Some("abc".into()),
            ..Default::default()
        });
        config.radio_stations.push(RadioStation {
            id: 1,
            name: "Jazz".into(),
            stream_url: "http://radio.example/jazz".into(),
            homepage_url: None,
        });
        config.server.default_callback = "jsonpCallback".into();

        let ctrl = build_controller(&config).unwrap();
        assert_eq!(ctrl.scrobblers().len(), 1);
        assert_eq!(ctrl.radio_stations().len(), 1);
        assert_eq!(ctrl.encoder().default_callback(), "jsonpCallback");
    }
}
