//! Endpoint implementations.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::StreamExt;
use tokio_util::io::ReaderStream;
use tracing::{debug, warn};

use super::ctrl::Controller;
use super::encode::ResponseWriter;
use super::envelope::{
    ErrorCode, InternetRadioStation, InternetRadioStations, License, MusicFolder, MusicFolders,
    Payload, Response,
};
use super::handler::{Handler, RawHandler, RequestContext, ResponseStream};
use super::params::ParamsError;
use crate::scrobble::ScrobbleEvent;

fn params_error(e: ParamsError) -> Response {
    match e {
        ParamsError::Missing(_) => Response::error(ErrorCode::MissingParameter, e.to_string()),
        ParamsError::Malformed { .. } => Response::error(ErrorCode::Generic, e.to_string()),
    }
}

pub struct Ping;

#[async_trait]
impl Handler for Ping {
    async fn handle(&self, _ctrl: &Controller, _ctx: &RequestContext) -> Response {
        Response::new()
    }
}

pub struct GetLicense;

#[async_trait]
impl Handler for GetLicense {
    async fn handle(&self, _ctrl: &Controller, _ctx: &RequestContext) -> Response {
        Response::with_payload(Payload::License(License { valid: true }))
    }
}

pub struct GetMusicFolders;

#[async_trait]
impl Handler for GetMusicFolders {
    async fn handle(&self, ctrl: &Controller, _ctx: &RequestContext) -> Response {
        let list = ctrl
            .music_paths()
            .iter()
            .zip(0..)
            .map(|(path, id)| MusicFolder {
                id,
                name: folder_name(path),
            })
            .collect();
        Response::with_payload(Payload::MusicFolders(MusicFolders { list }))
    }
}

fn folder_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

pub struct GetInternetRadioStations;

#[async_trait]
impl Handler for GetInternetRadioStations {
    async fn handle(&self, ctrl: &Controller, _ctx: &RequestContext) -> Response {
        let list = ctrl
            .radio_stations()
            .iter()
            .map(InternetRadioStation::from_config)
            .collect();
        Response::with_payload(Payload::InternetRadioStations(InternetRadioStations { list }))
    }
}

/// Reports plays. Backend outcomes never affect the response.
///
/// Params: `id` (repeatable), `time` (ms since epoch, one per id), `submission` (default true).
pub struct Scrobble;

#[async_trait]
impl Handler for Scrobble {
    async fn handle(&self, ctrl: &Controller, ctx: &RequestContext) -> Response {
        let Some(user) = ctx.user.clone() else {
            return Response::error(ErrorCode::NotAuthorized, "no user for this request");
        };
        let ids = match ctx.params.get_list("id") {
            Ok(ids) => ids,
            Err(e) => return params_error(e),
        };
        let times = match ctx.params.get_list_int("time") {
            Ok(times) => times,
            Err(e) => return params_error(e),
        };
        let submission = match ctx.params.get_or_bool("submission", true) {
            Ok(submission) => submission,
            Err(e) => return params_error(e),
        };

        // Resolve everything first so an unknown id sends nothing
        let mut tracks = Vec::with_capacity(ids.len());
        for id in ids {
            match ctrl.library().track(id).await {
                Some(track) => tracks.push(track),
                None => {
                    return Response::error(
                        ErrorCode::NotFound,
                        format!("couldn't find a track with id {id:?}"),
                    );
                }
            }
        }

        for (i, track) in tracks.into_iter().enumerate() {
            let stamp = times
                .get(i)
                .and_then(|ms| DateTime::<Utc>::from_timestamp_millis(*ms))
                .unwrap_or_else(Utc::now);
            // Fire-and-forget: the handle is dropped, the fan-out keeps running
            drop(ctrl.scrobblers().dispatch(ScrobbleEvent {
                user: Arc::clone(&user),
                track: Arc::new(track),
                stamp,
                submission,
            }));
        }
        Response::new()
    }
}

/// Streams a track's file untouched, chunk by chunk.
///
/// Errors found before the first byte go out as envelopes. After that the
/// head is committed, so a read failure or departed client just ends the body.
pub struct Download;

#[async_trait]
impl RawHandler for Download {
    async fn handle(
        &self,
        ctrl: &Controller,
        ctx: &RequestContext,
        w: &mut ResponseStream,
    ) -> Option<Response> {
        let id = match ctx.params.get("id") {
            Ok(id) => id,
            Err(e) => return Some(params_error(e)),
        };
        let Some(track) = ctrl.library().track(id).await else {
            return Some(Response::error(
                ErrorCode::NotFound,
                format!("couldn't find a track with id {id:?}"),
            ));
        };
        let Some(path) = track.path.as_deref() else {
            return Some(Response::error(ErrorCode::NotFound, "track has no file"));
        };

        let allowed = match ctrl.music_folder(&ctx.params) {
            Some(folder) => path.starts_with(folder),
            None => ctrl.music_paths().iter().any(|root| path.starts_with(root)),
        };
        if !allowed {
            return Some(Response::error(
                ErrorCode::NotAuthorized,
                "file is outside the music folders",
            ));
        }

        let file = match tokio::fs::File::open(path).await {
            Ok(file) => file,
            Err(e) => {
                warn!("Failed to open {:?}: {}", path, e);
                return Some(Response::error(ErrorCode::NotFound, "couldn't read file"));
            }
        };

        w.set_content_type(audio_content_type(path));
        let mut chunks = ReaderStream::new(file);
        let mut sent = 0usize;
        while let Some(chunk) = chunks.next().await {
            let chunk = match chunk {
                Ok(chunk) => chunk,
                Err(e) => {
                    warn!("Failed reading {:?} after {} bytes: {}", path, sent, e);
                    return None;
                }
            };
            sent += chunk.len();
            if let Err(e) = w.send(chunk).await {
                debug!(id, bytes = sent, "download aborted: {}", e);
                return None;
            }
        }
        debug!(id, bytes = sent, "download complete");
        None
    }
}

fn audio_content_type(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    match ext.as_deref() {
        Some("mp3") => "audio/mpeg",
        Some("flac") => "audio/flac",
        Some("ogg" | "oga" | "opus") => "audio/ogg",
        Some("m4a" | "mp4" | "aac") => "audio/mp4",
        Some("wav") => "audio/wav",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::library::MemoryLibrary;
    use crate::model::Track;
    use crate::subsonic::params::Params;
    use axum::http;
    use std::path::PathBuf;
    use std::time::Duration;

    #[test]
    fn test_audio_content_type() {
        assert_eq!(audio_content_type(Path::new("/m/a.MP3")), "audio/mpeg");
        assert_eq!(audio_content_type(Path::new("/m/a.opus")), "audio/ogg");
        assert_eq!(audio_content_type(Path::new("/m/a")), "application/octet-stream");
    }

    #[test]
    fn test_folder_name() {
        assert_eq!(folder_name(Path::new("/srv/music")), "music");
        assert_eq!(folder_name(Path::new("/")), "/");
    }

    #[tokio::test]
    async fn test_music_folders_are_numbered_in_order() {
        let ctrl = Controller::builder()
            .music_paths(vec![PathBuf::from("/srv/rock"), PathBuf::from("/srv/jazz")])
            .build();
        let resp = GetMusicFolders.handle(&ctrl, &RequestContext::default()).await;
        let Some(Payload::MusicFolders(folders)) = resp.payload() else {
            panic!("expected music folders");
        };
        assert_eq!(folders.list[1], MusicFolder { id: 1, name: "jazz".into() });
    }

    #[tokio::test]
    async fn test_scrobble_requires_user() {
        let ctrl = Controller::builder().build();
        let ctx = RequestContext {
            params: Params::from_pairs([("id", "tr-1")]),
            user: None,
        };
        let resp = Scrobble.handle(&ctrl, &ctx).await;
        assert_eq!(resp.api_error().unwrap().code, 50);
    }

    fn download_ctrl(music: &Path, file: PathBuf) -> Controller {
        let library = MemoryLibrary::new([Track {
            id: "tr-1".into(),
            path: Some(file),
            ..Default::default()
        }]);
        Controller::builder()
            .music_paths(vec![music.to_path_buf()])
            .library(Arc::new(library))
            .build()
    }

    fn ctx_for(id: &str) -> RequestContext {
        RequestContext {
            params: Params::from_pairs([("id", id)]),
            user: None,
        }
    }

    #[tokio::test]
    async fn test_download_error_path_sends_no_body() {
        let ctrl = Controller::builder().build();
        let (mut w, body) = ResponseStream::channel();
        let resp = Download.handle(&ctrl, &ctx_for("nope"), &mut w).await.unwrap();
        assert_eq!(resp.api_error().unwrap().code, 70);

        w.finish().await.unwrap();
        let response = body.respond().await;
        assert!(response.headers().get(http::header::CONTENT_TYPE).is_none());
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert!(bytes.is_empty());
    }

    #[tokio::test]
    async fn test_download_stops_when_client_leaves() {
        let music = tempfile::tempdir().unwrap();
        let file = music.path().join("long.flac");
        std::fs::write(&file, vec![0u8; 1 << 20]).unwrap();
        let ctrl = download_ctrl(music.path(), file);

        let (mut w, body) = ResponseStream::channel();
        drop(body);
        let resp = tokio::time::timeout(
            Duration::from_secs(5),
            Download.handle(&ctrl, &ctx_for("tr-1"), &mut w),
        )
        .await
        .expect("download kept going without a client");
        assert!(resp.is_none());
    }

    #[tokio::test]
    async fn test_download_missing_file_is_an_envelope() {
        let music = tempfile::tempdir().unwrap();
        let ctrl = download_ctrl(music.path(), music.path().join("gone.mp3"));
        let (mut w, _body) = ResponseStream::channel();
        let resp = Download.handle(&ctrl, &ctx_for("tr-1"), &mut w).await.unwrap();
        assert_eq!(resp.api_error().unwrap().code, 70);
    }
}
