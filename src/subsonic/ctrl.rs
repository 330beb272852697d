//! Controller state and routing for the `/rest` API.
//!
//! The controller holds only read-only startup configuration plus the shared
//! collaborators (library, scrobble dispatcher). Each request is served
//! independently.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use axum::Router;
use axum::extract::{Request, State};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response as HttpResponse};
use tracing::debug;

use super::encode::ResponseEncoder;
use super::envelope::{ErrorCode, Response};
use super::handler::{ResponseBuffer, h, hr};
use super::handlers;
use super::params::Params;
use crate::config::RadioStation;
use crate::library::{Library, MemoryLibrary};
use crate::model::User;
use crate::scrobble::ScrobbleDispatcher;

/// Shared state behind every `/rest` handler.
pub struct Controller {
    music_paths: Vec<PathBuf>,
    radio_stations: Vec<RadioStation>,
    encoder: ResponseEncoder,
    scrobblers: ScrobbleDispatcher,
    library: Arc<dyn Library>,
    users: UserDirectory,
}

impl Controller {
    pub fn builder() -> ControllerBuilder {
        ControllerBuilder::default()
    }

    pub fn encoder(&self) -> &ResponseEncoder {
        &self.encoder
    }

    pub fn scrobblers(&self) -> &ScrobbleDispatcher {
        &self.scrobblers
    }

    pub fn library(&self) -> &dyn Library {
        self.library.as_ref()
    }

    pub fn music_paths(&self) -> &[PathBuf] {
        &self.music_paths
    }

    pub fn radio_stations(&self) -> &[RadioStation] {
        &self.radio_stations
    }

    /// Resolve `musicFolderId` to a configured path. Absent, malformed or
    /// out-of-range ids resolve to nothing.
    pub fn music_folder(&self, params: &Params) -> Option<&Path> {
        let idx = params.get_int("musicFolderId").ok()?;
        let idx = usize::try_from(idx).ok()?;
        self.music_paths.get(idx).map(PathBuf::as_path)
    }
}

/// Assembles a [`Controller`]. Unset parts default to empty collaborators.
#[derive(Default)]
pub struct ControllerBuilder {
    music_paths: Vec<PathBuf>,
    radio_stations: Vec<RadioStation>,
    encoder: Option<ResponseEncoder>,
    scrobblers: Option<ScrobbleDispatcher>,
    library: Option<Arc<dyn Library>>,
    users: UserDirectory,
}

impl ControllerBuilder {
    pub fn music_paths(mut self, paths: Vec<PathBuf>) -> Self {
        self.music_paths = paths;
        self
    }

    pub fn radio_stations(mut self, stations: Vec<RadioStation>) -> Self {
        self.radio_stations = stations;
        self
    }

    pub fn encoder(mut self, encoder: ResponseEncoder) -> Self {
        self.encoder = Some(encoder);
        self
    }

    pub fn scrobblers(mut self, dispatcher: ScrobbleDispatcher) -> Self {
        self.scrobblers = Some(dispatcher);
        self
    }

    pub fn library(mut self, library: Arc<dyn Library>) -> Self {
        self.library = Some(library);
        self
    }

    pub fn users(mut self, users: UserDirectory) -> Self {
        self.users = users;
        self
    }

    pub fn build(self) -> Controller {
        Controller {
            music_paths: self.music_paths,
            radio_stations: self.radio_stations,
            encoder: self.encoder.unwrap_or_default(),
            scrobblers: self.scrobblers.unwrap_or_default(),
            library: self
                .library
                .unwrap_or_else(|| Arc::new(MemoryLibrary::default())),
            users: self.users,
        }
    }
}

/// Known users and their passwords.
#[derive(Debug, Default, Clone)]
pub struct UserDirectory {
    users: HashMap<String, (String, Arc<User>)>,
}

impl UserDirectory {
    pub fn insert(&mut self, password: impl Into<String>, user: User) {
        self.users
            .insert(user.name.clone(), (password.into(), Arc::new(user)));
    }

    /// Check `u` / `p` (plain, or `enc:` followed by hex) against the directory.
    pub fn resolve(&self, params: &Params) -> Result<Arc<User>, Response> {
        let (Ok(name), Ok(password)) = (params.get("u"), params.get("p")) else {
            return Err(Response::error(
                ErrorCode::MissingParameter,
                "please provide parameters `u` and `p`",
            ));
        };
        let password = decode_password(password).ok_or_else(|| {
            Response::error(ErrorCode::WrongCredentials, "invalid password encoding")
        })?;
        match self.users.get(name) {
            Some((expected, user)) if *expected == password => Ok(Arc::clone(user)),
            _ => Err(Response::error(
                ErrorCode::WrongCredentials,
                "wrong username or password",
            )),
        }
    }
}

fn decode_password(raw: &str) -> Option<String> {
    match raw.strip_prefix("enc:") {
        Some(encoded) => hex::decode(encoded)
            .ok()
            .and_then(|bytes| String::from_utf8(bytes).ok()),
        None => Some(raw.to_string()),
    }
}

/// Resolves the caller's identity and stores it in the request extensions.
async fn resolve_identity(
    State(ctrl): State<Arc<Controller>>,
    mut request: Request,
    next: Next,
) -> HttpResponse {
    let params = Params::from_uri(request.uri());
    match ctrl.users.resolve(&params) {
        Ok(user) => {
            debug!(user = %user.name, path = request.uri().path(), "resolved identity");
            request.extensions_mut().insert(user);
            next.run(request).await
        }
        Err(resp) => {
            let mut w = ResponseBuffer::new();
            ctrl.encoder()
                .write_response_logged(&mut w, &params, Some(&resp));
            w.into_response()
        }
    }
}

/// Build the `/rest` router. Every endpoint answers at `/rest/<name>` and `/rest/<name>.view`.
pub fn router(ctrl: Arc<Controller>) -> Router {
    let endpoints = [
        ("ping", h(handlers::Ping)),
        ("getLicense", h(handlers::GetLicense)),
        ("getMusicFolders", h(handlers::GetMusicFolders)),
        ("getInternetRadioStations", h(handlers::GetInternetRadioStations)),
        ("scrobble", h(handlers::Scrobble)),
        ("download", hr(handlers::Download)),
    ];

    let mut rest = Router::new();
    for (name, route) in endpoints {
        rest = rest
            .route(&format!("/{name}"), route.clone())
            .route(&format!("/{name}.view"), route);
    }

    Router::new()
        .nest(
            "/rest",
            rest.layer(middleware::from_fn_with_state(
                Arc::clone(&ctrl),
                resolve_identity,
            )),
        )
        .with_state(ctrl)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn directory() -> UserDirectory {
        let mut users = UserDirectory::default();
        users.insert("sesame", User::new("alice"));
        users
    }

    #[test]
    fn test_resolve_plain_and_hex_passwords() {
        let users = directory();
        let plain = Params::from_pairs([("u", "alice"), ("p", "sesame")]);
        assert_eq!(users.resolve(&plain).unwrap().name, "alice");

        let encoded = format!("enc:{}", hex::encode("sesame"));
        let hexed = Params::from_pairs([("u", "alice"), ("p", encoded.as_str())]);
        assert_eq!(users.resolve(&hexed).unwrap().name, "alice");
    }

    #[test]
    fn test_resolve_failures() {
        let users = directory();
        let missing = users.resolve(&Params::from_pairs([("u", "alice")])).unwrap_err();
        assert_eq!(missing.api_error().unwrap().code, 10);

        let wrong = users
            .resolve(&Params::from_pairs([("u", "alice"), ("p", "nope")]))
            .unwrap_err();
        assert_eq!(wrong.api_error().unwrap().code, 40);

        let unknown = users
            .resolve(&Params::from_pairs([("u", "mallory"), ("p", "sesame")]))
            .unwrap_err();
        assert_eq!(unknown.api_error().unwrap().code, 40);

        let bad_hex = users
            .resolve(&Params::from_pairs([("u", "alice"), ("p", "enc:zz")]))
            .unwrap_err();
        assert_eq!(bad_hex.api_error().unwrap().code, 40);
    }

    #[test]
    fn test_music_folder_lookup() {
        let ctrl = Controller::builder()
            .music_paths(vec![PathBuf::from("/music/a"), PathBuf::from("/music/b")])
            .build();
        let folder = |v: &str| {
            ctrl.music_folder(&Params::from_pairs([("musicFolderId", v)]))
                .map(Path::to_path_buf)
        };
        assert_eq!(folder("1"), Some(PathBuf::from("/music/b")));
        assert_eq!(folder("2"), None);
        assert_eq!(folder("-1"), None);
        assert_eq!(folder("x"), None);
        assert_eq!(ctrl.music_folder(&Params::new()), None);
    }
}
