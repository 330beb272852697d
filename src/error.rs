//! Application-wide error types.
//!
//! Library modules use specific error types via `thiserror`, while the CLI
//! uses `anyhow` for convenient error propagation.
//!
//! # Design
//!
//! - [`Error`]: Top-level error for startup and command wiring
//! - Module-specific errors ([`ConfigError`], [`ScrobbleError`]) for
//!   detailed handling
//!
//! Request handling never produces an [`Error`]: handlers answer with a
//! failed envelope instead.
//!
//! [`ConfigError`]: crate::config::ConfigError
//! [`ScrobbleError`]: crate::scrobble::ScrobbleError

/// Application-wide result type.
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level application error.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// File or socket I/O error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration could not be loaded
    #[error(transparent)]
    Config(#[from] crate::config::ConfigError),

    /// The shared HTTP client could not be built
    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),

    /// A scrobble backend failed
    #[error("Scrobble error: {0}")]
    Scrobble(#[from] crate::scrobble::ScrobbleError),

    /// No configured user with this name
    #[error("Unknown user: {0}")]
    UnknownUser(String),

    /// No catalog track with this id
    #[error("Unknown track: {0}")]
    UnknownTrack(String),

    /// Generic error with context
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<Error>,
    },
}

impl Error {
    /// Create an unknown user error.
    pub fn unknown_user(name: impl Into<String>) -> Self {
        Self::UnknownUser(name.into())
    }

    /// Create an unknown track error.
    pub fn unknown_track(id: impl Into<String>) -> Self {
        Self::UnknownTrack(id.into())
    }

    /// Add context to an error.
    pub fn context(self, ctx: impl Into<String>) -> Self {
        Self::WithContext {
            context: ctx.into(),
            source: Box::new(self),
        }
    }
}

/// Extension trait for adding context to Results.
pub trait ResultExt<T> {
    /// Add context to an error result.
    fn with_context(self, ctx: impl Into<String>) -> Result<T>;
}

impl<T> ResultExt<T> for Result<T> {
    fn with_context(self, ctx: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.context(ctx))
    }
}

impl<T> ResultExt<T> for std::result::Result<T, std::io::Error> {
    fn with_context(self, ctx: impl Into<String>) -> Result<T> {
        self.map_err(|e| Error::Io(e).context(ctx))
    }
}

impl<T> ResultExt<T> for std::result::Result<T, reqwest::Error> {
    fn with_context(self, ctx: impl Into<String>) -> Result<T> {
        self.map_err(|e| Error::HttpClient(e).context(ctx))
    }
}
