//! Error types, one enum per subsystem.

use std::path::PathBuf;

/// Errors raised while loading configuration from the environment.
///
/// Any of these is fatal at startup: the process logs the error and exits
/// before serving.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A mandatory environment variable is not set.
    #[error("missing required environment variable {name}")]
    Missing { name: &'static str },

    /// An environment variable is set but cannot be parsed.
    #[error("invalid value for {name}: {reason}")]
    Invalid { name: &'static str, reason: String },
}

/// Errors from the Telegram Bot API client.
#[derive(Debug, thiserror::Error)]
pub enum TelegramError {
    /// Transport-level failure (connect, TLS, timeout).
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The API answered with `ok: false`.
    #[error("Telegram API {method} failed: {description}")]
    Api { method: String, description: String },

    /// The API answered `ok: true` but without the expected payload.
    #[error("Telegram API {method} returned no result")]
    MissingResult { method: String },

    /// Local file I/O while uploading or downloading.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors while persisting an inbound file to local temp storage.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// The file has no server-side path to download from.
    #[error("file {file_id} has no downloadable path")]
    NoFilePath { file_id: String },

    #[error(transparent)]
    Telegram(#[from] TelegramError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors from the conversion workers.
///
/// Validation variants describe bad user input and are recoverable; the rest
/// are failures of the underlying tool or the filesystem.
#[derive(Debug, thiserror::Error)]
pub enum ConvertError {
    /// The page-range expression could not be parsed.
    #[error("invalid page range '{input}': {reason}")]
    InvalidPageRange { input: String, reason: String },

    /// No page of the document matched the requested range.
    #[error("no pages matched the requested range")]
    NoPagesMatched,

    /// The archive extension is not one we can extract.
    #[error("unsupported archive format: {name} (send ZIP or TAR/TAR.GZ)")]
    UnsupportedArchive { name: String },

    /// The archive extracted to nothing.
    #[error("the archive is empty")]
    EmptyArchive,

    /// The external tool could not be started (usually: not installed).
    #[error("{tool} could not be started: {source}")]
    Spawn {
        tool: &'static str,
        source: std::io::Error,
    },

    /// The external tool exited non-zero; `stderr` carries its own message.
    #[error("{tool} failed: {stderr}")]
    Tool { tool: &'static str, stderr: String },

    /// The tool reported success but the expected output is missing.
    #[error("{tool} produced no output at {path}")]
    MissingOutput { tool: &'static str, path: PathBuf },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ConvertError {
    /// True for errors caused by the user's input rather than the tooling.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            ConvertError::InvalidPageRange { .. }
                | ConvertError::NoPagesMatched
                | ConvertError::UnsupportedArchive { .. }
                | ConvertError::EmptyArchive
        )
    }
}

/// Errors from the webhook server.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: std::net::SocketAddr,
        source: std::io::Error,
    },
}
