//! Error types for the gdrive_fetch crate.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while resolving or downloading Drive files.
#[derive(Error, Debug)]
pub enum DriveError {
    /// The configured credentials file does not exist. Raised eagerly at
    /// construction, before any network call.
    #[error("missing Google Drive API credentials file \"{}\"", .0.display())]
    MissingCredentialsFile(PathBuf),

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("failed to parse credentials JSON: {0}")]
    CredentialsParseError(#[from] serde_json::Error),

    #[error("JWT encoding error: {0}")]
    JwtError(#[from] jsonwebtoken::errors::Error),

    #[error("token refresh failed: {0}")]
    TokenRefreshError(String),

    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("API error ({status}): {message}")]
    ApiError { status: u16, message: String },

    #[error("malformed URL \"{0}\": expected gdrive://<drive name>/<path/to/file>")]
    MalformedUrl(String),

    /// A name lookup matched nothing. `what` reads "drive" or
    /// "file or folder" depending on which lookup failed.
    #[error("{what} \"{name}\" not found on server for account \"{email}\"")]
    NotFound {
        what: &'static str,
        name: String,
        email: String,
    },

    /// A name lookup matched more than one object. `what` reads "drives"
    /// or "files or folders" depending on which lookup failed.
    #[error("ambiguous path, multiple {what} named \"{name}\" exist on server for account \"{email}\"")]
    Ambiguous {
        what: &'static str,
        name: String,
        email: String,
    },
}

impl DriveError {
    /// True when a lookup matched nothing or the server reported the
    /// standard "resource missing" status. The downloader gives these
    /// their own skip reason; every other failure is folded into a
    /// generic skip.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            DriveError::NotFound { .. } | DriveError::ApiError { status: 404, .. }
        )
    }
}

/// Result type alias for DriveError.
pub type Result<T> = std::result::Result<T, DriveError>;
