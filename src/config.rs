//! Configuration for the Drive downloader.

use std::path::PathBuf;

/// Base URL of the Google Drive v3 API.
pub const DRIVE_API_BASE: &str = "https://www.googleapis.com/drive/v3";

/// Settings shared by every download in a session.
///
/// All knobs live here rather than in globals so callers can run several
/// sessions with different credentials side by side.
#[derive(Debug, Clone)]
pub struct Config {
    /// Path to the service account credentials JSON file.
    pub credentials_file: PathBuf,
    /// Base URL of the Drive API. Overridable for tests.
    pub api_base_url: String,
}

impl Config {
    pub fn new(credentials_file: impl Into<PathBuf>) -> Self {
        Self {
            credentials_file: credentials_file.into(),
            api_base_url: DRIVE_API_BASE.to_string(),
        }
    }

    /// Points the client at a different API endpoint.
    pub fn with_api_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.api_base_url = base_url.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_api_base() {
        let config = Config::new("/etc/gdrive/credentials.json");
        assert_eq!(config.api_base_url, DRIVE_API_BASE);
        assert_eq!(
            config.credentials_file,
            PathBuf::from("/etc/gdrive/credentials.json")
        );
    }

    #[test]
    fn test_api_base_override() {
        let config = Config::new("creds.json").with_api_base_url("http://localhost:8080");
        assert_eq!(config.api_base_url, "http://localhost:8080");
    }
}
