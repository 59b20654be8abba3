//! Parser for `gdrive://` remote URLs.

use std::sync::LazyLock;

use regex::Regex;

use crate::error::{DriveError, Result};

/// Drive name that addresses the account's own root instead of a shared
/// drive. Matched exactly, case-sensitive.
pub const MY_DRIVE: &str = "My Drive";

/// Alias the API accepts for the root folder of the user's own drive.
pub const ROOT_ID: &str = "root";

/// Splits a remote URL into drive name and path. The drive name may
/// contain spaces, so this cannot go through a strict URL parser.
static REMOTE_URL_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?i:gdrive)://([^/]*)(/.*)?$").expect("Invalid remote URL regex")
});

/// A parsed `gdrive://<drive name>/<path/to/file>` URL.
///
/// The drive name and every path segment are percent-decoded, and the
/// path is normalized: empty and `.` segments vanish, `..` removes the
/// segment before it.
///
/// # Examples
///
/// ```
/// use gdrive_fetch::remote_url::RemoteUrl;
///
/// let url = RemoteUrl::parse("gdrive://My Drive/data/session1.nix").unwrap();
/// assert!(url.is_my_drive());
/// assert_eq!(url.segments(), ["data", "session1.nix"]);
/// assert_eq!(url.file_name(), "session1.nix");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteUrl {
    drive_name: String,
    segments: Vec<String>,
}

impl RemoteUrl {
    /// Parse a remote URL string.
    pub fn parse(url: &str) -> Result<Self> {
        let trimmed = url.trim();

        let captures = REMOTE_URL_REGEX
            .captures(trimmed)
            .ok_or_else(|| DriveError::MalformedUrl(url.to_string()))?;

        let drive_name = decode(url, captures.get(1).map_or("", |m| m.as_str()))?;
        if drive_name.trim().is_empty() {
            return Err(DriveError::MalformedUrl(url.to_string()));
        }

        let path = captures.get(2).map_or("", |m| m.as_str());
        let mut segments = Vec::new();
        for component in path.split('/') {
            let component = decode(url, component)?;
            match component.as_str() {
                "" | "." => {}
                ".." => {
                    if segments.pop().is_none() {
                        return Err(DriveError::MalformedUrl(url.to_string()));
                    }
                }
                _ => segments.push(component),
            }
        }

        Ok(Self { drive_name, segments })
    }

    /// The drive name, percent-decoded.
    pub fn drive_name(&self) -> &str {
        &self.drive_name
    }

    /// True when the URL addresses the account's own drive rather than a
    /// shared drive.
    pub fn is_my_drive(&self) -> bool {
        self.drive_name == MY_DRIVE
    }

    /// Normalized path segments below the drive root.
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// The last path segment, or the drive name when the path is empty.
    pub fn file_name(&self) -> &str {
        self.segments
            .last()
            .map(String::as_str)
            .unwrap_or(&self.drive_name)
    }
}

impl std::fmt::Display for RemoteUrl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "gdrive://{}", self.drive_name)?;
        for segment in &self.segments {
            write!(f, "/{}", segment)?;
        }
        Ok(())
    }
}

fn decode(url: &str, component: &str) -> Result<String> {
    urlencoding::decode(component)
        .map(|s| s.into_owned())
        .map_err(|_| DriveError::MalformedUrl(url.to_string()))
}
