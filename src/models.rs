//! Data models for Google Drive API responses.

use serde::Deserialize;

/// Shared drive metadata from the drives.list endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct DriveInfo {
    pub id: String,
    pub name: String,
}

/// Response from the drives.list API endpoint.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriveListResponse {
    #[serde(default)]
    pub drives: Vec<DriveInfo>,
    #[serde(default)]
    pub next_page_token: Option<String>,
}

/// A matched child object from a name lookup. Only the id is requested;
/// the walk never needs anything else.
#[derive(Debug, Clone, Deserialize)]
pub struct ChildRef {
    pub id: String,
}

/// Response from the files.list API endpoint.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChildListResponse {
    #[serde(default)]
    pub files: Vec<ChildRef>,
    #[serde(default)]
    pub next_page_token: Option<String>,
}

/// Size-only file metadata from the files.get endpoint.
///
/// The API reports size as a decimal string; folders and some Google
/// editor documents omit it entirely.
#[derive(Debug, Deserialize)]
pub struct FileSize {
    #[serde(default, deserialize_with = "deserialize_size")]
    pub size: Option<u64>,
}

fn deserialize_size<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let opt: Option<String> = Option::deserialize(deserializer)?;
    match opt {
        Some(s) => s.parse::<u64>().map(Some).map_err(serde::de::Error::custom),
        None => Ok(None),
    }
}

/// User information from the about API.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub email_address: Option<String>,
}

/// About response from the Drive API.
#[derive(Debug, Deserialize)]
pub struct About {
    #[serde(default)]
    pub user: Option<User>,
}

/// Google API error response.
#[derive(Debug, Deserialize)]
pub struct ApiErrorResponse {
    pub error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
pub struct ApiErrorDetail {
    pub code: u16,
    pub message: String,
}

/// Service account credentials from JSON file.
#[derive(Debug, Deserialize)]
pub struct ServiceAccountCredentials {
    pub client_email: String,
    pub private_key: String,
    pub token_uri: Option<String>,
}

/// OAuth2 token response.
#[derive(Debug, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: u64,
}

/// Format bytes into human-readable size.
pub fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}
