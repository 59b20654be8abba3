//! Google Drive API client for lookups and chunked reads.

use bytes::Bytes;
use reqwest::header::{CONTENT_RANGE, RANGE};
use reqwest::Client;
use tracing::debug;

use crate::auth::Authenticator;
use crate::error::{DriveError, Result};
use crate::models::{
    About, ApiErrorResponse, ChildListResponse, ChildRef, DriveInfo, DriveListResponse, FileSize,
};

/// Reported instead of an address when the about endpoint fails or the
/// account has no email. Error messages must never fail themselves.
const UNKNOWN_EMAIL: &str = "unknown email";

/// Client for the Google Drive v3 API.
#[derive(Debug)]
pub struct DriveClient {
    auth: Authenticator,
    http: Client,
    base_url: String,
}

impl DriveClient {
    /// Create a new DriveClient.
    ///
    /// # Arguments
    /// * `auth` - Authenticator for obtaining access tokens
    /// * `base_url` - Base URL of the Drive API
    pub fn new(auth: Authenticator, base_url: impl Into<String>) -> Self {
        Self {
            auth,
            http: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// List all shared drives visible to the account.
    pub async fn list_drives(&self) -> Result<Vec<DriveInfo>> {
        let token = self.auth.get_access_token().await?;
        let mut all_drives = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut request = self
                .http
                .get(format!("{}/drives", self.base_url))
                .bearer_auth(&token)
                .query(&[("fields", "nextPageToken, drives(id, name)")]);

            if let Some(ref token) = page_token {
                request = request.query(&[("pageToken", token)]);
            }

            let response = request.send().await?;
            if !response.status().is_success() {
                return Err(api_error(response).await);
            }

            let list_response: DriveListResponse = response.json().await?;
            all_drives.extend(list_response.drives);

            match list_response.next_page_token {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        Ok(all_drives)
    }

    /// Find all non-trashed children of a folder with an exact name.
    pub async fn find_children(&self, name: &str, parent_id: &str) -> Result<Vec<ChildRef>> {
        let query = format!(
            "name = '{}' and '{}' in parents and trashed = false",
            name.replace('\\', "\\\\").replace('\'', "\\'"),
            parent_id
        );

        let token = self.auth.get_access_token().await?;
        let mut all_files = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut request = self
                .http
                .get(format!("{}/files", self.base_url))
                .bearer_auth(&token)
                .query(&[
                    ("q", query.as_str()),
                    ("includeItemsFromAllDrives", "true"),
                    ("supportsAllDrives", "true"),
                    ("fields", "nextPageToken, files(id)"),
                ]);

            if let Some(ref token) = page_token {
                request = request.query(&[("pageToken", token)]);
            }

            let response = request.send().await?;
            if !response.status().is_success() {
                return Err(api_error(response).await);
            }

            let list_response: ChildListResponse = response.json().await?;
            all_files.extend(list_response.files);

            match list_response.next_page_token {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        Ok(all_files)
    }

    /// Get the size of a file in bytes. Objects without a size, such as
    /// folders and Google editor documents, report zero.
    pub async fn file_size(&self, file_id: &str) -> Result<u64> {
        let token = self.auth.get_access_token().await?;

        let response = self
            .http
            .get(format!("{}/files/{}", self.base_url, file_id))
            .bearer_auth(&token)
            .query(&[("supportsAllDrives", "true"), ("fields", "size")])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(api_error(response).await);
        }

        let metadata: FileSize = response.json().await?;
        Ok(metadata.size.unwrap_or(0))
    }

    /// The email address of the authenticated account, for error messages.
    /// Falls back to a placeholder rather than failing.
    pub async fn user_email(&self) -> String {
        match self.fetch_user_email().await {
            Ok(Some(email)) => email,
            Ok(None) => UNKNOWN_EMAIL.to_string(),
            Err(e) => {
                debug!("could not determine account email: {}", e);
                UNKNOWN_EMAIL.to_string()
            }
        }
    }

    async fn fetch_user_email(&self) -> Result<Option<String>> {
        let token = self.auth.get_access_token().await?;

        let response = self
            .http
            .get(format!("{}/about", self.base_url))
            .bearer_auth(&token)
            .query(&[("fields", "user(emailAddress)")])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(api_error(response).await);
        }

        let about: About = response.json().await?;
        Ok(about.user.and_then(|user| user.email_address))
    }

    /// Open a chunked reader over a file's content.
    ///
    /// Each [`ObjectStream::next_chunk`] call issues one ranged request for
    /// up to `chunk_size` bytes.
    pub fn stream_object(&self, file_id: impl Into<String>, chunk_size: u64) -> ObjectStream<'_> {
        ObjectStream {
            client: self,
            file_id: file_id.into(),
            chunk_size: chunk_size.max(1),
            position: 0,
            total: None,
            done: false,
        }
    }
}

/// Incremental reader over a file's content.
pub struct ObjectStream<'a> {
    client: &'a DriveClient,
    file_id: String,
    chunk_size: u64,
    position: u64,
    total: Option<u64>,
    done: bool,
}

/// One chunk of downloaded content.
pub struct ObjectChunk {
    /// The bytes of this chunk. Empty only for zero-byte objects.
    pub data: Bytes,
    /// Exact number of bytes transferred so far, including this chunk.
    pub transferred: u64,
    /// True when the object has been fully read.
    pub is_last: bool,
}

impl ObjectStream<'_> {
    /// Fetch the next chunk of the file.
    pub async fn next_chunk(&mut self) -> Result<ObjectChunk> {
        let token = self.client.auth.get_access_token().await?;
        let range_end = self.position + self.chunk_size - 1;

        let response = self
            .client
            .http
            .get(format!("{}/files/{}", self.client.base_url, self.file_id))
            .bearer_auth(&token)
            .query(&[("alt", "media"), ("supportsAllDrives", "true")])
            .header(RANGE, format!("bytes={}-{}", self.position, range_end))
            .send()
            .await?;

        match response.status().as_u16() {
            206 => {
                if self.total.is_none() {
                    self.total = response
                        .headers()
                        .get(CONTENT_RANGE)
                        .and_then(|value| value.to_str().ok())
                        .and_then(parse_content_range_total);
                }
                let data = response.bytes().await?;
                let short_read = (data.len() as u64) < self.chunk_size;
                self.position += data.len() as u64;
                self.done = short_read || self.total.is_some_and(|total| self.position >= total);
                Ok(self.chunk(data))
            }
            // Server ignored the range and sent the whole object.
            200 => {
                let data = response.bytes().await?;
                self.position += data.len() as u64;
                self.total = Some(self.position);
                self.done = true;
                Ok(self.chunk(data))
            }
            // Requested past the end. Happens only for zero-byte objects,
            // which have no first byte to ask for.
            416 => {
                self.total = Some(self.position);
                self.done = true;
                Ok(self.chunk(Bytes::new()))
            }
            _ => Err(api_error(response).await),
        }
    }

    /// Exact number of bytes transferred so far.
    pub fn transferred(&self) -> u64 {
        self.position
    }

    fn chunk(&self, data: Bytes) -> ObjectChunk {
        ObjectChunk {
            data,
            transferred: self.position,
            is_last: self.done,
        }
    }
}

/// Extract the total size from a Content-Range header value such as
/// `bytes 0-4/1024`. A `*` total yields None.
fn parse_content_range_total(value: &str) -> Option<u64> {
    value.rsplit('/').next()?.trim().parse().ok()
}

/// Map an unsuccessful response to an API error, preferring the structured
/// message in the JSON body over the raw text.
async fn api_error(response: reqwest::Response) -> DriveError {
    let status = response.status();
    let error_body = response.text().await.unwrap_or_default();
    if let Ok(api_error) = serde_json::from_str::<ApiErrorResponse>(&error_body) {
        return DriveError::ApiError {
            status: api_error.error.code,
            message: api_error.error.message,
        };
    }
    DriveError::ApiError {
        status: status.as_u16(),
        message: error_body,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_content_range_total() {
        assert_eq!(parse_content_range_total("bytes 0-4/1024"), Some(1024));
        assert_eq!(parse_content_range_total("bytes */52"), Some(52));
        assert_eq!(parse_content_range_total("bytes 0-4/*"), None);
        assert_eq!(parse_content_range_total("garbage"), None);
    }
}
