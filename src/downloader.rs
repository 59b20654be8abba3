//! Skip-aware downloads with chunked transfer and progress reporting.

use std::path::Path;

use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tracing::{error, info};

use crate::auth::Authenticator;
use crate::client::DriveClient;
use crate::config::Config;
use crate::error::{DriveError, Result};
use crate::models::format_size;
use crate::remote_url::RemoteUrl;
use crate::resolver;

/// Default download chunk size, 5 MiB.
///
/// Each chunk costs one request round trip, so larger chunks transfer
/// noticeably faster, but they also make progress updates rarer. 5 MiB is
/// the compromise.
pub const DEFAULT_CHUNK_SIZE: u64 = 5 * 1024 * 1024;

/// Per-download settings.
#[derive(Debug, Clone)]
pub struct DownloadOptions {
    /// Re-download and replace a local file that already exists.
    pub overwrite_existing: bool,
    /// Bytes fetched per request.
    pub chunk_size: u64,
}

impl Default for DownloadOptions {
    fn default() -> Self {
        Self {
            overwrite_existing: false,
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }
}

/// Why a download was skipped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// The local file already exists and overwriting was not requested.
    AlreadyExists,
    /// The drive, a path segment, or the file itself does not exist on
    /// the server.
    NotFound { detail: String },
    /// Any other failure: malformed URL, ambiguous path, network or API
    /// error, or local I/O error.
    Error { detail: String },
}

/// The result of a download attempt.
///
/// Failures are reported here rather than returned as errors so that one
/// bad file never interrupts a batch.
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use]
pub enum DownloadOutcome {
    /// The file was fetched and written in full.
    Completed { bytes_written: u64 },
    /// Nothing usable was produced.
    Skipped(SkipReason),
}

impl std::fmt::Display for DownloadOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DownloadOutcome::Completed { bytes_written } => {
                write!(f, "completed ({})", format_size(*bytes_written))
            }
            DownloadOutcome::Skipped(SkipReason::AlreadyExists) => {
                write!(f, "skipped (already exists)")
            }
            DownloadOutcome::Skipped(SkipReason::NotFound { detail })
            | DownloadOutcome::Skipped(SkipReason::Error { detail }) => {
                write!(f, "skipped ({})", detail)
            }
        }
    }
}

/// Downloads files addressed by `gdrive://` URLs.
#[derive(Debug)]
pub struct Downloader {
    client: DriveClient,
}

impl Downloader {
    /// Create a downloader from configuration.
    ///
    /// Fails when the credentials file is missing, so a broken setup is
    /// reported once up front instead of as a skip on every file.
    pub fn new(config: &Config) -> Result<Self> {
        let auth = Authenticator::from_file(&config.credentials_file)?;
        Ok(Self {
            client: DriveClient::new(auth, config.api_base_url.clone()),
        })
    }

    /// Create a downloader around an existing client.
    pub fn with_client(client: DriveClient) -> Self {
        Self { client }
    }

    /// The underlying API client.
    pub fn client(&self) -> &DriveClient {
        &self.client
    }

    /// Download one file to `local_path`.
    ///
    /// When the local file already exists and `overwrite_existing` is not
    /// set, the download is skipped without any network traffic. Every
    /// failure is logged and folded into the returned outcome; this method
    /// never escalates a per-file problem.
    ///
    /// `progress` is called after every chunk with the exact cumulative
    /// number of bytes transferred and the expected total.
    pub async fn download<F>(
        &self,
        url: &str,
        local_path: &Path,
        options: &DownloadOptions,
        mut progress: F,
    ) -> DownloadOutcome
    where
        F: FnMut(u64, u64),
    {
        let name = file_name_for_logs(local_path);

        if !options.overwrite_existing && local_path.exists() {
            info!("skipping {} (already exists)", name);
            return DownloadOutcome::Skipped(SkipReason::AlreadyExists);
        }

        info!("downloading {}", name);
        match self.fetch(url, local_path, options, &mut progress).await {
            Ok(bytes_written) => {
                info!("finished {} ({})", name, format_size(bytes_written));
                DownloadOutcome::Completed { bytes_written }
            }
            Err(e) if e.is_not_found() => {
                let detail = self.not_found_detail(e).await;
                error!("skipping {} ({})", name, detail);
                DownloadOutcome::Skipped(SkipReason::NotFound { detail })
            }
            Err(e) => {
                let detail = e.to_string();
                error!("skipping {} ({})", name, detail);
                DownloadOutcome::Skipped(SkipReason::Error { detail })
            }
        }
    }

    async fn fetch<F>(
        &self,
        url: &str,
        local_path: &Path,
        options: &DownloadOptions,
        progress: &mut F,
    ) -> Result<u64>
    where
        F: FnMut(u64, u64),
    {
        // Create the containing directory if necessary
        if let Some(parent) = local_path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        let remote = RemoteUrl::parse(url)?;
        let file_id = resolver::resolve(&self.client, &remote).await?;
        let total = self.client.file_size(&file_id).await?;

        let mut file = File::create(local_path).await?;
        let mut stream = self.client.stream_object(file_id, options.chunk_size);

        loop {
            let chunk = stream.next_chunk().await?;
            file.write_all(&chunk.data).await?;
            progress(chunk.transferred, total);
            if chunk.is_last {
                break;
            }
        }

        file.flush().await?;
        Ok(stream.transferred())
    }

    /// Not-found errors from the resolver already name the object and the
    /// account; a bare 404 from the API gets the account looked up here.
    async fn not_found_detail(&self, err: DriveError) -> String {
        match err {
            DriveError::NotFound { .. } => err.to_string(),
            _ => format!(
                "not found on server for account \"{}\"",
                self.client.user_email().await
            ),
        }
    }
}

/// The file name component of a path, for log messages.
fn file_name_for_logs(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
