//! gdrive_fetch - Download files from Google Drive by human-readable path.
//!
//! Files are addressed with `gdrive://<drive name>/<path/to/file>` URLs,
//! where the drive name is either a shared drive or the literal `My Drive`
//! for the account's own storage. The path is resolved folder by folder to
//! an object id, then the content is fetched in chunks with exact progress
//! reporting.
//!
//! Existing local files are skipped without touching the network, and every
//! per-file failure is reported as a skip rather than an error, so batch
//! downloads always run to the end of the list.
//!
//! # Example
//!
//! ```no_run
//! use gdrive_fetch::{Config, Downloader, DownloadOptions};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::new("service-account.json");
//!     let downloader = Downloader::new(&config)?;
//!
//!     let outcome = downloader
//!         .download(
//!             "gdrive://My Drive/data/session1.nix",
//!             "data/session1.nix".as_ref(),
//!             &DownloadOptions::default(),
//!             |transferred, total| eprintln!("{}/{} bytes", transferred, total),
//!         )
//!         .await;
//!     println!("{}", outcome);
//!
//!     Ok(())
//! }
//! ```

pub mod auth;
pub mod client;
pub mod config;
pub mod downloader;
pub mod error;
pub mod models;
pub mod remote_url;
pub mod resolver;

// Re-exports for convenience
pub use auth::Authenticator;
pub use client::DriveClient;
pub use config::Config;
pub use downloader::{
    DownloadOptions, DownloadOutcome, Downloader, SkipReason, DEFAULT_CHUNK_SIZE,
};
pub use error::{DriveError, Result};
pub use remote_url::RemoteUrl;
