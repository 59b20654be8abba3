//! gdrive_fetch CLI - Download Google Drive files by path.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::Context;
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::debug;

use gdrive_fetch::{
    resolver, Config, DownloadOptions, DownloadOutcome, Downloader, RemoteUrl, SkipReason,
};

/// Download Google Drive files addressed by gdrive:// paths.
#[derive(Parser)]
#[command(name = "gdrive_fetch")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to service account JSON credentials file.
    #[arg(long, env = "GOOGLE_APPLICATION_CREDENTIALS")]
    credentials: PathBuf,

    /// Increase output verbosity (-v for debug, -vv for trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress non-error output.
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Download one or more files.
    Download {
        /// Remote URLs of the form gdrive://<drive name>/<path/to/file>.
        #[arg(required = true)]
        urls: Vec<String>,

        /// Local destination directory.
        #[arg(long, short = 't', default_value = ".")]
        to: PathBuf,

        /// Replace local files that already exist.
        #[arg(long)]
        overwrite: bool,

        /// Chunk size in MiB.
        #[arg(
            long = "chunk-size",
            value_name = "MIB",
            default_value_t = 5,
            value_parser = clap::value_parser!(u64).range(1..=1024)
        )]
        chunk_size_mib: u64,

        /// Disable the progress bar.
        #[arg(long)]
        no_progress: bool,
    },

    /// Resolve a remote URL to its object id without downloading.
    Resolve {
        /// Remote URL of the form gdrive://<drive name>/<path/to/file>.
        url: String,
    },

    /// Print the email address of the authenticated account.
    Whoami,
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    // Log level priority: RUST_LOG env var > quiet flag > verbose flag
    let default_level = if cli.quiet {
        "error"
    } else {
        match cli.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = Config::new(&cli.credentials);
    let downloader = Downloader::new(&config).with_context(|| {
        format!(
            "failed to set up Drive access with credentials {:?}",
            cli.credentials
        )
    })?;

    match cli.command {
        Commands::Download {
            urls,
            to,
            overwrite,
            chunk_size_mib,
            no_progress,
        } => {
            let options = DownloadOptions {
                overwrite_existing: overwrite,
                chunk_size: chunk_size_mib * 1024 * 1024,
            };

            let mut failures = 0usize;
            for url in &urls {
                let local_path = local_path_for(url, &to);
                debug!("saving {} to {:?}", url, local_path);

                let bar = if no_progress {
                    None
                } else {
                    Some(byte_progress_bar())
                };
                let outcome = downloader
                    .download(url, &local_path, &options, |transferred, total| {
                        if let Some(bar) = &bar {
                            bar.set_length(total.max(transferred));
                            bar.set_position(transferred);
                        }
                    })
                    .await;
                if let Some(bar) = &bar {
                    bar.finish_and_clear();
                }

                println!("{}: {}", local_path.display(), outcome);
                if matches!(
                    outcome,
                    DownloadOutcome::Skipped(SkipReason::NotFound { .. })
                        | DownloadOutcome::Skipped(SkipReason::Error { .. })
                ) {
                    failures += 1;
                }
            }

            if failures > 0 {
                eprintln!("{} of {} download(s) failed", failures, urls.len());
                return Ok(ExitCode::FAILURE);
            }
        }

        Commands::Resolve { url } => {
            let remote = RemoteUrl::parse(&url)?;
            let id = resolver::resolve(downloader.client(), &remote).await?;
            println!("{}", id);
        }

        Commands::Whoami => {
            println!("{}", downloader.client().user_email().await);
        }
    }

    Ok(ExitCode::SUCCESS)
}

/// Destination path for a URL: its file name under the target directory.
/// An unparseable URL keeps the text after its last slash as the name, so
/// the downloader can report the failure per file.
fn local_path_for(url: &str, to: &Path) -> PathBuf {
    match RemoteUrl::parse(url) {
        Ok(remote) => to.join(remote.file_name()),
        Err(_) => to.join(url.rsplit('/').next().unwrap_or(url)),
    }
}

fn byte_progress_bar() -> ProgressBar {
    let bar = ProgressBar::new(0);
    bar.set_style(
        ProgressStyle::with_template("{bar:40} {bytes}/{total_bytes} ({bytes_per_sec})")
            .unwrap_or_else(|_| ProgressStyle::default_bar()),
    );
    bar
}
