//! Resolution of remote URLs to Drive object ids.

use tracing::debug;

use crate::client::DriveClient;
use crate::error::{DriveError, Result};
use crate::remote_url::{RemoteUrl, ROOT_ID};

/// Resolve a parsed remote URL to the id of the object it names.
///
/// The drive root is located first, then each path segment is looked up by
/// exact name under the id resolved so far. The walk stops at the first
/// segment that fails, so nothing past a missing folder is ever queried.
///
/// The account email in error messages is fetched only when an error is
/// actually built.
pub async fn resolve(client: &DriveClient, url: &RemoteUrl) -> Result<String> {
    debug!("resolving {}", url);

    let mut current = drive_root_id(client, url).await?;
    debug!("drive \"{}\" has root id {}", url.drive_name(), current);

    for segment in url.segments() {
        current = child_id(client, &current, segment).await?;
        debug!("segment \"{}\" resolved to {}", segment, current);
    }

    Ok(current)
}

/// Locate the root id for the URL's drive. The "My Drive" sentinel maps
/// to the fixed root alias without touching the network; any other name
/// must match exactly one shared drive.
async fn drive_root_id(client: &DriveClient, url: &RemoteUrl) -> Result<String> {
    if url.is_my_drive() {
        return Ok(ROOT_ID.to_string());
    }

    let name = url.drive_name();
    let mut matches: Vec<_> = client
        .list_drives()
        .await?
        .into_iter()
        .filter(|drive| drive.name == name)
        .collect();

    if matches.len() > 1 {
        return Err(DriveError::Ambiguous {
            what: "drives",
            name: name.to_string(),
            email: client.user_email().await,
        });
    }
    match matches.pop() {
        Some(drive) => Ok(drive.id),
        None => Err(DriveError::NotFound {
            what: "drive",
            name: name.to_string(),
            email: client.user_email().await,
        }),
    }
}

/// Look up a child by exact name under a parent folder. Exactly one match
/// is required.
async fn child_id(client: &DriveClient, parent_id: &str, name: &str) -> Result<String> {
    let mut matches = client.find_children(name, parent_id).await?;

    if matches.len() > 1 {
        return Err(DriveError::Ambiguous {
            what: "files or folders",
            name: name.to_string(),
            email: client.user_email().await,
        });
    }
    match matches.pop() {
        Some(child) => Ok(child.id),
        None => Err(DriveError::NotFound {
            what: "file or folder",
            name: name.to_string(),
            email: client.user_email().await,
        }),
    }
}
