//! Per-request scratch directories under the media root.
//!
//! Each request owns one directory holding the downloaded artifact and any
//! derived chunks; the key is derived from the request identity so the same
//! message never scatters files across two directories.

use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use tracing::{debug, warn};

/// Derived work-directory key, stable per (chat, message, url) triple.
pub fn request_key(chat_id: i64, message_id: i64, url: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(chat_id.to_le_bytes());
    hasher.update(message_id.to_le_bytes());
    hasher.update(url.as_bytes());
    let digest = hasher.finalize();

    // First 16 hex chars (8 bytes)
    hex::encode(&digest[..8])
}

/// Create the work directory for a request.
pub async fn create(media_root: &Path, key: &str) -> std::io::Result<PathBuf> {
    let dir = media_root.join(key);
    tokio::fs::create_dir_all(&dir).await?;
    Ok(dir)
}

/// Best-effort cleanup after handling: remove the primary artifact
/// unconditionally, then the directory iff empty (chunks are removed by the
/// dispatcher). Failures are logged, never escalated.
pub async fn cleanup(artifact: &Path, dir: &Path) {
    if let Err(e) = tokio::fs::remove_file(artifact).await {
        warn!(path = %artifact.display(), error = %e, "failed to remove artifact");
    }

    remove_if_empty(dir).await;
}

/// Remove the directory only when nothing is left inside it.
pub async fn remove_if_empty(dir: &Path) {
    match dir_is_empty(dir).await {
        Ok(true) => {
            if let Err(e) = tokio::fs::remove_dir(dir).await {
                warn!(path = %dir.display(), error = %e, "failed to remove work directory");
            }
        }
        Ok(false) => {
            debug!(path = %dir.display(), "work directory not empty, leaving in place");
        }
        Err(e) => {
            warn!(path = %dir.display(), error = %e, "failed to inspect work directory");
        }
    }
}

async fn dir_is_empty(dir: &Path) -> std::io::Result<bool> {
    let mut entries = tokio::fs::read_dir(dir).await?;
    Ok(entries.next_entry().await?.is_none())
}
