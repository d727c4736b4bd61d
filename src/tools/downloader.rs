//! yt-dlp invocation.
//!
//! Downloads a URL into a destination directory, preferring an mp4
//! video+audio pair merged into one container, and re-encoding through the
//! postprocessor to a baseline H.264/AAC profile so chunks cut from it stay
//! playable everywhere.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

use super::{run_tool, version_check, ExternalTool};
use crate::error::RelayError;

/// Container extensions the platform accepts as a playable artifact.
const CONTAINER_EXTENSIONS: &[&str] = &["mp4", "mkv", "webm"];

/// External downloader (yt-dlp) adapter
pub struct Downloader {
    binary_path: String,
    timeout: Duration,
}

impl Downloader {
    pub fn new(timeout: Duration) -> Self {
        Self::with_binary_path("yt-dlp", timeout)
    }

    pub fn with_binary_path(binary_path: impl Into<String>, timeout: Duration) -> Self {
        Self {
            binary_path: binary_path.into(),
            timeout,
        }
    }

    /// Fetch `url` into `dest`, blocking this task for the full download, and
    /// return the path of the merged media file.
    pub async fn download(&self, url: &str, dest: &Path) -> Result<PathBuf, RelayError> {
        let template = dest.join("%(title)s.%(ext)s");

        let mut cmd = Command::new(&self.binary_path);
        cmd.args([
            "--format",
            "bestvideo[ext=mp4]+bestaudio[ext=m4a]/best[ext=mp4]/best",
            "--merge-output-format",
            "mp4",
            "--postprocessor-args",
            "ffmpeg:-c:v libx264 -profile:v baseline -level 3.0 -pix_fmt yuv420p -c:a aac",
            "--output",
        ])
        .arg(&template)
        .arg(url);

        debug!(url, dest = %dest.display(), "invoking yt-dlp");

        let output = run_tool(cmd, self.timeout)
            .await
            .map_err(|e| RelayError::DownloadFailed {
                output: e.to_string(),
            })?;

        if !output.success() {
            return Err(RelayError::DownloadFailed {
                output: output.combined(),
            });
        }

        find_artifact(dest).ok_or(RelayError::NoFileFound)
    }
}

#[async_trait]
impl ExternalTool for Downloader {
    fn name(&self) -> &str {
        "yt-dlp"
    }

    async fn health_check(&self) -> Result<()> {
        version_check(&self.binary_path, "--version").await
    }
}

/// First file in the directory with a known container extension.
fn find_artifact(dir: &Path) -> Option<PathBuf> {
    let pattern = dir.join("*").to_string_lossy().into_owned();
    let mut entries: Vec<PathBuf> = glob::glob(&pattern).ok()?.flatten().collect();
    entries.sort();

    entries.into_iter().find(|path| {
        path.extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| CONTAINER_EXTENSIONS.contains(&ext))
    })
}
