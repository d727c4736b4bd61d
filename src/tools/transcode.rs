//! ffmpeg chunk encoding.
//!
//! Chunks are re-encoded, not stream-copied: arbitrary time offsets into
//! compressed video are not frame-aligned, and a stream copy would leave the
//! leading group of pictures broken. The fixed baseline profile keeps every
//! chunk playable on its own.

use std::path::Path;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use tokio::process::Command;

use super::{run_tool, version_check, ExternalTool};

/// Seam between the splitter and the transcoder, so splitting can be tested
/// without ffmpeg installed.
#[async_trait]
pub trait ChunkEncoder: Send + Sync {
    /// Re-encode `duration` seconds of `src` starting at `start` into `dest`.
    async fn encode_chunk(&self, src: &Path, start: f64, duration: f64, dest: &Path)
        -> Result<()>;
}

/// External transcoder (ffmpeg) adapter
pub struct FfmpegEncoder {
    binary_path: String,
    timeout: Duration,
}

impl FfmpegEncoder {
    pub fn new(timeout: Duration) -> Self {
        Self::with_binary_path("ffmpeg", timeout)
    }

    pub fn with_binary_path(binary_path: impl Into<String>, timeout: Duration) -> Self {
        Self {
            binary_path: binary_path.into(),
            timeout,
        }
    }
}

#[async_trait]
impl ChunkEncoder for FfmpegEncoder {
    async fn encode_chunk(
        &self,
        src: &Path,
        start: f64,
        duration: f64,
        dest: &Path,
    ) -> Result<()> {
        let mut cmd = Command::new(&self.binary_path);
        cmd.arg("-i")
            .arg(src)
            .args(["-ss", &format!("{start:.2}"), "-t", &format!("{duration:.2}")])
            .args([
                "-c:v",
                "libx264",
                "-profile:v",
                "baseline",
                "-level",
                "3.0",
                "-pix_fmt",
                "yuv420p",
                "-c:a",
                "aac",
                "-movflags",
                "+faststart",
                "-avoid_negative_ts",
                "make_zero",
                "-y",
            ])
            .arg(dest);

        let output = run_tool(cmd, self.timeout).await?;

        if !output.success() {
            anyhow::bail!(
                "ffmpeg exited with code {}: {}",
                output.exit_code.unwrap_or(-1),
                output.combined()
            );
        }

        Ok(())
    }
}

#[async_trait]
impl ExternalTool for FfmpegEncoder {
    fn name(&self) -> &str {
        "ffmpeg"
    }

    async fn health_check(&self) -> Result<()> {
        version_check(&self.binary_path, "-version").await
    }
}
