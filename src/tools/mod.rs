//! External tool adapters.
//!
//! Every interesting byte of media work is delegated to command-line tools:
//! yt-dlp retrieves, ffprobe measures, ffmpeg re-encodes. Each invocation is
//! spawned through [`run_tool`], which captures output and enforces the
//! configured timeout so a hung tool cannot pin its task forever.

pub mod downloader;
pub mod probe;
pub mod transcode;

use std::process::Stdio;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use tokio::process::Command;
use tokio::time::timeout;

pub use downloader::Downloader;
pub use probe::Prober;
pub use transcode::{ChunkEncoder, FfmpegEncoder};

/// Trait for external command-line tools
#[async_trait]
pub trait ExternalTool: Send + Sync {
    /// Tool name as reported by `check`
    fn name(&self) -> &str;

    /// Verify the tool is installed and responds
    async fn health_check(&self) -> Result<()>;
}

/// Captured output of a finished tool invocation.
#[derive(Debug)]
pub struct ToolOutput {
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
    success: bool,
}

impl ToolOutput {
    pub fn success(&self) -> bool {
        self.success
    }

    /// stdout and stderr interleaved for error reporting.
    pub fn combined(&self) -> String {
        let mut combined = String::new();
        if !self.stdout.trim().is_empty() {
            combined.push_str(self.stdout.trim());
        }
        if !self.stderr.trim().is_empty() {
            if !combined.is_empty() {
                combined.push('\n');
            }
            combined.push_str(self.stderr.trim());
        }
        combined
    }
}

/// Run a command to completion, capturing stdout/stderr, under a timeout.
/// A timed-out child is killed rather than left running.
pub(crate) async fn run_tool(mut cmd: Command, wait: Duration) -> Result<ToolOutput> {
    let program = format!("{:?}", cmd.as_std().get_program());

    cmd.stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let child = cmd
        .spawn()
        .with_context(|| format!("failed to spawn {program}"))?;

    let output = timeout(wait, child.wait_with_output())
        .await
        .map_err(|_| anyhow::anyhow!("{program} timed out after {wait:?}"))?
        .with_context(|| format!("failed to wait for {program}"))?;

    Ok(ToolOutput {
        exit_code: output.status.code(),
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        success: output.status.success(),
    })
}

/// Health check via a version flag; shared by the concrete tools.
pub(crate) async fn version_check(binary: &str, arg: &str) -> Result<()> {
    let mut cmd = Command::new(binary);
    cmd.arg(arg);

    let output = run_tool(cmd, Duration::from_secs(15))
        .await
        .with_context(|| format!("failed to run {binary} health check"))?;

    if !output.success() {
        anyhow::bail!("{} health check failed: {}", binary, output.combined());
    }

    Ok(())
}
