//! ffprobe duration query.

use std::path::Path;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use tokio::process::Command;

use super::{run_tool, version_check, ExternalTool};
use crate::error::RelayError;

/// External prober (ffprobe) adapter
pub struct Prober {
    binary_path: String,
    timeout: Duration,
}

impl Prober {
    pub fn new(timeout: Duration) -> Self {
        Self::with_binary_path("ffprobe", timeout)
    }

    pub fn with_binary_path(binary_path: impl Into<String>, timeout: Duration) -> Self {
        Self {
            binary_path: binary_path.into(),
            timeout,
        }
    }

    /// Media duration in seconds, read from the container format header.
    pub async fn duration_seconds(&self, media: &Path) -> Result<f64, RelayError> {
        let mut cmd = Command::new(&self.binary_path);
        cmd.args([
            "-v",
            "quiet",
            "-show_entries",
            "format=duration",
            "-of",
            "csv=p=0",
        ])
        .arg(media);

        let output = run_tool(cmd, self.timeout)
            .await
            .map_err(|e| RelayError::ProbeFailed {
                detail: e.to_string(),
            })?;

        if !output.success() {
            return Err(RelayError::ProbeFailed {
                detail: output.combined(),
            });
        }

        parse_duration(&output.stdout).ok_or_else(|| RelayError::ProbeFailed {
            detail: format!("unparsable duration output: {:?}", output.stdout.trim()),
        })
    }
}

#[async_trait]
impl ExternalTool for Prober {
    fn name(&self) -> &str {
        "ffprobe"
    }

    async fn health_check(&self) -> Result<()> {
        version_check(&self.binary_path, "-version").await
    }
}

fn parse_duration(raw: &str) -> Option<f64> {
    let value = raw.trim().parse::<f64>().ok()?;
    (value.is_finite() && value > 0.0).then_some(value)
}
