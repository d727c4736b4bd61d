//! Size-aware splitting of oversized artifacts.
//!
//! Chunk size is bounded through a duration proxy: assuming roughly constant
//! bitrate, `duration * target / size` seconds of video should land near the
//! target byte count. The estimate is approximate, so the dispatcher
//! re-checks every chunk's actual size before upload.

use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::error::RelayError;
use crate::limits::DeliveryLimits;
use crate::tools::ChunkEncoder;

/// Planned chunking of one artifact.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChunkPlan {
    /// Seconds of source video per chunk
    pub chunk_duration: f64,
    /// Number of encoder invocations; the trailing chunk may come out empty
    /// and is then skipped
    pub num_chunks: u32,
}

impl ChunkPlan {
    /// Compute the plan for an artifact of `file_bytes` lasting
    /// `duration_seconds`. Clamped to the minimum chunk duration so short
    /// high-bitrate clips don't shatter into slivers.
    pub fn compute(duration_seconds: f64, file_bytes: u64, limits: &DeliveryLimits) -> Self {
        let target = limits.target_chunk_bytes as f64;
        let mut chunk_duration = duration_seconds * target / file_bytes as f64;

        if chunk_duration < limits.min_chunk_seconds {
            chunk_duration = limits.min_chunk_seconds;
        }

        let num_chunks = (duration_seconds / chunk_duration) as u32 + 1;

        Self {
            chunk_duration,
            num_chunks,
        }
    }

    /// Start offset of the chunk at `index` (0-based).
    pub fn start_of(&self, index: u32) -> f64 {
        index as f64 * self.chunk_duration
    }
}

/// Execute the plan: encode each chunk of `src` into `workdir` in index
/// order. All-or-nothing: a failed encode deletes everything produced so far
/// and returns `SplitFailed`. A chunk that comes out missing or zero-byte is
/// silently dropped, never retried.
pub async fn split(
    src: &Path,
    workdir: &Path,
    plan: &ChunkPlan,
    encoder: &dyn ChunkEncoder,
) -> Result<Vec<PathBuf>, RelayError> {
    let mut chunks: Vec<PathBuf> = Vec::new();

    for index in 0..plan.num_chunks {
        let dest = workdir.join(format!("chunk_{}.mp4", index + 1));
        let start = plan.start_of(index);

        debug!(chunk = index + 1, start, duration = plan.chunk_duration, "encoding chunk");

        if let Err(e) = encoder
            .encode_chunk(src, start, plan.chunk_duration, &dest)
            .await
        {
            discard(&chunks).await;
            let _ = tokio::fs::remove_file(&dest).await;

            return Err(RelayError::SplitFailed {
                detail: format!("chunk {}: {e}", index + 1),
            });
        }

        match tokio::fs::metadata(&dest).await {
            Ok(meta) if meta.len() > 0 => chunks.push(dest),
            _ => {
                warn!(chunk = index + 1, "encoder produced no usable output, skipping");
                let _ = tokio::fs::remove_file(&dest).await;
            }
        }
    }

    Ok(chunks)
}

/// Remove every chunk produced before a mid-sequence failure.
async fn discard(chunks: &[PathBuf]) {
    for chunk in chunks {
        if let Err(e) = tokio::fs::remove_file(chunk).await {
            warn!(path = %chunk.display(), error = %e, "failed to remove chunk");
        }
    }
}
