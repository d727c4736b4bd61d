//! Delivery of finished artifacts back to the chat.
//!
//! Chunks go out strictly in index order, one upload at a time, so they
//! arrive in the platform's natural message order. Failures are best-effort:
//! a chunk that cannot be sent is reported and the rest still go out.

use std::path::{Path, PathBuf};

use tracing::{error, info, warn};

use crate::error::RelayError;
use crate::limits::DeliveryLimits;
use crate::telegram::Messenger;

/// Outcome counts for one delivery pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeliveryReport {
    pub sent: u32,
    pub skipped: u32,
    pub failed: u32,
}

/// Upload a single artifact that fits under the ceiling.
pub async fn deliver_single(
    messenger: &dyn Messenger,
    chat_id: i64,
    artifact: &Path,
) -> Result<(), RelayError> {
    messenger
        .send_video(chat_id, artifact, None)
        .await
        .map_err(|e| RelayError::SendFailed {
            detail: e.to_string(),
        })
}

/// Upload chunks in index order. The duration-based size estimate is only
/// approximate, so each chunk is re-stat'ed here; anything still over the
/// ceiling is skipped (not retried) and reported, and the remaining chunks
/// still attempt delivery. Each chunk file is deleted after its attempt.
pub async fn deliver_chunks(
    messenger: &dyn Messenger,
    chat_id: i64,
    chunks: &[PathBuf],
    limits: &DeliveryLimits,
) -> DeliveryReport {
    let total = chunks.len();
    let mut report = DeliveryReport::default();

    for (index, chunk) in chunks.iter().enumerate() {
        let position = index + 1;

        match tokio::fs::metadata(chunk).await {
            Err(e) => {
                warn!(chunk = position, error = %e, "failed to stat chunk");
                report.failed += 1;
            }
            Ok(meta) if meta.len() > limits.max_upload_bytes => {
                warn!(
                    chunk = position,
                    bytes = meta.len(),
                    "chunk still exceeds upload ceiling, skipping"
                );
                notify(
                    messenger,
                    chat_id,
                    &format!("⚠️ Part {position}/{total} is too large, skipping"),
                )
                .await;
                report.skipped += 1;
            }
            Ok(meta) => {
                let caption = format!(
                    "Part {}/{} ({:.1}MB)",
                    position,
                    total,
                    meta.len() as f64 / (1024.0 * 1024.0)
                );

                match messenger.send_video(chat_id, chunk, Some(&caption)).await {
                    Ok(()) => {
                        info!(chunk = position, bytes = meta.len(), "chunk delivered");
                        report.sent += 1;
                    }
                    Err(e) => {
                        error!(chunk = position, error = %e, "failed to send chunk");
                        notify(
                            messenger,
                            chat_id,
                            &format!("❌ Error sending part {position}/{total}"),
                        )
                        .await;
                        report.failed += 1;
                    }
                }
            }
        }

        if let Err(e) = tokio::fs::remove_file(chunk).await {
            warn!(chunk = position, error = %e, "failed to remove chunk after delivery");
        }
    }

    report
}

/// Best-effort status text; a failed notification must never abort delivery.
async fn notify(messenger: &dyn Messenger, chat_id: i64, text: &str) {
    if let Err(e) = messenger.send_text(chat_id, text).await {
        warn!(error = %e, "failed to send status message");
    }
}
