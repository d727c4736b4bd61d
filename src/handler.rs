//! Per-message pipeline: authorize, classify, download, split when
//! oversized, deliver, clean up.
//!
//! One handler instance is shared by every spawned task; all of its state is
//! read-only after construction.

use std::future::Future;
use std::path::Path;
use std::sync::Arc;

use tracing::{error, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::classify::classify;
use crate::config::Config;
use crate::dispatch;
use crate::error::RelayError;
use crate::splitter::{self, ChunkPlan};
use crate::telegram::{Message, Messenger};
use crate::tools::{Downloader, FfmpegEncoder, Prober};
use crate::workdir;

/// Shared pipeline state: config plus the tool and messenger handles.
pub struct Handler {
    config: Arc<Config>,
    messenger: Arc<dyn Messenger>,
    downloader: Downloader,
    prober: Prober,
    encoder: FfmpegEncoder,
}

impl Handler {
    pub fn new(config: Arc<Config>, messenger: Arc<dyn Messenger>) -> Self {
        let tool_timeout = config.limits.tool_timeout();
        Self {
            downloader: Downloader::new(tool_timeout),
            prober: Prober::new(tool_timeout),
            encoder: FfmpegEncoder::new(tool_timeout),
            config,
            messenger,
        }
    }

    /// Handle one inbound message end to end. Never returns an error: every
    /// failure is logged and reported to the chat, and cleanup always runs.
    pub async fn handle_message(&self, message: &Message) {
        let Some(text) = message.text.as_deref().filter(|t| !t.is_empty()) else {
            return;
        };
        let chat_id = message.chat.id;

        // Authorization comes first: unauthorized senders are told so for any
        // text, link or not.
        if !self.config.whitelist.authorizes(message.sender_username()) {
            warn!(chat_id, username = ?message.sender_username(), "unauthorized sender");
            self.notify(chat_id, RelayError::Unauthorized.user_message())
                .await;
            return;
        }

        let Some(platform) = classify(text) else {
            return;
        };

        let request_id = Uuid::new_v4();
        let span = info_span!(
            "request",
            %request_id,
            chat_id,
            platform = platform.name()
        );

        if let Err(e) = self
            .run(chat_id, message.message_id, text)
            .instrument(span)
            .await
        {
            error!(%request_id, error = %e, "request failed");
            self.notify(chat_id, e.user_message()).await;
        }
    }

    /// The pipeline proper: download into a fresh work directory, relay the
    /// artifact, clean up regardless of the outcome.
    async fn run(&self, chat_id: i64, message_id: i64, url: &str) -> Result<(), RelayError> {
        info!("handling video link");
        self.notify(chat_id, "📥 Downloading video...").await;

        let key = workdir::request_key(chat_id, message_id, url);
        let dir = workdir::create(&self.config.media_root, &key)
            .await
            .map_err(|source| RelayError::WorkdirFailed { source })?;

        let artifact = match self
            .with_retry("download", || self.downloader.download(url, &dir))
            .await
        {
            Ok(artifact) => artifact,
            Err(e) => {
                workdir::remove_if_empty(&dir).await;
                return Err(e);
            }
        };

        let outcome = self.relay_artifact(chat_id, &artifact, &dir).await;
        workdir::cleanup(&artifact, &dir).await;
        outcome
    }

    /// Send the artifact as-is when it fits, otherwise split and deliver the
    /// chunks.
    async fn relay_artifact(
        &self,
        chat_id: i64,
        artifact: &Path,
        dir: &Path,
    ) -> Result<(), RelayError> {
        let limits = &self.config.limits;

        let size = tokio::fs::metadata(artifact)
            .await
            .map_err(|source| RelayError::StatFailed { source })?
            .len();

        if !limits.needs_split(size) {
            info!(bytes = size, "sending single artifact");
            self.notify(chat_id, "📤 Sending video...").await;

            // Best-effort: a failed send is reported but does not abort
            // handling.
            if let Err(e) = dispatch::deliver_single(self.messenger.as_ref(), chat_id, artifact)
                .await
            {
                error!(error = %e, "failed to send video");
                self.notify(chat_id, e.user_message()).await;
            }
            return Ok(());
        }

        self.notify(
            chat_id,
            &format!(
                "📹 Video is larger than {}MB, splitting into chunks...",
                limits.max_upload_bytes / (1024 * 1024)
            ),
        )
        .await;

        let duration = self
            .with_retry("probe", || self.prober.duration_seconds(artifact))
            .await?;

        let plan = ChunkPlan::compute(duration, size, limits);
        info!(
            duration,
            bytes = size,
            chunks = plan.num_chunks,
            chunk_seconds = plan.chunk_duration,
            "splitting artifact"
        );

        let chunks = splitter::split(artifact, dir, &plan, &self.encoder).await?;

        self.notify(
            chat_id,
            &format!("📤 Sending {} video chunks...", chunks.len()),
        )
        .await;

        let report =
            dispatch::deliver_chunks(self.messenger.as_ref(), chat_id, &chunks, limits).await;
        info!(
            sent = report.sent,
            skipped = report.skipped,
            failed = report.failed,
            "chunk delivery finished"
        );

        Ok(())
    }

    /// Run an idempotent step under the retry policy. Non-retryable errors
    /// and exhausted attempts pass straight through.
    async fn with_retry<T, F, Fut>(&self, step: &str, mut op: F) -> Result<T, RelayError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, RelayError>>,
    {
        let mut attempt = 0u32;

        loop {
            attempt += 1;

            match op().await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_retryable() && self.config.retry.should_retry(attempt) => {
                    let delay = self.config.retry.delay_for_attempt(attempt);
                    warn!(
                        step,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "step failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Best-effort status text to the chat.
    async fn notify(&self, chat_id: i64, text: &str) {
        if let Err(e) = self.messenger.send_text(chat_id, text).await {
            warn!(error = %e, "failed to send status message");
        }
    }
}
