//! Error kinds for message handling.
//!
//! Every failure in the relay pipeline maps to one of these tagged kinds, so
//! callers can tell transient tool hiccups apart from permanent failures
//! instead of parsing intent out of a message string.

use thiserror::Error;

/// A failure while handling one video request.
#[derive(Debug, Error)]
pub enum RelayError {
    #[error("sender is not authorized")]
    Unauthorized,

    #[error("failed to create work directory: {source}")]
    WorkdirFailed {
        #[source]
        source: std::io::Error,
    },

    /// The downloader exited non-zero or could not be invoked. Carries the
    /// tool's combined output for the log; the chat reply stays short.
    #[error("download failed: {output}")]
    DownloadFailed { output: String },

    #[error("no video file found after download")]
    NoFileFound,

    #[error("failed to stat media file: {source}")]
    StatFailed {
        #[source]
        source: std::io::Error,
    },

    #[error("failed to probe media duration: {detail}")]
    ProbeFailed { detail: String },

    #[error("failed to split video: {detail}")]
    SplitFailed { detail: String },

    #[error("failed to send video: {detail}")]
    SendFailed { detail: String },
}

impl RelayError {
    /// Short human-readable reply for the chat. Full detail goes to the log
    /// only.
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::Unauthorized => "❌ You are not authorized to operate this bot",
            Self::WorkdirFailed { .. } => "❌ Failed to create download directory",
            Self::DownloadFailed { .. } => "❌ Failed to download video",
            Self::NoFileFound => "❌ No video file found after download",
            Self::StatFailed { .. } => "❌ Error checking video file",
            Self::ProbeFailed { .. } => "❌ Could not read video duration",
            Self::SplitFailed { .. } => "❌ Error splitting video",
            Self::SendFailed { .. } => "❌ Error sending video",
        }
    }

    /// Whether the failed step may be re-attempted. Only the idempotent,
    /// read-only steps qualify: a partially-completed split or a possibly
    /// half-delivered send must not run twice.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::DownloadFailed { .. } | Self::ProbeFailed { .. })
    }
}
