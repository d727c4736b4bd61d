//! vidrelay - Telegram video relay bot
//!
//! Watches chat messages for social-media video links, fetches them with
//! yt-dlp, splits oversized files into re-encoded chunks with ffmpeg, and
//! uploads the result back to the chat.
//!
//! # Architecture
//!
//! Each inbound message runs the whole pipeline on its own task:
//! authorize → classify → download → maybe split → deliver → cleanup.
//! Nothing persists beyond one message's handling; the only state shared
//! across tasks is the read-only configuration.
//!
//! # Modules
//!
//! - `telegram`: Bot API client and the `Messenger` seam
//! - `tools`: external tool adapters (yt-dlp, ffprobe, ffmpeg)
//! - `splitter` / `dispatch`: size-aware chunking and sequential delivery
//! - `handler` / `bot`: per-message pipeline and the long-poll loop
//!
//! # Usage
//!
//! ```bash
//! # Run the bot
//! TELEGRAM_BOT_TOKEN=... vidrelay serve
//!
//! # One-shot download without Telegram
//! vidrelay fetch https://youtu.be/abc123
//!
//! # Verify the external tools are installed
//! vidrelay check
//! ```

pub mod bot;
pub mod classify;
pub mod cli;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod handler;
pub mod limits;
pub mod splitter;
pub mod telegram;
pub mod tools;
pub mod workdir;

// Re-export main types at crate root for convenience
pub use classify::{classify, is_supported, Platform};
pub use config::{Config, Whitelist};
pub use dispatch::DeliveryReport;
pub use error::RelayError;
pub use handler::Handler;
pub use limits::{DeliveryLimits, RetryPolicy};
pub use splitter::ChunkPlan;
pub use telegram::{Message, Messenger, TelegramClient, Update};
