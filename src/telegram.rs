//! Telegram Bot API client.
//!
//! A thin client over the raw Bot API: long-poll `getUpdates` for inbound
//! messages, `sendMessage` for status text, and multipart `sendVideo` for
//! delivering artifacts. Outbound sending sits behind the [`Messenger`] trait
//! so the dispatcher can be exercised without the network.

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;

/// One entry from `getUpdates`.
#[derive(Debug, Clone, Deserialize)]
pub struct Update {
    pub update_id: i64,
    pub message: Option<Message>,
}

/// Inbound chat message, carrying exactly what the pipeline reads.
#[derive(Debug, Clone, Deserialize)]
pub struct Message {
    pub message_id: i64,
    pub chat: Chat,
    pub from: Option<User>,
    #[serde(default)]
    pub text: Option<String>,
}

impl Message {
    pub fn sender_username(&self) -> Option<&str> {
        self.from.as_ref().and_then(|user| user.username.as_deref())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Chat {
    pub id: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct User {
    pub id: i64,
    pub username: Option<String>,
}

/// Response envelope from the Telegram API
#[derive(Debug, Deserialize)]
struct TelegramResponse<T> {
    ok: bool,
    result: Option<T>,
    description: Option<String>,
}

impl<T> TelegramResponse<T> {
    fn into_result(self) -> Result<T> {
        if !self.ok {
            anyhow::bail!(
                "Telegram API error: {}",
                self.description.unwrap_or_default()
            );
        }
        self.result.context("Telegram API returned no result")
    }
}

/// Message result from sendMessage/sendVideo
#[derive(Debug, Deserialize)]
pub struct MessageResult {
    pub message_id: i64,
}

/// Outbound messaging seam used by the handler and dispatcher.
#[async_trait]
pub trait Messenger: Send + Sync {
    async fn send_text(&self, chat_id: i64, text: &str) -> Result<()>;

    async fn send_video(&self, chat_id: i64, video: &Path, caption: Option<&str>) -> Result<()>;
}

/// Telegram Bot API client
pub struct TelegramClient {
    /// Bot token
    bot_token: String,
    /// HTTP client
    client: reqwest::Client,
}

impl TelegramClient {
    pub fn new(bot_token: String) -> Self {
        Self {
            bot_token,
            client: reqwest::Client::new(),
        }
    }

    /// Build API URL
    fn api_url(&self, method: &str) -> String {
        format!("https://api.telegram.org/bot{}/{}", self.bot_token, method)
    }

    /// Long-poll for updates after `offset`. Blocks server-side for up to
    /// `timeout_secs`; the HTTP timeout is padded past that so the poll
    /// itself never races the transport.
    pub async fn get_updates(&self, offset: i64, timeout_secs: u64) -> Result<Vec<Update>> {
        let url = self.api_url("getUpdates");

        let response = self
            .client
            .post(&url)
            .timeout(Duration::from_secs(timeout_secs + 10))
            .json(&serde_json::json!({
                "offset": offset,
                "timeout": timeout_secs,
                "allowed_updates": ["message"],
            }))
            .send()
            .await
            .context("Failed to poll Telegram updates")?;

        let result: TelegramResponse<Vec<Update>> = response
            .json()
            .await
            .context("Failed to parse Telegram response")?;

        result.into_result()
    }

    /// Send a text message
    pub async fn send_message(&self, chat_id: i64, text: &str) -> Result<i64> {
        let url = self.api_url("sendMessage");

        let response = self
            .client
            .post(&url)
            .json(&serde_json::json!({
                "chat_id": chat_id,
                "text": text,
            }))
            .send()
            .await
            .context("Failed to send Telegram message")?;

        let result: TelegramResponse<MessageResult> = response
            .json()
            .await
            .context("Failed to parse Telegram response")?;

        Ok(result.into_result()?.message_id)
    }

    /// Upload a video file with an optional caption
    pub async fn send_video_file(
        &self,
        chat_id: i64,
        video: &Path,
        caption: Option<&str>,
    ) -> Result<i64> {
        let url = self.api_url("sendVideo");

        let file_name = video
            .file_name()
            .unwrap_or_default()
            .to_string_lossy()
            .to_string();

        let file_bytes = tokio::fs::read(video)
            .await
            .context("Failed to read video file")?;

        let file_part = Part::bytes(file_bytes)
            .file_name(file_name)
            .mime_str("video/mp4")?;

        let mut form = Form::new()
            .text("chat_id", chat_id.to_string())
            .part("video", file_part);

        if let Some(cap) = caption {
            form = form.text("caption", cap.to_string());
        }

        let response = self
            .client
            .post(&url)
            .multipart(form)
            .send()
            .await
            .context("Failed to send Telegram video")?;

        let result: TelegramResponse<MessageResult> = response
            .json()
            .await
            .context("Failed to parse Telegram response")?;

        Ok(result.into_result()?.message_id)
    }
}

#[async_trait]
impl Messenger for TelegramClient {
    async fn send_text(&self, chat_id: i64, text: &str) -> Result<()> {
        self.send_message(chat_id, text).await.map(|_| ())
    }

    async fn send_video(&self, chat_id: i64, video: &Path, caption: Option<&str>) -> Result<()> {
        self.send_video_file(chat_id, video, caption)
            .await
            .map(|_| ())
    }
}
