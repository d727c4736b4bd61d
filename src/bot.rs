//! Long-poll message loop.
//!
//! Each inbound message with non-empty text runs the full pipeline on its own
//! task. A semaphore bounds how many pipelines run at once; when saturated,
//! the loop waits for a permit before spawning, which also pauses polling —
//! that is the backpressure.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::sync::Semaphore;
use tracing::{info, warn};

use crate::config::Config;
use crate::handler::Handler;
use crate::telegram::TelegramClient;

/// Server-side long-poll window, in seconds.
const LONG_POLL_SECONDS: u64 = 60;

/// Backoff after a failed poll before trying again.
const POLL_RETRY_DELAY: Duration = Duration::from_secs(5);

pub struct Bot {
    client: Arc<TelegramClient>,
    handler: Arc<Handler>,
    jobs: Arc<Semaphore>,
}

impl Bot {
    /// Build the bot from resolved configuration. Missing credential is a
    /// startup failure.
    pub fn new(config: Config) -> Result<Self> {
        let token = config.require_token()?.to_string();
        let client = Arc::new(TelegramClient::new(token));
        let jobs = Arc::new(Semaphore::new(config.limits.max_concurrent_jobs));
        let handler = Arc::new(Handler::new(Arc::new(config), client.clone()));

        Ok(Self {
            client,
            handler,
            jobs,
        })
    }

    /// Poll for updates forever, spawning one task per message.
    pub async fn run(&self) -> Result<()> {
        info!("bot started, long-polling for updates");

        let mut offset = 0i64;

        loop {
            let updates = match self.client.get_updates(offset, LONG_POLL_SECONDS).await {
                Ok(updates) => updates,
                Err(e) => {
                    warn!(error = %e, "getUpdates failed, backing off");
                    tokio::time::sleep(POLL_RETRY_DELAY).await;
                    continue;
                }
            };

            for update in updates {
                offset = offset.max(update.update_id + 1);

                let Some(message) = update.message else {
                    continue;
                };
                if message.text.as_deref().is_none_or(str::is_empty) {
                    continue;
                }

                // Waits here when all permits are taken: inbound messages
                // queue instead of fanning out unbounded downloads.
                let permit = self
                    .jobs
                    .clone()
                    .acquire_owned()
                    .await
                    .context("job semaphore closed")?;

                let handler = self.handler.clone();
                tokio::spawn(async move {
                    let _permit = permit;
                    handler.handle_message(&message).await;
                });
            }
        }
    }
}
