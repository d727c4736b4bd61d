//! Command-line interface for vidrelay.
//!
//! `serve` runs the bot; `fetch` exercises the download/split pipeline on a
//! single URL without Telegram; `check` verifies the external tools.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

use crate::bot::Bot;
use crate::classify::classify;
use crate::config::Config;
use crate::splitter::{self, ChunkPlan};
use crate::tools::{Downloader, ExternalTool, FfmpegEncoder, Prober};
use crate::workdir;

/// vidrelay - Telegram video relay bot
#[derive(Parser, Debug)]
#[command(name = "vidrelay")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the Telegram bot
    Serve,

    /// Download a single URL, splitting it if oversized, without Telegram
    Fetch {
        /// Video link to fetch
        url: String,

        /// Directory for the result (defaults to a work directory under the
        /// media root)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Check that the external tools are installed
    Check,

    /// Show resolved configuration
    Config,
}

impl Cli {
    /// Execute the CLI command
    pub async fn execute(self) -> Result<()> {
        let config = Config::load()?;

        match self.command {
            Commands::Serve => serve(config).await,
            Commands::Fetch { url, output } => fetch(config, &url, output).await,
            Commands::Check => check(&config).await,
            Commands::Config => show_config(&config),
        }
    }
}

/// Run the bot until killed.
async fn serve(config: Config) -> Result<()> {
    config.ensure_media_root()?;
    let bot = Bot::new(config)?;
    bot.run().await
}

/// One-shot pipeline run: download, split when oversized, print paths.
async fn fetch(config: Config, url: &str, output: Option<PathBuf>) -> Result<()> {
    let Some(platform) = classify(url) else {
        anyhow::bail!("not a supported video link: {url}");
    };

    let dest = match output {
        Some(dir) => {
            std::fs::create_dir_all(&dir)?;
            dir
        }
        None => {
            config.ensure_media_root()?;
            workdir::create(&config.media_root, &workdir::request_key(0, 0, url)).await?
        }
    };

    let timeout = config.limits.tool_timeout();

    eprintln!("📥 Downloading {} video: {}", platform.name(), url);
    let downloader = Downloader::new(timeout);
    let artifact = downloader.download(url, &dest).await?;

    let size = std::fs::metadata(&artifact)?.len();
    if !config.limits.needs_split(size) {
        println!("{}", artifact.display());
        return Ok(());
    }

    eprintln!(
        "📹 {}MB exceeds the attachment ceiling, splitting...",
        size / (1024 * 1024)
    );

    let prober = Prober::new(timeout);
    let duration = prober.duration_seconds(&artifact).await?;
    let plan = ChunkPlan::compute(duration, size, &config.limits);

    let encoder = FfmpegEncoder::new(timeout);
    let chunks = splitter::split(&artifact, &dest, &plan, &encoder).await?;

    for chunk in &chunks {
        println!("{}", chunk.display());
    }

    Ok(())
}

/// Health-check each external tool and report availability.
async fn check(config: &Config) -> Result<()> {
    let timeout = config.limits.tool_timeout();
    let tools: Vec<Box<dyn ExternalTool>> = vec![
        Box::new(Downloader::new(timeout)),
        Box::new(Prober::new(timeout)),
        Box::new(FfmpegEncoder::new(timeout)),
    ];

    let mut missing = false;

    for tool in &tools {
        match tool.health_check().await {
            Ok(()) => println!("✅ {}", tool.name()),
            Err(e) => {
                missing = true;
                println!("❌ {}: {}", tool.name(), e);
            }
        }
    }

    if missing {
        std::process::exit(1);
    }

    Ok(())
}

/// Show the resolved configuration (for debugging)
fn show_config(config: &Config) -> Result<()> {
    println!(
        "Config file:  {}",
        config
            .config_file
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "(none - using defaults)".to_string())
    );
    println!("Media root:   {}", config.media_root.display());
    println!(
        "Bot token:    {}",
        if config.bot_token.is_some() {
            "(set)"
        } else {
            "(not set)"
        }
    );
    println!(
        "Whitelist:    {}",
        if config.whitelist.is_open() {
            "(open to all senders)".to_string()
        } else {
            config.whitelist.users().join(", ")
        }
    );
    println!();
    println!("Limits:");
    println!("  Max upload bytes:    {}", config.limits.max_upload_bytes);
    println!("  Target chunk bytes:  {}", config.limits.target_chunk_bytes);
    println!("  Min chunk seconds:   {}", config.limits.min_chunk_seconds);
    println!("  Tool timeout:        {}s", config.limits.tool_timeout_seconds);
    println!("  Max concurrent jobs: {}", config.limits.max_concurrent_jobs);
    println!();
    println!("Retry:");
    println!("  Max attempts:        {}", config.retry.max_attempts);
    println!("  Initial delay:       {}ms", config.retry.initial_delay_ms);
    println!("  Max delay:           {}ms", config.retry.max_delay_ms);
    println!("  Backoff multiplier:  {}", config.retry.backoff_multiplier);

    Ok(())
}
