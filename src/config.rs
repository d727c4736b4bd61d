//! Configuration for vidrelay.
//!
//! Sources (highest priority first):
//! 1. Environment variables (TELEGRAM_BOT_TOKEN, TELEGRAM_BOT_WHITELIST_USERS,
//!    VIDRELAY_MEDIA_ROOT)
//! 2. Config file (.vidrelay/config.yaml, discovered by walking up from the
//!    current directory)
//! 3. Defaults (~/.vidrelay/media)
//!
//! The resolved [`Config`] is loaded once at startup and passed explicitly to
//! the bot; there is no ambient global state.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::limits::{DeliveryLimits, RetryPolicy};

pub const ENV_BOT_TOKEN: &str = "TELEGRAM_BOT_TOKEN";
pub const ENV_WHITELIST: &str = "TELEGRAM_BOT_WHITELIST_USERS";
pub const ENV_MEDIA_ROOT: &str = "VIDRELAY_MEDIA_ROOT";

/// Raw config file schema (matches YAML structure)
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConfigFile {
    /// Media root directory (absolute, or relative to the config file's
    /// project root)
    pub media_root: Option<String>,

    /// Authorized sender usernames; empty means open to all
    #[serde(default)]
    pub whitelist: Vec<String>,

    #[serde(default)]
    pub limits: DeliveryLimits,

    #[serde(default)]
    pub retry: RetryPolicy,
}

/// Configured set of authorized sender usernames. Empty means unrestricted.
#[derive(Debug, Clone, Default)]
pub struct Whitelist(Vec<String>);

impl Whitelist {
    pub fn new(users: Vec<String>) -> Self {
        Self(
            users
                .into_iter()
                .map(|u| u.trim().to_string())
                .filter(|u| !u.is_empty())
                .collect(),
        )
    }

    /// Parse the comma-separated environment form.
    pub fn parse(raw: &str) -> Self {
        Self::new(raw.split(',').map(str::to_string).collect())
    }

    pub fn is_open(&self) -> bool {
        self.0.is_empty()
    }

    /// Empty whitelist authorizes every sender; a non-empty whitelist
    /// authorizes exact username matches only. A sender without a username
    /// can never match a non-empty whitelist.
    pub fn authorizes(&self, username: Option<&str>) -> bool {
        if self.0.is_empty() {
            return true;
        }
        username.is_some_and(|name| self.0.iter().any(|allowed| allowed == name))
    }

    pub fn users(&self) -> &[String] {
        &self.0
    }
}

/// Resolved configuration, passed explicitly to the bot and CLI commands.
#[derive(Debug, Clone)]
pub struct Config {
    /// Bot credential; required for `serve`, unused by local commands
    pub bot_token: Option<String>,

    pub whitelist: Whitelist,

    /// Root directory holding one work directory per in-flight request
    pub media_root: PathBuf,

    pub limits: DeliveryLimits,

    pub retry: RetryPolicy,

    /// Path to config file (if found)
    pub config_file: Option<PathBuf>,
}

impl Config {
    /// Load configuration from all sources.
    pub fn load() -> Result<Self> {
        let config_file = find_config_file();

        let file = match &config_file {
            Some(path) => load_config_file(path)?,
            None => ConfigFile::default(),
        };

        Ok(Self::resolve(file, config_file))
    }

    fn resolve(file: ConfigFile, config_file: Option<PathBuf>) -> Self {
        let bot_token = std::env::var(ENV_BOT_TOKEN).ok().filter(|t| !t.is_empty());

        let whitelist = match std::env::var(ENV_WHITELIST) {
            Ok(raw) if !raw.trim().is_empty() => Whitelist::parse(&raw),
            _ => Whitelist::new(file.whitelist),
        };

        let media_root = std::env::var(ENV_MEDIA_ROOT)
            .map(PathBuf::from)
            .ok()
            .or_else(|| {
                file.media_root
                    .as_ref()
                    .map(|root| resolve_path(config_root(config_file.as_deref()).as_deref(), root))
            })
            .unwrap_or_else(default_media_root);

        Self {
            bot_token,
            whitelist,
            media_root,
            limits: file.limits,
            retry: file.retry,
            config_file,
        }
    }

    /// The bot credential, or a startup error if it is not configured.
    pub fn require_token(&self) -> Result<&str> {
        self.bot_token
            .as_deref()
            .with_context(|| format!("{ENV_BOT_TOKEN} environment variable not set"))
    }

    /// Create the media root. Inability to do so is a startup failure.
    pub fn ensure_media_root(&self) -> Result<()> {
        std::fs::create_dir_all(&self.media_root).with_context(|| {
            format!(
                "failed to create media directory: {}",
                self.media_root.display()
            )
        })
    }
}

fn default_media_root() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".vidrelay")
        .join("media")
}

/// Find config file by searching current directory and parents
fn find_config_file() -> Option<PathBuf> {
    let mut current = std::env::current_dir().ok()?;

    loop {
        let config_path = current.join(".vidrelay").join("config.yaml");
        if config_path.exists() {
            return Some(config_path);
        }

        if !current.pop() {
            break;
        }
    }

    None
}

/// Load and parse config file
fn load_config_file(path: &Path) -> Result<ConfigFile> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config file: {}", path.display()))?;

    serde_yaml::from_str(&content)
        .with_context(|| format!("failed to parse config file: {}", path.display()))
}

/// Project root a config file belongs to (parent of .vidrelay/)
fn config_root(config_path: Option<&Path>) -> Option<PathBuf> {
    config_path
        .and_then(|p| p.parent())
        .and_then(|p| p.parent())
        .map(Path::to_path_buf)
}

/// Resolve a path that may be relative to the config file's project root
fn resolve_path(base: Option<&Path>, path_str: &str) -> PathBuf {
    let path = PathBuf::from(path_str);
    if path.is_absolute() {
        path
    } else {
        base.unwrap_or(Path::new(".")).join(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_whitelist_authorizes_everyone() {
        let whitelist = Whitelist::default();
        assert!(whitelist.is_open());
        assert!(whitelist.authorizes(Some("anyone")));
        assert!(whitelist.authorizes(None));
    }

    #[test]
    fn test_whitelist_exact_match_only() {
        let whitelist = Whitelist::parse("alice, bob");
        assert!(!whitelist.is_open());
        assert!(whitelist.authorizes(Some("alice")));
        assert!(whitelist.authorizes(Some("bob")));
        assert!(!whitelist.authorizes(Some("Alice")));
        assert!(!whitelist.authorizes(Some("alice2")));
        assert!(!whitelist.authorizes(None));
    }

    #[test]
    fn test_whitelist_parse_trims_and_drops_empty() {
        let whitelist = Whitelist::parse(" alice ,, bob ,");
        assert_eq!(whitelist.users(), &["alice", "bob"]);
    }

    #[test]
    fn test_config_file_parsing() {
        let yaml = r#"
media_root: ./media
whitelist:
  - alice
limits:
  max_upload_bytes: 1048576
retry:
  max_attempts: 5
"#;
        let file: ConfigFile = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(file.media_root, Some("./media".to_string()));
        assert_eq!(file.whitelist, vec!["alice".to_string()]);
        assert_eq!(file.limits.max_upload_bytes, 1_048_576);
        // unspecified limit fields fall back to defaults
        assert_eq!(file.limits.min_chunk_seconds, 30.0);
        assert_eq!(file.retry.max_attempts, 5);
    }

    #[test]
    fn test_resolve_path_relative_to_project_root() {
        let base = PathBuf::from("/home/user/project");

        assert_eq!(
            resolve_path(Some(&base), "media"),
            PathBuf::from("/home/user/project/media")
        );
        assert_eq!(
            resolve_path(Some(&base), "/absolute/media"),
            PathBuf::from("/absolute/media")
        );
        assert_eq!(resolve_path(None, "media"), PathBuf::from("./media"));
    }

    #[test]
    fn test_config_root_is_parent_of_dot_dir() {
        let path = PathBuf::from("/home/user/project/.vidrelay/config.yaml");
        assert_eq!(
            config_root(Some(&path)),
            Some(PathBuf::from("/home/user/project"))
        );
    }
}
