// src/config.rs
//! Service configuration: TOML file with env overrides, built-in defaults
//! when the file is missing, and a dev-gated polling hot reload.

use serde::Deserialize;
use std::fs;
use std::path::PathBuf;
use std::sync::{Arc, RwLock};
use std::thread;
use std::time::{Duration, SystemTime};
use tracing::info;

use crate::interest::DEFAULT_INTEREST_INCREMENT;

// --- env defaults & names ---
pub const DEFAULT_FEED_CONFIG_PATH: &str = "config/feed.toml";

pub const ENV_FEED_CONFIG_PATH: &str = "FEED_CONFIG_PATH";
pub const ENV_INTEREST_INCREMENT: &str = "INTEREST_INCREMENT";
pub const ENV_FEED_HOT_RELOAD: &str = "FEED_HOT_RELOAD";

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct FeedConfig {
    /// Affinity added per tag on a qualifying post view.
    #[serde(default = "default_increment")]
    pub interest_increment: u32,
    /// "Who to follow" list length.
    #[serde(default = "default_suggestions_limit")]
    pub suggestions_limit: usize,
    /// Absolute base for sitemap URLs.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default)]
    pub search: SearchLimits,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SearchLimits {
    #[serde(default = "default_user_results")]
    pub users: usize,
    #[serde(default = "default_post_results")]
    pub posts: usize,
}

fn default_increment() -> u32 {
    DEFAULT_INTEREST_INCREMENT
}

fn default_suggestions_limit() -> usize {
    6
}

fn default_base_url() -> String {
    "http://localhost:8000".to_string()
}

fn default_user_results() -> usize {
    5
}

fn default_post_results() -> usize {
    20
}

impl Default for SearchLimits {
    fn default() -> Self {
        Self {
            users: default_user_results(),
            posts: default_post_results(),
        }
    }
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            interest_increment: default_increment(),
            suggestions_limit: default_suggestions_limit(),
            base_url: default_base_url(),
            search: SearchLimits::default(),
        }
    }
}

impl FeedConfig {
    /// Load from `FEED_CONFIG_PATH` (default `config/feed.toml`), falling
    /// back to built-in defaults if the file is missing or unparsable,
    /// then apply env overrides.
    pub fn load() -> Self {
        let path = std::env::var(ENV_FEED_CONFIG_PATH)
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_FEED_CONFIG_PATH));

        let mut cfg = match fs::read_to_string(&path) {
            Ok(s) => toml::from_str(&s).unwrap_or_default(),
            Err(_) => Self::default(),
        };

        if let Some(inc) = parse_increment_env(std::env::var(ENV_INTEREST_INCREMENT).ok()) {
            cfg.interest_increment = inc;
        }
        cfg
    }

    pub fn from_toml_str(s: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(s)?)
    }
}

fn parse_increment_env(raw: Option<String>) -> Option<u32> {
    raw.and_then(|s| s.trim().parse::<u32>().ok())
}

/// Threadsafe handle so handlers always see the current config, and the
/// hot-reload thread can swap it atomically.
#[derive(Clone)]
pub struct ConfigHandle {
    inner: Arc<RwLock<FeedConfig>>,
}

impl ConfigHandle {
    pub fn new(config: FeedConfig) -> Self {
        Self {
            inner: Arc::new(RwLock::new(config)),
        }
    }

    pub fn snapshot(&self) -> FeedConfig {
        self.inner
            .read()
            .map(|g| g.clone())
            .unwrap_or_default()
    }
}

/// Hot reload is dev-only: FEED_HOT_RELOAD=1 plus a debug build or a
/// local/dev SHUTTLE_ENV.
fn hot_reload_enabled() -> bool {
    let want = std::env::var(ENV_FEED_HOT_RELOAD)
        .ok()
        .map(|v| v == "1")
        .unwrap_or(false);
    if !want {
        return false;
    }
    if cfg!(debug_assertions) {
        return true;
    }
    matches!(
        std::env::var("SHUTTLE_ENV")
            .unwrap_or_default()
            .to_ascii_lowercase()
            .as_str(),
        "local" | "development" | "dev"
    )
}

/// Poll `path` for mtime changes every 2s and swap the config in place.
/// Uses only std, no external watcher deps.
pub fn start_hot_reload_thread(handle: ConfigHandle, path: PathBuf) {
    if !hot_reload_enabled() {
        return;
    }

    thread::spawn(move || {
        let poll = Duration::from_secs(2);
        let mut last_mtime: Option<SystemTime> = None;

        loop {
            match fs::metadata(&path).and_then(|m| m.modified()) {
                Ok(mtime) => {
                    let changed = match last_mtime {
                        None => {
                            last_mtime = Some(mtime);
                            false
                        }
                        Some(prev) => mtime > prev,
                    };
                    if changed {
                        if let Ok(content) = fs::read_to_string(&path) {
                            if let Ok(fresh) = FeedConfig::from_toml_str(&content) {
                                if let Ok(mut guard) = handle.inner.write() {
                                    *guard = fresh;
                                    info!("feed config hot-reloaded");
                                }
                            }
                        }
                        last_mtime = Some(mtime);
                    }
                }
                Err(_) => {
                    // File missing or unreadable; keep trying.
                }
            }
            thread::sleep(poll);
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_preserve_the_original_increment() {
        let cfg = FeedConfig::default();
        assert_eq!(cfg.interest_increment, 10);
        assert_eq!(cfg.suggestions_limit, 6);
        assert_eq!(cfg.search.users, 5);
        assert_eq!(cfg.search.posts, 20);
    }

    #[test]
    fn partial_toml_fills_in_defaults() {
        let cfg = FeedConfig::from_toml_str("interest_increment = 25\n").unwrap();
        assert_eq!(cfg.interest_increment, 25);
        assert_eq!(cfg.suggestions_limit, 6);
        assert_eq!(cfg.search, SearchLimits::default());
    }

    #[test]
    fn nested_search_limits_parse() {
        let cfg = FeedConfig::from_toml_str(
            "interest_increment = 10\n\n[search]\nusers = 3\nposts = 7\n",
        )
        .unwrap();
        assert_eq!(cfg.search.users, 3);
        assert_eq!(cfg.search.posts, 7);
    }

    #[test]
    fn increment_env_parsing_is_defensive() {
        assert_eq!(parse_increment_env(Some(" 15 ".into())), Some(15));
        assert_eq!(parse_increment_env(Some("-3".into())), None);
        assert_eq!(parse_increment_env(Some("lots".into())), None);
        assert_eq!(parse_increment_env(None), None);
    }

    #[test]
    #[serial_test::serial]
    fn env_override_wins_over_defaults() {
        std::env::set_var(ENV_FEED_CONFIG_PATH, "/nonexistent/feed.toml");
        std::env::set_var(ENV_INTEREST_INCREMENT, "42");
        let cfg = FeedConfig::load();
        std::env::remove_var(ENV_INTEREST_INCREMENT);
        std::env::remove_var(ENV_FEED_CONFIG_PATH);
        assert_eq!(cfg.interest_increment, 42);
    }
}
