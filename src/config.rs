use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

const DEFAULT_ENV_PREFIX: &str = "CHIRP";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Config {
    #[serde(default)]
    pub ui: UiConfig,
    #[serde(default)]
    pub feed: FeedConfig,
    #[serde(default)]
    pub log: LogConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UiConfig {
    /// Reduce inter-card spacing by one row.
    #[serde(default)]
    pub compress: bool,
    /// Draw a border around each card.
    #[serde(default)]
    pub tweet_border: bool,
    /// Header timestamps as "5m" instead of wall clock.
    #[serde(default = "default_true")]
    pub relative_time: bool,
    /// Credit the original author in repost headers.
    #[serde(default = "default_true")]
    pub retweet_by: bool,
    /// Activity bar with per-feed unread counters.
    #[serde(default = "default_true")]
    pub activities: bool,
    /// Key reminder on the bottom row.
    #[serde(default = "default_true")]
    pub help_bar: bool,
    #[serde(default = "default_theme")]
    pub theme: String,
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            compress: false,
            tweet_border: false,
            relative_time: true,
            retweet_by: true,
            activities: true,
            help_bar: true,
            theme: default_theme(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_theme() -> String {
    "default".into()
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FeedConfig {
    /// The viewer's own handle, for self-mention highlighting.
    #[serde(default)]
    pub own_handle: String,
    /// Query for the search feed; empty means the feed does not refresh.
    #[serde(default)]
    pub search_query: String,
    /// Handle for the user feed; empty means the feed does not refresh.
    #[serde(default)]
    pub user: String,
    /// How often the active feed refreshes on its own.
    #[serde(default = "default_refresh", with = "humantime_serde")]
    pub refresh: Duration,
    /// How long a fetch may run before it is abandoned.
    #[serde(default = "default_fetch_timeout", with = "humantime_serde")]
    pub fetch_timeout: Duration,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            own_handle: String::new(),
            search_query: String::new(),
            user: String::new(),
            refresh: default_refresh(),
            fetch_timeout: default_fetch_timeout(),
        }
    }
}

fn default_refresh() -> Duration {
    Duration::from_secs(120)
}

fn default_fetch_timeout() -> Duration {
    Duration::from_secs(10)
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LogConfig {
    #[serde(default = "default_log_file")]
    pub file: Option<PathBuf>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            file: default_log_file(),
        }
    }
}

fn default_log_file() -> Option<PathBuf> {
    dirs::cache_dir().map(|dir| dir.join("chirp-tui").join("chirp-tui.log"))
}

#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    pub config_file: Option<PathBuf>,
    pub env_prefix: Option<String>,
}

pub fn load(options: LoadOptions) -> Result<Config> {
    let mut cfg = Config::default();

    if let Some(path) = options.config_file.as_ref() {
        if path.exists() {
            cfg = read_config_file(path)?;
        }
    } else if let Some(default_path) = default_config_path() {
        if default_path.exists() {
            cfg = read_config_file(&default_path)?;
        }
    }

    let prefix = options.env_prefix.as_deref().unwrap_or(DEFAULT_ENV_PREFIX);
    apply_env(&mut cfg, prefix);

    Ok(cfg)
}

fn read_config_file(path: &Path) -> Result<Config> {
    let data = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file at {}", path.display()))?;
    let config: Config = serde_yaml::from_str(&data)
        .with_context(|| format!("Failed to parse config file at {}", path.display()))?;
    Ok(config)
}

fn apply_env(cfg: &mut Config, prefix: &str) {
    let upper_prefix = format!("{}_", prefix.to_uppercase());
    let mut map: HashMap<String, String> = HashMap::new();

    for (key, value) in env::vars() {
        if let Some(stripped) = key.strip_prefix(&upper_prefix) {
            let normalized = stripped.to_ascii_lowercase().replace("__", ".");
            map.insert(normalized, value);
        }
    }

    for (key, value) in map {
        apply_env_value(cfg, &key, value);
    }
}

fn apply_env_value(cfg: &mut Config, key: &str, value: String) {
    match key {
        "ui.compress" => cfg.ui.compress = parse_bool(&value),
        "ui.tweet_border" => cfg.ui.tweet_border = parse_bool(&value),
        "ui.relative_time" => cfg.ui.relative_time = parse_bool(&value),
        "ui.retweet_by" => cfg.ui.retweet_by = parse_bool(&value),
        "ui.activities" => cfg.ui.activities = parse_bool(&value),
        "ui.help_bar" => cfg.ui.help_bar = parse_bool(&value),
        "ui.theme" => cfg.ui.theme = value,
        "feed.own_handle" => cfg.feed.own_handle = value,
        "feed.search_query" => cfg.feed.search_query = value,
        "feed.user" => cfg.feed.user = value,
        "feed.refresh" => {
            if let Ok(duration) = humantime::parse_duration(&value) {
                cfg.feed.refresh = duration;
            }
        }
        "feed.fetch_timeout" => {
            if let Ok(duration) = humantime::parse_duration(&value) {
                cfg.feed.fetch_timeout = duration;
            }
        }
        "log.file" => cfg.log.file = Some(PathBuf::from(value)),
        _ => {}
    }
}

fn parse_bool(value: &str) -> bool {
    matches!(value, "1" | "true" | "TRUE" | "True" | "yes" | "on")
}

pub fn default_path() -> Option<PathBuf> {
    default_config_path()
}

fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("chirp-tui").join("config.yaml"))
}
