// src/config.rs
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG_PATH: &str = "config/roster.toml";

pub const ENV_CONFIG_PATH: &str = "ROSTER_CONFIG_PATH";
pub const ENV_CACHE_PATH: &str = "ROSTER_CACHE_PATH";
pub const ENV_FEED_PATH: &str = "ROSTER_FEED_PATH";
pub const ENV_FORCE: &str = "ROSTER_FORCE";
pub const ENV_ROSTER_OFFSET: &str = "ROSTER_OFFSET";

fn default_cache_path() -> PathBuf {
    PathBuf::from("cache/roster.v1.json")
}
fn default_uid_domain() -> String {
    "CREW-ROSTER.INVALID".to_string()
}
fn default_prodid() -> String {
    "crew-roster".to_string()
}
fn default_request_timeout_secs() -> u64 {
    60
}
fn default_connect_timeout_secs() -> u64 {
    10
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RosterConfig {
    #[serde(default = "default_cache_path")]
    pub cache_path: PathBuf,
    /// Previously published feed; reconciled against on the next publication.
    #[serde(default)]
    pub feed_path: Option<PathBuf>,
    /// Right-hand side of every event UID.
    #[serde(default = "default_uid_domain")]
    pub uid_domain: String,
    #[serde(default = "default_prodid")]
    pub prodid: String,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
    #[serde(default)]
    pub portal_base_url: Option<String>,
    /// Ignore cached trips and refetch everything.
    #[serde(default)]
    pub force: bool,
    /// Which brief roster to read: 0 is the current one, positive steps forward, negative back.
    #[serde(default)]
    pub roster_offset: i32,
}

impl Default for RosterConfig {
    fn default() -> Self {
        Self {
            cache_path: default_cache_path(),
            feed_path: None,
            uid_domain: default_uid_domain(),
            prodid: default_prodid(),
            request_timeout_secs: default_request_timeout_secs(),
            connect_timeout_secs: default_connect_timeout_secs(),
            portal_base_url: None,
            force: false,
            roster_offset: 0,
        }
    }
}

impl RosterConfig {
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading roster config from {}", path.display()))?;
        let mut cfg: RosterConfig = toml::from_str(&content)
            .with_context(|| format!("parsing roster config {}", path.display()))?;
        cfg.sanitize();
        Ok(cfg)
    }

    /// Load config using env var + fallbacks, then apply env overrides:
    /// 1) $ROSTER_CONFIG_PATH (must exist)
    /// 2) config/roster.toml
    /// 3) built-in defaults
    pub fn load_default() -> Result<Self> {
        let mut cfg = if let Ok(p) = std::env::var(ENV_CONFIG_PATH) {
            let pb = PathBuf::from(p);
            if !pb.exists() {
                return Err(anyhow!("{ENV_CONFIG_PATH} points to non-existent path"));
            }
            Self::load_from(&pb)?
        } else {
            let default = PathBuf::from(DEFAULT_CONFIG_PATH);
            if default.exists() {
                Self::load_from(&default)?
            } else {
                Self::default()
            }
        };
        cfg.apply_env();
        Ok(cfg)
    }

    fn apply_env(&mut self) {
        if let Ok(p) = std::env::var(ENV_CACHE_PATH) {
            if !p.trim().is_empty() {
                self.cache_path = PathBuf::from(p);
            }
        }
        if let Ok(p) = std::env::var(ENV_FEED_PATH) {
            if !p.trim().is_empty() {
                self.feed_path = Some(PathBuf::from(p));
            }
        }
        if let Ok(v) = std::env::var(ENV_FORCE) {
            self.force = matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes");
        }
        if let Ok(v) = std::env::var(ENV_ROSTER_OFFSET) {
            if let Ok(offset) = v.trim().parse() {
                self.roster_offset = offset;
            }
        }
    }

    fn sanitize(&mut self) {
        self.uid_domain = self.uid_domain.trim().to_string();
        if self.uid_domain.is_empty() {
            self.uid_domain = default_uid_domain();
        }
        if self.request_timeout_secs == 0 {
            self.request_timeout_secs = default_request_timeout_secs();
        }
        if self.connect_timeout_secs == 0 {
            self.connect_timeout_secs = default_connect_timeout_secs();
        }
        if let Some(url) = self.portal_base_url.as_mut() {
            if !url.ends_with('/') {
                url.push('/');
            }
        }
    }
}
