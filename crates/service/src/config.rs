use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use chrono::Duration;
use serde::{Deserialize, Serialize};
use url::Url;

use common::credential::{Threshold, DEFAULT_THRESHOLD_BITS};
use common::site::{SiteSettings, DEFAULT_MAX_SITE_SIZE};

pub const DEFAULT_PORT: u16 = 8787;

#[derive(Debug, Clone)]
pub struct Config {
    /// address for the HTTP server to listen on
    pub listen_addr: SocketAddr,
    /// external origin sites are published under,
    ///  if not set then it is derived from each request's Host header
    pub public_url: Option<Url>,

    // data store configuration
    /// a path to a sqlite database, if not set then an
    ///  in-memory database will be used
    pub sqlite_path: Option<PathBuf>,
    /// keep everything in process memory instead of sqlite
    pub memory_store: bool,

    // site policy
    pub site_lifetime: Duration,
    pub upload_window: Duration,
    /// proof-of-work threshold exponent: tokens must hash below 2^bits
    pub threshold_bits: u32,
    pub max_site_size: u64,

    // misc
    pub log_level: tracing::Level,
    /// directory for daily rolling log files, stdout only if not set
    pub log_dir: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        let site = SiteSettings::default();
        Self {
            listen_addr: SocketAddr::new(IpAddr::V4(Ipv4Addr::new(0, 0, 0, 0)), DEFAULT_PORT),
            public_url: None,
            sqlite_path: None,
            memory_store: false,
            site_lifetime: site.lifetime,
            upload_window: site.upload_window,
            threshold_bits: site.threshold.bits(),
            max_site_size: site.max_site_size,
            log_level: tracing::Level::INFO,
            log_dir: None,
        }
    }
}

impl Config {
    /// Swap in short-lived sites and a threshold every token passes.
    pub fn apply_testing_profile(&mut self) {
        let testing = SiteSettings::testing();
        self.site_lifetime = testing.lifetime;
        self.upload_window = testing.upload_window;
        self.threshold_bits = testing.threshold.bits();
        self.max_site_size = testing.max_site_size;
    }

    pub fn site_settings(&self) -> SiteSettings {
        SiteSettings {
            lifetime: self.site_lifetime,
            upload_window: self.upload_window,
            threshold: Threshold::new(self.threshold_bits),
            max_site_size: self.max_site_size,
        }
    }
}

/// On-disk `config.toml`. Every field may be omitted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigFile {
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    pub public_url: Option<Url>,
    #[serde(default)]
    pub sqlite_path: Option<PathBuf>,
    /// Site lifetime in seconds
    #[serde(default = "default_site_lifetime")]
    pub site_lifetime: u64,
    /// Upload window in seconds
    #[serde(default = "default_upload_window")]
    pub upload_window: u64,
    #[serde(default = "default_threshold_bits")]
    pub threshold_bits: u32,
    #[serde(default = "default_max_site_size")]
    pub max_site_size: u64,
    #[serde(default)]
    pub log_level: Option<String>,
    #[serde(default)]
    pub log_dir: Option<PathBuf>,
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_site_lifetime() -> u64 {
    30 * 24 * 3600
}

fn default_upload_window() -> u64 {
    3600
}

fn default_threshold_bits() -> u32 {
    DEFAULT_THRESHOLD_BITS
}

fn default_max_site_size() -> u64 {
    DEFAULT_MAX_SITE_SIZE
}

impl Default for ConfigFile {
    fn default() -> Self {
        Self {
            port: default_port(),
            public_url: None,
            sqlite_path: None,
            site_lifetime: default_site_lifetime(),
            upload_window: default_upload_window(),
            threshold_bits: default_threshold_bits(),
            max_site_size: default_max_site_size(),
            log_level: None,
            log_dir: None,
        }
    }
}

impl ConfigFile {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|e| ConfigError::Read(path.to_path_buf(), e))?;
        Ok(toml::from_str(&raw)?)
    }

    pub fn into_config(self) -> Result<Config, ConfigError> {
        let log_level = match self.log_level {
            Some(level) => {
                tracing::Level::from_str(&level).map_err(|_| ConfigError::LogLevel(level))?
            }
            None => tracing::Level::INFO,
        };
        Ok(Config {
            listen_addr: SocketAddr::new(IpAddr::V4(Ipv4Addr::new(0, 0, 0, 0)), self.port),
            public_url: self.public_url,
            sqlite_path: self.sqlite_path,
            memory_store: false,
            site_lifetime: seconds(self.site_lifetime)?,
            upload_window: seconds(self.upload_window)?,
            threshold_bits: self.threshold_bits,
            max_site_size: self.max_site_size,
            log_level,
            log_dir: self.log_dir,
        })
    }
}

fn seconds(secs: u64) -> Result<Duration, ConfigError> {
    i64::try_from(secs)
        .ok()
        .and_then(Duration::try_seconds)
        .ok_or(ConfigError::Duration(secs))
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {0:?}: {1}")]
    Read(PathBuf, std::io::Error),
    #[error("invalid config file: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid log level: {0}")]
    LogLevel(String),
    #[error("duration out of range: {0} seconds")]
    Duration(u64),
}
