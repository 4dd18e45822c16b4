mod file_config;

pub use file_config::{CacheConfig, FileConfig};

use crate::server::RequestsLoggingLevel;
use anyhow::{bail, Result};
use clap::ValueEnum;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_CACHE_TTL_SEC: u64 = 24 * 60 * 60;
pub const DEFAULT_EMPTY_CACHE_TTL_SEC: u64 = 5 * 60;
pub const DEFAULT_CACHE_MAX_ENTRIES: usize = 1000;

/// CLI arguments that can be used for config resolution.
/// This struct mirrors the CLI arguments that can be overridden by TOML config.
#[derive(Debug, Clone, Default)]
pub struct CliConfig {
    pub db_path: Option<PathBuf>,
    pub port: u16,
    pub metrics_port: u16,
    pub logging_level: RequestsLoggingLevel,
    pub content_cache_age_sec: usize,
    pub read_pool_size: usize,
    pub store_timeout_ms: u64,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub db_path: PathBuf,
    pub port: u16,
    pub metrics_port: u16,
    pub logging_level: RequestsLoggingLevel,
    pub content_cache_age_sec: usize,
    pub read_pool_size: usize,
    pub store_timeout: Duration,
    pub cache: CacheSettings,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheSettings {
    pub ttl: Duration,
    pub empty_ttl: Duration,
    pub max_entries: usize,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(DEFAULT_CACHE_TTL_SEC),
            empty_ttl: Duration::from_secs(DEFAULT_EMPTY_CACHE_TTL_SEC),
            max_entries: DEFAULT_CACHE_MAX_ENTRIES,
        }
    }
}

impl AppConfig {
    /// Resolve configuration from CLI arguments and optional TOML file config.
    /// TOML values override CLI values where present.
    pub fn resolve(cli: &CliConfig, file_config: Option<FileConfig>) -> Result<Self> {
        let file = file_config.unwrap_or_default();

        let db_path = file
            .db_path
            .map(PathBuf::from)
            .or_else(|| cli.db_path.clone())
            .ok_or_else(|| {
                anyhow::anyhow!("db_path must be specified via --db-path or in config file")
            })?;

        // The database file may not exist yet, its directory must.
        if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            if !parent.is_dir() {
                bail!("Database directory does not exist: {:?}", parent);
            }
        }
        if db_path.is_dir() {
            bail!("db_path is a directory: {:?}", db_path);
        }

        let port = file.port.unwrap_or(cli.port);
        let metrics_port = file.metrics_port.unwrap_or(cli.metrics_port);

        let logging_level = file
            .logging_level
            .and_then(|s| parse_logging_level(&s))
            .unwrap_or_else(|| cli.logging_level.clone());

        let content_cache_age_sec = file
            .content_cache_age_sec
            .unwrap_or(cli.content_cache_age_sec);

        let read_pool_size = file.read_pool_size.unwrap_or(cli.read_pool_size);
        if read_pool_size == 0 {
            bail!("read_pool_size must be at least 1");
        }

        let store_timeout_ms = file.store_timeout_ms.unwrap_or(cli.store_timeout_ms);
        if store_timeout_ms == 0 {
            bail!("store_timeout_ms must be greater than 0");
        }

        let cache_file = file.cache.unwrap_or_default();
        let cache = CacheSettings {
            ttl: Duration::from_secs(cache_file.ttl_sec.unwrap_or(DEFAULT_CACHE_TTL_SEC)),
            empty_ttl: Duration::from_secs(
                cache_file
                    .empty_ttl_sec
                    .unwrap_or(DEFAULT_EMPTY_CACHE_TTL_SEC),
            ),
            max_entries: cache_file.max_entries.unwrap_or(DEFAULT_CACHE_MAX_ENTRIES),
        };

        Ok(Self {
            db_path,
            port,
            metrics_port,
            logging_level,
            content_cache_age_sec,
            read_pool_size,
            store_timeout: Duration::from_millis(store_timeout_ms),
            cache,
        })
    }
}

/// Parses a logging level string into RequestsLoggingLevel.
/// Uses clap's ValueEnum trait for parsing.
fn parse_logging_level(s: &str) -> Option<RequestsLoggingLevel> {
    RequestsLoggingLevel::from_str(s, true).ok()
}
