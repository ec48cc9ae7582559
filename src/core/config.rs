//! Configuration system: TOML file + env var overrides + smart defaults.

#![allow(missing_docs)]

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::core::errors::{LogscopeError, Result};

/// Full logscope configuration model.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(default)]
pub struct Config {
    pub database: DatabaseConfig,
    pub query: QueryConfig,
    pub export: ExportConfig,
    /// Where this config was loaded from. Not read from the file itself.
    #[serde(skip)]
    pub config_file: PathBuf,
}

/// Log database location and connection pool knobs.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct DatabaseConfig {
    pub path: PathBuf,
    /// Number of connections opened once at startup.
    pub pool_size: usize,
    /// How long a caller waits for a leased connection to come back.
    pub acquire_timeout_ms: u64,
    /// SQLite busy handler timeout per connection.
    pub busy_timeout_ms: u64,
    /// Open an ad-hoc connection when the pool failed to initialize.
    pub fallback_direct: bool,
}

/// Pagination defaults for event browsing.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct QueryConfig {
    pub default_per_page: u32,
    pub max_per_page: u32,
}

/// Export size cap.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ExportConfig {
    pub max_rows: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: data_dir().join("logs.sqlite3"),
            pool_size: 5,
            acquire_timeout_ms: 5_000,
            busy_timeout_ms: 5_000,
            fallback_direct: true,
        }
    }
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            default_per_page: 20,
            max_per_page: 500,
        }
    }
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self { max_rows: 10_000 }
    }
}

impl Config {
    /// Default configuration path.
    #[must_use]
    pub fn default_path() -> PathBuf {
        home_dir()
            .join(".config")
            .join("logscope")
            .join("config.toml")
    }

    /// Load config from default or explicit path, then apply env overrides.
    ///
    /// Missing config file is not an error when loading from default path; defaults are used.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        Self::load_with_env(path, |name| env::var(name).ok())
    }

    fn load_with_env<F>(path: Option<&Path>, lookup: F) -> Result<Self>
    where
        F: FnMut(&str) -> Option<String>,
    {
        let path_buf = path.map_or_else(Self::default_path, Path::to_path_buf);
        let is_explicit_path = path.is_some();

        let mut cfg = if path_buf.exists() {
            let raw = fs::read_to_string(&path_buf).map_err(|source| LogscopeError::Io {
                path: path_buf.clone(),
                source,
            })?;
            let parsed: Self = toml::from_str(&raw)?;
            parsed
        } else if is_explicit_path {
            return Err(LogscopeError::MissingConfig { path: path_buf });
        } else {
            Self::default()
        };

        cfg.config_file = path_buf;
        cfg.apply_env_overrides_from(lookup)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Deterministic hash of the effective config for diagnostics.
    ///
    /// FNV-1a over the canonical JSON form, stable across processes.
    pub fn stable_hash(&self) -> Result<String> {
        let canonical = serde_json::to_string(self)?;
        let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
        for byte in canonical.as_bytes() {
            hash ^= u64::from(*byte);
            hash = hash.wrapping_mul(0x0100_0000_01b3);
        }
        Ok(format!("{hash:016x}"))
    }

    /// Clamp a requested page size into `1..=max_per_page`, using the default when absent.
    #[must_use]
    pub fn effective_per_page(&self, requested: Option<u32>) -> u32 {
        requested
            .unwrap_or(self.query.default_per_page)
            .clamp(1, self.query.max_per_page)
    }

    fn apply_env_overrides_from<F>(&mut self, mut lookup: F) -> Result<()>
    where
        F: FnMut(&str) -> Option<String>,
    {
        let mut var = |name: &str| lookup(name).filter(|raw| !raw.trim().is_empty());

        if let Some(raw) = var("LOGSCOPE_DB_PATH") {
            self.database.path = PathBuf::from(raw);
        }
        if let Some(raw) = var("LOGSCOPE_DB_POOL_SIZE") {
            self.database.pool_size = parse_env("LOGSCOPE_DB_POOL_SIZE", &raw)?;
        }
        if let Some(raw) = var("LOGSCOPE_DB_ACQUIRE_TIMEOUT_MS") {
            self.database.acquire_timeout_ms = parse_env("LOGSCOPE_DB_ACQUIRE_TIMEOUT_MS", &raw)?;
        }
        if let Some(raw) = var("LOGSCOPE_DB_BUSY_TIMEOUT_MS") {
            self.database.busy_timeout_ms = parse_env("LOGSCOPE_DB_BUSY_TIMEOUT_MS", &raw)?;
        }
        if let Some(raw) = var("LOGSCOPE_DB_FALLBACK_DIRECT") {
            self.database.fallback_direct = parse_env("LOGSCOPE_DB_FALLBACK_DIRECT", &raw)?;
        }
        if let Some(raw) = var("LOGSCOPE_QUERY_DEFAULT_PER_PAGE") {
            self.query.default_per_page = parse_env("LOGSCOPE_QUERY_DEFAULT_PER_PAGE", &raw)?;
        }
        if let Some(raw) = var("LOGSCOPE_QUERY_MAX_PER_PAGE") {
            self.query.max_per_page = parse_env("LOGSCOPE_QUERY_MAX_PER_PAGE", &raw)?;
        }
        if let Some(raw) = var("LOGSCOPE_EXPORT_MAX_ROWS") {
            self.export.max_rows = parse_env("LOGSCOPE_EXPORT_MAX_ROWS", &raw)?;
        }
        Ok(())
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if self.database.pool_size == 0 {
            return Err(LogscopeError::InvalidConfig {
                details: "database.pool_size must be >= 1".to_string(),
            });
        }
        if self.database.path.as_os_str().is_empty() {
            return Err(LogscopeError::InvalidConfig {
                details: "database.path must not be empty".to_string(),
            });
        }
        if self.query.default_per_page == 0 || self.query.max_per_page == 0 {
            return Err(LogscopeError::InvalidConfig {
                details: "query.default_per_page and query.max_per_page must be >= 1".to_string(),
            });
        }
        if self.query.default_per_page > self.query.max_per_page {
            return Err(LogscopeError::InvalidConfig {
                details: format!(
                    "query.default_per_page ({}) must not exceed query.max_per_page ({})",
                    self.query.default_per_page, self.query.max_per_page
                ),
            });
        }
        if self.export.max_rows == 0 {
            return Err(LogscopeError::InvalidConfig {
                details: "export.max_rows must be >= 1".to_string(),
            });
        }
        Ok(())
    }
}

fn home_dir() -> PathBuf {
    env::var_os("HOME").map_or_else(
        || {
            tracing::warn!("HOME not set, falling back to /tmp for logscope paths");
            PathBuf::from("/tmp")
        },
        PathBuf::from,
    )
}

fn data_dir() -> PathBuf {
    home_dir().join(".local").join("share").join("logscope")
}

fn parse_env<T>(name: &str, raw: &str) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse::<T>()
        .map_err(|error| LogscopeError::ConfigParse {
            context: "env",
            details: format!("{name}={raw:?}: {error}"),
        })
}
