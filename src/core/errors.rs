//! LGS-prefixed error types with structured error codes.

#![allow(missing_docs)]

use std::path::{Path, PathBuf};

use thiserror::Error;

/// Shared `Result` alias for the project.
pub type Result<T> = std::result::Result<T, LogscopeError>;

/// Top-level error type for logscope.
#[derive(Debug, Error)]
pub enum LogscopeError {
    #[error("[LGS-1001] invalid configuration: {details}")]
    InvalidConfig { details: String },

    #[error("[LGS-1002] missing configuration file: {path}")]
    MissingConfig { path: PathBuf },

    #[error("[LGS-1003] configuration parse failure in {context}: {details}")]
    ConfigParse {
        context: &'static str,
        details: String,
    },

    #[error("[LGS-2001] unrecognized date {input:?}: expected YYYY-MM-DD or YYYY-MM-DDTHH:MM")]
    InvalidDate { input: String },

    #[error("[LGS-3001] connection pool unavailable: {details}")]
    PoolUnavailable { details: String },

    #[error("[LGS-3002] connection pool exhausted after waiting {waited_ms} ms")]
    PoolExhausted { waited_ms: u64 },

    #[error("[LGS-3101] SQL failure in {context}: {details}")]
    Sql {
        context: &'static str,
        details: String,
    },

    #[error("[LGS-4001] serialization failure in {context}: {details}")]
    Serialization {
        context: &'static str,
        details: String,
    },

    #[error("[LGS-4002] IO failure at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl LogscopeError {
    /// Stable machine-parseable error code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::InvalidConfig { .. } => "LGS-1001",
            Self::MissingConfig { .. } => "LGS-1002",
            Self::ConfigParse { .. } => "LGS-1003",
            Self::InvalidDate { .. } => "LGS-2001",
            Self::PoolUnavailable { .. } => "LGS-3001",
            Self::PoolExhausted { .. } => "LGS-3002",
            Self::Sql { .. } => "LGS-3101",
            Self::Serialization { .. } => "LGS-4001",
            Self::Io { .. } => "LGS-4002",
        }
    }

    /// Whether retrying might resolve the failure.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::PoolUnavailable { .. }
                | Self::PoolExhausted { .. }
                | Self::Sql { .. }
                | Self::Io { .. }
        )
    }

    /// Convenience constructor for IO errors with a known path.
    #[must_use]
    pub fn io(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }
}

impl From<rusqlite::Error> for LogscopeError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sql {
            context: "rusqlite",
            details: value.to_string(),
        }
    }
}

impl From<serde_json::Error> for LogscopeError {
    fn from(value: serde_json::Error) -> Self {
        Self::Serialization {
            context: "serde_json",
            details: value.to_string(),
        }
    }
}

impl From<csv::Error> for LogscopeError {
    fn from(value: csv::Error) -> Self {
        Self::Serialization {
            context: "csv",
            details: value.to_string(),
        }
    }
}

impl From<toml::de::Error> for LogscopeError {
    fn from(value: toml::de::Error) -> Self {
        Self::ConfigParse {
            context: "toml",
            details: value.to_string(),
        }
    }
}
