//! Static mapping of each log source to its physical table and column names.
//!
//! Everything here is trusted internal configuration: table and column names
//! are spliced into SQL text, so they must only ever come from this table and
//! never from request content.

#![allow(missing_docs)]

use std::fmt;
use std::str::FromStr;

use serde::{Serialize, Serializer};

use crate::core::errors::LogscopeError;

/// Origin of a unified event row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventSource {
    ApacheAccess,
    ApacheError,
    Ftp,
}

impl EventSource {
    /// Label projected as the constant `source` column and shown to operators.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::ApacheAccess => "Apache (Acceso)",
            Self::ApacheError => "Apache (Error)",
            Self::Ftp => "FTP",
        }
    }

    /// Table and columns this source is read from.
    #[must_use]
    pub fn table_spec(self) -> &'static SourceTableSpec {
        match self {
            Self::ApacheAccess => &SOURCE_TABLES[0],
            Self::ApacheError => &SOURCE_TABLES[1],
            Self::Ftp => &SOURCE_TABLES[2],
        }
    }
}

impl fmt::Display for EventSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for EventSource {
    type Err = LogscopeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SOURCE_TABLES
            .iter()
            .map(|spec| spec.source)
            .find(|source| source.label() == s)
            .ok_or_else(|| LogscopeError::Serialization {
                context: "source label",
                details: format!("unknown source label {s:?}"),
            })
    }
}

impl Serialize for EventSource {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.label())
    }
}

/// Service family a source belongs to, as selected by the service filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceGroup {
    Apache,
    Ftp,
}

/// Column names that vary per source table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceFields {
    pub address: &'static str,
    pub timestamp: &'static str,
    pub detail: &'static str,
}

/// One physical log table and how it maps onto the unified event shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceTableSpec {
    pub source: EventSource,
    pub table: &'static str,
    pub fields: SourceFields,
    pub group: ServiceGroup,
}

/// Access table name; the daily report aggregates over this table.
pub const ACCESS_TABLE: &str = "access_log";

/// Every source the unifier knows, in union order.
pub static SOURCE_TABLES: [SourceTableSpec; 3] = [
    SourceTableSpec {
        source: EventSource::ApacheAccess,
        table: ACCESS_TABLE,
        fields: SourceFields {
            address: "address",
            timestamp: "timestamp",
            detail: "path",
        },
        group: ServiceGroup::Apache,
    },
    SourceTableSpec {
        source: EventSource::ApacheError,
        table: "error_log",
        fields: SourceFields {
            address: "client_address",
            timestamp: "timestamp",
            detail: "message",
        },
        group: ServiceGroup::Apache,
    },
    SourceTableSpec {
        source: EventSource::Ftp,
        table: "transfer_log",
        fields: SourceFields {
            address: "address",
            timestamp: "timestamp",
            detail: "details",
        },
        group: ServiceGroup::Ftp,
    },
];
