//! Rendering of already-fetched events for download.

use std::fmt;
use std::str::FromStr;

use crate::core::errors::{LogscopeError, Result};
use crate::store::events::LogEvent;

/// Download format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExportFormat {
    /// Header row from the record keys, then one row per event.
    #[default]
    Csv,
    /// Indented JSON array, timestamps as text.
    Json,
}

impl ExportFormat {
    /// Suggested attachment name.
    #[must_use]
    pub const fn file_name(self) -> &'static str {
        match self {
            Self::Csv => "logs_export.csv",
            Self::Json => "logs_export.json",
        }
    }

    /// MIME type for the rendered document.
    #[must_use]
    pub const fn content_type(self) -> &'static str {
        match self {
            Self::Csv => "text/csv",
            Self::Json => "application/json",
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Csv => "csv",
            Self::Json => "json",
        })
    }
}

impl FromStr for ExportFormat {
    type Err = LogscopeError;

    /// Anything other than `json` falls back to CSV, matching the export form.
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(if s.eq_ignore_ascii_case("json") {
            Self::Json
        } else {
            Self::Csv
        })
    }
}

/// Render `events` in `format`.
pub fn render(events: &[LogEvent], format: ExportFormat) -> Result<String> {
    match format {
        ExportFormat::Csv => render_csv(events),
        ExportFormat::Json => Ok(serde_json::to_string_pretty(events)?),
    }
}

/// CSV with a header row; an empty set renders as an empty document.
pub fn render_csv(events: &[LogEvent]) -> Result<String> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    for event in events {
        writer.serialize(event)?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|err| LogscopeError::Serialization {
            context: "csv",
            details: err.to_string(),
        })?;
    String::from_utf8(bytes).map_err(|err| LogscopeError::Serialization {
        context: "csv",
        details: err.to_string(),
    })
}
