//! Daily report: per-day totals over the access log.
//!
//! A read-only aggregation over `access_log`, newest day first, capped at
//! [`DAILY_STATS_LIMIT`] days. Callers that chart the result reverse it into
//! chronological order themselves.

#![allow(missing_docs)]

use chrono::NaiveDate;
use serde::Serialize;

use crate::core::errors::Result;
use crate::query::sources::EventSource;
use crate::store::pool::ConnectionProvider;

/// Most recent days reported.
pub const DAILY_STATS_LIMIT: u32 = 30;

/// Counters for one calendar day of access-log traffic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DailyStat {
    pub date: NaiveDate,
    pub total_events: u64,
    pub unique_addresses: u64,
    /// Responses with a status code in 400..=599.
    pub error_count: u64,
}

/// Aggregation over the access table, using its columns from the source map.
fn daily_stats_sql() -> String {
    let spec = EventSource::ApacheAccess.table_spec();
    format!(
        "SELECT
            DATE({ts}) AS day,
            COUNT(*),
            COUNT(DISTINCT {addr}),
            COALESCE(SUM(CASE WHEN status_code BETWEEN 400 AND 599 THEN 1 ELSE 0 END), 0)
         FROM {table}
         GROUP BY DATE({ts})
         ORDER BY day DESC
         LIMIT ?1",
        ts = spec.fields.timestamp,
        addr = spec.fields.address,
        table = spec.table,
    )
}

/// Read-only aggregation engine over the log database.
pub struct StatsEngine<'a> {
    provider: &'a ConnectionProvider,
}

impl<'a> StatsEngine<'a> {
    pub fn new(provider: &'a ConnectionProvider) -> Self {
        Self { provider }
    }

    /// Daily stats, newest first. Failures are logged and yield an empty list.
    pub fn daily_stats(&self) -> Vec<DailyStat> {
        self.try_daily_stats().unwrap_or_else(|err| {
            tracing::error!(
                code = err.code(),
                statement = %daily_stats_sql(),
                limit = DAILY_STATS_LIMIT,
                "daily stats query failed: {err}"
            );
            Vec::new()
        })
    }

    /// Daily stats, newest first, reporting failures to the caller.
    #[allow(clippy::cast_sign_loss)]
    pub fn try_daily_stats(&self) -> Result<Vec<DailyStat>> {
        let conn = self.provider.try_acquire()?;
        let mut stmt = conn.prepare_cached(&daily_stats_sql())?;
        let stats = stmt
            .query_map([DAILY_STATS_LIMIT], |row| {
                Ok(DailyStat {
                    date: row.get(0)?,
                    total_events: row.get::<_, i64>(1)?.max(0) as u64,
                    unique_addresses: row.get::<_, i64>(2)?.max(0) as u64,
                    error_count: row.get::<_, i64>(3)?.max(0) as u64,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        tracing::debug!(days = stats.len(), "daily stats fetched");
        Ok(stats)
    }
}
