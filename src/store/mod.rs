//! Read-only access to the log database: connection pool, unified event
//! queries, and the daily report.

pub mod events;
pub mod pool;
pub mod stats;

use crate::core::config::Config;
use crate::query::filter::{FilterSet, PageRequest};
use crate::store::events::{EventPage, EventUnifier, LogEvent};
use crate::store::pool::ConnectionProvider;
use crate::store::stats::{DailyStat, StatsEngine};

/// Process-wide entry point for request handlers.
///
/// Created once at startup; owns the connection pool and is shared by
/// reference across requests. Every call leases and returns its own
/// connection.
pub struct LogStore {
    provider: ConnectionProvider,
    export_max_rows: u32,
}

impl LogStore {
    /// Initialize the pool described by `config`.
    pub fn open(config: &Config) -> Self {
        Self {
            provider: ConnectionProvider::initialize(&config.database),
            export_max_rows: config.export.max_rows,
        }
    }

    /// Underlying connection provider.
    pub fn provider(&self) -> &ConnectionProvider {
        &self.provider
    }

    /// One page of unified events; `([], 0)` on any storage failure.
    pub fn fetch_events(&self, filter: &FilterSet, page: PageRequest) -> EventPage {
        EventUnifier::new(&self.provider).fetch(filter, page)
    }

    /// Every event matching `filter`, up to the configured export cap.
    pub fn fetch_export(&self, filter: &FilterSet) -> Vec<LogEvent> {
        self.fetch_events(filter, PageRequest::new(1, self.export_max_rows))
            .events
    }

    /// Daily access statistics, newest first; empty on storage failure.
    pub fn fetch_daily_stats(&self) -> Vec<DailyStat> {
        StatsEngine::new(&self.provider).daily_stats()
    }
}
