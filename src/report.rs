//! Chart-ready series built from the daily report.

use serde::Serialize;

use crate::store::stats::DailyStat;

/// Display format for chart labels.
pub const CHART_DATE_FORMAT: &str = "%d-%m-%Y";

/// Parallel vectors in chronological order, oldest day first.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ChartSeries {
    /// Day labels in [`CHART_DATE_FORMAT`].
    pub dates: Vec<String>,
    /// Requests per day.
    pub totals: Vec<u64>,
    /// 4xx/5xx responses per day.
    pub errors: Vec<u64>,
}

impl ChartSeries {
    /// Build from stats as returned by the store (newest first).
    #[must_use]
    pub fn from_stats(stats: &[DailyStat]) -> Self {
        let mut series = Self::default();
        for stat in stats.iter().rev() {
            series
                .dates
                .push(stat.date.format(CHART_DATE_FORMAT).to_string());
            series.totals.push(stat.total_events);
            series.errors.push(stat.error_count);
        }
        series
    }

    /// True when there is no day to chart.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }
}
