//! Convenience re-exports for library consumers.
//!
//! ```rust,no_run
//! use logscope::prelude::*;
//! ```

// Core
pub use crate::core::config::Config;
pub use crate::core::errors::{LogscopeError, Result};

// Query
pub use crate::query::dates::{Boundary, normalize};
pub use crate::query::filter::{FilterSet, PageRequest, Service};
pub use crate::query::sources::EventSource;

// Store
pub use crate::store::LogStore;
pub use crate::store::events::{EventPage, LogEvent};
pub use crate::store::pool::{ConnectionProvider, PoolStatus};
pub use crate::store::stats::DailyStat;

// Output
pub use crate::export::{ExportFormat, render};
pub use crate::report::ChartSeries;
