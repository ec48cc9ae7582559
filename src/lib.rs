#![forbid(unsafe_code)]

//! logscope: read-only browser and daily reporter for web-server and
//! file-transfer logs kept in SQLite.
//!
//! Three log tables with different shapes (Apache access, Apache error, FTP
//! transfers) are presented as one newest-first stream of events:
//! 1. **Filters**: service, address substring, date range, keyword
//! 2. **Unification**: one parameterized `UNION ALL` over the enabled tables,
//!    counted and paginated
//! 3. **Daily report**: per-day totals, unique addresses, and error counts
//!
//! # Library usage
//!
//! ```rust,no_run
//! use logscope::prelude::*;
//!
//! let config = Config::load(None)?;
//! let store = LogStore::open(&config);
//! let filter = FilterSet::builder().service("Apache").keyword("error").build();
//! let page = store.fetch_events(&filter, PageRequest::new(1, 20));
//! println!("{} of {} events", page.events.len(), page.total);
//! # Ok::<(), logscope::core::errors::LogscopeError>(())
//! ```

pub mod prelude;

pub mod core;
pub mod export;
pub mod query;
pub mod report;
pub mod store;
