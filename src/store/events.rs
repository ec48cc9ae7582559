//! Event unifier: one paginated, newest-first view over every enabled log table.
//!
//! Each enabled [`SourceTableSpec`] contributes a SELECT projecting the same
//! four columns (`source`, `timestamp`, `address`, `detail`). The selects are
//! combined with `UNION ALL`, counted once over the full filtered set, and
//! read once more ordered and sliced for the requested page.

#![allow(missing_docs)]

use chrono::NaiveDateTime;
use rusqlite::{Connection, params_from_iter};
use rusqlite::types::Value;
use serde::Serialize;

use crate::core::errors::{LogscopeError, Result};
use crate::query::conditions;
use crate::query::dates::timestamp_text;
use crate::query::filter::{FilterSet, PageRequest};
use crate::query::sources::{EventSource, SourceTableSpec};
use crate::store::pool::ConnectionProvider;

/// One row of the unified view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LogEvent {
    pub source: EventSource,
    #[serde(with = "timestamp_text")]
    pub timestamp: NaiveDateTime,
    pub address: String,
    pub detail: String,
}

/// A page of events plus the size of the whole filtered set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EventPage {
    pub events: Vec<LogEvent>,
    pub total: u64,
}

impl EventPage {
    /// The "no results" page.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Number of pages at `per_page` rows each; an empty set still has one page.
    #[must_use]
    pub fn total_pages(&self, per_page: u32) -> u64 {
        let per_page = u64::from(per_page.max(1));
        if self.total == 0 {
            1
        } else {
            self.total.div_ceil(per_page)
        }
    }
}

/// The statements and parameters for one unified fetch. Built without a
/// connection so it can be inspected and logged on its own.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnifiedQuery {
    sources: Vec<EventSource>,
    union_sql: String,
    params: Vec<String>,
}

impl UnifiedQuery {
    /// Plan the union for `filter`, or `None` when the service selects no table.
    #[must_use]
    pub fn plan(filter: &FilterSet) -> Option<Self> {
        let mut sources = Vec::new();
        let mut selects = Vec::new();
        let mut params = Vec::new();

        for spec in filter.service().enabled_sources() {
            let clause = conditions::build(filter, &spec.fields);
            selects.push(source_select(spec, &clause.sql()));
            params.extend(clause.into_params());
            sources.push(spec.source);
        }

        if selects.is_empty() {
            return None;
        }

        Some(Self {
            sources,
            union_sql: selects.join(" UNION ALL "),
            params,
        })
    }

    /// Sources taking part in the union, in union order.
    pub fn sources(&self) -> &[EventSource] {
        &self.sources
    }

    pub fn union_sql(&self) -> &str {
        &self.union_sql
    }

    /// Filter parameters shared by the count and page statements.
    pub fn params(&self) -> &[String] {
        &self.params
    }

    #[must_use]
    pub fn count_sql(&self) -> String {
        format!("SELECT COUNT(*) FROM ({}) AS unified", self.union_sql)
    }

    #[must_use]
    pub fn page_sql(&self) -> String {
        format!(
            "SELECT source, timestamp, address, detail FROM ({}) AS unified \
             ORDER BY timestamp DESC LIMIT ? OFFSET ?",
            self.union_sql
        )
    }

    /// Filter parameters followed by the bound LIMIT and OFFSET.
    #[must_use]
    pub fn page_params(&self, page: PageRequest) -> Vec<Value> {
        let offset = i64::try_from(page.offset()).unwrap_or(i64::MAX);
        self.params
            .iter()
            .cloned()
            .map(Value::Text)
            .chain([
                Value::Integer(i64::from(page.per_page())),
                Value::Integer(offset),
            ])
            .collect()
    }
}

fn source_select(spec: &SourceTableSpec, where_sql: &str) -> String {
    let fields = &spec.fields;
    let mut select = format!(
        "SELECT '{label}' AS source, {ts} AS timestamp, {addr} AS address, {detail} AS detail FROM {table}",
        label = spec.source.label(),
        ts = fields.timestamp,
        addr = fields.address,
        detail = fields.detail,
        table = spec.table,
    );
    if !where_sql.is_empty() {
        select.push(' ');
        select.push_str(where_sql);
    }
    select
}

/// Runs unified fetches against a [`ConnectionProvider`].
pub struct EventUnifier<'a> {
    provider: &'a ConnectionProvider,
}

impl<'a> EventUnifier<'a> {
    pub fn new(provider: &'a ConnectionProvider) -> Self {
        Self { provider }
    }

    /// Fetch one page. Any pool or storage failure is logged with the
    /// statement that failed and yields an empty page with total 0.
    pub fn fetch(&self, filter: &FilterSet, page: PageRequest) -> EventPage {
        let Some(query) = UnifiedQuery::plan(filter) else {
            tracing::debug!(service = %filter.service(), "service selects no source table");
            return EventPage::empty();
        };
        match self.run(&query, page) {
            Ok(result) => result,
            Err(failure) => {
                tracing::error!(
                    code = failure.error.code(),
                    statement = failure.statement.as_deref().unwrap_or("(no connection)"),
                    params = ?query.params(),
                    page = page.page(),
                    per_page = page.per_page(),
                    "event query failed: {}",
                    failure.error
                );
                EventPage::empty()
            }
        }
    }

    /// Fetch one page, reporting failures to the caller.
    pub fn try_fetch(&self, filter: &FilterSet, page: PageRequest) -> Result<EventPage> {
        match UnifiedQuery::plan(filter) {
            Some(query) => self.run(&query, page).map_err(|failure| failure.error),
            None => Ok(EventPage::empty()),
        }
    }

    fn run(
        &self,
        query: &UnifiedQuery,
        page: PageRequest,
    ) -> std::result::Result<EventPage, StatementFailure> {
        let conn = self
            .provider
            .try_acquire()
            .map_err(|error| StatementFailure {
                statement: None,
                error,
            })?;

        let count_sql = query.count_sql();
        tracing::debug!(statement = %count_sql, params = ?query.params(), "counting events");
        let total = count_events(&conn, &count_sql, query.params())
            .map_err(|error| StatementFailure::at(&count_sql, error))?;

        let page_sql = query.page_sql();
        let page_params = query.page_params(page);
        tracing::debug!(statement = %page_sql, params = ?page_params, "fetching event page");
        let events = read_page(&conn, &page_sql, &page_params)
            .map_err(|error| StatementFailure::at(&page_sql, error))?;

        tracing::debug!(rows = events.len(), total, "event page fetched");
        Ok(EventPage { events, total })
    }
}

/// A failed fetch and the statement that was executing, if one had started.
#[derive(Debug)]
struct StatementFailure {
    statement: Option<String>,
    error: LogscopeError,
}

impl StatementFailure {
    fn at(statement: &str, error: LogscopeError) -> Self {
        Self {
            statement: Some(statement.to_string()),
            error,
        }
    }
}

fn count_events(conn: &Connection, sql: &str, params: &[String]) -> Result<u64> {
    let total: i64 = conn.query_row(sql, params_from_iter(params), |row| row.get(0))?;
    Ok(u64::try_from(total).unwrap_or(0))
}

fn read_page(conn: &Connection, sql: &str, params: &[Value]) -> Result<Vec<LogEvent>> {
    let mut stmt = conn.prepare(sql)?;
    let events = stmt
        .query_map(params_from_iter(params), |row| {
            let label: String = row.get(0)?;
            let source = label.parse::<EventSource>().map_err(|err| {
                rusqlite::Error::FromSqlConversionFailure(
                    0,
                    rusqlite::types::Type::Text,
                    Box::new(err),
                )
            })?;
            Ok(LogEvent {
                source,
                timestamp: row.get(1)?,
                address: row.get::<_, Option<String>>(2)?.unwrap_or_default(),
                detail: row.get::<_, Option<String>>(3)?.unwrap_or_default(),
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(events)
}
