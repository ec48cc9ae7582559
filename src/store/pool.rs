//! Connection provider: a fixed-size pool of read-only SQLite connections
//! opened once at startup, with an optional direct-connection fallback.
//!
//! Pool creation is attempted exactly once. Its outcome is kept in
//! [`PoolStatus`] and every acquisition picks the pooled or the direct path
//! from that status alone.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};
use rusqlite::{Connection, OpenFlags};

use crate::core::config::DatabaseConfig;
use crate::core::errors::{LogscopeError, Result};

/// Outcome of the one-time pool initialization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PoolStatus {
    /// All connections were opened.
    Ready,
    /// Pool creation failed; only the direct path (if enabled) remains.
    Failed(String),
}

/// Point-in-time pool occupancy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(missing_docs)]
pub struct PoolState {
    pub size: usize,
    pub idle: usize,
    pub leased: usize,
}

/// Hands out [`Lease`]s over pooled or direct connections.
pub struct ConnectionProvider {
    path: PathBuf,
    status: PoolStatus,
    size: usize,
    idle: Mutex<Vec<Connection>>,
    returned: Condvar,
    acquire_timeout: Duration,
    busy_timeout: Duration,
    fallback_direct: bool,
}

impl ConnectionProvider {
    /// Open the pool described by `config`. Never fails: a pool that cannot
    /// be created is recorded as [`PoolStatus::Failed`].
    pub fn initialize(config: &DatabaseConfig) -> Self {
        let busy_timeout = Duration::from_millis(config.busy_timeout_ms);
        let opened: Result<Vec<Connection>> = (0..config.pool_size)
            .map(|_| open_read_only(&config.path, busy_timeout))
            .collect();

        let (status, idle) = match opened {
            Ok(conns) => {
                tracing::info!(
                    path = %config.path.display(),
                    size = conns.len(),
                    "connection pool ready"
                );
                (PoolStatus::Ready, conns)
            }
            Err(err) => {
                tracing::warn!(
                    path = %config.path.display(),
                    code = err.code(),
                    fallback_direct = config.fallback_direct,
                    "connection pool unavailable: {err}"
                );
                (PoolStatus::Failed(err.to_string()), Vec::new())
            }
        };

        Self {
            path: config.path.clone(),
            status,
            size: idle.len(),
            idle: Mutex::new(idle),
            returned: Condvar::new(),
            acquire_timeout: Duration::from_millis(config.acquire_timeout_ms),
            busy_timeout,
            fallback_direct: config.fallback_direct,
        }
    }

    /// Outcome recorded at startup.
    pub fn status(&self) -> &PoolStatus {
        &self.status
    }

    /// Database file the provider opens.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Current occupancy. A failed pool reports size 0.
    pub fn state(&self) -> PoolState {
        let idle = self.idle.lock().len();
        PoolState {
            size: self.size,
            idle,
            leased: self.size.saturating_sub(idle),
        }
    }

    /// Acquire a connection, or `None` when the caller must treat the
    /// operation as failed. The reason is logged.
    pub fn acquire(&self) -> Option<Lease<'_>> {
        match self.try_acquire() {
            Ok(lease) => Some(lease),
            Err(err) => {
                tracing::error!(code = err.code(), "no database connection: {err}");
                None
            }
        }
    }

    /// Acquire a connection, reporting why none is available.
    pub fn try_acquire(&self) -> Result<Lease<'_>> {
        match &self.status {
            PoolStatus::Ready => self.checkout(),
            PoolStatus::Failed(reason) if self.fallback_direct => {
                tracing::warn!(%reason, "pool unavailable, opening direct connection");
                let conn = open_read_only(&self.path, self.busy_timeout)?;
                Ok(Lease {
                    conn: Some(conn),
                    origin: Origin::Direct,
                })
            }
            PoolStatus::Failed(reason) => Err(LogscopeError::PoolUnavailable {
                details: format!("{reason} (direct fallback disabled)"),
            }),
        }
    }

    fn checkout(&self) -> Result<Lease<'_>> {
        let started = Instant::now();
        let deadline = started + self.acquire_timeout;
        let mut idle = self.idle.lock();
        loop {
            if let Some(conn) = idle.pop() {
                return Ok(Lease {
                    conn: Some(conn),
                    origin: Origin::Pooled(self),
                });
            }
            if self.returned.wait_until(&mut idle, deadline).timed_out() && idle.is_empty() {
                let waited_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
                return Err(LogscopeError::PoolExhausted { waited_ms });
            }
        }
    }

    fn give_back(&self, conn: Connection) {
        self.idle.lock().push(conn);
        self.returned.notify_one();
    }
}

enum Origin<'a> {
    Pooled(&'a ConnectionProvider),
    Direct,
}

/// Scoped use of one connection.
///
/// Dropping the lease returns a pooled connection to its pool or closes a
/// direct one, exactly once, on every path out of the borrowing scope.
pub struct Lease<'a> {
    conn: Option<Connection>,
    origin: Origin<'a>,
}

impl Lease<'_> {
    /// Whether this lease came from the pool rather than the direct fallback.
    pub fn is_pooled(&self) -> bool {
        matches!(self.origin, Origin::Pooled(_))
    }
}

impl std::ops::Deref for Lease<'_> {
    type Target = Connection;

    fn deref(&self) -> &Connection {
        // Only `Drop` takes the connection out.
        self.conn.as_ref().unwrap_or_else(|| unreachable!("lease used after release"))
    }
}

impl Drop for Lease<'_> {
    fn drop(&mut self) {
        let Some(conn) = self.conn.take() else {
            return;
        };
        match self.origin {
            Origin::Pooled(provider) => provider.give_back(conn),
            Origin::Direct => {
                if let Err((_, err)) = conn.close() {
                    tracing::warn!("closing direct connection failed: {err}");
                }
            }
        }
    }
}

fn open_read_only(path: &Path, busy_timeout: Duration) -> Result<Connection> {
    let conn = Connection::open_with_flags(
        path,
        OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
    )
    .map_err(|err| LogscopeError::PoolUnavailable {
        details: format!("open {}: {err}", path.display()),
    })?;
    conn.busy_timeout(busy_timeout)?;
    Ok(conn)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_db() -> (tempfile::TempDir, DatabaseConfig) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logs.sqlite3");
        let conn = Connection::open(&path).unwrap();
        conn.execute_batch("CREATE TABLE t (x INTEGER); INSERT INTO t VALUES (1);")
            .unwrap();
        let config = DatabaseConfig {
            path,
            pool_size: 2,
            acquire_timeout_ms: 50,
            busy_timeout_ms: 100,
            fallback_direct: true,
        };
        (dir, config)
    }

    fn missing_db(fallback_direct: bool) -> DatabaseConfig {
        DatabaseConfig {
            path: PathBuf::from("/nonexistent/logscope/logs.sqlite3"),
            pool_size: 2,
            acquire_timeout_ms: 10,
            busy_timeout_ms: 10,
            fallback_direct,
        }
    }

    #[test]
    fn pool_initializes_and_leases_return() {
        let (_dir, config) = temp_db();
        let provider = ConnectionProvider::initialize(&config);
        assert_eq!(provider.status(), &PoolStatus::Ready);

        {
            let lease = provider.acquire().expect("lease");
            assert!(lease.is_pooled());
            let x: i64 = lease.query_row("SELECT x FROM t", [], |row| row.get(0)).unwrap();
            assert_eq!(x, 1);
            assert_eq!(provider.state().leased, 1);
        }
        assert_eq!(
            provider.state(),
            PoolState {
                size: 2,
                idle: 2,
                leased: 0
            }
        );
    }

    #[test]
    fn exhausted_pool_times_out() {
        let (_dir, config) = temp_db();
        let provider = ConnectionProvider::initialize(&config);
        let _a = provider.acquire().unwrap();
        let _b = provider.acquire().unwrap();

        let err = provider.try_acquire().err().expect("pool should be exhausted");
        assert_eq!(err.code(), "LGS-3002");
        assert!(provider.acquire().is_none());
    }

    #[test]
    fn waiter_receives_returned_connection() {
        let (_dir, mut config) = temp_db();
        config.pool_size = 1;
        config.acquire_timeout_ms = 2_000;
        let provider = ConnectionProvider::initialize(&config);

        std::thread::scope(|scope| {
            let held = provider.acquire().unwrap();
            let waiter = scope.spawn(|| provider.acquire().map(|lease| lease.is_pooled()));
            std::thread::sleep(Duration::from_millis(50));
            drop(held);
            assert_eq!(waiter.join().unwrap(), Some(true));
        });
        assert_eq!(provider.state().idle, 1);
    }

    #[test]
    fn lease_is_released_when_scope_unwinds() {
        let (_dir, config) = temp_db();
        let provider = ConnectionProvider::initialize(&config);
        let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _lease = provider.acquire().unwrap();
            panic!("query blew up");
        }));
        assert!(outcome.is_err());
        assert_eq!(provider.state().idle, 2);
    }

    #[test]
    fn failed_pool_without_fallback_yields_nothing() {
        let provider = ConnectionProvider::initialize(&missing_db(false));
        assert!(matches!(provider.status(), PoolStatus::Failed(_)));
        assert_eq!(provider.state().size, 0);
        let err = provider.try_acquire().err().unwrap();
        assert_eq!(err.code(), "LGS-3001");
        assert!(provider.acquire().is_none());
    }

    #[test]
    fn failed_pool_falls_back_to_direct_connection() {
        let (_dir, config) = temp_db();
        let mut broken = config.clone();
        broken.path = PathBuf::from("/nonexistent/logscope/logs.sqlite3");
        let mut provider = ConnectionProvider::initialize(&broken);
        assert!(matches!(provider.status(), PoolStatus::Failed(_)));

        // The database shows up after startup; the pool is not retried but
        // the direct path reaches it.
        provider.path = config.path.clone();
        let lease = provider.acquire().expect("direct lease");
        assert!(!lease.is_pooled());
        drop(lease);
        assert!(matches!(provider.status(), PoolStatus::Failed(_)));
        assert_eq!(provider.state().size, 0);
    }

    #[test]
    fn failed_fallback_yields_nothing() {
        let provider = ConnectionProvider::initialize(&missing_db(true));
        assert!(provider.acquire().is_none());
    }

    #[test]
    fn connections_are_read_only() {
        let (_dir, config) = temp_db();
        let provider = ConnectionProvider::initialize(&config);
        let lease = provider.acquire().unwrap();
        assert!(lease.execute("INSERT INTO t VALUES (2)", []).is_err());
    }
}
