#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus};
use std::time::{SystemTime, UNIX_EPOCH};

use logscope::core::config::{Config, DatabaseConfig};
use rusqlite::{Connection, params};

pub struct CmdResult {
    pub status: ExitStatus,
    pub stdout: String,
    pub stderr: String,
    pub log_path: PathBuf,
}

fn now_millis() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| d.as_millis())
}

fn sanitize(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}

fn resolve_bin_path() -> PathBuf {
    if let Ok(path) = std::env::var("CARGO_BIN_EXE_logscope") {
        return PathBuf::from(path);
    }

    let exe_name = if cfg!(windows) {
        "logscope.exe"
    } else {
        "logscope"
    };
    let fallback = std::env::current_exe()
        .ok()
        .and_then(|p| p.parent().map(PathBuf::from))
        .and_then(|deps| deps.parent().map(PathBuf::from))
        .map(|debug_dir| debug_dir.join(exe_name));

    match fallback {
        Some(path) if path.exists() => path,
        _ => panic!("unable to resolve logscope binary path for integration test"),
    }
}

/// Run the binary with `args`, pointing it at `db` when given, and keep a log
/// of the invocation for failure messages.
pub fn run_cli_case(case_name: &str, args: &[&str], db: Option<&Path>) -> CmdResult {
    let root = std::env::temp_dir().join("logscope-test-logs");
    fs::create_dir_all(&root).expect("create temp test log dir");

    let log_path = root.join(format!("{}-{}.log", sanitize(case_name), now_millis()));
    let bin_path = resolve_bin_path();

    let mut command = Command::new(&bin_path);
    command
        .args(args)
        .env("RUST_BACKTRACE", "1")
        .env("LOGSCOPE_OUTPUT_FORMAT", "json")
        .env("HOME", std::env::temp_dir());
    if let Some(db) = db {
        command.env("LOGSCOPE_DB_PATH", db);
    }
    let output = command.output().expect("execute logscope command");

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();

    let mut log_content = String::new();
    log_content.push_str(&format!("case={case_name}\n"));
    log_content.push_str(&format!("bin={}\n", bin_path.display()));
    log_content.push_str(&format!("args={args:?}\n"));
    log_content.push_str(&format!("status={}\n", output.status));
    log_content.push_str("----- stdout -----\n");
    log_content.push_str(&stdout);
    log_content.push('\n');
    log_content.push_str("----- stderr -----\n");
    log_content.push_str(&stderr);
    log_content.push('\n');
    fs::write(&log_path, log_content).expect("write test log");

    CmdResult {
        status: output.status,
        stdout,
        stderr,
        log_path,
    }
}

/// Temporary log database with the three source tables.
pub struct LogFixture {
    _dir: tempfile::TempDir,
    pub path: PathBuf,
    conn: Connection,
}

impl LogFixture {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("logs.sqlite3");
        let conn = Connection::open(&path).expect("open fixture db");
        conn.execute_batch(
            "CREATE TABLE access_log (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                address TEXT NOT NULL,
                timestamp TEXT NOT NULL,
                method TEXT,
                path TEXT NOT NULL,
                status_code INTEGER NOT NULL,
                bytes INTEGER
            );
            CREATE TABLE error_log (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                client_address TEXT,
                timestamp TEXT NOT NULL,
                level TEXT,
                message TEXT NOT NULL
            );
            CREATE TABLE transfer_log (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                address TEXT NOT NULL,
                timestamp TEXT NOT NULL,
                details TEXT NOT NULL
            );",
        )
        .expect("create fixture schema");
        Self {
            _dir: dir,
            path,
            conn,
        }
    }

    pub fn access(&self, address: &str, timestamp: &str, path: &str, status_code: i64) -> &Self {
        self.conn
            .execute(
                "INSERT INTO access_log (address, timestamp, method, path, status_code, bytes)
                 VALUES (?1, ?2, 'GET', ?3, ?4, 512)",
                params![address, timestamp, path, status_code],
            )
            .expect("insert access row");
        self
    }

    pub fn error(&self, client_address: &str, timestamp: &str, message: &str) -> &Self {
        self.conn
            .execute(
                "INSERT INTO error_log (client_address, timestamp, level, message)
                 VALUES (?1, ?2, 'error', ?3)",
                params![client_address, timestamp, message],
            )
            .expect("insert error row");
        self
    }

    pub fn transfer(&self, address: &str, timestamp: &str, details: &str) -> &Self {
        self.conn
            .execute(
                "INSERT INTO transfer_log (address, timestamp, details) VALUES (?1, ?2, ?3)",
                params![address, timestamp, details],
            )
            .expect("insert transfer row");
        self
    }

    pub fn execute(&self, sql: &str) {
        self.conn.execute_batch(sql).expect("fixture statement");
    }

    /// Config pointing at this fixture with a small pool.
    pub fn config(&self) -> Config {
        Config {
            database: DatabaseConfig {
                path: self.path.clone(),
                pool_size: 2,
                acquire_timeout_ms: 200,
                busy_timeout_ms: 200,
                fallback_direct: true,
            },
            ..Config::default()
        }
    }
}

/// A representative mix of traffic across all three sources.
pub fn seeded() -> LogFixture {
    let fx = LogFixture::new();
    fx.access("10.0.0.5", "2024-01-10 08:15:00", "/index.html", 200)
        .access("10.0.0.7", "2024-01-15 12:00:00", "/admin/error.php", 500)
        .access("192.168.1.20", "2024-01-20 09:30:00", "/login", 302)
        .access("10.0.0.5", "2024-02-01 00:00:00", "/error/404.html", 404)
        .error("10.0.0.7", "2024-01-15 12:00:01", "PHP Fatal error: Uncaught Exception")
        .error("172.16.0.3", "2024-01-31 23:59:59", "File does not exist: /var/www/favicon.ico")
        .error("10.0.0.9", "2024-01-31 23:59:30", "client denied by server configuration: error page")
        .transfer("10.0.0.5", "2024-01-12 14:00:00", "STOR backup.tar.gz")
        .transfer("192.168.1.20", "2024-01-25 18:45:00", "RETR error_report.csv");
    fx
}
