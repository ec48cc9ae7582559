//! Top-level CLI definition and dispatch.

use std::fs;
use std::io::{self, IsTerminal, Write};
use std::path::PathBuf;

use clap::{Args, CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{Shell as CompletionShell, generate};
use colored::{Colorize, control};
use serde_json::{Value, json};
use thiserror::Error;

use logscope::core::config::Config;
use logscope::export::{self, ExportFormat};
use logscope::query::filter::{FilterSet, PageRequest};
use logscope::report::ChartSeries;
use logscope::store::LogStore;
use logscope::store::events::EventPage;
use logscope::store::pool::PoolStatus;

/// Command-line interface to the log database.
#[derive(Debug, Parser)]
#[command(
    name = "logscope",
    author,
    version,
    about = "Browse, export and report on Apache and FTP logs",
    long_about = None,
    arg_required_else_help = true
)]
pub struct Cli {
    /// Override config file path.
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,
    /// Force JSON output mode.
    #[arg(long, global = true)]
    json: bool,
    /// Disable colored output.
    #[arg(long, global = true)]
    no_color: bool,
    /// Increase verbosity.
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    pub verbose: bool,
    /// Quiet mode (errors only).
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,
    /// Subcommand to execute.
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone, Subcommand)]
enum Command {
    /// Show one page of unified log events.
    Events(EventsArgs),
    /// Export every event matching the filters.
    Export(ExportArgs),
    /// Show daily access statistics.
    Report,
    /// Inspect configuration.
    Config(ConfigArgs),
    /// Generate shell completions.
    Completions(CompletionsArgs),
}

/// Filter fields shared by `events` and `export`.
#[derive(Debug, Clone, Args, Default)]
struct FilterArgs {
    /// Service: Apache, FTP or Todos (all).
    #[arg(long, value_name = "SERVICE")]
    service: Option<String>,
    /// Address substring.
    #[arg(long, value_name = "TEXT")]
    ip: Option<String>,
    /// Range start: YYYY-MM-DD or YYYY-MM-DDTHH:MM.
    #[arg(long, value_name = "DATE")]
    from: Option<String>,
    /// Range end (inclusive): YYYY-MM-DD or YYYY-MM-DDTHH:MM.
    #[arg(long, value_name = "DATE")]
    to: Option<String>,
    /// Substring of the request path, error message or transfer details.
    #[arg(long, value_name = "TEXT")]
    keyword: Option<String>,
}

impl FilterArgs {
    fn to_filter(&self) -> FilterSet {
        FilterSet::from_raw(
            self.service.as_deref(),
            self.ip.as_deref(),
            self.from.as_deref(),
            self.to.as_deref(),
            self.keyword.as_deref(),
        )
    }
}

#[derive(Debug, Clone, Args)]
struct EventsArgs {
    #[command(flatten)]
    filter: FilterArgs,
    /// Page number, starting at 1.
    #[arg(long, default_value_t = 1, value_name = "N")]
    page: u32,
    /// Rows per page (defaults to query.default_per_page).
    #[arg(long, value_name = "N")]
    per_page: Option<u32>,
}

#[derive(Debug, Clone, Copy, ValueEnum, Default)]
enum FormatArg {
    #[default]
    Csv,
    Json,
}

impl From<FormatArg> for ExportFormat {
    fn from(value: FormatArg) -> Self {
        match value {
            FormatArg::Csv => Self::Csv,
            FormatArg::Json => Self::Json,
        }
    }
}

#[derive(Debug, Clone, Args)]
struct ExportArgs {
    #[command(flatten)]
    filter: FilterArgs,
    /// Output format.
    #[arg(long, value_enum, default_value_t = FormatArg::Csv)]
    format: FormatArg,
    /// Write to this file instead of stdout. A directory receives the default file name.
    #[arg(long, short, value_name = "PATH")]
    output: Option<PathBuf>,
}

#[derive(Debug, Clone, Args)]
struct ConfigArgs {
    #[command(subcommand)]
    command: Option<ConfigCommand>,
}

#[derive(Debug, Clone, Subcommand)]
enum ConfigCommand {
    /// Print the config file path.
    Path,
    /// Print the effective configuration.
    Show,
    /// Validate the configuration and probe the database.
    Validate,
}

#[derive(Debug, Clone, Args)]
struct CompletionsArgs {
    /// Shell to generate completion script for.
    #[arg(value_enum)]
    shell: CompletionShell,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OutputMode {
    Human,
    Json,
}

/// CLI error type with explicit exit-code mapping.
#[derive(Debug, Error)]
pub enum CliError {
    /// Invalid user input at runtime.
    #[error("{0}")]
    User(String),
    /// Environment/runtime failure.
    #[error("{0}")]
    Runtime(String),
    /// JSON serialization failed.
    #[error("failed to serialize output: {0}")]
    Json(#[from] serde_json::Error),
    /// Output write failed.
    #[error("failed to write output: {0}")]
    Io(#[from] io::Error),
}

impl CliError {
    /// Process exit code contract for the CLI.
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::User(_) => 1,
            Self::Runtime(_) | Self::Io(_) => 2,
            Self::Json(_) => 3,
        }
    }
}

/// Dispatch CLI commands.
pub fn run(cli: &Cli) -> Result<(), CliError> {
    if cli.no_color {
        control::set_override(false);
    }

    match &cli.command {
        Command::Events(args) => run_events(cli, args),
        Command::Export(args) => run_export(cli, args),
        Command::Report => run_report(cli),
        Command::Config(args) => run_config(cli, args),
        Command::Completions(args) => {
            let mut command = Cli::command();
            let binary_name = command.get_name().to_string();
            generate(args.shell, &mut command, binary_name, &mut io::stdout());
            Ok(())
        }
    }
}

fn load_config(cli: &Cli) -> Result<Config, CliError> {
    Config::load(cli.config.as_deref()).map_err(|e| CliError::Runtime(e.to_string()))
}

fn run_events(cli: &Cli, args: &EventsArgs) -> Result<(), CliError> {
    if args.page == 0 {
        return Err(CliError::User("--page starts at 1".to_string()));
    }
    let config = load_config(cli)?;
    let store = LogStore::open(&config);
    let filter = args.filter.to_filter();
    let page = PageRequest::new(args.page, config.effective_per_page(args.per_page));

    let result = store.fetch_events(&filter, page);

    match output_mode(cli) {
        OutputMode::Json => {
            let payload = json!({
                "command": "events",
                "filters": filter,
                "events": result.events,
                "pagination": pagination_json(&result, page),
            });
            write_json_line(&payload)?;
        }
        OutputMode::Human => print_events_human(&filter, &result, page),
    }
    Ok(())
}

fn pagination_json(result: &EventPage, page: PageRequest) -> Value {
    json!({
        "page": page.page(),
        "per_page": page.per_page(),
        "total": result.total,
        "total_pages": result.total_pages(page.per_page()),
    })
}

fn print_events_human(filter: &FilterSet, result: &EventPage, page: PageRequest) {
    if !filter.is_empty() {
        println!("{} {}", "Filters:".bold(), describe_filter(filter));
    }
    if result.events.is_empty() {
        println!("No events found.");
    } else {
        println!(
            "{:<16}  {:<19}  {:<15}  {}",
            "Source".bold(),
            "Timestamp".bold(),
            "Address".bold(),
            "Detail".bold()
        );
        for event in &result.events {
            println!(
                "{:<16}  {:<19}  {:<15}  {}",
                event.source.label(),
                event.timestamp.format("%Y-%m-%d %H:%M:%S"),
                event.address,
                event.detail
            );
        }
    }
    println!();
    println!(
        "Page {} of {} ({} events)",
        page.page(),
        result.total_pages(page.per_page()),
        result.total
    );
}

fn describe_filter(filter: &FilterSet) -> String {
    let mut parts = vec![format!("service={}", filter.service())];
    let optional = [
        ("ip", filter.address()),
        ("from", filter.date_start()),
        ("to", filter.date_end()),
        ("keyword", filter.keyword()),
    ];
    for (name, value) in optional {
        if let Some(value) = value {
            parts.push(format!("{name}={value:?}"));
        }
    }
    parts.join(" ")
}

fn run_export(cli: &Cli, args: &ExportArgs) -> Result<(), CliError> {
    let config = load_config(cli)?;
    let store = LogStore::open(&config);
    let filter = args.filter.to_filter();
    let format = ExportFormat::from(args.format);

    let events = store.fetch_export(&filter);
    let rendered =
        export::render(&events, format).map_err(|e| CliError::Runtime(e.to_string()))?;

    match &args.output {
        None => {
            let mut stdout = io::stdout().lock();
            stdout.write_all(rendered.as_bytes())?;
            if format == ExportFormat::Json {
                writeln!(stdout)?;
            }
        }
        Some(path) => {
            let target = if path.is_dir() {
                path.join(format.file_name())
            } else {
                path.clone()
            };
            fs::write(&target, rendered.as_bytes()).map_err(|e| {
                CliError::Runtime(format!("write export to {}: {e}", target.display()))
            })?;
            match output_mode(cli) {
                OutputMode::Human => {
                    eprintln!("Exported {} events to {}", events.len(), target.display());
                }
                OutputMode::Json => write_json_line(&json!({
                    "command": "export",
                    "format": format.to_string(),
                    "rows": events.len(),
                    "path": target.to_string_lossy(),
                }))?,
            }
        }
    }
    Ok(())
}

fn run_report(cli: &Cli) -> Result<(), CliError> {
    let config = load_config(cli)?;
    let store = LogStore::open(&config);
    let stats = store.fetch_daily_stats();

    match output_mode(cli) {
        OutputMode::Json => {
            let payload = json!({
                "command": "report",
                "days": stats,
                "chart": ChartSeries::from_stats(&stats),
            });
            write_json_line(&payload)?;
        }
        OutputMode::Human => {
            if stats.is_empty() {
                println!("No access statistics available.");
                return Ok(());
            }
            println!(
                "{:<10}  {:>8}  {:>10}  {:>7}",
                "Date".bold(),
                "Requests".bold(),
                "Unique IPs".bold(),
                "Errors".bold()
            );
            for day in &stats {
                let errors = if day.error_count > 0 {
                    day.error_count.to_string().red().to_string()
                } else {
                    day.error_count.to_string()
                };
                println!(
                    "{:<10}  {:>8}  {:>10}  {:>7}",
                    day.date.format("%Y-%m-%d"),
                    day.total_events,
                    day.unique_addresses,
                    errors
                );
            }
        }
    }
    Ok(())
}

fn run_config(cli: &Cli, args: &ConfigArgs) -> Result<(), CliError> {
    match &args.command {
        None | Some(ConfigCommand::Path) => {
            let path = cli.config.clone().unwrap_or_else(Config::default_path);
            let exists = path.exists();

            match output_mode(cli) {
                OutputMode::Human => {
                    println!("{}", path.display());
                    if !exists {
                        println!("  (file does not exist; defaults will be used)");
                    }
                }
                OutputMode::Json => {
                    let payload = json!({
                        "command": "config path",
                        "path": path.to_string_lossy(),
                        "exists": exists,
                    });
                    write_json_line(&payload)?;
                }
            }
            Ok(())
        }
        Some(ConfigCommand::Show) => {
            let config = load_config(cli)?;
            match output_mode(cli) {
                OutputMode::Human => {
                    let rendered = toml::to_string_pretty(&config)
                        .map_err(|e| CliError::Runtime(format!("render config: {e}")))?;
                    print!("{rendered}");
                }
                OutputMode::Json => {
                    let hash = config
                        .stable_hash()
                        .map_err(|e| CliError::Runtime(e.to_string()))?;
                    write_json_line(&json!({
                        "command": "config show",
                        "config": config,
                        "hash": hash,
                    }))?;
                }
            }
            Ok(())
        }
        Some(ConfigCommand::Validate) => {
            let config = load_config(cli)?;
            let store = LogStore::open(&config);
            let status = store.provider().status().clone();
            let pool_ok = status == PoolStatus::Ready;
            let pool_error = match &status {
                PoolStatus::Ready => None,
                PoolStatus::Failed(reason) => Some(reason.clone()),
            };

            match output_mode(cli) {
                OutputMode::Human => {
                    println!("{} configuration is valid", "ok".green());
                    match &status {
                        PoolStatus::Ready => println!(
                            "{} database {} ({} pooled connections)",
                            "ok".green(),
                            config.database.path.display(),
                            store.provider().state().size
                        ),
                        PoolStatus::Failed(reason) => {
                            println!("{} database: {reason}", "warn".yellow());
                        }
                    }
                }
                OutputMode::Json => write_json_line(&json!({
                    "command": "config validate",
                    "valid": true,
                    "database": config.database.path.to_string_lossy(),
                    "pool_ready": pool_ok,
                    "pool_error": pool_error,
                }))?,
            }
            if pool_ok {
                Ok(())
            } else {
                Err(CliError::Runtime(format!(
                    "database {} is not reachable",
                    config.database.path.display()
                )))
            }
        }
    }
}

fn write_json_line(payload: &Value) -> Result<(), CliError> {
    let mut stdout = io::stdout().lock();
    serde_json::to_writer(&mut stdout, payload)?;
    writeln!(stdout)?;
    Ok(())
}

fn output_mode(cli: &Cli) -> OutputMode {
    let env_mode = std::env::var("LOGSCOPE_OUTPUT_FORMAT").ok();
    resolve_output_mode(cli.json, env_mode.as_deref(), io::stdout().is_terminal())
}

fn resolve_output_mode(json_flag: bool, env_mode: Option<&str>, stdout_is_tty: bool) -> OutputMode {
    if json_flag {
        return OutputMode::Json;
    }

    let fallback = if stdout_is_tty {
        OutputMode::Human
    } else {
        OutputMode::Json
    };

    match env_mode
        .map(str::trim)
        .map(str::to_ascii_lowercase)
        .as_deref()
    {
        Some("json") => OutputMode::Json,
        Some("human") => OutputMode::Human,
        _ => fallback,
    }
}
