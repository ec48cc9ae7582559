#![forbid(unsafe_code)]

//! logscope CLI entry point.

use clap::Parser;
use tracing_subscriber::EnvFilter;

mod cli_app;

fn main() {
    let args = cli_app::Cli::parse();
    init_tracing(&args);
    if let Err(e) = cli_app::run(&args) {
        eprintln!("logscope: {e}");
        std::process::exit(e.exit_code());
    }
}

fn init_tracing(args: &cli_app::Cli) {
    let level = if args.quiet {
        "error"
    } else if args.verbose {
        "debug"
    } else {
        "warn"
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("logscope={level}")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}
