use std::env;
use std::process;

use clap::Parser;

use celonis_mcp::cli::Args;
use celonis_mcp::config::defaults::ENV_VERBOSE;
use celonis_mcp::config::parse_flag;
use celonis_mcp::logging::init_logging;
use celonis_mcp::orchestrator;
use celonis_mcp::ui::output::{print_error, print_result};
use celonis_mcp::ui::OutputStyle;

#[tokio::main]
async fn main() {
    let args = Args::parse();

    // CELONIS_VERBOSE from `.env` or the settings file is picked up later by
    // the config; logging only sees the flag and the process environment.
    let verbose = args.verbose || env::var(ENV_VERBOSE).map(|v| parse_flag(&v)).unwrap_or(false);
    init_logging(verbose);

    match orchestrator::run(&args).await {
        Ok(result) => print_result(&result, OutputStyle::from_compact_flag(args.compact)),
        Err(e) => {
            print_error(&e);
            process::exit(e.exit_code());
        }
    }
}
