//! # elec - Electrical Code-Compliance CLI
//!
//! Command-line front end for `elec_core`.
//!
//! ```text
//! elec box --volume 18 --wire 2x14 --ground 1x14 --device 1x14
//! elec conduit --type emt --size 1/2 --wire 4x12:thhn
//! elec dwelling --sqft 1500 --appliance Dishwasher:1200 --motor Disposal:1000
//! elec calc item.json
//! elec job new|show|add|recalc <file>
//! elec tables
//! elec config show|path|init
//! ```
//!
//! Exit status: 0 on success, 1 on any error, 2 when `--strict` is set and
//! a result is out of limits.

mod cli;
mod commands;
mod config;
mod output;
mod shorthand;

use clap::Parser;
use elec_core::CalcError;
use tracing_subscriber::EnvFilter;

use cli::{Cli, OutputFormat};

fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let json = cli.format == Some(OutputFormat::Json);
    let strict = cli.strict;

    match commands::execute(cli) {
        Ok(within_limits) => {
            if strict && !within_limits {
                eprintln!("Result out of limits");
                std::process::exit(2);
            }
        }
        Err(e) => {
            eprintln!("Error: {:#}", e);
            if json {
                if let Some(calc) = e.downcast_ref::<CalcError>() {
                    if let Ok(body) = serde_json::to_string_pretty(calc) {
                        eprintln!("{}", body);
                    }
                }
            }
            std::process::exit(1);
        }
    }
}
