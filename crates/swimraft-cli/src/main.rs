//! # swimraft-cli
//!
//! The main entry point for the swimraft binary. It parses command-line
//! arguments and dispatches to the appropriate subcommand handler.

#![forbid(unsafe_code)]

use crate::args::{Cli, Command};
use anyhow::Result;
use clap::Parser;

mod args;
mod commands;
mod logging;
mod wiring;

fn main() -> Result<()> {
    let args = Cli::parse();

    // Tracing initialization happens inside the `run` command so it has
    // access to the simulation's telemetry bus; other commands use a plain
    // logger.
    if !matches!(args.command, Command::Run(_)) {
        tracing_subscriber::fmt().with_env_filter("info").init();
    }

    match args.command {
        Command::Run(opts) => commands::run::exec(opts),
        Command::ListProtocols => commands::list_protocols::exec(),
        Command::Validate { scenario } => commands::validate::exec(scenario),
    }
}
