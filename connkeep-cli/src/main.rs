//! `ConnKeep` CLI - Command-line interface for connection secrets
//!
//! Stores, reads and deletes the secrets of connection profiles through the
//! same owner thread and dispatcher the desktop application uses.

mod cli;
mod commands;
mod error;
mod prompt;
mod util;

use clap::Parser;
use cli::Cli;
use connkeep_core::{TracingConfig, TracingLevel, init_tracing};

fn main() {
    let cli = Cli::parse();

    let settings = match util::load_settings(cli.config.as_deref()) {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(e.exit_code());
        }
    };

    let level = if cli.quiet {
        TracingLevel::Error
    } else if cli.verbose > 0 {
        TracingLevel::from_verbosity(cli.verbose)
    } else {
        settings.log_level
    };
    if let Err(e) = init_tracing(&TracingConfig::new().with_level(level)) {
        eprintln!("Warning: logging disabled: {e}");
    }

    let options = util::SessionOptions {
        config_dir: cli.config.clone(),
        memory: cli.memory,
        settings,
    };
    let result = commands::dispatch(&options, cli.command);

    if let Err(e) = result {
        if !cli.quiet && !e.is_silent() {
            eprintln!("Error: {e}");
        }
        std::process::exit(e.exit_code());
    }
}
