//! callgate CLI Binary
//!
//! Command-line front end for evaluating admission constraints.

use anyhow::Context;
use callgate::cli::{Cli, RunContext};
use callgate::config::ConfigLoader;
use callgate::logging::{init_logging, LoggingConfig};
use clap::Parser;
use std::process;
use tracing::{error, info};

fn main() {
    let cli = Cli::parse();

    let logging_config = build_logging_config(&cli);
    if let Err(e) = init_logging(Some(&logging_config)) {
        eprintln!("Failed to initialize logging: {}", e);
        process::exit(1);
    }

    match run(&cli) {
        Ok(code) => process::exit(code),
        Err(e) => {
            error!("Command failed: {:#}", e);
            eprintln!("error: {:#}", e);
            process::exit(1);
        }
    }
}

fn run(cli: &Cli) -> anyhow::Result<i32> {
    info!("callgate starting");
    let context = RunContext::new(cli.config.clone()).context("loading configuration")?;
    let output = context
        .execute(&cli.command)
        .map_err(|e| anyhow::anyhow!(callgate::cli::map_error(&e)))?;
    println!("{}", output.text);
    info!(exit_code = output.exit_code, "Command completed");
    Ok(output.exit_code)
}

/// Build logging configuration from CLI args and config file.
/// Precedence: CLI flags override config file override defaults.
fn build_logging_config(cli: &Cli) -> LoggingConfig {
    let mut config = ConfigLoader::load(cli.config.as_deref())
        .map(|c| c.logging)
        .unwrap_or_default();

    if cli.quiet {
        config.level = "off".to_string();
    }
    if cli.verbose {
        config.level = "debug".to_string();
    }
    if let Some(ref level) = cli.log_level {
        config.level = level.clone();
    }
    config
}
