//! rmqcat - command-line entrypoint.
//!
//! Usage:
//!   rmqcat consume --queue jobs --prefetch 50 --format json
//!   rmqcat publish --routing-key jobs --message hello
//!   rmqcat publish --delimiter '\t' < lines.tsv
//!   rmqcat purge --queue jobs

use clap::Parser;
use rmqcat::cli::commands::{run_consume, run_publish, run_purge};
use rmqcat::cli::{Cli, Commands};
use rmqcat::config::ConfigError;
use rmqcat::messaging::ConsumeError;
use rmqcat::ops::init_tracing;
use rmqcat::runtime::{self, SHUTDOWN_GRACE};
use std::process::ExitCode;

fn main() -> ExitCode {
    let cli = Cli::parse();

    let cfg = match cli.global.load_config() {
        Ok(cfg) => cfg,
        Err(err) => {
            eprintln!("error: {err}");
            return ExitCode::from(2);
        }
    };
    if let Err(err) = init_tracing(&cfg.logging) {
        eprintln!("error: {err:#}");
        return ExitCode::from(2);
    }

    let command = async move {
        match cli.command {
            Commands::Consume(args) => run_consume(cfg, args).await,
            Commands::Publish(args) => run_publish(cfg, args).await,
            Commands::Purge(args) => run_purge(cfg, args).await,
        }
    };
    let result = match runtime::block_on(command, SHUTDOWN_GRACE) {
        Ok(result) => result,
        Err(err) => {
            eprintln!("error: failed to start runtime: {err}");
            return ExitCode::from(1);
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err:#}");
            exit_code(&err)
        }
    }
}

fn exit_code(err: &anyhow::Error) -> ExitCode {
    if err.downcast_ref::<ConfigError>().is_some() {
        return ExitCode::from(2);
    }
    match err.downcast_ref::<ConsumeError>() {
        Some(ConsumeError::DrainTimeout(_)) => ExitCode::from(3),
        Some(ConsumeError::Config(_)) => ExitCode::from(2),
        _ => ExitCode::from(1),
    }
}
