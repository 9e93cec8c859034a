mod bridge;
mod cli;
mod commands;
mod config;
mod credentials;
mod progress;
mod ui;

use anyhow::Result;
use clap::{CommandFactory, Parser};
use clap_complete::generate;
use cli::{Cli, Command};
use commands::service::AttributeTarget;
use delivery::{ServiceOperation, ServiceStatus};
use std::io;

/// Global context for the application
pub struct Context {
    pub verbose: u8,
    pub quiet: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    let log_level = match cli.verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };

    env_logger::Builder::new()
        .filter_level(if cli.quiet {
            log::LevelFilter::Error
        } else {
            log_level
        })
        .format_timestamp(None)
        .init();

    let ctx = Context {
        verbose: cli.verbose,
        quiet: cli.quiet,
    };
    log::trace!("verbosity {}", ctx.verbose);

    match cli.command {
        Command::Deliver(args) => commands::deliver::run(&ctx, args),
        Command::Start(args) => {
            commands::service::operation(args, ServiceOperation::Status(ServiceStatus::Start))
        }
        Command::Stop(args) => {
            commands::service::operation(args, ServiceOperation::Status(ServiceStatus::Stop))
        }
        Command::Kill(args) => {
            commands::service::operation(args, ServiceOperation::Status(ServiceStatus::Kill))
        }
        Command::Remove(args) => commands::service::operation(args, ServiceOperation::Remove),
        Command::Deploy(args) => commands::service::deploy(args),
        Command::Pack(args) => commands::pack::run(args),
        Command::Settings(args) => {
            commands::service::attributes(args, AttributeTarget::Settings)
        }
        Command::Preferences(args) => {
            commands::service::attributes(args, AttributeTarget::Preferences)
        }
        Command::Completions { shell } => {
            generate(shell, &mut Cli::command(), "bridgectl", &mut io::stdout());
            Ok(())
        }
    }
}
