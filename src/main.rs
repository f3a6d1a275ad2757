mod catalog;
mod cli;
mod commands;
mod engine;
mod paths;
mod scanner;
mod selection;
mod settings;
mod state;
mod ui;

use anyhow::Result;
use clap::{CommandFactory, Parser};
use clap_complete::generate;
use cli::{Cli, Command, InstalledCommand};
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

    match cli.command {
        Command::Refresh => commands::catalog::refresh(&ctx),
        Command::List { category } => commands::catalog::list(&ctx, category.as_deref()),
        Command::Apply(args) => commands::apply::run(&ctx, args),
        Command::Installed(cmd) => match cmd {
            InstalledCommand::List => commands::installed::list(&ctx),
            InstalledCommand::Reset { yes } => commands::installed::reset(&ctx, yes),
        },
        Command::Completions { shell } => {
            let mut cmd = Cli::command();
            generate(shell, &mut cmd, "regente", &mut io::stdout());
            Ok(())
        }
    }
}
