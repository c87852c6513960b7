//! Coverfetch CLI - Command-line interface
//!
//! This binary provides a command-line interface to the coverfetch library.

mod commands;
mod error;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

use commands::config::ConfigCommands;
use commands::run::RunArgs;
use error::CliError;

/// Fetch, resize and store catalog cover images.
#[derive(Debug, Parser)]
#[command(name = "coverfetch", version, about, long_about = None)]
struct Cli {
    /// Config file (default: ~/.coverfetch/config.ini)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log at debug level unless RUST_LOG is set
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Also write logs to this file
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Process every record in the catalog
    Run(RunArgs),

    /// Write a config file populated with the default settings
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Inspect configuration
    #[command(subcommand)]
    Config(ConfigCommands),
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Run(args) => commands::run::run(args, cli.config, cli.verbose, cli.log_file),
        Commands::Init { force } => commands::init::run(cli.config, force).map(|()| ExitCode::SUCCESS),
        Commands::Config(command) => {
            commands::config::run(command, cli.config).map(|()| ExitCode::SUCCESS)
        }
    };

    match result {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::from(e.exit_code())
        }
    }
}
