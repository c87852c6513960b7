//! Configuration inspection CLI commands.

use std::path::PathBuf;

use clap::Subcommand;

use super::common::{base_config, config_path};
use crate::error::CliError;

/// Config subcommands.
#[derive(Debug, Subcommand)]
pub enum ConfigCommands {
    /// Show the effective settings (defaults overlaid with the config file)
    Show,

    /// Show the configuration file path
    Path,
}

/// Run a config subcommand.
pub fn run(command: ConfigCommands, explicit: Option<PathBuf>) -> Result<(), CliError> {
    match command {
        ConfigCommands::Show => run_show(explicit),
        ConfigCommands::Path => run_path(explicit),
    }
}

fn run_show(explicit: Option<PathBuf>) -> Result<(), CliError> {
    let config = base_config(explicit.as_deref())?;
    let timeout = match config.download_timeout {
        Some(t) => format!("{}s", t.as_secs()),
        None => "none".to_string(),
    };

    println!("catalog.uri              = {}", config.catalog_uri);
    println!("catalog.database         = {}", config.collection.database);
    println!("catalog.collection       = {}", config.collection.collection);
    println!("catalog.identifier_field = {}", config.projection.identifier_field);
    println!("catalog.locator_field    = {}", config.projection.locator_field);
    println!("pipeline.concurrency     = {}", config.concurrency);
    println!("pipeline.output_dir      = {}", config.output_dir.display());
    println!("image.width              = {}", config.target_width);
    println!("image.height             = {}", config.target_height);
    println!("image.quality            = {}", config.jpeg_quality);
    println!("download.timeout         = {}", timeout);
    Ok(())
}

fn run_path(explicit: Option<PathBuf>) -> Result<(), CliError> {
    let path = config_path(explicit.as_deref())?;
    let state = if path.is_file() { "" } else { " (not created)" };
    println!("{}{}", path.display(), state);
    Ok(())
}
