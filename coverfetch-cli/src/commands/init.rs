//! Init command - write a config file with the default settings.

use std::path::PathBuf;

use coverfetch::config::{ConfigFile, PipelineConfig};

use super::common::config_path;
use crate::error::CliError;

/// Run the init command.
pub fn run(explicit: Option<PathBuf>, force: bool) -> Result<(), CliError> {
    let path = config_path(explicit.as_deref())?;

    if path.exists() && !force {
        return Err(CliError::Config(format!(
            "{} already exists. Use --force to overwrite it.",
            path.display()
        )));
    }

    ConfigFile::write(&PipelineConfig::default(), &path)?;

    println!("Configuration file: {}", path.display());
    println!();
    println!("Edit this file to customize coverfetch settings.");
    println!("CLI arguments override config file values when specified.");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_writes_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.ini");

        run(Some(path.clone()), false).unwrap();

        let loaded = ConfigFile::load(&path)
            .unwrap()
            .apply(PipelineConfig::default());
        assert_eq!(loaded, PipelineConfig::default());
    }

    #[test]
    fn test_init_refuses_to_overwrite_without_force() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.ini");
        std::fs::write(&path, "[pipeline]\nconcurrency = 2\n").unwrap();

        assert!(matches!(run(Some(path.clone()), false), Err(CliError::Config(_))));
        run(Some(path.clone()), true).unwrap();

        let loaded = ConfigFile::load(&path).unwrap();
        assert_eq!(loaded.concurrency, Some(10));
    }
}
