//! Common helpers shared across CLI commands.

use std::path::{Path, PathBuf};

use coverfetch::config::{default_config_path, ConfigFile, PipelineConfig};

use crate::error::CliError;

/// Resolves the config file path: the explicit one, else the default.
pub fn config_path(explicit: Option<&Path>) -> Result<PathBuf, CliError> {
    match explicit {
        Some(path) => Ok(path.to_path_buf()),
        None => default_config_path().ok_or_else(|| {
            CliError::Config(
                "Could not determine home directory. Use --config to name a config file."
                    .to_string(),
            )
        }),
    }
}

/// Loads the config file.
///
/// An explicitly named file must exist. The default file is optional; when
/// it is absent an empty `ConfigFile` is returned.
pub fn load_config_file(explicit: Option<&Path>) -> Result<ConfigFile, CliError> {
    if let Some(path) = explicit {
        return Ok(ConfigFile::load(path)?);
    }

    match default_config_path() {
        Some(path) if path.is_file() => Ok(ConfigFile::load(&path)?),
        _ => Ok(ConfigFile::default()),
    }
}

/// Defaults overlaid with the config file.
pub fn base_config(explicit: Option<&Path>) -> Result<PipelineConfig, CliError> {
    Ok(load_config_file(explicit)?.apply(PipelineConfig::default()))
}
