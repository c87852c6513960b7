//! Configuration for a pipeline run.
//!
//! [`PipelineConfig`] holds every tunable with named defaults. A
//! [`ConfigFile`] (INI) can override any of them, and the CLI applies its
//! flags last:
//!
//! ```text
//! defaults ──► config.ini ──► command-line flags
//! ```

mod error;
mod file;
mod settings;

pub use error::ConfigError;
pub use file::{default_config_path, ConfigFile, CONFIG_DIR_NAME, CONFIG_FILE_NAME};
pub use settings::{
    PipelineConfig, DEFAULT_CATALOG_URI, DEFAULT_DOWNLOAD_TIMEOUT_SECS, DEFAULT_OUTPUT_DIR,
};
