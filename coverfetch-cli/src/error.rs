//! CLI error type.

use std::fmt;

use coverfetch::config::ConfigError;
use coverfetch::fetch::FetchError;
use coverfetch::logging::LoggingError;
use coverfetch::pipeline::PipelineError;

/// Errors surfaced by CLI commands.
#[derive(Debug)]
pub enum CliError {
    /// Bad or missing configuration.
    Config(String),

    /// Logging could not be initialised.
    Logging(LoggingError),

    /// The HTTP client could not be created.
    Http(FetchError),

    /// Process setup (runtime, signal handler) failed.
    Runtime(String),

    /// The run itself failed.
    Pipeline(PipelineError),
}

impl CliError {
    /// Process exit code for this error.
    pub fn exit_code(&self) -> u8 {
        match self {
            CliError::Config(_) => 2,
            _ => 1,
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::Config(msg) => write!(f, "Configuration error: {}", msg),
            CliError::Logging(e) => write!(f, "Failed to initialise logging: {}", e),
            CliError::Http(e) => write!(f, "{}", e),
            CliError::Runtime(msg) => write!(f, "Runtime error: {}", msg),
            CliError::Pipeline(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CliError::Logging(e) => Some(e),
            CliError::Http(e) => Some(e),
            CliError::Pipeline(e) => Some(e),
            CliError::Config(_) | CliError::Runtime(_) => None,
        }
    }
}

impl From<ConfigError> for CliError {
    fn from(e: ConfigError) -> Self {
        CliError::Config(e.to_string())
    }
}

impl From<PipelineError> for CliError {
    fn from(e: PipelineError) -> Self {
        match e {
            PipelineError::Config(e) => CliError::Config(e.to_string()),
            other => CliError::Pipeline(other),
        }
    }
}
