//! Run command - process every record in the catalog.

use std::io::IsTerminal;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::Args;
use coverfetch::catalog::FieldProjection;
use coverfetch::config::PipelineConfig;
use coverfetch::fetch::ReqwestFetcher;
use coverfetch::logging::{init_logging, LoggingConfig};
use coverfetch::pipeline::Pipeline;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use super::common::base_config;
use crate::error::CliError;

/// Arguments for the run command.
#[derive(Debug, Clone, Default, Args)]
pub struct RunArgs {
    /// Catalog to read (mongodb://..., file://<path> or a JSON Lines path)
    #[arg(long)]
    pub catalog: Option<String>,

    /// MongoDB database holding the catalog
    #[arg(long)]
    pub database: Option<String>,

    /// MongoDB collection holding the catalog
    #[arg(long)]
    pub collection: Option<String>,

    /// Directory receiving <identifier>.jpg files
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,

    /// Maximum number of images processed at once
    #[arg(short, long)]
    pub concurrency: Option<usize>,

    /// Output width in pixels
    #[arg(long)]
    pub width: Option<u32>,

    /// Output height in pixels
    #[arg(long)]
    pub height: Option<u32>,

    /// JPEG quality (1-100)
    #[arg(short, long)]
    pub quality: Option<u8>,

    /// Per-download timeout in seconds (0 disables)
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Catalog field holding the identifier
    #[arg(long)]
    pub identifier_field: Option<String>,

    /// Catalog field holding the image URL
    #[arg(long)]
    pub locator_field: Option<String>,

    /// Exit non-zero if any image failed
    #[arg(long)]
    pub strict: bool,
}

impl RunArgs {
    /// Overlays the flags that were given onto `config`.
    pub fn apply(&self, mut config: PipelineConfig) -> PipelineConfig {
        if let Some(catalog) = &self.catalog {
            config.catalog_uri = catalog.clone();
        }
        if let Some(database) = &self.database {
            config.collection.database = database.clone();
        }
        if let Some(collection) = &self.collection {
            config.collection.collection = collection.clone();
        }
        if let Some(dir) = &self.output_dir {
            config.output_dir = dir.clone();
        }
        if let Some(concurrency) = self.concurrency {
            config.concurrency = concurrency;
        }
        if let Some(width) = self.width {
            config.target_width = width;
        }
        if let Some(height) = self.height {
            config.target_height = height;
        }
        if let Some(quality) = self.quality {
            config.jpeg_quality = quality;
        }
        if let Some(secs) = self.timeout {
            config = config.with_download_timeout(Some(Duration::from_secs(secs)));
        }
        if self.identifier_field.is_some() || self.locator_field.is_some() {
            config.projection = FieldProjection::new(
                self.identifier_field
                    .clone()
                    .unwrap_or(config.projection.identifier_field),
                self.locator_field
                    .clone()
                    .unwrap_or(config.projection.locator_field),
            );
        }
        config
    }
}

/// Run the run command.
pub fn run(
    args: RunArgs,
    config_file: Option<PathBuf>,
    verbose: bool,
    log_file: Option<PathBuf>,
) -> Result<ExitCode, CliError> {
    let _log_guard = init_logging(&LoggingConfig {
        level: verbose.then(|| "debug".to_string()),
        file: log_file,
        ansi: std::io::stderr().is_terminal(),
    })
    .map_err(CliError::Logging)?;

    let config = args.apply(base_config(config_file.as_deref())?);
    config.validate()?;

    info!(
        version = coverfetch::VERSION,
        catalog = %config.catalog_uri,
        output_dir = %config.output_dir.display(),
        concurrency = config.concurrency,
        width = config.target_width,
        height = config.target_height,
        quality = config.jpeg_quality,
        "Starting coverfetch"
    );

    // Set up signal handler for graceful shutdown
    let cancel = CancellationToken::new();
    let handler_token = cancel.clone();
    ctrlc::set_handler(move || {
        if !handler_token.is_cancelled() {
            eprintln!("Received shutdown signal, finishing in-flight images...");
            handler_token.cancel();
        }
    })
    .map_err(|e| CliError::Runtime(format!("Failed to set signal handler: {}", e)))?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| CliError::Runtime(format!("Failed to create Tokio runtime: {}", e)))?;

    let summary = runtime.block_on(async move {
        let fetcher = ReqwestFetcher::new().map_err(CliError::Http)?;
        let pipeline = Pipeline::new(config, Arc::new(fetcher)).with_cancellation(cancel);
        pipeline.run_configured().await.map_err(CliError::from)
    })?;

    println!("{}", summary);

    if args.strict && summary.failed > 0 {
        warn!(failed = summary.failed, "Exiting with failure status (--strict)");
        return Ok(ExitCode::FAILURE);
    }
    Ok(ExitCode::SUCCESS)
}
