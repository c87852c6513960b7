//! Bounded-concurrency image pipeline.
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────┐ Record ┌────────────┐ acquire ┌─────────────────────┐
//! │ CatalogSource │ ─────► │ Dispatcher │ ──────► │ AdmissionController │
//! └───────────────┘        └─────┬──────┘         └─────────────────────┘
//!                                │ register + spawn
//!                                ▼
//!                  ┌────────────────────────────┐
//!                  │ ImageTask (one per record) │
//!                  │ download → transform →     │
//!                  │ persist → release token    │
//!                  └─────────────┬──────────────┘
//!                                │ complete
//!                                ▼
//!                  ┌────────────────────────────┐
//!                  │     CompletionBarrier      │ ──► RunSummary
//!                  └────────────────────────────┘
//! ```
//!
//! At most `concurrency` tasks hold a token at once. Every dispatched task
//! ends as succeeded or failed, and [`Pipeline::run`] only returns after the
//! last one has finished, including when the catalog fails part way (the
//! run drains in-flight work, then reports [`PipelineError::CatalogFatal`]).
//!
//! Two records sharing an identifier race on the same output path; the last
//! write wins. Identifier uniqueness is the catalog's responsibility.

mod admission;
mod barrier;
mod dispatcher;
mod task;
mod types;

use std::sync::Arc;
use std::time::Instant;

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::catalog::{open_catalog, CatalogSource};
use crate::config::PipelineConfig;
use crate::fetch::ImageFetcher;

pub use admission::{AdmissionController, AdmissionPermit, DEFAULT_CONCURRENCY};
pub use barrier::{BarrierCounts, CompletionBarrier, CompletionGuard};
pub use dispatcher::{DispatchReport, Dispatcher};
pub use task::{ImageTask, TaskContext};
pub use types::{FailureCounts, FailureKind, PipelineError, RunSummary, TaskError, TaskOutcome};

/// Runs catalogs through the fetch → resize → store chain.
pub struct Pipeline {
    config: PipelineConfig,
    fetcher: Arc<dyn ImageFetcher>,
    cancel: CancellationToken,
}

impl Pipeline {
    /// Creates a pipeline. The config is validated when a run starts.
    pub fn new(config: PipelineConfig, fetcher: Arc<dyn ImageFetcher>) -> Self {
        Self {
            config,
            fetcher,
            cancel: CancellationToken::new(),
        }
    }

    /// Uses `token` to stop dispatch early. Tasks already started still
    /// finish.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Opens the configured catalog and runs it.
    pub async fn run_configured(&self) -> Result<RunSummary, PipelineError> {
        let mut catalog = open_catalog(
            &self.config.catalog_uri,
            self.config.projection.clone(),
            &self.config.collection,
        )
        .await
        .map_err(PipelineError::CatalogOpen)?;
        self.run(catalog.as_mut()).await
    }

    /// Processes every record in `catalog` and waits for all tasks.
    pub async fn run<C>(&self, catalog: &mut C) -> Result<RunSummary, PipelineError>
    where
        C: CatalogSource + ?Sized,
    {
        let started = Instant::now();
        self.config.validate().map_err(PipelineError::Config)?;
        let transformer = self.config.transformer().map_err(PipelineError::Config)?;
        self.prepare_output_dir().await?;

        let admission = Arc::new(AdmissionController::new(self.config.concurrency));
        let barrier = CompletionBarrier::new();
        let tasks = TaskContext::new(
            Arc::clone(&self.fetcher),
            transformer,
            &self.config.output_dir,
            self.config.download_timeout,
        );
        let dispatcher = Dispatcher::new(
            Arc::clone(&admission),
            barrier.clone(),
            tasks,
            self.cancel.clone(),
        );

        let dispatched = dispatcher.dispatch(catalog).await;
        // The barrier is closed even when dispatch errored; drain either way
        let counts = barrier.wait().await;
        let report = dispatched?;

        let summary = RunSummary {
            dispatched: report.dispatched,
            succeeded: counts.succeeded,
            failed: counts.failed,
            skipped: report.skipped,
            failures: counts.failures,
            peak_concurrency: admission.peak_in_flight(),
            interrupted: report.interrupted,
            elapsed: started.elapsed(),
        };

        match report.fatal {
            Some(source) => {
                warn!(summary = %summary, "Run ended early after catalog failure");
                Err(PipelineError::CatalogFatal { source, summary })
            }
            None => {
                info!(
                    succeeded = summary.succeeded,
                    failed = summary.failed,
                    skipped = summary.skipped,
                    peak_concurrency = summary.peak_concurrency,
                    "Run complete"
                );
                Ok(summary)
            }
        }
    }

    async fn prepare_output_dir(&self) -> Result<(), PipelineError> {
        let dir = &self.config.output_dir;
        tokio::fs::create_dir_all(dir)
            .await
            .map_err(|source| PipelineError::OutputDir {
                path: dir.clone(),
                source,
            })
    }
}
