//! Record dispatcher.
//!
//! Pulls records from a [`CatalogSource`] and starts one task per record:
//!
//! ```text
//! next_record ──► acquire token ──► register with barrier ──► spawn task
//!      ▲                                                        │
//!      └────────────────────── (does not wait) ◄────────────────┘
//! ```
//!
//! Item-level catalog errors are logged and skipped. A fatal catalog error
//! or a cancellation request stops dispatch; tasks already started keep
//! running and are drained through the completion barrier by the caller.
//! The barrier and the admission pool are closed on every exit path of
//! [`Dispatcher::dispatch`].

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::admission::AdmissionController;
use super::barrier::CompletionBarrier;
use super::task::TaskContext;
use super::types::{PipelineError, TaskOutcome};
use crate::catalog::{CatalogError, CatalogSource};

/// What happened during dispatch.
#[derive(Debug, Default)]
pub struct DispatchReport {
    /// Tasks started.
    pub dispatched: usize,
    /// Catalog items skipped because they could not be read.
    pub skipped: usize,
    /// The fatal catalog error that stopped dispatch, if any.
    pub fatal: Option<CatalogError>,
    /// True if dispatch stopped because cancellation was requested.
    pub interrupted: bool,
}

/// Fans records out to tasks under admission control.
pub struct Dispatcher {
    admission: Arc<AdmissionController>,
    barrier: CompletionBarrier,
    tasks: TaskContext,
    cancel: CancellationToken,
}

impl Dispatcher {
    pub fn new(
        admission: Arc<AdmissionController>,
        barrier: CompletionBarrier,
        tasks: TaskContext,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            admission,
            barrier,
            tasks,
            cancel,
        }
    }

    /// Dispatches every record in `catalog`, then closes the barrier and
    /// the admission pool.
    ///
    /// Returns once the last task has been started, not once it has
    /// finished; use [`CompletionBarrier::wait`] for that.
    pub async fn dispatch<C>(&self, catalog: &mut C) -> Result<DispatchReport, PipelineError>
    where
        C: CatalogSource + ?Sized,
    {
        let mut report = DispatchReport::default();
        let result = self.dispatch_inner(catalog, &mut report).await;

        // Registration and admission are over whatever happened above
        self.barrier.close();
        self.admission.close();

        result.map(|()| report)
    }

    async fn dispatch_inner<C>(
        &self,
        catalog: &mut C,
        report: &mut DispatchReport,
    ) -> Result<(), PipelineError>
    where
        C: CatalogSource + ?Sized,
    {
        info!(source = %catalog.describe(), capacity = self.admission.capacity(), "Dispatching records");

        loop {
            let item = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => {
                    report.interrupted = true;
                    break;
                }
                item = catalog.next_record() => item,
            };

            let record = match item {
                None => break,
                Some(Ok(record)) => record,
                Some(Err(CatalogError::Item { position, reason })) => {
                    warn!(position, reason = %reason, "Skipping unreadable catalog record");
                    report.skipped += 1;
                    continue;
                }
                Some(Err(err @ CatalogError::Fatal { .. })) => {
                    error!(error = %err, "Catalog failed, draining in-flight tasks");
                    report.fatal = Some(err);
                    break;
                }
            };

            let permit = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => {
                    report.interrupted = true;
                    break;
                }
                permit = self.admission.acquire() => permit?,
            };

            let guard = self.barrier.register()?;
            let task = self.tasks.task(record);
            report.dispatched += 1;

            tokio::spawn(async move {
                let identifier = task.record().identifier().to_string();
                let locator = task.record().image_locator().to_string();

                let outcome = match task.run().await {
                    Ok(_) => TaskOutcome::Succeeded,
                    Err(err) => {
                        warn!(
                            identifier = %identifier,
                            locator = %locator,
                            kind = %err.kind(),
                            error = %err,
                            "Task failed"
                        );
                        TaskOutcome::Failed(err.kind())
                    }
                };

                permit.release();
                guard.complete(outcome);
            });
        }

        if report.interrupted {
            warn!(dispatched = report.dispatched, "Dispatch cancelled, no further records will be started");
        }
        debug!(
            dispatched = report.dispatched,
            skipped = report.skipped,
            "Dispatch finished"
        );

        Ok(())
    }
}
