//! Per-record task: download → decode → resize → encode → persist.
//!
//! A task owns its [`Record`] by value and runs its steps strictly in order.
//! Any step failing ends the task; nothing is retried and no sibling task is
//! affected. At most one file is written per task.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use bytes::Bytes;
use tracing::{debug, instrument};

use super::types::TaskError;
use crate::catalog::Record;
use crate::fetch::ImageFetcher;
use crate::transform::{self, ImageTransformer, TransformError};

/// Shared, immutable inputs every task needs.
#[derive(Clone)]
pub struct TaskContext {
    pub(crate) fetcher: Arc<dyn ImageFetcher>,
    pub(crate) transformer: ImageTransformer,
    pub(crate) output_dir: Arc<Path>,
    pub(crate) download_timeout: Option<Duration>,
}

impl TaskContext {
    pub fn new(
        fetcher: Arc<dyn ImageFetcher>,
        transformer: ImageTransformer,
        output_dir: impl AsRef<Path>,
        download_timeout: Option<Duration>,
    ) -> Self {
        Self {
            fetcher,
            transformer,
            output_dir: Arc::from(output_dir.as_ref()),
            download_timeout,
        }
    }

    /// Builds the task for one record.
    pub fn task(&self, record: Record) -> ImageTask {
        ImageTask {
            record,
            ctx: self.clone(),
        }
    }

    /// Output path for `record`.
    pub fn output_path(&self, record: &Record) -> PathBuf {
        self.output_dir.join(record.output_file_name())
    }
}

/// The unit of work for one record.
pub struct ImageTask {
    record: Record,
    ctx: TaskContext,
}

impl ImageTask {
    pub fn record(&self) -> &Record {
        &self.record
    }

    /// Runs every step and returns the path written on success.
    #[instrument(skip(self), fields(identifier = %self.record.identifier()))]
    pub async fn run(self) -> Result<PathBuf, TaskError> {
        let started = Instant::now();

        let raw = self.download().await?;
        debug!(bytes = raw.len(), "Downloaded image");

        let encoded = self.transform(raw).await?;
        let path = self.persist(&encoded).await?;

        debug!(
            path = %path.display(),
            bytes = encoded.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Stored image"
        );
        Ok(path)
    }

    async fn download(&self) -> Result<Bytes, TaskError> {
        let locator = self.record.image_locator();
        let fetch = self.ctx.fetcher.fetch(locator);

        let result = match self.ctx.download_timeout {
            Some(timeout) => tokio::time::timeout(timeout, fetch).await.map_err(|_| {
                TaskError::Timeout {
                    identifier: self.record.identifier().to_string(),
                    locator: locator.to_string(),
                    timeout,
                }
            })?,
            None => fetch.await,
        };

        result.map_err(|source| TaskError::Download {
            identifier: self.record.identifier().to_string(),
            locator: locator.to_string(),
            source,
        })
    }

    /// Decode, resize and encode on a blocking worker.
    async fn transform(&self, raw: Bytes) -> Result<Vec<u8>, TaskError> {
        let transformer = self.ctx.transformer;

        let joined = tokio::task::spawn_blocking(move || {
            let decoded = transform::decode(&raw)?;
            drop(raw);
            let resized = transform::resize(
                &decoded,
                transformer.target_width(),
                transformer.target_height(),
            )?;
            drop(decoded);
            transform::encode_jpeg(&resized, transformer.jpeg_quality())
        })
        .await;

        let result = joined.map_err(|e| TaskError::Transform {
            identifier: self.record.identifier().to_string(),
            reason: format!("transform worker failed: {}", e),
        })?;

        result.map_err(|e| self.transform_error(e))
    }

    fn transform_error(&self, source: TransformError) -> TaskError {
        if source.is_decode() {
            TaskError::Decode {
                identifier: self.record.identifier().to_string(),
                locator: self.record.image_locator().to_string(),
                source,
            }
        } else {
            TaskError::Transform {
                identifier: self.record.identifier().to_string(),
                reason: source.to_string(),
            }
        }
    }

    async fn persist(&self, encoded: &[u8]) -> Result<PathBuf, TaskError> {
        let path = self.ctx.output_path(&self.record);
        let persist_err = |source| TaskError::Persist {
            identifier: self.record.identifier().to_string(),
            path: path.clone(),
            source,
        };

        // Write to a temp file first, then rename for atomicity. The suffix
        // is unique per write so colliding identifiers never share a temp file.
        let temp_path = temp_path_for(&path);
        if let Err(e) = tokio::fs::write(&temp_path, encoded).await {
            let _ = tokio::fs::remove_file(&temp_path).await;
            return Err(persist_err(e));
        }
        if let Err(e) = tokio::fs::rename(&temp_path, &path).await {
            let _ = tokio::fs::remove_file(&temp_path).await;
            return Err(persist_err(e));
        }

        Ok(path)
    }
}

/// `<dir>/<name>.<n>.tmp`, unique within this process.
fn temp_path_for(path: &Path) -> PathBuf {
    static NEXT: AtomicU64 = AtomicU64::new(0);
    let n = NEXT.fetch_add(1, Ordering::Relaxed);

    let mut name = path.file_name().map(|f| f.to_os_string()).unwrap_or_default();
    name.push(format!(".{}.{}.tmp", std::process::id(), n));
    path.with_file_name(name)
}
