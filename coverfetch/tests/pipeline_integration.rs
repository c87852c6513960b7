//! Integration tests for the image pipeline.
//!
//! These tests drive complete runs through `Pipeline` with an in-process
//! fetcher serving generated images, covering:
//! - empty catalogs and partial failures
//! - the concurrency ceiling under load
//! - overwrite/idempotence and identifier collisions
//! - catalog failures and cancellation
//!
//! Run with: `cargo test --test pipeline_integration`

use std::collections::HashMap;
use std::io::Cursor;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use futures::future::BoxFuture;
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use rand::Rng;

use coverfetch::catalog::{CatalogError, MemoryCatalog, Record};
use coverfetch::config::PipelineConfig;
use coverfetch::fetch::{FetchError, ImageFetcher};
use coverfetch::pipeline::{FailureKind, Pipeline, PipelineError};
use tokio_util::sync::CancellationToken;

// ============================================================================
// Helper Functions
// ============================================================================

/// Fetcher serving canned bodies by locator, tracking concurrent fetches.
#[derive(Default)]
struct FakeImageHost {
    bodies: HashMap<String, Bytes>,
    max_delay_ms: u64,
    running: AtomicUsize,
    peak: AtomicUsize,
    calls: AtomicUsize,
}

impl FakeImageHost {
    fn with_delay(mut self, max_delay_ms: u64) -> Self {
        self.max_delay_ms = max_delay_ms;
        self
    }

    fn serve(mut self, locator: &str, body: Bytes) -> Self {
        self.bodies.insert(locator.to_string(), body);
        self
    }

    fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    async fn get(&self, locator: &str) -> Result<Bytes, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.running.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);

        if self.max_delay_ms > 0 {
            let delay = rand::rng().random_range(1..=self.max_delay_ms);
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }

        let result = self
            .bodies
            .get(locator)
            .cloned()
            .ok_or_else(|| FetchError::Request(format!("connection refused: {}", locator)));

        self.running.fetch_sub(1, Ordering::SeqCst);
        result
    }
}

impl ImageFetcher for FakeImageHost {
    fn fetch<'a>(&'a self, locator: &'a str) -> BoxFuture<'a, Result<Bytes, FetchError>> {
        Box::pin(self.get(locator))
    }
}

/// A PNG with a pattern derived from `seed`.
fn png(seed: u8) -> Bytes {
    let img = RgbImage::from_fn(48, 32, |x, y| {
        Rgb([seed.wrapping_add(x as u8 * 5), seed.wrapping_mul(3).wrapping_add(y as u8 * 7), 120])
    });
    let mut out = Vec::new();
    DynamicImage::ImageRgb8(img)
        .write_to(&mut Cursor::new(&mut out), ImageFormat::Png)
        .unwrap();
    Bytes::from(out)
}

fn locator(i: usize) -> String {
    format!("https://images.example.com/{}.png", i)
}

fn config(dir: &Path) -> PipelineConfig {
    PipelineConfig::default()
        .with_output_dir(dir.join("img"))
        .with_target_size(64, 64)
        .with_download_timeout(Some(Duration::from_secs(5)))
}

fn jpg_files(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .unwrap()
        .map(|entry| entry.unwrap().file_name().to_string_lossy().to_string())
        .collect();
    names.sort();
    names
}

// ============================================================================
// Integration Tests
// ============================================================================

/// An empty catalog finishes immediately with an empty output directory.
#[tokio::test]
async fn test_empty_catalog_creates_empty_output_dir() {
    let dir = tempfile::tempdir().unwrap();
    let host = Arc::new(FakeImageHost::default());
    let pipeline = Pipeline::new(config(dir.path()), host.clone());

    let summary = tokio::time::timeout(Duration::from_secs(5), pipeline.run(&mut MemoryCatalog::new()))
        .await
        .expect("empty run must not block")
        .unwrap();

    assert_eq!(summary.dispatched, 0);
    assert_eq!(summary.succeeded, 0);
    assert_eq!(summary.failed, 0);
    assert!(dir.path().join("img").is_dir());
    assert!(jpg_files(&dir.path().join("img")).is_empty());
    assert_eq!(host.calls(), 0);
}

/// One unreachable locator fails only its own record.
#[tokio::test]
async fn test_unreachable_locator_fails_only_its_record() {
    let dir = tempfile::tempdir().unwrap();
    let host = Arc::new(
        FakeImageHost::default()
            .serve(&locator(0), png(1))
            .serve(&locator(2), png(2)),
    );
    let pipeline = Pipeline::new(config(dir.path()), host.clone());
    let mut catalog = MemoryCatalog::from_records(vec![
        Record::new("alpha", locator(0)),
        Record::new("beta", locator(1)),
        Record::new("gamma", locator(2)),
    ]);

    let summary = pipeline.run(&mut catalog).await.unwrap();

    assert_eq!(summary.dispatched, 3);
    assert_eq!(summary.succeeded, 2);
    assert_eq!(summary.failed, 1);
    assert_eq!(summary.failures.get(FailureKind::Download), 1);
    assert_eq!(
        jpg_files(&dir.path().join("img")),
        vec!["alpha.jpg".to_string(), "gamma.jpg".to_string()]
    );
}

/// Twenty slow records never run more than ten at once.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrency_ceiling_under_load() {
    let dir = tempfile::tempdir().unwrap();
    let mut host = FakeImageHost::default().with_delay(40);
    for i in 0..20 {
        host = host.serve(&locator(i), png(i as u8));
    }
    let host = Arc::new(host);

    let pipeline = Pipeline::new(config(dir.path()).with_concurrency(10), host.clone());
    let mut catalog =
        MemoryCatalog::from_records((0..20).map(|i| Record::new(format!("show-{:02}", i), locator(i))));

    let summary = pipeline.run(&mut catalog).await.unwrap();

    assert_eq!(summary.succeeded, 20);
    assert!(summary.peak_concurrency <= 10, "peak {}", summary.peak_concurrency);
    assert!(host.peak() <= 10, "fetch peak {}", host.peak());
    assert!(host.peak() > 1, "work should overlap");
    assert_eq!(jpg_files(&dir.path().join("img")).len(), 20);
}

/// Running twice over the same content produces identical files.
#[tokio::test]
async fn test_rerun_overwrites_with_identical_output() {
    let dir = tempfile::tempdir().unwrap();
    let host = Arc::new(FakeImageHost::default().serve(&locator(0), png(9)));
    let pipeline = Pipeline::new(config(dir.path()), host);
    let output = dir.path().join("img").join("alpha.jpg");

    let records = || MemoryCatalog::from_records(vec![Record::new("alpha", locator(0))]);

    pipeline.run(&mut records()).await.unwrap();
    let first = std::fs::read(&output).unwrap();

    pipeline.run(&mut records()).await.unwrap();
    let second = std::fs::read(&output).unwrap();

    assert_eq!(first, second);
    let decoded = image::load_from_memory(&second).unwrap();
    assert_eq!((decoded.width(), decoded.height()), (64, 64));
}

/// Duplicate identifiers race for one file; both tasks succeed.
#[tokio::test]
async fn test_duplicate_identifier_yields_single_file() {
    let dir = tempfile::tempdir().unwrap();
    let host = Arc::new(
        FakeImageHost::default()
            .serve(&locator(0), png(10))
            .serve(&locator(1), png(200)),
    );
    let pipeline = Pipeline::new(config(dir.path()), host);
    let mut catalog = MemoryCatalog::from_records(vec![
        Record::new("same", locator(0)),
        Record::new("same", locator(1)),
    ]);

    let summary = pipeline.run(&mut catalog).await.unwrap();

    assert_eq!(summary.succeeded, 2);
    assert_eq!(jpg_files(&dir.path().join("img")), vec!["same.jpg".to_string()]);
}

/// Unreadable catalog items are skipped, not fatal.
#[tokio::test]
async fn test_unreadable_items_are_skipped() {
    let dir = tempfile::tempdir().unwrap();
    let host = Arc::new(FakeImageHost::default().serve(&locator(0), png(3)));
    let pipeline = Pipeline::new(config(dir.path()), host);

    let mut catalog = MemoryCatalog::new();
    catalog.push_error(CatalogError::item(1, "missing field 'image'"));
    catalog.push(Record::new("alpha", locator(0)));
    catalog.push_error(CatalogError::item(3, "invalid JSON"));

    let summary = pipeline.run(&mut catalog).await.unwrap();

    assert_eq!(summary.skipped, 2);
    assert_eq!(summary.succeeded, 1);
    assert!(!summary.is_clean());
}

/// A fatal catalog error drains in-flight tasks before reporting.
#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_fatal_catalog_error_drains_in_flight_tasks() {
    let dir = tempfile::tempdir().unwrap();
    let host = Arc::new(
        FakeImageHost::default()
            .with_delay(50)
            .serve(&locator(0), png(4))
            .serve(&locator(1), png(5)),
    );
    let pipeline = Pipeline::new(config(dir.path()), host);

    let mut catalog = MemoryCatalog::new();
    catalog.push(Record::new("alpha", locator(0)));
    catalog.push(Record::new("beta", locator(1)));
    catalog.push_error(CatalogError::fatal("cursor closed by server"));
    catalog.push(Record::new("never", locator(0)));

    let err = pipeline.run(&mut catalog).await.unwrap_err();

    match err {
        PipelineError::CatalogFatal { source, summary } => {
            assert!(source.is_fatal());
            assert_eq!(summary.dispatched, 2);
            assert_eq!(summary.succeeded, 2);
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(
        jpg_files(&dir.path().join("img")),
        vec!["alpha.jpg".to_string(), "beta.jpg".to_string()]
    );
}

/// A cancelled run starts nothing and says so.
#[tokio::test]
async fn test_cancelled_run_dispatches_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let host = Arc::new(FakeImageHost::default().serve(&locator(0), png(6)));
    let token = CancellationToken::new();
    token.cancel();
    let pipeline = Pipeline::new(config(dir.path()), host.clone()).with_cancellation(token);

    let mut catalog = MemoryCatalog::from_records(vec![Record::new("alpha", locator(0))]);
    let summary = pipeline.run(&mut catalog).await.unwrap();

    assert!(summary.interrupted);
    assert_eq!(summary.dispatched, 0);
    assert_eq!(host.calls(), 0);
    assert!(summary.to_string().starts_with("Run interrupted"));
}

/// Non-image bodies and disk errors are reported by kind.
#[tokio::test]
async fn test_failures_are_classified() {
    let dir = tempfile::tempdir().unwrap();
    let host = Arc::new(
        FakeImageHost::default()
            .serve(&locator(0), Bytes::from_static(b"<html>gone</html>"))
            .serve(&locator(1), png(7)),
    );
    let config = config(dir.path());
    std::fs::create_dir_all(config.output_dir.join("blocked.jpg")).unwrap();
    let pipeline = Pipeline::new(config, host);

    let mut catalog = MemoryCatalog::from_records(vec![
        Record::new("html", locator(0)),
        Record::new("blocked", locator(1)),
    ]);
    let summary = pipeline.run(&mut catalog).await.unwrap();

    assert_eq!(summary.failed, 2);
    assert_eq!(summary.failures.get(FailureKind::Decode), 1);
    assert_eq!(summary.failures.get(FailureKind::Persist), 1);
}

/// The configured JSON Lines catalog is opened and projected.
#[tokio::test]
async fn test_run_configured_reads_json_lines_catalog() {
    let dir = tempfile::tempdir().unwrap();
    let catalog_path = dir.path().join("podcasts.jsonl");
    std::fs::write(
        &catalog_path,
        format!(
            "{{\"podlistUrl\": \"alpha\", \"image\": \"{}\", \"title\": \"Alpha\"}}\n\
             {{\"podlistUrl\": \"beta\"}}\n\
             {{\"podlistUrl\": \"gamma\", \"image\": \"{}\"}}\n",
            locator(0),
            locator(1)
        ),
    )
    .unwrap();

    let host = Arc::new(
        FakeImageHost::default()
            .serve(&locator(0), png(8))
            .serve(&locator(1), png(9)),
    );
    let config = config(dir.path()).with_catalog_uri(format!("file://{}", catalog_path.display()));
    let summary = Pipeline::new(config, host).run_configured().await.unwrap();

    assert_eq!(summary.succeeded, 2);
    assert_eq!(summary.skipped, 1);
    assert_eq!(
        jpg_files(&dir.path().join("img")),
        vec!["alpha.jpg".to_string(), "gamma.jpg".to_string()]
    );
}

/// A catalog line with invalid UTF-8 is skipped; later records still run.
#[tokio::test]
async fn test_run_configured_skips_invalid_utf8_line() {
    let dir = tempfile::tempdir().unwrap();
    let catalog_path = dir.path().join("podcasts.jsonl");
    let mut contents = Vec::new();
    contents.extend_from_slice(format!("{{\"podlistUrl\": \"alpha\", \"image\": \"{}\"}}\n", locator(0)).as_bytes());
    contents.extend_from_slice(b"{\"podlistUrl\": \"b\xffeta\", \"image\": \"x\"}\n");
    contents.extend_from_slice(format!("{{\"podlistUrl\": \"gamma\", \"image\": \"{}\"}}\n", locator(1)).as_bytes());
    std::fs::write(&catalog_path, contents).unwrap();

    let host = Arc::new(
        FakeImageHost::default()
            .serve(&locator(0), png(11))
            .serve(&locator(1), png(12)),
    );
    let config = config(dir.path()).with_catalog_uri(format!("file://{}", catalog_path.display()));
    let summary = Pipeline::new(config, host).run_configured().await.unwrap();

    assert_eq!(summary.succeeded, 2);
    assert_eq!(summary.skipped, 1);
    assert_eq!(
        jpg_files(&dir.path().join("img")),
        vec!["alpha.jpg".to_string(), "gamma.jpg".to_string()]
    );
}

/// A missing catalog file fails before anything is dispatched.
#[tokio::test]
async fn test_run_configured_missing_catalog() {
    let dir = tempfile::tempdir().unwrap();
    let config = config(dir.path()).with_catalog_uri(dir.path().join("nope.jsonl").to_string_lossy());
    let result = Pipeline::new(config, Arc::new(FakeImageHost::default()))
        .run_configured()
        .await;

    assert!(matches!(result, Err(PipelineError::CatalogOpen(_))));
}

/// Invalid settings are rejected before the output directory is touched.
#[tokio::test]
async fn test_invalid_config_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let config = config(dir.path()).with_jpeg_quality(0);
    let result = Pipeline::new(config, Arc::new(FakeImageHost::default()))
        .run(&mut MemoryCatalog::new())
        .await;

    assert!(matches!(result, Err(PipelineError::Config(_))));
    assert!(!dir.path().join("img").exists());
}
