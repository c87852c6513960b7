//! Coverfetch - catalog cover image normalizer
//!
//! Reads a catalog of `(identifier, image URL)` records, downloads every
//! image, resizes it to a fixed size and stores it as
//! `<output_dir>/<identifier>.jpg`, with a fixed ceiling on how many records
//! are processed at once.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use coverfetch::config::PipelineConfig;
//! use coverfetch::fetch::ReqwestFetcher;
//! use coverfetch::pipeline::Pipeline;
//!
//! let config = PipelineConfig::default().with_catalog_uri("file://podcasts.jsonl");
//! let pipeline = Pipeline::new(config, Arc::new(ReqwestFetcher::new()?));
//! let summary = pipeline.run_configured().await?;
//! println!("{}", summary);
//! ```

pub mod catalog;
pub mod config;
pub mod fetch;
pub mod logging;
pub mod pipeline;
pub mod transform;

/// Crate version, as reported by the CLI banner.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
