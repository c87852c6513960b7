//! Pipeline settings.

use std::path::PathBuf;
use std::time::Duration;

use super::error::ConfigError;
use crate::catalog::{CollectionName, FieldProjection};
use crate::pipeline::DEFAULT_CONCURRENCY;
use crate::transform::{
    ImageTransformer, DEFAULT_JPEG_QUALITY, DEFAULT_TARGET_HEIGHT, DEFAULT_TARGET_WIDTH,
};

/// Default output directory, relative to the working directory.
pub const DEFAULT_OUTPUT_DIR: &str = "img";

/// Default catalog location.
pub const DEFAULT_CATALOG_URI: &str = "mongodb://localhost:27017";

/// Default per-download deadline in seconds.
///
/// Without a deadline a single unresponsive host holds its token forever
/// and permanently shrinks the pool.
pub const DEFAULT_DOWNLOAD_TIMEOUT_SECS: u64 = 30;

/// Everything a run needs to know.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineConfig {
    /// Maximum number of tasks executing at once.
    pub concurrency: usize,
    /// Output width in pixels.
    pub target_width: u32,
    /// Output height in pixels.
    pub target_height: u32,
    /// JPEG quality, 1-100.
    pub jpeg_quality: u8,
    /// Directory receiving `<identifier>.jpg` files.
    pub output_dir: PathBuf,
    /// Where to read records from.
    pub catalog_uri: String,
    /// Field names mapped onto records.
    pub projection: FieldProjection,
    /// Database and collection for `mongodb://` catalogs.
    pub collection: CollectionName,
    /// Per-download deadline; `None` waits forever.
    pub download_timeout: Option<Duration>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_CONCURRENCY,
            target_width: DEFAULT_TARGET_WIDTH,
            target_height: DEFAULT_TARGET_HEIGHT,
            jpeg_quality: DEFAULT_JPEG_QUALITY,
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            catalog_uri: DEFAULT_CATALOG_URI.to_string(),
            projection: FieldProjection::default(),
            collection: CollectionName::default(),
            download_timeout: Some(Duration::from_secs(DEFAULT_DOWNLOAD_TIMEOUT_SECS)),
        }
    }
}

impl PipelineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    pub fn with_target_size(mut self, width: u32, height: u32) -> Self {
        self.target_width = width;
        self.target_height = height;
        self
    }

    pub fn with_jpeg_quality(mut self, quality: u8) -> Self {
        self.jpeg_quality = quality;
        self
    }

    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = dir.into();
        self
    }

    pub fn with_catalog_uri(mut self, uri: impl Into<String>) -> Self {
        self.catalog_uri = uri.into();
        self
    }

    pub fn with_projection(mut self, projection: FieldProjection) -> Self {
        self.projection = projection;
        self
    }

    pub fn with_collection(mut self, collection: CollectionName) -> Self {
        self.collection = collection;
        self
    }

    /// Sets the per-download deadline. A zero duration disables it.
    pub fn with_download_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.download_timeout = timeout.filter(|t| !t.is_zero());
        self
    }

    /// Checks every setting is usable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.concurrency == 0 {
            return Err(ConfigError::Invalid {
                name: "concurrency",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.target_width == 0 || self.target_height == 0 {
            return Err(ConfigError::Invalid {
                name: "target size",
                reason: format!(
                    "must be non-zero, got {}×{}",
                    self.target_width, self.target_height
                ),
            });
        }
        if !(1..=100).contains(&self.jpeg_quality) {
            return Err(ConfigError::Invalid {
                name: "jpeg_quality",
                reason: format!("must be within 1-100, got {}", self.jpeg_quality),
            });
        }
        if self.catalog_uri.trim().is_empty() {
            return Err(ConfigError::Invalid {
                name: "catalog_uri",
                reason: "must not be empty".to_string(),
            });
        }
        if self.output_dir.as_os_str().is_empty() {
            return Err(ConfigError::Invalid {
                name: "output_dir",
                reason: "must not be empty".to_string(),
            });
        }
        if self.projection.identifier_field.is_empty() || self.projection.locator_field.is_empty() {
            return Err(ConfigError::Invalid {
                name: "projection",
                reason: "field names must not be empty".to_string(),
            });
        }
        if self.collection.database.is_empty() || self.collection.collection.is_empty() {
            return Err(ConfigError::Invalid {
                name: "collection",
                reason: "database and collection names must not be empty".to_string(),
            });
        }
        Ok(())
    }

    /// Builds the transform settings.
    pub fn transformer(&self) -> Result<ImageTransformer, ConfigError> {
        ImageTransformer::new(self.target_width, self.target_height, self.jpeg_quality).map_err(
            |e| ConfigError::Invalid {
                name: "image",
                reason: e.to_string(),
            },
        )
    }
}
