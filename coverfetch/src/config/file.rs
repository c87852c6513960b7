//! INI configuration file.
//!
//! ```ini
//! [catalog]
//! ; mongodb://, mongodb+srv://, file:// or a plain path
//! uri = mongodb://localhost:27017
//! database = podgo
//! collection = podcasts
//! identifier_field = podlistUrl
//! locator_field = image
//!
//! [pipeline]
//! concurrency = 10
//! output_dir = img
//!
//! [image]
//! width = 800
//! height = 800
//! quality = 75
//!
//! [download]
//! ; seconds, 0 disables the deadline
//! timeout = 30
//! ```
//!
//! Every key is optional; missing keys keep the value they override.

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use ini::{Ini, Properties};

use super::error::ConfigError;
use super::settings::PipelineConfig;

/// Directory under the user's home holding the config file.
pub const CONFIG_DIR_NAME: &str = ".coverfetch";

/// Config file name.
pub const CONFIG_FILE_NAME: &str = "config.ini";

/// Returns `~/.coverfetch/config.ini`, if a home directory is known.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
}

/// Values read from a config file. `None` means "not set".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigFile {
    pub catalog_uri: Option<String>,
    pub database: Option<String>,
    pub collection: Option<String>,
    pub identifier_field: Option<String>,
    pub locator_field: Option<String>,
    pub concurrency: Option<usize>,
    pub output_dir: Option<PathBuf>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub quality: Option<u8>,
    pub timeout_secs: Option<u64>,
}

impl ConfigFile {
    /// Loads and parses the file at `path`.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let ini = Ini::load_from_file(path).map_err(|e| ConfigError::Read {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        Self::from_ini(&ini)
    }

    /// Parses INI text.
    pub fn parse(text: &str) -> Result<Self, ConfigError> {
        let ini = Ini::load_from_str(text).map_err(|e| ConfigError::Read {
            path: PathBuf::from("<string>"),
            reason: e.to_string(),
        })?;
        Self::from_ini(&ini)
    }

    fn from_ini(ini: &Ini) -> Result<Self, ConfigError> {
        let catalog = ini.section(Some("catalog"));
        let pipeline = ini.section(Some("pipeline"));
        let image = ini.section(Some("image"));
        let download = ini.section(Some("download"));

        Ok(Self {
            catalog_uri: string(catalog, "uri"),
            database: string(catalog, "database"),
            collection: string(catalog, "collection"),
            identifier_field: string(catalog, "identifier_field"),
            locator_field: string(catalog, "locator_field"),
            concurrency: parsed(pipeline, "pipeline", "concurrency")?,
            output_dir: string(pipeline, "output_dir").map(PathBuf::from),
            width: parsed(image, "image", "width")?,
            height: parsed(image, "image", "height")?,
            quality: parsed(image, "image", "quality")?,
            timeout_secs: parsed(download, "download", "timeout")?,
        })
    }

    /// Overlays the values set in this file onto `config`.
    pub fn apply(&self, mut config: PipelineConfig) -> PipelineConfig {
        if let Some(uri) = &self.catalog_uri {
            config.catalog_uri = uri.clone();
        }
        if let Some(database) = &self.database {
            config.collection.database = database.clone();
        }
        if let Some(collection) = &self.collection {
            config.collection.collection = collection.clone();
        }
        if let Some(field) = &self.identifier_field {
            config.projection.identifier_field = field.clone();
        }
        if let Some(field) = &self.locator_field {
            config.projection.locator_field = field.clone();
        }
        if let Some(concurrency) = self.concurrency {
            config.concurrency = concurrency;
        }
        if let Some(dir) = &self.output_dir {
            config.output_dir = dir.clone();
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
        if let Some(secs) = self.timeout_secs {
            config = config.with_download_timeout(Some(Duration::from_secs(secs)));
        }
        config
    }

    /// Writes `config` as a complete INI file, creating parent directories.
    pub fn write(config: &PipelineConfig, path: &Path) -> Result<(), ConfigError> {
        let write_err = |reason: String| ConfigError::Write {
            path: path.to_path_buf(),
            reason,
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| write_err(e.to_string()))?;
        }

        to_ini(config)
            .write_to_file(path)
            .map_err(|e| write_err(e.to_string()))
    }
}

fn to_ini(config: &PipelineConfig) -> Ini {
    let timeout = config.download_timeout.map(|t| t.as_secs()).unwrap_or(0);

    let mut ini = Ini::new();
    ini.with_section(Some("catalog"))
        .set("uri", config.catalog_uri.as_str())
        .set("database", config.collection.database.as_str())
        .set("collection", config.collection.collection.as_str())
        .set("identifier_field", config.projection.identifier_field.as_str())
        .set("locator_field", config.projection.locator_field.as_str());
    ini.with_section(Some("pipeline"))
        .set("concurrency", config.concurrency.to_string())
        .set("output_dir", config.output_dir.to_string_lossy().to_string());
    ini.with_section(Some("image"))
        .set("width", config.target_width.to_string())
        .set("height", config.target_height.to_string())
        .set("quality", config.jpeg_quality.to_string());
    ini.with_section(Some("download"))
        .set("timeout", timeout.to_string());
    ini
}

fn string(section: Option<&Properties>, key: &str) -> Option<String> {
    section
        .and_then(|s| s.get(key))
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn parsed<T>(section: Option<&Properties>, name: &str, key: &str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match string(section, key) {
        None => Ok(None),
        Some(value) => value
            .parse::<T>()
            .map(Some)
            .map_err(|e| ConfigError::InvalidValue {
                section: name.to_string(),
                key: key.to_string(),
                value: value.clone(),
                reason: e.to_string(),
            }),
    }
}
