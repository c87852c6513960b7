//! Image transform stage.
//!
//! Pure, synchronous functions that turn downloaded bytes into a normalized
//! JPEG:
//!
//! ```text
//! raw bytes ──decode──► DynamicImage ──resize──► DynamicImage ──encode──► JPEG bytes
//!           (content     (exact target,          (fixed quality,
//!            sniffing)    Lanczos3)               RGB)
//! ```
//!
//! Codec detection looks at the leading bytes, never at the URL extension.
//! Resizing targets exact dimensions and does not preserve aspect ratio.
//! Given the same input bytes and settings the output is byte-identical.
//!
//! These functions are CPU-bound; tasks call them from a blocking worker.

mod error;

use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, ImageFormat};

pub use error::TransformError;

/// Default output width in pixels.
pub const DEFAULT_TARGET_WIDTH: u32 = 800;

/// Default output height in pixels.
pub const DEFAULT_TARGET_HEIGHT: u32 = 800;

/// Default JPEG quality (1-100).
pub const DEFAULT_JPEG_QUALITY: u8 = 75;

/// Resampling filter used for every resize.
pub const RESIZE_FILTER: FilterType = FilterType::Lanczos3;

/// Settings for the decode → resize → encode chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageTransformer {
    target_width: u32,
    target_height: u32,
    jpeg_quality: u8,
}

impl Default for ImageTransformer {
    fn default() -> Self {
        Self {
            target_width: DEFAULT_TARGET_WIDTH,
            target_height: DEFAULT_TARGET_HEIGHT,
            jpeg_quality: DEFAULT_JPEG_QUALITY,
        }
    }
}

impl ImageTransformer {
    /// Creates a transformer with explicit settings.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` if either dimension is zero or the quality is
    /// outside 1-100.
    pub fn new(target_width: u32, target_height: u32, jpeg_quality: u8) -> Result<Self, TransformError> {
        if target_width == 0 || target_height == 0 {
            return Err(TransformError::InvalidConfig(format!(
                "target dimensions must be non-zero, got {}×{}",
                target_width, target_height
            )));
        }
        if !(1..=100).contains(&jpeg_quality) {
            return Err(TransformError::InvalidConfig(format!(
                "JPEG quality must be within 1-100, got {}",
                jpeg_quality
            )));
        }

        Ok(Self {
            target_width,
            target_height,
            jpeg_quality,
        })
    }

    pub fn target_width(&self) -> u32 {
        self.target_width
    }

    pub fn target_height(&self) -> u32 {
        self.target_height
    }

    pub fn jpeg_quality(&self) -> u8 {
        self.jpeg_quality
    }

    /// Runs the full chain on raw downloaded bytes.
    pub fn process(&self, raw: &[u8]) -> Result<Vec<u8>, TransformError> {
        let decoded = decode(raw)?;
        let resized = resize(&decoded, self.target_width, self.target_height)?;
        encode_jpeg(&resized, self.jpeg_quality)
    }
}

/// Decodes `raw` using content-based format detection.
pub fn decode(raw: &[u8]) -> Result<DynamicImage, TransformError> {
    if raw.is_empty() {
        return Err(TransformError::Decode("no image data".to_string()));
    }

    let format = image::guess_format(raw)
        .map_err(|e| TransformError::UnsupportedFormat(e.to_string()))?;

    decode_as(raw, format)
}

fn decode_as(raw: &[u8], format: ImageFormat) -> Result<DynamicImage, TransformError> {
    image::load_from_memory_with_format(raw, format)
        .map_err(|e| TransformError::Decode(format!("{:?}: {}", format, e)))
}

/// Scales `image` to exactly `width × height`, stretching if necessary.
pub fn resize(image: &DynamicImage, width: u32, height: u32) -> Result<DynamicImage, TransformError> {
    if width == 0 || height == 0 {
        return Err(TransformError::InvalidDimensions {
            width,
            height,
            reason: "target must be non-zero".to_string(),
        });
    }
    if image.width() == 0 || image.height() == 0 {
        return Err(TransformError::InvalidDimensions {
            width: image.width(),
            height: image.height(),
            reason: "source image is empty".to_string(),
        });
    }

    Ok(image.resize_exact(width, height, RESIZE_FILTER))
}

/// Encodes `image` as a baseline RGB JPEG. Alpha is discarded.
pub fn encode_jpeg(image: &DynamicImage, quality: u8) -> Result<Vec<u8>, TransformError> {
    let rgb = image.to_rgb8();
    let mut out = Vec::with_capacity((rgb.width() * rgb.height()) as usize / 4);

    let mut encoder = JpegEncoder::new_with_quality(&mut out, quality);
    encoder
        .encode_image(&rgb)
        .map_err(|e| TransformError::EncodingFailed(e.to_string()))?;

    Ok(out)
}
