//! Configuration types for file conversion.
//!
//! All conversion behaviour is controlled through [`ConversionConfig`], built
//! via its [`ConversionConfigBuilder`]. Keeping every knob in one struct makes
//! it trivial to share a config between the session controller and the CLI,
//! and to log exactly which settings produced a given artifact.

use crate::error::FileConvError;
use crate::progress::ProgressCallback;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Default upload ceiling: 50 MB.
pub const DEFAULT_MAX_UPLOAD_BYTES: u64 = 50 * 1024 * 1024;

/// Configuration for a conversion.
///
/// Built via [`ConversionConfig::builder()`] or using
/// [`ConversionConfig::default()`].
///
/// # Example
/// ```rust
/// use edgequake_fileconv::{ConversionConfig, RasterFormat};
///
/// let config = ConversionConfig::builder()
///     .raster_format(RasterFormat::Png)
///     .max_upload_mb(20)
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct ConversionConfig {
    /// Largest accepted source file in bytes. Default: 50 MB.
    ///
    /// Checked before a file is read into memory; oversize files are
    /// rejected whole, never truncated.
    pub max_upload_bytes: u64,

    /// Scale factor applied to each PDF page when rasterising. Default: 2.0.
    ///
    /// 1.0 renders one pixel per PDF point (72 DPI); 2.0 gives 144 DPI,
    /// enough for legible text in an exported JPEG.
    pub raster_scale: f32,

    /// Bitmap format for rasterised PDF pages. Default: JPEG.
    pub raster_format: RasterFormat,

    /// JPEG quality (1–100) for rasterised pages. Default: 95.
    pub jpeg_quality: u8,

    /// Page geometry used by the image layout engine. Default: A4, 10 mm margin.
    pub image_page: PageGeometry,

    /// Page geometry used when typesetting HTML and text. Default: Letter, 1 in margin.
    pub document_page: PageGeometry,

    /// Body font size in points for typeset documents. Default: 12.
    pub font_size: f32,

    /// PDF user password for encrypted documents.
    pub password: Option<String>,

    /// Download timeout for URL inputs in seconds. Default: 120.
    pub download_timeout_secs: u64,

    /// Optional progress observer for per-item events.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self {
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            raster_scale: 2.0,
            raster_format: RasterFormat::default(),
            jpeg_quality: 95,
            image_page: PageGeometry::a4(),
            document_page: PageGeometry::letter(),
            font_size: 12.0,
            password: None,
            download_timeout_secs: 120,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for ConversionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConversionConfig")
            .field("max_upload_bytes", &self.max_upload_bytes)
            .field("raster_scale", &self.raster_scale)
            .field("raster_format", &self.raster_format)
            .field("jpeg_quality", &self.jpeg_quality)
            .field("image_page", &self.image_page)
            .field("document_page", &self.document_page)
            .field("font_size", &self.font_size)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("download_timeout_secs", &self.download_timeout_secs)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<dyn ConversionProgressCallback>"),
            )
            .finish()
    }
}

impl ConversionConfig {
    /// Create a new builder for `ConversionConfig`.
    pub fn builder() -> ConversionConfigBuilder {
        ConversionConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`ConversionConfig`].
#[derive(Debug)]
pub struct ConversionConfigBuilder {
    config: ConversionConfig,
}

impl ConversionConfigBuilder {
    pub fn max_upload_bytes(mut self, bytes: u64) -> Self {
        self.config.max_upload_bytes = bytes;
        self
    }

    pub fn max_upload_mb(mut self, mb: u64) -> Self {
        self.config.max_upload_bytes = mb.saturating_mul(1024 * 1024);
        self
    }

    pub fn raster_scale(mut self, scale: f32) -> Self {
        self.config.raster_scale = scale.clamp(0.25, 8.0);
        self
    }

    pub fn raster_format(mut self, format: RasterFormat) -> Self {
        self.config.raster_format = format;
        self
    }

    pub fn jpeg_quality(mut self, q: u8) -> Self {
        self.config.jpeg_quality = q.clamp(1, 100);
        self
    }

    pub fn image_page(mut self, page: PageGeometry) -> Self {
        self.config.image_page = page;
        self
    }

    pub fn document_page(mut self, page: PageGeometry) -> Self {
        self.config.document_page = page;
        self
    }

    pub fn font_size(mut self, pt: f32) -> Self {
        self.config.font_size = pt.clamp(6.0, 72.0);
        self
    }

    pub fn password(mut self, pwd: impl Into<String>) -> Self {
        self.config.password = Some(pwd.into());
        self
    }

    pub fn download_timeout_secs(mut self, secs: u64) -> Self {
        self.config.download_timeout_secs = secs;
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ConversionConfig, FileConvError> {
        let c = &self.config;
        if c.max_upload_bytes == 0 {
            return Err(FileConvError::InvalidConfig(
                "Upload limit must be > 0 bytes".into(),
            ));
        }
        c.image_page.validate()?;
        c.document_page.validate()?;
        Ok(self.config)
    }
}

// ── Enums and value types ────────────────────────────────────────────────

/// Bitmap format used for rasterised PDF pages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RasterFormat {
    /// Lossy, small files. (default)
    #[default]
    Jpeg,
    /// Lossless.
    Png,
}

/// Portrait page size and uniform margin, in millimetres.
///
/// Landscape pages are produced by swapping width and height, so the
/// geometry is always stored portrait (`width_mm <= height_mm`).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PageGeometry {
    pub width_mm: f32,
    pub height_mm: f32,
    pub margin_mm: f32,
}

impl PageGeometry {
    /// ISO A4 with a 10 mm margin.
    pub fn a4() -> Self {
        Self {
            width_mm: 210.0,
            height_mm: 297.0,
            margin_mm: 10.0,
        }
    }

    /// US Letter with a one-inch margin.
    pub fn letter() -> Self {
        Self {
            width_mm: 215.9,
            height_mm: 279.4,
            margin_mm: 25.4,
        }
    }

    /// Page dimensions `(width, height)` for the requested orientation.
    pub fn oriented(&self, landscape: bool) -> (f32, f32) {
        let short = self.width_mm.min(self.height_mm);
        let long = self.width_mm.max(self.height_mm);
        if landscape {
            (long, short)
        } else {
            (short, long)
        }
    }

    fn validate(&self) -> Result<(), FileConvError> {
        if self.width_mm <= 0.0 || self.height_mm <= 0.0 {
            return Err(FileConvError::InvalidConfig(format!(
                "Page size must be positive, got {}x{} mm",
                self.width_mm, self.height_mm
            )));
        }
        if self.margin_mm < 0.0 || self.margin_mm * 2.0 >= self.width_mm.min(self.height_mm) {
            return Err(FileConvError::InvalidConfig(format!(
                "Margin {} mm leaves no printable area on a {}x{} mm page",
                self.margin_mm, self.width_mm, self.height_mm
            )));
        }
        Ok(())
    }
}
