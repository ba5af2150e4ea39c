//! # edgequake-fileconv
//!
//! Convert between everyday document formats: images to PDF, PDF pages to
//! images, HTML and Word documents to PDF, PDF text to a Word-openable file,
//! and a summary PDF for presentations.
//!
//! ## Why preview first?
//!
//! Every conversion stops at an editable [`PreviewState`] before anything
//! is written. Pages can be reordered or dropped and markup or text edited,
//! then [`export`] produces exactly one [`ConversionArtifact`]. The
//! [`session::ConverterSession`] holds that state for interactive callers.
//!
//! ## Pipeline Overview
//!
//! ```text
//! file(s)
//!  │
//!  ├─ 1. Input    resolve local paths or download URLs, enforce size ceiling
//!  ├─ 2. Adapter  decode images / rasterise PDF / DOCX → HTML / extract text
//!  ├─ 3. Preview  editable image sequence, HTML or plain text
//!  ├─ 4. Layout   one page per image, or wrap + paginate text
//!  └─ 5. Export   PDF (pdfium) / single image / ZIP / RTF
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use edgequake_fileconv::{convert, export, load_inputs, ConversionConfig, ConversionKind};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ConversionConfig::default();
//!     let files = load_inputs(&["scan-1.png", "scan-2.jpg"], &config).await?;
//!     let mut preview = convert(ConversionKind::ImageToPdf, &files, &config).await?;
//!     preview.move_image(1, 0)?;
//!     let artifact = export(&preview, &config).await?;
//!     std::fs::write(format!("scans{}", artifact.extension), &artifact.bytes)?;
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `fileconv` binary (clap + anyhow + indicatif + tracing-subscriber) |
//!
//! Disable `cli` when using only the library to avoid pulling in CLI-only deps:
//! ```toml
//! edgequake-fileconv = { version = "0.1", default-features = false }
//! ```
//!
//! ## pdfium
//!
//! PDF reading and writing go through the pdfium shared library, bound at
//! run time. Set `FILECONV_PDFIUM_PATH` to the library (or its directory)
//! when it is not next to the executable or on the system search path.
//! Conversions that never touch a PDF (image decoding, DOCX/HTML previews,
//! ZIP and RTF export) work without it.

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod convert;
pub mod error;
pub mod options;
pub mod output;
pub mod pipeline;
pub mod preview;
pub mod progress;
pub mod session;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{ConversionConfig, ConversionConfigBuilder, PageGeometry, RasterFormat};
pub use convert::{
    convert, convert_from_bytes, convert_sync, convert_to_artifact, convert_to_file, export,
    inspect, load_inputs,
};
pub use error::{ErrorKind, FileConvError};
pub use options::{options_for_file, ConversionKind, ConversionOption, CONVERSION_OPTIONS};
pub use output::{derive_output_filename, ensure_extension, ConversionArtifact, DocumentInfo};
pub use pipeline::input::{FileCategory, SourceFile};
pub use preview::{ImagePreviewItem, OutputContainer, PixelFormat, PreviewState, SourceStats};
pub use progress::{ConversionProgressCallback, NoopProgressCallback, ProgressCallback};
pub use session::ConverterSession;
