//! Error types for the edgequake-fileconv library.
//!
//! Every failure is a [`FileConvError`]. Variants are grouped the same way a
//! user perceives them, and [`FileConvError::kind`] collapses them into the
//! three-way [`ErrorKind`] taxonomy:
//!
//! * **Input**: the request itself is wrong: no file, a file that is too
//!   large or of the wrong type, an empty image set.
//! * **Processing**: a third-party engine (pdfium, the image codecs, the
//!   ZIP writer, the XML reader) failed on otherwise valid input.
//! * **Unsupported**: the conversion is unknown, or needs server-side
//!   infrastructure that does not exist.
//!
//! Errors halt the current request without partial output and are never
//! retried. None of them poisons the process: a new conversion may start
//! right after a failure.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// Coarse classification of a [`FileConvError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Input,
    Processing,
    Unsupported,
}

/// All errors returned by the edgequake-fileconv library.
#[derive(Debug, Error)]
pub enum FileConvError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// A conversion was requested without any source file.
    #[error("No file provided.\nSelect a file to convert first.")]
    NoFile,

    /// Input file was not found at the given path.
    #[error("File not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The input string is not a valid file path or URL.
    #[error("Invalid input '{input}': not a file path or a valid HTTP/HTTPS URL")]
    InvalidInput { input: String },

    /// HTTP URL was syntactically valid but download failed.
    #[error("Failed to download '{url}': {reason}\nCheck your internet connection.")]
    DownloadFailed { url: String, reason: String },

    /// Download exceeded the configured timeout.
    #[error("Download timed out after {secs}s for '{url}'\nIncrease --download-timeout.")]
    DownloadTimeout { url: String, secs: u64 },

    /// The file exceeds the configured upload ceiling.
    #[error("File '{name}' is too large ({size} bytes); the limit is {limit} bytes.\nRaise it with --max-size-mb.")]
    FileTooLarge { name: String, size: u64, limit: u64 },

    /// The file's extension and media type match none of the conversion's
    /// accepted source types.
    #[error("'{name}' cannot be used for {conversion}: expected one of {expected}")]
    UnsupportedFileType {
        name: String,
        conversion: String,
        expected: String,
    },

    /// The conversion takes a single file but several were supplied.
    #[error("{conversion} converts one file at a time, got {count}")]
    TooManyFiles { conversion: String, count: usize },

    /// The image layout engine was handed an empty sequence.
    #[error("No images to lay out")]
    NoImages,

    /// An image-sequence preview had every page removed before export.
    #[error("No pages available to export")]
    NoPagesToExport,

    /// An image reports a zero width or height.
    #[error("Image '{name}' has invalid dimensions {width}x{height}")]
    InvalidImageDimensions {
        name: String,
        width: u32,
        height: u32,
    },

    /// A preview edit referenced a position that does not exist.
    #[error("Preview position {index} is out of range ({len} items)")]
    PreviewIndexOutOfRange { index: usize, len: usize },

    /// A reorder listed the same position twice.
    #[error("Preview position {index} is listed more than once in the new order")]
    DuplicatePreviewPosition { index: usize },

    /// A preview edit does not apply to the current preview kind.
    #[error("Cannot {action}: the current preview is {kind}")]
    PreviewMismatch { action: String, kind: String },

    /// The session has nothing to download yet.
    #[error("Nothing to download.\nRun a conversion first.")]
    NoPreview,

    /// The session refuses a second conversion while one is in flight.
    #[error("A conversion is already in progress")]
    ConversionInProgress,

    /// PDF requires a password but none was provided.
    #[error("PDF '{name}' is encrypted and requires a password.\nProvide it with --password <PASSWORD>.")]
    PasswordRequired { name: String },

    /// A password was provided but it is wrong.
    #[error("Wrong password for PDF '{name}'")]
    WrongPassword { name: String },

    // ── Processing errors ─────────────────────────────────────────────────
    /// pdfium could not parse the document.
    #[error("PDF '{name}' could not be opened: {detail}")]
    CorruptPdf { name: String, detail: String },

    /// pdfium returned an error for a specific page.
    #[error("Rendering failed for page {page}: {detail}")]
    RenderFailed { page: usize, detail: String },

    /// Text could not be extracted from a page.
    #[error("Text extraction failed for page {page}: {detail}")]
    TextExtractionFailed { page: usize, detail: String },

    /// An image could not be decoded.
    #[error("Failed to process image '{name}': {detail}")]
    ImageDecodeFailed { name: String, detail: String },

    /// A bitmap could not be exported to the requested format.
    #[error("Failed to encode image as {format}: {detail}")]
    ImageEncodeFailed { format: String, detail: String },

    /// Building the output PDF failed.
    #[error("PDF assembly failed: {0}")]
    PdfAssemblyFailed(String),

    /// The word-processing document is not a readable DOCX package.
    #[error("Document '{name}' could not be read: {detail}")]
    MalformedDocument { name: String, detail: String },

    /// Writing the ZIP archive failed.
    #[error("Archive creation failed: {0}")]
    ArchiveFailed(String),

    /// Could not create or write the output file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\n\
PDF rendering and assembly need the pdfium shared library.\n\
  • Set FILECONV_PDFIUM_PATH=/path/to/libpdfium (file or directory).\n\
  • Or place libpdfium next to the fileconv executable.\n\
  • Or install it system-wide.\n\
Pre-built libraries: https://github.com/bblanchon/pdfium-binaries/releases\n"
    )]
    PdfiumBindingFailed(String),

    // ── Unsupported operations ────────────────────────────────────────────
    /// The conversion tag is not one of the known conversions.
    #[error("Unsupported conversion type '{0}'")]
    UnknownConversion(String),

    /// The conversion exists in name only and needs a server-side engine.
    #[error("{conversion} requires server-side infrastructure that is not available")]
    RequiresServer { conversion: String },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl FileConvError {
    /// Classify this error into the three-way taxonomy.
    pub fn kind(&self) -> ErrorKind {
        match self {
            FileConvError::NoFile
            | FileConvError::FileNotFound { .. }
            | FileConvError::PermissionDenied { .. }
            | FileConvError::InvalidInput { .. }
            | FileConvError::DownloadFailed { .. }
            | FileConvError::DownloadTimeout { .. }
            | FileConvError::FileTooLarge { .. }
            | FileConvError::UnsupportedFileType { .. }
            | FileConvError::TooManyFiles { .. }
            | FileConvError::NoImages
            | FileConvError::NoPagesToExport
            | FileConvError::InvalidImageDimensions { .. }
            | FileConvError::PreviewIndexOutOfRange { .. }
            | FileConvError::DuplicatePreviewPosition { .. }
            | FileConvError::PreviewMismatch { .. }
            | FileConvError::NoPreview
            | FileConvError::ConversionInProgress
            | FileConvError::PasswordRequired { .. }
            | FileConvError::WrongPassword { .. }
            | FileConvError::InvalidConfig(_) => ErrorKind::Input,

            FileConvError::CorruptPdf { .. }
            | FileConvError::RenderFailed { .. }
            | FileConvError::TextExtractionFailed { .. }
            | FileConvError::ImageDecodeFailed { .. }
            | FileConvError::ImageEncodeFailed { .. }
            | FileConvError::PdfAssemblyFailed(_)
            | FileConvError::MalformedDocument { .. }
            | FileConvError::ArchiveFailed(_)
            | FileConvError::OutputWriteFailed { .. }
            | FileConvError::PdfiumBindingFailed(_)
            | FileConvError::Internal(_) => ErrorKind::Processing,

            FileConvError::UnknownConversion(_) | FileConvError::RequiresServer { .. } => {
                ErrorKind::Unsupported
            }
        }
    }

    /// The message shown to a user: the first line of the display text,
    /// without the remediation hints that follow it.
    pub fn user_message(&self) -> String {
        let full = self.to_string();
        full.lines().next().unwrap_or_default().to_string()
    }
}

impl From<zip::result::ZipError> for FileConvError {
    fn from(e: zip::result::ZipError) -> Self {
        FileConvError::ArchiveFailed(e.to_string())
    }
}
