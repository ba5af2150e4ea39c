//! Input resolution: turn a user-supplied path or URL into a [`SourceFile`].
//!
//! The upload boundary accepts a whole file or nothing. The size ceiling is
//! checked against file metadata (or the `Content-Length` header) *before*
//! the bytes are read, and again against the actual byte count, so an
//! oversize file is never partially accepted.

use crate::error::FileConvError;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

/// A file selected for conversion, fully loaded in memory.
#[derive(Clone)]
pub struct SourceFile {
    /// Display name, including extension (e.g. `report.docx`).
    pub name: String,
    /// Reported media type, when known.
    pub media_type: Option<String>,
    pub bytes: Vec<u8>,
}

impl std::fmt::Debug for SourceFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SourceFile")
            .field("name", &self.name)
            .field("media_type", &self.media_type)
            .field("size", &self.bytes.len())
            .finish()
    }
}

/// Broad family of a source file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FileCategory {
    Image,
    Pdf,
    Office,
    Html,
    Unknown,
}

const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "webp", "bmp", "svg"];
const OFFICE_EXTENSIONS: &[&str] = &[
    "ppt", "pptx", "doc", "docx", "xls", "xlsx", "odt", "ods", "odp",
];

impl SourceFile {
    pub fn new(name: impl Into<String>, media_type: Option<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            media_type,
            bytes,
        }
    }

    /// Build a source from in-memory bytes, guessing the media type from the name.
    pub fn from_bytes(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        let name = name.into();
        let media_type = guess_media_type(&name);
        Self::new(name, media_type, bytes)
    }

    /// Lower-case extension without the dot, or `""` when there is none.
    pub fn extension(&self) -> String {
        Path::new(&self.name)
            .extension()
            .map(|e| e.to_string_lossy().to_ascii_lowercase())
            .unwrap_or_default()
    }

    /// File name with its last extension removed.
    pub fn stem(&self) -> &str {
        crate::output::strip_extension(&self.name)
    }

    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }

    /// Classify by media type first, then by extension.
    pub fn category(&self) -> FileCategory {
        let mt = self
            .media_type
            .as_deref()
            .unwrap_or_default()
            .to_ascii_lowercase();
        let ext = self.extension();
        let ext = ext.as_str();

        if mt.starts_with("image/") || IMAGE_EXTENSIONS.contains(&ext) {
            FileCategory::Image
        } else if mt == "application/pdf" || ext == "pdf" {
            FileCategory::Pdf
        } else if mt.contains("presentation")
            || mt.contains("spreadsheet")
            || mt.contains("document")
            || OFFICE_EXTENSIONS.contains(&ext)
        {
            FileCategory::Office
        } else if mt == "text/html" || ext == "html" || ext == "htm" {
            FileCategory::Html
        } else {
            FileCategory::Unknown
        }
    }

    /// Reject the file if it exceeds `limit` bytes.
    pub fn ensure_within(&self, limit: u64) -> Result<(), FileConvError> {
        check_size(&self.name, self.size(), limit)
    }
}

fn check_size(name: &str, size: u64, limit: u64) -> Result<(), FileConvError> {
    if size > limit {
        return Err(FileConvError::FileTooLarge {
            name: name.to_string(),
            size,
            limit,
        });
    }
    Ok(())
}

/// Guess a media type from a file name.
pub fn guess_media_type(name: &str) -> Option<String> {
    mime_guess::from_path(name)
        .first()
        .map(|m| m.essence_str().to_string())
}

/// Check if the input string looks like a URL.
pub fn is_url(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}

/// Resolve the input string to a loaded [`SourceFile`].
///
/// If the input is a URL, download it; otherwise read the local file.
pub async fn resolve_input(
    input: &str,
    max_bytes: u64,
    timeout_secs: u64,
) -> Result<SourceFile, FileConvError> {
    if input.trim().is_empty() {
        return Err(FileConvError::NoFile);
    }
    if is_url(input) {
        download_url(input, max_bytes, timeout_secs).await
    } else {
        read_local(Path::new(input), max_bytes).await
    }
}

/// Read a local file, validating existence, permissions and size.
async fn read_local(path: &Path, max_bytes: u64) -> Result<SourceFile, FileConvError> {
    let path_buf: PathBuf = path.to_path_buf();
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .ok_or_else(|| FileConvError::InvalidInput {
            input: path.display().to_string(),
        })?;

    let meta = tokio::fs::metadata(path)
        .await
        .map_err(|e| map_io_error(e, &path_buf))?;
    if !meta.is_file() {
        return Err(FileConvError::InvalidInput {
            input: path.display().to_string(),
        });
    }
    check_size(&name, meta.len(), max_bytes)?;

    let bytes = tokio::fs::read(path)
        .await
        .map_err(|e| map_io_error(e, &path_buf))?;
    check_size(&name, bytes.len() as u64, max_bytes)?;

    debug!("Read local file: {} ({} bytes)", path.display(), bytes.len());
    Ok(SourceFile::from_bytes(name, bytes))
}

fn map_io_error(e: std::io::Error, path: &Path) -> FileConvError {
    match e.kind() {
        std::io::ErrorKind::PermissionDenied => FileConvError::PermissionDenied {
            path: path.to_path_buf(),
        },
        _ => FileConvError::FileNotFound {
            path: path.to_path_buf(),
        },
    }
}

/// Download a URL into memory.
async fn download_url(
    url: &str,
    max_bytes: u64,
    timeout_secs: u64,
) -> Result<SourceFile, FileConvError> {
    info!("Downloading file from: {}", url);

    let parsed = reqwest::Url::parse(url).map_err(|_| FileConvError::InvalidInput {
        input: url.to_string(),
    })?;
    let name = extract_filename(&parsed);

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| FileConvError::DownloadFailed {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

    let response = client.get(parsed).send().await.map_err(|e| {
        if e.is_timeout() {
            FileConvError::DownloadTimeout {
                url: url.to_string(),
                secs: timeout_secs,
            }
        } else {
            FileConvError::DownloadFailed {
                url: url.to_string(),
                reason: e.to_string(),
            }
        }
    })?;

    if !response.status().is_success() {
        return Err(FileConvError::DownloadFailed {
            url: url.to_string(),
            reason: format!("HTTP {}", response.status()),
        });
    }

    if let Some(len) = response.content_length() {
        check_size(&name, len, max_bytes)?;
    }

    let media_type = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.split(';').next().unwrap_or(v).trim().to_string())
        .filter(|v| !v.is_empty() && v != "application/octet-stream")
        .or_else(|| guess_media_type(&name));

    let bytes = response
        .bytes()
        .await
        .map_err(|e| FileConvError::DownloadFailed {
            url: url.to_string(),
            reason: e.to_string(),
        })?;
    check_size(&name, bytes.len() as u64, max_bytes)?;

    info!("Downloaded {} ({} bytes)", name, bytes.len());
    Ok(SourceFile::new(name, media_type, bytes.to_vec()))
}

/// Extract a reasonable filename from the URL path.
fn extract_filename(url: &reqwest::Url) -> String {
    if let Some(mut segments) = url.path_segments() {
        if let Some(last) = segments.next_back() {
            if !last.is_empty() && last.contains('.') {
                return last.to_string();
            }
        }
    }
    "download".to_string()
}
