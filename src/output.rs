//! Output types: the exported artifact, its file name, and inspection data.

use crate::error::FileConvError;
use crate::pipeline::input::FileCategory;
use serde::Serialize;
use std::path::Path;
use tracing::info;

/// The single downloadable result of an export.
#[derive(Clone)]
pub struct ConversionArtifact {
    pub bytes: Vec<u8>,
    /// Extension including the dot, e.g. `".pdf"`.
    pub extension: String,
    pub media_type: String,
}

impl std::fmt::Debug for ConversionArtifact {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConversionArtifact")
            .field("size", &self.bytes.len())
            .field("extension", &self.extension)
            .field("media_type", &self.media_type)
            .finish()
    }
}

impl ConversionArtifact {
    pub fn new(bytes: Vec<u8>, extension: &str, media_type: &str) -> Self {
        Self {
            bytes,
            extension: extension.to_string(),
            media_type: media_type.to_string(),
        }
    }
}

/// Diagnostic metadata about a source file. Produced by [`crate::inspect`];
/// never accompanied by a converted artifact.
#[derive(Debug, Clone, Serialize)]
pub struct DocumentInfo {
    pub name: String,
    pub size_bytes: u64,
    pub media_type: Option<String>,
    pub category: FileCategory,
    /// Pixel dimensions, for images.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
    /// PDF details, for PDFs.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pdf_version: Option<String>,
    /// Tags of the conversions this file can go through.
    pub conversions: Vec<String>,
}

/// Remove the last `.ext` from a file name. Names without an extension, and
/// dot-files such as `.profile`, are returned unchanged.
pub fn strip_extension(name: &str) -> &str {
    match name.rfind('.') {
        Some(0) | None => name,
        Some(idx) => &name[..idx],
    }
}

/// Append `extension` (with leading dot) unless `name` already ends with it,
/// compared case-insensitively.
pub fn ensure_extension(name: &str, extension: &str) -> String {
    if name
        .to_ascii_lowercase()
        .ends_with(&extension.to_ascii_lowercase())
    {
        name.to_string()
    } else {
        format!("{name}{extension}")
    }
}

/// Output name for `source_name` converted to `extension`:
/// `report.DOCX` + `.pdf` → `report.pdf`.
pub fn derive_output_filename(source_name: &str, extension: &str) -> String {
    ensure_extension(strip_extension(source_name), extension)
}

/// Write an artifact to `path`.
///
/// Uses atomic write (temp file + rename) to prevent partial files.
pub async fn write_artifact(artifact: &ConversionArtifact, path: &Path) -> Result<(), FileConvError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| FileConvError::OutputWriteFailed {
                    path: path.to_path_buf(),
                    source: e,
                })?;
        }
    }

    let mut tmp_name = path.as_os_str().to_os_string();
    tmp_name.push(".tmp");
    let tmp_path = std::path::PathBuf::from(tmp_name);

    tokio::fs::write(&tmp_path, &artifact.bytes)
        .await
        .map_err(|e| FileConvError::OutputWriteFailed {
            path: path.to_path_buf(),
            source: e,
        })?;

    tokio::fs::rename(&tmp_path, path)
        .await
        .map_err(|e| FileConvError::OutputWriteFailed {
            path: path.to_path_buf(),
            source: e,
        })?;

    info!("Wrote {} ({} bytes)", path.display(), artifact.bytes.len());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derive_replaces_extension() {
        assert_eq!(derive_output_filename("report.DOCX", ".pdf"), "report.pdf");
        assert_eq!(derive_output_filename("scan.final.png", ".pdf"), "scan.final.pdf");
        assert_eq!(derive_output_filename("README", ".pdf"), "README.pdf");
    }

    #[test]
    fn ensure_extension_does_not_double() {
        assert_eq!(ensure_extension("report.pdf", ".pdf"), "report.pdf");
        assert_eq!(ensure_extension("REPORT.PDF", ".pdf"), "REPORT.PDF");
        assert_eq!(ensure_extension("report", ".pdf"), "report.pdf");
        assert_eq!(ensure_extension("report.pdf", ".zip"), "report.pdf.zip");
    }

    #[test]
    fn strip_extension_edge_cases() {
        assert_eq!(strip_extension(".profile"), ".profile");
        assert_eq!(strip_extension("a.b.c"), "a.b");
        assert_eq!(strip_extension("plain"), "plain");
    }

    #[tokio::test]
    async fn write_artifact_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/out/report.pdf");
        let artifact = ConversionArtifact::new(b"%PDF-1.7".to_vec(), ".pdf", "application/pdf");
        write_artifact(&artifact, &path).await.unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), b"%PDF-1.7");
        assert!(!dir.path().join("nested/out/report.pdf.tmp").exists());
    }
}
