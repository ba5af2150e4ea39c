//! The converter session: one owner for selection, preview and output name.
//!
//! A [`ConverterSession`] walks the same path an interactive user does:
//!
//! ```text
//! select ──▶ convert(kind) ──▶ edit preview ──▶ download
//!   ▲                                              │
//!   └──────────────────── reset ◀──────────────────┘
//! ```
//!
//! Selecting new files discards any previous preview. A failed conversion
//! or download leaves a user-facing message in [`ConverterSession::last_error`]
//! and never a partial artifact. A successful download consumes the preview.
//!
//! Only one conversion may be in flight. A conversion future dropped before
//! it completes leaves the session marked busy until [`ConverterSession::reset`].

use crate::config::ConversionConfig;
use crate::convert::export;
use crate::error::FileConvError;
use crate::options::{options_for_file, ConversionKind, ConversionOption};
use crate::output::{derive_output_filename, ensure_extension, write_artifact, ConversionArtifact};
use crate::pipeline::input::SourceFile;
use crate::preview::{ImagePreviewItem, PreviewState};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

pub struct ConverterSession {
    config: ConversionConfig,
    selection: Vec<SourceFile>,
    options: Vec<&'static ConversionOption>,
    preview: Option<PreviewState>,
    output_filename: String,
    last_error: Option<String>,
    in_flight: bool,
}

impl ConverterSession {
    pub fn new(config: ConversionConfig) -> Self {
        Self {
            config,
            selection: Vec::new(),
            options: Vec::new(),
            preview: None,
            output_filename: String::new(),
            last_error: None,
            in_flight: false,
        }
    }

    pub fn config(&self) -> &ConversionConfig {
        &self.config
    }

    // ── Selection ────────────────────────────────────────────────────────

    /// Replace the selection and return the conversions it qualifies for.
    ///
    /// Every file must pass the upload ceiling; otherwise nothing is
    /// selected. With several files only conversions that accept several
    /// files and every one of them are offered.
    pub fn select(
        &mut self,
        files: Vec<SourceFile>,
    ) -> Result<&[&'static ConversionOption], FileConvError> {
        self.reset();

        let result = Self::check_selection(&files, self.config.max_upload_bytes);
        match result {
            Ok(options) => {
                info!(
                    "Selected {} file(s), {} conversion(s) available",
                    files.len(),
                    options.len()
                );
                self.selection = files;
                self.options = options;
                Ok(&self.options)
            }
            Err(e) => Err(self.record(e)),
        }
    }

    fn check_selection(
        files: &[SourceFile],
        limit: u64,
    ) -> Result<Vec<&'static ConversionOption>, FileConvError> {
        let first = files.first().ok_or(FileConvError::NoFile)?;
        for f in files {
            f.ensure_within(limit)?;
        }
        let mut options = options_for_file(first);
        if files.len() > 1 {
            options.retain(|o| o.id.accepts_multiple() && files.iter().all(|f| o.accepts(f)));
        }
        Ok(options)
    }

    pub fn selection(&self) -> &[SourceFile] {
        &self.selection
    }

    /// Conversions available for the current selection.
    pub fn options(&self) -> &[&'static ConversionOption] {
        &self.options
    }

    // ── Conversion ───────────────────────────────────────────────────────

    /// Run `kind` over the selection and keep the resulting preview.
    ///
    /// The output file name defaults to the first file's name with the
    /// preview's export extension.
    pub async fn convert(&mut self, kind: ConversionKind) -> Result<&PreviewState, FileConvError> {
        if self.in_flight {
            return Err(FileConvError::ConversionInProgress);
        }
        self.in_flight = true;
        self.last_error = None;
        self.preview = None;

        let result = crate::convert::convert(kind, &self.selection, &self.config).await;
        self.in_flight = false;

        match result {
            Ok(preview) => {
                if let Some(first) = self.selection.first() {
                    self.output_filename =
                        derive_output_filename(&first.name, &preview.default_extension());
                }
                Ok(&*self.preview.insert(preview))
            }
            Err(e) => Err(self.record(e)),
        }
    }

    pub fn is_converting(&self) -> bool {
        self.in_flight
    }

    pub fn preview(&self) -> Option<&PreviewState> {
        self.preview.as_ref()
    }

    // ── Preview edits ────────────────────────────────────────────────────

    fn preview_mut(&mut self) -> Result<&mut PreviewState, FileConvError> {
        self.preview.as_mut().ok_or(FileConvError::NoPreview)
    }

    pub fn move_image(&mut self, from: usize, to: usize) -> Result<(), FileConvError> {
        self.preview_mut()?.move_image(from, to)
    }

    pub fn remove_image(&mut self, index: usize) -> Result<ImagePreviewItem, FileConvError> {
        self.preview_mut()?.remove_image(index)
    }

    pub fn reorder_images(&mut self, order: &[usize]) -> Result<(), FileConvError> {
        self.preview_mut()?.reorder_images(order)
    }

    pub fn set_html(&mut self, html: impl Into<String>) -> Result<(), FileConvError> {
        self.preview_mut()?.set_html(html)
    }

    pub fn set_text(&mut self, text: impl Into<String>) -> Result<(), FileConvError> {
        self.preview_mut()?.set_text(text)
    }

    // ── Output ───────────────────────────────────────────────────────────

    pub fn output_filename(&self) -> &str {
        &self.output_filename
    }

    pub fn set_output_filename(&mut self, name: impl Into<String>) {
        self.output_filename = name.into();
    }

    /// Export the current preview without consuming it. Returns the final
    /// file name (extension ensured) and the artifact.
    pub async fn prepare_download(&mut self) -> Result<(String, ConversionArtifact), FileConvError> {
        let result = self.export_current().await;
        result.map_err(|e| self.record(e))
    }

    async fn export_current(&self) -> Result<(String, ConversionArtifact), FileConvError> {
        let preview = self.preview.as_ref().ok_or(FileConvError::NoPreview)?;
        let artifact = export(preview, &self.config).await?;
        // Only the last path component is used; the name never leaves the target dir.
        let base = Path::new(self.output_filename.trim())
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("converted");
        Ok((ensure_extension(base, &artifact.extension), artifact))
    }

    /// Export the preview and write it into `dir`. The preview is consumed
    /// once the file is written.
    pub async fn download(&mut self, dir: &Path) -> Result<PathBuf, FileConvError> {
        let (name, artifact) = self.prepare_download().await?;
        let path = dir.join(name);
        if let Err(e) = write_artifact(&artifact, &path).await {
            return Err(self.record(e));
        }
        self.preview = None;
        Ok(path)
    }

    // ── Errors & reset ───────────────────────────────────────────────────

    /// User-facing message of the last failure, if the last action failed.
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    fn record(&mut self, e: FileConvError) -> FileConvError {
        warn!("{}", e);
        self.last_error = Some(e.user_message());
        e
    }

    /// Drop the selection, preview, output name and error.
    pub fn reset(&mut self) {
        self.selection.clear();
        self.options.clear();
        self.preview = None;
        self.output_filename.clear();
        self.last_error = None;
        self.in_flight = false;
    }
}
