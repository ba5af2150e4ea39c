//! PDF reading via pdfium: rasterise pages, extract page text, read the
//! document information dictionary.
//!
//! ## Why spawn_blocking?
//!
//! The `pdfium-render` crate wraps the pdfium C++ library, which uses
//! thread-local state internally and is not safe to call from async contexts.
//! `tokio::task::spawn_blocking` moves the work onto a dedicated thread pool
//! thread designed for blocking operations, preventing the Tokio worker
//! threads from stalling during CPU-heavy rendering.
//!
//! ## Why scale, not a pixel cap?
//!
//! Pages are rendered at a fixed factor of their natural size (2× by
//! default) so the output keeps the document's own proportions and a
//! predictable sharpness. Callers wanting smaller output lower
//! [`ConversionConfig::raster_scale`].

use crate::config::{ConversionConfig, RasterFormat};
use crate::error::FileConvError;
use crate::pipeline::encode::encode_page;
use crate::pipeline::engine;
use crate::pipeline::input::SourceFile;
use crate::preview::ImagePreviewItem;
use crate::progress::Reporter;
use pdfium_render::prelude::*;
use tracing::{debug, info};

/// Information-dictionary fields and page count of a PDF.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PdfDetails {
    pub page_count: usize,
    pub title: Option<String>,
    pub author: Option<String>,
    pub pdf_version: String,
}

/// Render every page of `file` to an encoded image, in page order.
///
/// Items are named `page-N.<ext>` (1-based). A zero-page PDF yields an
/// empty vector; callers decide whether that is an error.
pub async fn rasterize(
    file: &SourceFile,
    config: &ConversionConfig,
) -> Result<Vec<ImagePreviewItem>, FileConvError> {
    let bytes = file.bytes.clone();
    let name = file.name.clone();
    let password = config.password.clone();
    let scale = config.raster_scale;
    let format = config.raster_format;
    let quality = config.jpeg_quality;
    let reporter = Reporter::new(config.progress_callback.clone());

    tokio::task::spawn_blocking(move || {
        rasterize_blocking(
            bytes,
            &name,
            password.as_deref(),
            scale,
            format,
            quality,
            &reporter,
        )
    })
    .await
    .map_err(|e| FileConvError::Internal(format!("Render task panicked: {}", e)))?
}

fn rasterize_blocking(
    bytes: Vec<u8>,
    name: &str,
    password: Option<&str>,
    scale: f32,
    format: RasterFormat,
    quality: u8,
    reporter: &Reporter,
) -> Result<Vec<ImagePreviewItem>, FileConvError> {
    let pdfium = engine::bind()?;
    let document = open_document(&pdfium, bytes, name, password)?;

    let pages = document.pages();
    let total = pages.len() as usize;
    info!("PDF loaded: {} pages", total);
    reporter.start(total);

    let render_config = PdfRenderConfig::new().scale_page_by_factor(scale);
    let mut items = Vec::with_capacity(total);

    for (idx, page) in pages.iter().enumerate() {
        let page_num = idx + 1;
        reporter.item_start(page_num, total);

        let rendered = page
            .render_with_config(&render_config)
            .map_err(|e| FileConvError::RenderFailed {
                page: page_num,
                detail: format!("{:?}", e),
            })
            .map(|bitmap| bitmap.as_image())
            .and_then(|img| {
                let (data, pixel_format) = encode_page(&img, format, quality)?;
                Ok((data, pixel_format, img.width(), img.height()))
            });

        let (data, pixel_format, width, height) = match rendered {
            Ok(r) => r,
            Err(e) => {
                reporter.item_error(page_num, total, &e.to_string());
                return Err(e);
            }
        };

        debug!("Rendered page {} → {}x{} px", page_num, width, height);
        reporter.item_complete(page_num, total, data.len());
        items.push(ImagePreviewItem::new(
            format!("page-{}.{}", page_num, pixel_format.extension()),
            data,
            pixel_format,
            width,
            height,
        ));
    }

    reporter.complete(total);
    Ok(items)
}

/// Extract the text of every page, in page order. Empty pages yield empty
/// strings so page numbering stays aligned.
pub async fn extract_page_texts(
    file: &SourceFile,
    config: &ConversionConfig,
) -> Result<Vec<String>, FileConvError> {
    let bytes = file.bytes.clone();
    let name = file.name.clone();
    let password = config.password.clone();
    let reporter = Reporter::new(config.progress_callback.clone());

    tokio::task::spawn_blocking(move || {
        extract_texts_blocking(bytes, &name, password.as_deref(), &reporter)
    })
    .await
    .map_err(|e| FileConvError::Internal(format!("Text task panicked: {}", e)))?
}

fn extract_texts_blocking(
    bytes: Vec<u8>,
    name: &str,
    password: Option<&str>,
    reporter: &Reporter,
) -> Result<Vec<String>, FileConvError> {
    let pdfium = engine::bind()?;
    let document = open_document(&pdfium, bytes, name, password)?;

    let pages = document.pages();
    let total = pages.len() as usize;
    reporter.start(total);

    let mut texts = Vec::with_capacity(total);
    for (idx, page) in pages.iter().enumerate() {
        let page_num = idx + 1;
        reporter.item_start(page_num, total);
        let text = match page.text() {
            Ok(t) => t.all(),
            Err(e) => {
                let err = FileConvError::TextExtractionFailed {
                    page: page_num,
                    detail: format!("{:?}", e),
                };
                reporter.item_error(page_num, total, &err.to_string());
                return Err(err);
            }
        };
        reporter.item_complete(page_num, total, text.len());
        texts.push(text);
    }

    reporter.complete(total);
    debug!("Extracted text from {} pages of {}", total, name);
    Ok(texts)
}

/// Read page count and document information without rendering anything.
pub async fn read_details(
    file: &SourceFile,
    password: Option<&str>,
) -> Result<PdfDetails, FileConvError> {
    let bytes = file.bytes.clone();
    let name = file.name.clone();
    let pwd = password.map(|s| s.to_string());

    tokio::task::spawn_blocking(move || read_details_blocking(bytes, &name, pwd.as_deref()))
        .await
        .map_err(|e| FileConvError::Internal(format!("Metadata task panicked: {}", e)))?
}

fn read_details_blocking(
    bytes: Vec<u8>,
    name: &str,
    password: Option<&str>,
) -> Result<PdfDetails, FileConvError> {
    let pdfium = engine::bind()?;
    let document = open_document(&pdfium, bytes, name, password)?;
    let metadata = document.metadata();

    let get_meta = |tag: PdfDocumentMetadataTagType| -> Option<String> {
        metadata.get(tag).and_then(|t| {
            let v = t.value().trim().to_string();
            if v.is_empty() {
                None
            } else {
                Some(v)
            }
        })
    };

    Ok(PdfDetails {
        page_count: document.pages().len() as usize,
        title: get_meta(PdfDocumentMetadataTagType::Title),
        author: get_meta(PdfDocumentMetadataTagType::Author),
        pdf_version: format!("{:?}", document.version()),
    })
}

fn open_document<'a>(
    pdfium: &'a Pdfium,
    bytes: Vec<u8>,
    name: &str,
    password: Option<&str>,
) -> Result<PdfDocument<'a>, FileConvError> {
    pdfium
        .load_pdf_from_byte_vec(bytes, password)
        .map_err(|e| classify_open_error(&format!("{:?}", e), name, password.is_some()))
}

/// pdfium reports password problems only through its error text.
fn classify_open_error(detail: &str, name: &str, had_password: bool) -> FileConvError {
    if detail.to_ascii_lowercase().contains("password") {
        if had_password {
            FileConvError::WrongPassword {
                name: name.to_string(),
            }
        } else {
            FileConvError::PasswordRequired {
                name: name.to_string(),
            }
        }
    } else {
        FileConvError::CorruptPdf {
            name: name.to_string(),
            detail: detail.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn password_errors_are_classified() {
        let e = classify_open_error("PdfiumLibraryInternalError(PasswordError)", "a.pdf", false);
        assert!(matches!(e, FileConvError::PasswordRequired { .. }));

        let e = classify_open_error("PdfiumLibraryInternalError(PasswordError)", "a.pdf", true);
        assert!(matches!(e, FileConvError::WrongPassword { .. }));
    }

    #[test]
    fn other_open_errors_are_corrupt_pdf() {
        let e = classify_open_error("PdfiumLibraryInternalError(FormatError)", "bad.pdf", false);
        match e {
            FileConvError::CorruptPdf { name, detail } => {
                assert_eq!(name, "bad.pdf");
                assert!(detail.contains("FormatError"));
            }
            other => panic!("unexpected {other:?}"),
        }
    }
}
