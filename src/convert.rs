//! Conversion entry points: dispatch to an adapter, then export.
//!
//! ## Why two steps?
//!
//! [`convert`] never produces a file. It runs exactly one adapter and
//! returns an editable [`PreviewState`]; the caller may reorder or drop
//! pages, or rewrite markup and text, and only then call [`export`] to get
//! the single [`ConversionArtifact`]. Callers that do not edit use
//! [`convert_to_artifact`] or [`convert_to_file`], which chain the two.
//!
//! Everything is strictly sequential: files, pages and images are
//! processed one at a time and each step is awaited before the next. A
//! failure halts the request without partial output and is not retried.

use crate::config::ConversionConfig;
use crate::error::FileConvError;
use crate::options::{ensure_valid_conversion, options_for_file, ConversionKind};
use crate::output::{ensure_extension, write_artifact, ConversionArtifact, DocumentInfo};
use crate::pipeline::input::{self, FileCategory, SourceFile};
use crate::pipeline::{archive, assemble, encode, markup, render, text, typeset};
use crate::preview::{OutputContainer, PreviewState, SourceStats};
use crate::progress::Reporter;
use image::ImageReader;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info, warn};

const PDF_MEDIA_TYPE: &str = "application/pdf";
const ZIP_MEDIA_TYPE: &str = "application/zip";
const DOCX_MEDIA_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document";

/// Run the `kind` adapter over `files` and return the editable preview.
///
/// # Errors
/// - [`FileConvError::NoFile`] when `files` is empty.
/// - [`FileConvError::TooManyFiles`] when `kind` takes one file and more
///   were given (only image-to-PDF accepts several).
/// - [`FileConvError::FileTooLarge`] / [`FileConvError::UnsupportedFileType`]
///   for a file that fails the upload checks; nothing is converted then.
/// - Any adapter failure, unchanged.
pub async fn convert(
    kind: ConversionKind,
    files: &[SourceFile],
    config: &ConversionConfig,
) -> Result<PreviewState, FileConvError> {
    let start = Instant::now();
    let first = files.first().ok_or(FileConvError::NoFile)?;
    if files.len() > 1 && !kind.accepts_multiple() {
        return Err(FileConvError::TooManyFiles {
            conversion: kind.option().label.to_string(),
            count: files.len(),
        });
    }
    for file in files {
        file.ensure_within(config.max_upload_bytes)?;
        ensure_valid_conversion(file, kind)?;
    }
    info!("Starting {} on {} file(s)", kind, files.len());

    let reporter = Reporter::new(config.progress_callback.clone());

    let preview = match kind {
        ConversionKind::ImageToPdf => {
            let total = files.len();
            reporter.start(total);
            let mut images = Vec::with_capacity(total);
            for (idx, file) in files.iter().enumerate() {
                let n = idx + 1;
                reporter.item_start(n, total);
                match encode::decode_upload(file) {
                    Ok(item) => {
                        reporter.item_complete(n, total, item.data.len());
                        images.push(item);
                    }
                    Err(e) => {
                        reporter.item_error(n, total, &e.to_string());
                        return Err(e);
                    }
                }
            }
            reporter.complete(total);
            PreviewState::ImageSequence {
                images,
                container: OutputContainer::Pdf,
            }
        }

        ConversionKind::PdfToImage => {
            let images = render::rasterize(first, config).await?;
            let container = if images.len() > 1 {
                OutputContainer::Zip
            } else {
                OutputContainer::Image
            };
            PreviewState::ImageSequence { images, container }
        }

        ConversionKind::HtmlToPdf => single_step(&reporter, || {
            Ok(PreviewState::Html {
                html: String::from_utf8_lossy(&first.bytes).into_owned(),
                container: OutputContainer::Pdf,
            })
        })?,

        ConversionKind::DocxToPdf => single_step(&reporter, || {
            Ok(PreviewState::Html {
                html: markup::docx_to_html(&first.name, &first.bytes)?,
                container: OutputContainer::Pdf,
            })
        })?,

        ConversionKind::PptToPdf => single_step(&reporter, || {
            Ok(PreviewState::Text {
                text: text::presentation_summary(),
                title: Some(first.name.clone()),
                source: Some(SourceStats {
                    size_bytes: first.size(),
                    media_type: first.media_type.clone(),
                }),
                container: OutputContainer::Pdf,
            })
        })?,

        ConversionKind::PdfToDocx => {
            let pages = render::extract_page_texts(first, config).await?;
            PreviewState::Text {
                text: text::join_page_texts(&pages),
                title: None,
                source: None,
                container: OutputContainer::Docx,
            }
        }
    };

    info!(
        "{} preview ready ({}) in {}ms",
        kind,
        preview.kind_name(),
        start.elapsed().as_millis()
    );
    Ok(preview)
}

/// Report a one-item conversion around `f`.
fn single_step(
    reporter: &Reporter,
    f: impl FnOnce() -> Result<PreviewState, FileConvError>,
) -> Result<PreviewState, FileConvError> {
    reporter.start(1);
    reporter.item_start(1, 1);
    match f() {
        Ok(preview) => {
            reporter.item_complete(1, 1, 0);
            reporter.complete(1);
            Ok(preview)
        }
        Err(e) => {
            reporter.item_error(1, 1, &e.to_string());
            Err(e)
        }
    }
}

/// Turn a (possibly edited) preview into exactly one artifact.
///
/// | preview        | container           | artifact                       |
/// |----------------|---------------------|--------------------------------|
/// | image-sequence | pdf                 | laid-out PDF                   |
/// | image-sequence | image, one item     | that image's bytes             |
/// | image-sequence | zip, or image ≠ 1   | ZIP of `page-N.<ext>` entries  |
/// | html           | pdf                 | typeset Letter PDF             |
/// | text           | docx                | RTF wrapper, `.docx`           |
/// | text           | pdf                 | centered summary PDF           |
///
/// # Errors
/// - [`FileConvError::NoPagesToExport`] for an image sequence with no items.
/// - [`FileConvError::PreviewMismatch`] for a container the preview kind
///   cannot produce.
pub async fn export(
    preview: &PreviewState,
    config: &ConversionConfig,
) -> Result<ConversionArtifact, FileConvError> {
    let reporter = Reporter::new(config.progress_callback.clone());

    let artifact = match preview {
        PreviewState::ImageSequence { images, container } => {
            if images.is_empty() {
                return Err(FileConvError::NoPagesToExport);
            }
            match (container, images.as_slice()) {
                (OutputContainer::Pdf, _) => {
                    let bytes = assemble::images_to_pdf(images, &config.image_page, &reporter).await?;
                    ConversionArtifact::new(bytes, ".pdf", PDF_MEDIA_TYPE)
                }
                (OutputContainer::Image, [only]) => ConversionArtifact::new(
                    only.data.clone(),
                    &format!(".{}", only.format.extension()),
                    only.format.mime_type(),
                ),
                (OutputContainer::Image | OutputContainer::Zip, _) => {
                    ConversionArtifact::new(archive::zip_images(images)?, ".zip", ZIP_MEDIA_TYPE)
                }
                (OutputContainer::Docx, _) => return Err(mismatch(preview, "export as DOCX")),
            }
        }

        PreviewState::Html { html, container } => match container {
            OutputContainer::Pdf => {
                let blocks = markup::flatten_html(html);
                debug!("Flattened HTML into {} blocks", blocks.len());
                let pages = typeset::typeset_blocks(&blocks, &config.document_page, config.font_size);
                let bytes = assemble::text_pages_to_pdf(pages).await?;
                ConversionArtifact::new(bytes, ".pdf", PDF_MEDIA_TYPE)
            }
            OutputContainer::Zip | OutputContainer::Image | OutputContainer::Docx => {
                return Err(mismatch(preview, "export markup other than as PDF"));
            }
        },

        PreviewState::Text {
            text: body,
            title,
            source,
            container,
        } => match container {
            OutputContainer::Docx => {
                ConversionArtifact::new(text::build_rtf(body).into_bytes(), ".docx", DOCX_MEDIA_TYPE)
            }
            OutputContainer::Pdf => {
                let pages = typeset::typeset_summary(
                    text::SUMMARY_HEADING,
                    title.as_deref().unwrap_or(text::DEFAULT_TITLE),
                    body,
                    source.as_ref(),
                    &config.image_page,
                );
                let bytes = assemble::text_pages_to_pdf(pages).await?;
                ConversionArtifact::new(bytes, ".pdf", PDF_MEDIA_TYPE)
            }
            OutputContainer::Zip | OutputContainer::Image => {
                return Err(mismatch(preview, "export text as images"));
            }
        },
    };

    info!(
        "Exported {} bytes as {}",
        artifact.bytes.len(),
        artifact.extension
    );
    Ok(artifact)
}

fn mismatch(preview: &PreviewState, action: &str) -> FileConvError {
    FileConvError::PreviewMismatch {
        action: action.to_string(),
        kind: preview.kind_name().to_string(),
    }
}

/// Convert and export in one go.
pub async fn convert_to_artifact(
    kind: ConversionKind,
    files: &[SourceFile],
    config: &ConversionConfig,
) -> Result<ConversionArtifact, FileConvError> {
    let preview = convert(kind, files, config).await?;
    export(&preview, config).await
}

/// Resolve each input (path or URL) into a [`SourceFile`], in order.
pub async fn load_inputs(
    inputs: &[impl AsRef<str>],
    config: &ConversionConfig,
) -> Result<Vec<SourceFile>, FileConvError> {
    let mut files = Vec::with_capacity(inputs.len());
    for i in inputs {
        files.push(
            input::resolve_input(i.as_ref(), config.max_upload_bytes, config.download_timeout_secs)
                .await?,
        );
    }
    Ok(files)
}

/// Convert the inputs and write the artifact to `output_path`.
///
/// The artifact's extension is appended unless the path already ends with
/// it. Uses atomic write (temp file + rename) to prevent partial files.
/// Returns the final path.
pub async fn convert_to_file(
    kind: ConversionKind,
    inputs: &[impl AsRef<str>],
    output_path: impl AsRef<Path>,
    config: &ConversionConfig,
) -> Result<PathBuf, FileConvError> {
    let files = load_inputs(inputs, config).await?;
    let artifact = convert_to_artifact(kind, &files, config).await?;
    let path = PathBuf::from(ensure_extension(
        &output_path.as_ref().to_string_lossy(),
        &artifact.extension,
    ));
    write_artifact(&artifact, &path).await?;
    Ok(path)
}

/// Convert in-memory bytes with a display name. The media type is guessed
/// from the name.
pub async fn convert_from_bytes(
    kind: ConversionKind,
    name: &str,
    bytes: Vec<u8>,
    config: &ConversionConfig,
) -> Result<PreviewState, FileConvError> {
    convert(kind, &[SourceFile::from_bytes(name, bytes)], config).await
}

/// Synchronous wrapper around [`convert_to_artifact`].
///
/// Creates a temporary tokio runtime internally.
pub fn convert_sync(
    kind: ConversionKind,
    files: &[SourceFile],
    config: &ConversionConfig,
) -> Result<ConversionArtifact, FileConvError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| FileConvError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(convert_to_artifact(kind, files, config))
}

/// Describe a file without converting it: size, type, image dimensions or
/// PDF details, and the conversions it qualifies for.
///
/// Image and PDF details are best effort; a file the decoders cannot read
/// is still described by name, size and type.
pub async fn inspect(file: &SourceFile, config: &ConversionConfig) -> Result<DocumentInfo, FileConvError> {
    file.ensure_within(config.max_upload_bytes)?;

    let mut info = DocumentInfo {
        name: file.name.clone(),
        size_bytes: file.size(),
        media_type: file.media_type.clone(),
        category: file.category(),
        width: None,
        height: None,
        page_count: None,
        title: None,
        author: None,
        pdf_version: None,
        conversions: options_for_file(file)
            .iter()
            .map(|o| o.id.tag().to_string())
            .collect(),
    };

    match info.category {
        FileCategory::Image => {
            let dims = ImageReader::new(Cursor::new(&file.bytes))
                .with_guessed_format()
                .ok()
                .and_then(|r| r.into_dimensions().ok());
            if let Some((w, h)) = dims {
                info.width = Some(w);
                info.height = Some(h);
            }
        }
        FileCategory::Pdf => match render::read_details(file, config.password.as_deref()).await {
            Ok(details) => {
                info.page_count = Some(details.page_count);
                info.title = details.title;
                info.author = details.author;
                info.pdf_version = Some(details.pdf_version);
            }
            Err(e) => warn!("No PDF details for {}: {}", file.name, e),
        },
        FileCategory::Office | FileCategory::Html | FileCategory::Unknown => {}
    }

    Ok(info)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::preview::{ImagePreviewItem, PixelFormat};
    use image::{DynamicImage, ImageFormat, Rgb, RgbImage};

    fn png(w: u32, h: u32) -> Vec<u8> {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(w, h, Rgb([10, 20, 30])));
        let mut buf = Vec::new();
        img.write_to(&mut Cursor::new(&mut buf), ImageFormat::Png).unwrap();
        buf
    }

    fn config() -> ConversionConfig {
        ConversionConfig::default()
    }

    #[tokio::test]
    async fn no_files_is_an_input_error() {
        let err = convert(ConversionKind::ImageToPdf, &[], &config()).await.unwrap_err();
        assert!(matches!(err, FileConvError::NoFile));
    }

    #[tokio::test]
    async fn single_file_kinds_reject_many() {
        let files = vec![
            SourceFile::from_bytes("a.html", b"<p>a</p>".to_vec()),
            SourceFile::from_bytes("b.html", b"<p>b</p>".to_vec()),
        ];
        let err = convert(ConversionKind::HtmlToPdf, &files, &config()).await.unwrap_err();
        assert!(matches!(err, FileConvError::TooManyFiles { count: 2, .. }));
    }

    #[tokio::test]
    async fn oversize_file_is_rejected_before_conversion() {
        let cfg = ConversionConfig::builder().max_upload_bytes(4).build().unwrap();
        let file = SourceFile::from_bytes("a.html", b"<p>too big</p>".to_vec());
        let err = convert(ConversionKind::HtmlToPdf, &[file], &cfg).await.unwrap_err();
        assert!(matches!(err, FileConvError::FileTooLarge { .. }));
    }

    #[tokio::test]
    async fn unreadable_pdf_is_still_described() {
        let file = SourceFile::from_bytes("junk.pdf", b"not really a pdf".to_vec());
        let info = inspect(&file, &config()).await.unwrap();
        assert_eq!(info.category, FileCategory::Pdf);
        assert_eq!(info.size_bytes, 16);
        assert!(info.page_count.is_none());
        assert!(info.pdf_version.is_none());
        assert_eq!(info.conversions, ["pdf-to-image", "pdf-to-docx"]);
    }

    #[tokio::test]
    async fn bytes_entry_point_guesses_type_from_name() {
        let preview = convert_from_bytes(ConversionKind::HtmlToPdf, "page.HTM", b"<p>x</p>".to_vec(), &config())
            .await
            .unwrap();
        assert_eq!(preview.container(), OutputContainer::Pdf);
        assert_eq!(preview.default_extension(), ".pdf");

        let err = convert_from_bytes(ConversionKind::PdfToDocx, "page.htm", vec![1], &config())
            .await
            .unwrap_err();
        assert!(matches!(err, FileConvError::UnsupportedFileType { .. }));
    }

    #[test]
    fn sync_wrapper_reports_input_errors() {
        let err = convert_sync(ConversionKind::ImageToPdf, &[], &config()).unwrap_err();
        assert!(matches!(err, FileConvError::NoFile));

        let file = SourceFile::from_bytes("notes.txt", b"hello".to_vec());
        let err = convert_sync(ConversionKind::DocxToPdf, &[file], &config()).unwrap_err();
        assert!(matches!(err, FileConvError::UnsupportedFileType { .. }));
    }

    #[tokio::test]
    async fn wrong_type_is_rejected() {
        let file = SourceFile::from_bytes("notes.txt", b"hello".to_vec());
        let err = convert(ConversionKind::DocxToPdf, &[file], &config()).await.unwrap_err();
        assert!(matches!(err, FileConvError::UnsupportedFileType { .. }));
    }

    #[tokio::test]
    async fn images_become_a_pdf_sequence_in_order() {
        let files = vec![
            SourceFile::from_bytes("wide.png", png(8, 6)),
            SourceFile::from_bytes("tall.png", png(6, 8)),
        ];
        let preview = convert(ConversionKind::ImageToPdf, &files, &config()).await.unwrap();
        match preview {
            PreviewState::ImageSequence { images, container } => {
                assert_eq!(container, OutputContainer::Pdf);
                let names: Vec<_> = images.iter().map(|i| i.name.as_str()).collect();
                assert_eq!(names, ["wide.png", "tall.png"]);
                assert_eq!((images[1].width, images[1].height), (6, 8));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test]
    async fn html_is_kept_verbatim() {
        let file = SourceFile::from_bytes("page.html", b"<h1>Hi</h1>".to_vec());
        let preview = convert(ConversionKind::HtmlToPdf, &[file], &config()).await.unwrap();
        assert!(matches!(
            preview,
            PreviewState::Html { ref html, container: OutputContainer::Pdf } if html == "<h1>Hi</h1>"
        ));
    }

    #[tokio::test]
    async fn ppt_gives_titled_summary() {
        let file = SourceFile::from_bytes("deck.pptx", vec![0; 2048]);
        let preview = convert(ConversionKind::PptToPdf, &[file], &config()).await.unwrap();
        match preview {
            PreviewState::Text {
                text,
                title,
                source,
                container,
            } => {
                assert!(text.starts_with("This PDF was generated from a PowerPoint file."));
                assert_eq!(title.as_deref(), Some("deck.pptx"));
                assert_eq!(source.map(|s| s.size_bytes), Some(2048));
                assert_eq!(container, OutputContainer::Pdf);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test]
    async fn text_preview_exports_rtf_docx() {
        let preview = PreviewState::Text {
            text: "\n\n--- Page 1 ---\n\nhello".into(),
            title: None,
            source: None,
            container: OutputContainer::Docx,
        };
        let artifact = export(&preview, &config()).await.unwrap();
        assert_eq!(artifact.extension, ".docx");
        let body = String::from_utf8(artifact.bytes).unwrap();
        assert!(body.starts_with("{\\rtf1"));
        assert!(body.contains("--- Page 1 ---\\par\n\\par\nhello"));
    }

    #[tokio::test]
    async fn single_image_exports_raw_bytes() {
        let item = ImagePreviewItem::new("page-1.jpg", vec![0xFF, 0xD8, 1], PixelFormat::Jpeg, 4, 4);
        let preview = PreviewState::ImageSequence {
            images: vec![item],
            container: OutputContainer::Image,
        };
        let artifact = export(&preview, &config()).await.unwrap();
        assert_eq!(artifact.extension, ".jpg");
        assert_eq!(artifact.media_type, "image/jpeg");
        assert_eq!(artifact.bytes, [0xFF, 0xD8, 1]);
    }

    #[tokio::test]
    async fn image_container_with_several_items_falls_back_to_zip() {
        let items = (1..=2)
            .map(|i| ImagePreviewItem::new(format!("page-{i}.png"), vec![i], PixelFormat::Png, 1, 1))
            .collect();
        let preview = PreviewState::ImageSequence {
            images: items,
            container: OutputContainer::Image,
        };
        let artifact = export(&preview, &config()).await.unwrap();
        assert_eq!(artifact.extension, ".zip");
        assert_eq!(artifact.media_type, "application/zip");
    }

    #[tokio::test]
    async fn empty_sequence_has_nothing_to_export() {
        let preview = PreviewState::ImageSequence {
            images: vec![],
            container: OutputContainer::Zip,
        };
        let err = export(&preview, &config()).await.unwrap_err();
        assert!(matches!(err, FileConvError::NoPagesToExport));
        assert_eq!(err.to_string(), "No pages available to export");
    }

    #[tokio::test]
    async fn impossible_container_is_a_mismatch() {
        let preview = PreviewState::Html {
            html: "<p>x</p>".into(),
            container: OutputContainer::Zip,
        };
        let err = export(&preview, &config()).await.unwrap_err();
        assert!(matches!(err, FileConvError::PreviewMismatch { .. }));
    }

    #[tokio::test]
    async fn inspect_reports_image_dimensions() {
        let file = SourceFile::from_bytes("shot.png", png(12, 7));
        let info = inspect(&file, &config()).await.unwrap();
        assert_eq!(info.category, FileCategory::Image);
        assert_eq!((info.width, info.height), (Some(12), Some(7)));
        assert_eq!(info.conversions, ["image-to-pdf"]);
        assert!(info.page_count.is_none());
    }

    #[tokio::test]
    async fn inspect_never_fails_on_undecodable_images() {
        let file = SourceFile::from_bytes("broken.png", b"garbage".to_vec());
        let info = inspect(&file, &config()).await.unwrap();
        assert_eq!(info.size_bytes, 7);
        assert!(info.width.is_none());
    }
}
