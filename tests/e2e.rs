//! End-to-end integration tests for edgequake-fileconv.
//!
//! Tests that only decode, archive or build previews run everywhere. Tests
//! that read or write PDFs need the pdfium shared library and are gated
//! behind the `E2E_ENABLED` environment variable.
//!
//! Run with:
//!   E2E_ENABLED=1 FILECONV_PDFIUM_PATH=./lib cargo test --test e2e -- --nocapture
//!
//! Generated artifacts are written to `target/e2e-output/` for inspection.

use edgequake_fileconv::pipeline::engine;
use edgequake_fileconv::{
    convert, convert_to_artifact, convert_to_file, export, inspect, ConversionConfig,
    ConversionKind, ConverterSession, FileConvError, OutputContainer, PreviewState, RasterFormat,
    SourceFile,
};
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use std::io::{Cursor, Read, Write};
use std::path::PathBuf;

// ── Test helpers ─────────────────────────────────────────────────────────────

fn output_dir() -> PathBuf {
    let d = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("target/e2e-output");
    std::fs::create_dir_all(&d).ok();
    d
}

/// Skip this test unless E2E_ENABLED is set *and* pdfium can be bound.
macro_rules! e2e_skip_unless_ready {
    () => {{
        if std::env::var("E2E_ENABLED").is_err() {
            println!("SKIP — set E2E_ENABLED=1 to run e2e tests");
            return;
        }
        if !engine::is_available() {
            println!("SKIP — pdfium not found; set FILECONV_PDFIUM_PATH");
            return;
        }
    }};
}

fn encoded(w: u32, h: u32, format: ImageFormat) -> Vec<u8> {
    let img = DynamicImage::ImageRgb8(RgbImage::from_fn(w, h, |x, y| {
        Rgb([(x % 256) as u8, (y % 256) as u8, 128])
    }));
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), format)
        .expect("encode test image");
    buf
}

fn png(name: &str, w: u32, h: u32) -> SourceFile {
    SourceFile::from_bytes(name, encoded(w, h, ImageFormat::Png))
}

/// A minimal DOCX: a ZIP whose `word/document.xml` holds `body`.
fn docx(name: &str, body: &str) -> SourceFile {
    let xml = format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body>{body}</w:body></w:document>"#
    );
    let mut zip = zip::ZipWriter::new(Cursor::new(Vec::new()));
    zip.start_file("word/document.xml", zip::write::SimpleFileOptions::default())
        .expect("start entry");
    zip.write_all(xml.as_bytes()).expect("write entry");
    let bytes = zip.finish().expect("finish zip").into_inner();
    SourceFile::from_bytes(name, bytes)
}

fn page_count(pdf: &[u8]) -> usize {
    let pdfium = engine::bind().expect("pdfium binds");
    let doc = pdfium
        .load_pdf_from_byte_slice(pdf, None)
        .expect("output is a readable PDF");
    doc.pages().len() as usize
}

// ── Without pdfium ───────────────────────────────────────────────────────────

#[tokio::test]
async fn test_image_preview_keeps_upload_order() {
    let files = vec![png("b.png", 40, 30), png("a.png", 30, 40)];
    let preview = convert(ConversionKind::ImageToPdf, &files, &ConversionConfig::default())
        .await
        .expect("preview");

    match &preview {
        PreviewState::ImageSequence { images, container } => {
            assert_eq!(*container, OutputContainer::Pdf);
            let names: Vec<_> = images.iter().map(|i| i.name.as_str()).collect();
            assert_eq!(names, ["b.png", "a.png"]);
            assert_eq!((images[0].width, images[0].height), (40, 30));
        }
        other => panic!("expected image sequence, got {}", other.kind_name()),
    }
}

#[tokio::test]
async fn test_docx_preview_is_html() {
    let file = docx(
        "letter.docx",
        r#"<w:p><w:pPr><w:pStyle w:val="Heading1"/></w:pPr><w:r><w:t>Dear reader</w:t></w:r></w:p>
           <w:p><w:r><w:rPr><w:b/></w:rPr><w:t>Bold</w:t></w:r><w:r><w:t xml:space="preserve"> and plain</w:t></w:r></w:p>"#,
    );
    let preview = convert(ConversionKind::DocxToPdf, &[file], &ConversionConfig::default())
        .await
        .expect("preview");

    match preview {
        PreviewState::Html { html, container } => {
            assert_eq!(container, OutputContainer::Pdf);
            assert!(html.contains("<h1>Dear reader</h1>"), "{html}");
            assert!(html.contains("<strong>Bold</strong> and plain"), "{html}");
        }
        other => panic!("expected html, got {}", other.kind_name()),
    }
}

#[tokio::test]
async fn test_corrupt_docx_is_reported() {
    let file = SourceFile::from_bytes("broken.docx", b"not a zip".to_vec());
    let err = convert(ConversionKind::DocxToPdf, &[file], &ConversionConfig::default())
        .await
        .unwrap_err();
    assert!(matches!(err, FileConvError::MalformedDocument { .. }), "{err}");
}

#[tokio::test]
async fn test_zip_export_of_three_pages() {
    let preview = PreviewState::ImageSequence {
        images: (1..=3)
            .map(|i| {
                edgequake_fileconv::ImagePreviewItem::new(
                    format!("render-{i}.png"),
                    encoded(8, 8, ImageFormat::Png),
                    edgequake_fileconv::PixelFormat::Png,
                    8,
                    8,
                )
            })
            .collect(),
        container: OutputContainer::Zip,
    };

    let artifact = export(&preview, &ConversionConfig::default())
        .await
        .expect("zip export");
    assert_eq!(artifact.extension, ".zip");

    let mut archive = zip::ZipArchive::new(Cursor::new(artifact.bytes)).expect("valid zip");
    let mut names: Vec<String> = archive.file_names().map(str::to_string).collect();
    names.sort();
    assert_eq!(names, ["page-1.png", "page-2.png", "page-3.png"]);

    let mut first = Vec::new();
    archive
        .by_name("page-1.png")
        .expect("entry")
        .read_to_end(&mut first)
        .expect("read entry");
    assert!(image::load_from_memory(&first).is_ok());
}

#[tokio::test]
async fn test_ppt_preview_carries_summary() {
    let file = SourceFile::from_bytes("deck.pptx", vec![0u8; 2048]);
    let preview = convert(ConversionKind::PptToPdf, &[file], &ConversionConfig::default())
        .await
        .expect("preview");
    match preview {
        PreviewState::Text { title, source, container, .. } => {
            assert_eq!(title.as_deref(), Some("deck.pptx"));
            assert_eq!(source.map(|s| s.size_bytes), Some(2048));
            assert_eq!(container, OutputContainer::Pdf);
        }
        other => panic!("expected text, got {}", other.kind_name()),
    }
}

#[tokio::test]
async fn test_inspect_image_reports_dimensions() {
    let info = inspect(&png("photo.png", 64, 48), &ConversionConfig::default())
        .await
        .expect("inspect");
    assert_eq!((info.width, info.height), (Some(64), Some(48)));
    assert_eq!(info.conversions, ["image-to-pdf"]);
    assert!(info.page_count.is_none());
}

#[tokio::test]
async fn test_session_flow_for_html() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut session = ConverterSession::new(ConversionConfig::default());
    session
        .select(vec![SourceFile::from_bytes("Notes.htm", b"<p>hi</p>".to_vec())])
        .expect("select");
    session.convert(ConversionKind::HtmlToPdf).await.expect("convert");
    assert_eq!(session.output_filename(), "Notes.pdf");

    // Text edits are refused on a markup preview, and leave it in place.
    let err = session.set_text("x").unwrap_err();
    assert!(matches!(err, FileConvError::PreviewMismatch { .. }));
    assert!(session.preview().is_some());

    session.set_html("<p>edited</p>").expect("markup edit");
    session.set_output_filename("");
    let (name, _) = match session.prepare_download().await {
        Ok(ready) => ready,
        Err(e) => {
            // Export needs pdfium; without it the failure is recorded.
            assert!(matches!(e, FileConvError::PdfiumBindingFailed(_)), "{e}");
            assert!(session.last_error().is_some());
            return;
        }
    };
    assert_eq!(name, "converted.pdf");
    let path = session.download(dir.path()).await.expect("download");
    assert!(path.exists());
    assert!(session.preview().is_none());
}

// ── With pdfium ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_images_to_pdf_one_page_each() {
    e2e_skip_unless_ready!();

    let files = vec![
        png("wide.png", 800, 600),
        png("tall.png", 600, 800),
        SourceFile::from_bytes("photo.jpg", encoded(320, 200, ImageFormat::Jpeg)),
    ];
    let artifact = convert_to_artifact(ConversionKind::ImageToPdf, &files, &ConversionConfig::default())
        .await
        .expect("image-to-pdf");

    assert_eq!(artifact.extension, ".pdf");
    assert!(artifact.bytes.starts_with(b"%PDF"));
    assert_eq!(page_count(&artifact.bytes), 3);

    let pdfium = engine::bind().expect("pdfium binds");
    let doc = pdfium
        .load_pdf_from_byte_slice(&artifact.bytes, None)
        .expect("readable");
    let first = doc.pages().get(0).expect("page 1");
    let second = doc.pages().get(1).expect("page 2");
    assert!(first.width().value > first.height().value, "page 1 is landscape");
    assert!(second.width().value < second.height().value, "page 2 is portrait");

    std::fs::write(output_dir().join("images.pdf"), &artifact.bytes).ok();
}

#[tokio::test]
async fn test_pdf_round_trip_to_images() {
    e2e_skip_unless_ready!();

    let config = ConversionConfig::default();
    let pdf = convert_to_artifact(
        ConversionKind::ImageToPdf,
        &[png("one.png", 200, 100), png("two.png", 100, 200)],
        &config,
    )
    .await
    .expect("build source pdf");

    let source = SourceFile::from_bytes("two-pages.pdf", pdf.bytes);
    let preview = convert(ConversionKind::PdfToImage, &[source.clone()], &config)
        .await
        .expect("rasterise");
    assert_eq!(preview.image_count(), Some(2));
    assert_eq!(preview.container(), OutputContainer::Zip);

    let zip = export(&preview, &config).await.expect("zip export");
    let archive = zip::ZipArchive::new(Cursor::new(zip.bytes)).expect("valid zip");
    assert_eq!(archive.len(), 2);

    // Dropping a page leaves a single image, exported as itself.
    let png_config = ConversionConfig::builder()
        .raster_format(RasterFormat::Png)
        .build()
        .expect("valid config");
    let mut preview = convert(ConversionKind::PdfToImage, &[source], &png_config)
        .await
        .expect("rasterise");
    preview.remove_image(0).expect("remove");
    let single = export(&preview, &png_config).await.expect("single export");
    assert_eq!(single.extension, ".png");
    assert!(image::load_from_memory(&single.bytes).is_ok());
}

#[tokio::test]
async fn test_docx_to_pdf_file() {
    e2e_skip_unless_ready!();

    let dir = tempfile::tempdir().expect("tempdir");
    let file = docx(
        "memo.docx",
        &"<w:p><w:r><w:t>A line of memo text that is long enough to wrap.</w:t></w:r></w:p>"
            .repeat(80),
    );
    let src = dir.path().join("memo.docx");
    std::fs::write(&src, &file.bytes).expect("write source");

    let out = convert_to_file(
        ConversionKind::DocxToPdf,
        &[src.to_string_lossy()],
        dir.path().join("memo"),
        &ConversionConfig::default(),
    )
    .await
    .expect("docx-to-pdf");

    assert_eq!(out.file_name().and_then(|n| n.to_str()), Some("memo.pdf"));
    let bytes = std::fs::read(&out).expect("read output");
    assert!(page_count(&bytes) >= 2, "80 paragraphs should spill onto a second page");
}

#[tokio::test]
async fn test_pdf_to_docx_extracts_text() {
    e2e_skip_unless_ready!();

    let config = ConversionConfig::default();
    let html = SourceFile::from_bytes(
        "page.html",
        b"<h1>Quarterly report</h1><p>Revenue grew.</p>".to_vec(),
    );
    let pdf = convert_to_artifact(ConversionKind::HtmlToPdf, &[html], &config)
        .await
        .expect("html-to-pdf");

    let source = SourceFile::from_bytes("report.pdf", pdf.bytes);
    let preview = convert(ConversionKind::PdfToDocx, &[source], &config)
        .await
        .expect("pdf-to-docx");
    match &preview {
        PreviewState::Text { text, container, .. } => {
            assert_eq!(*container, OutputContainer::Docx);
            assert!(text.contains("--- Page 1 ---"), "{text}");
            assert!(text.contains("Quarterly report"), "{text}");
        }
        other => panic!("expected text, got {}", other.kind_name()),
    }

    let rtf = export(&preview, &config).await.expect("rtf export");
    assert_eq!(rtf.extension, ".docx");
    assert!(String::from_utf8_lossy(&rtf.bytes).starts_with("{\\rtf1"));
    std::fs::write(output_dir().join("report.docx"), &rtf.bytes).ok();
}

#[tokio::test]
async fn test_inspect_pdf_reports_pages() {
    e2e_skip_unless_ready!();

    let config = ConversionConfig::default();
    let pdf = convert_to_artifact(
        ConversionKind::ImageToPdf,
        &[png("a.png", 10, 10), png("b.png", 10, 10), png("c.png", 10, 10)],
        &config,
    )
    .await
    .expect("build pdf");

    let info = inspect(&SourceFile::from_bytes("three.pdf", pdf.bytes), &config)
        .await
        .expect("inspect");
    assert_eq!(info.page_count, Some(3));
    assert!(info.pdf_version.is_some());
    assert_eq!(info.conversions, ["pdf-to-image", "pdf-to-docx"]);
}

#[tokio::test]
async fn test_garbage_pdf_is_corrupt() {
    e2e_skip_unless_ready!();

    let file = SourceFile::from_bytes("junk.pdf", b"%PDF-1.7 nonsense".to_vec());
    let err = convert(ConversionKind::PdfToImage, &[file], &ConversionConfig::default())
        .await
        .unwrap_err();
    assert!(matches!(err, FileConvError::CorruptPdf { .. }), "{err}");
}
