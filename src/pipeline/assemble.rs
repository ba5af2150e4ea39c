//! PDF assembly via pdfium: image pages from a layout, text pages from the
//! typesetter.
//!
//! Both builders run under `spawn_blocking` for the same reason rendering
//! does (see [`crate::pipeline::render`]).

use crate::config::PageGeometry;
use crate::error::FileConvError;
use crate::pipeline::encode::decode_item;
use crate::pipeline::engine;
use crate::pipeline::layout::{layout_pages, ImageSize};
use crate::pipeline::typeset::TypesetPage;
use crate::preview::ImagePreviewItem;
use crate::progress::Reporter;
use pdfium_render::prelude::*;
use tracing::{debug, info, warn};

fn assembly_err(e: PdfiumError) -> FileConvError {
    FileConvError::PdfAssemblyFailed(format!("{:?}", e))
}

/// Build a PDF with one page per image, laid out on `page`.
pub(crate) async fn images_to_pdf(
    images: &[ImagePreviewItem],
    page: &PageGeometry,
    reporter: &Reporter,
) -> Result<Vec<u8>, FileConvError> {
    let images = images.to_vec();
    let page = *page;
    let reporter = reporter.clone();

    tokio::task::spawn_blocking(move || images_to_pdf_blocking(&images, &page, &reporter))
        .await
        .map_err(|e| FileConvError::Internal(format!("Assembly task panicked: {}", e)))?
}

fn images_to_pdf_blocking(
    images: &[ImagePreviewItem],
    geometry: &PageGeometry,
    reporter: &Reporter,
) -> Result<Vec<u8>, FileConvError> {
    if let Some(bad) = images.iter().find(|i| i.width == 0 || i.height == 0) {
        return Err(FileConvError::InvalidImageDimensions {
            name: bad.name.clone(),
            width: bad.width,
            height: bad.height,
        });
    }
    let sizes: Vec<ImageSize> = images
        .iter()
        .map(|i| ImageSize::new(i.width, i.height))
        .collect();
    let placements = layout_pages(&sizes, geometry)?;

    let pdfium = engine::bind()?;
    let mut document = pdfium.create_new_pdf().map_err(assembly_err)?;
    let total = images.len();
    reporter.start(total);

    for (idx, (item, placement)) in images.iter().zip(&placements).enumerate() {
        let n = idx + 1;
        reporter.item_start(n, total);

        let result = decode_item(item).and_then(|img| {
            let mut object = PdfPageImageObject::new_with_size(
                &document,
                &img,
                PdfPoints::from_mm(placement.render_width),
                PdfPoints::from_mm(placement.render_height),
            )
            .map_err(assembly_err)?;
            object
                .translate(PdfPoints::from_mm(placement.x), PdfPoints::from_mm(placement.y))
                .map_err(assembly_err)?;
            let mut pdf_page = document
                .pages_mut()
                .create_page_at_end(PdfPagePaperSize::from_points(
                    PdfPoints::from_mm(placement.page_width),
                    PdfPoints::from_mm(placement.page_height),
                ))
                .map_err(assembly_err)?;
            pdf_page
                .objects_mut()
                .add_image_object(object)
                .map_err(assembly_err)?;
            Ok(())
        });

        if let Err(e) = result {
            reporter.item_error(n, total, &e.to_string());
            return Err(e);
        }

        debug!(
            "Placed {} on {:?} page {:.0}x{:.0} mm",
            item.name, placement.orientation, placement.page_width, placement.page_height
        );
        reporter.item_complete(n, total, item.data.len());
    }

    let bytes = document.save_to_bytes().map_err(assembly_err)?;
    reporter.complete(total);
    info!("Assembled {} image pages ({} bytes)", total, bytes.len());
    Ok(bytes)
}

/// Build a PDF from typeset text pages using the standard Helvetica faces.
///
/// The standard 14 fonts are not embedded and only carry the WinAnsi
/// (Latin-1 plus cp1252) repertoire. Characters outside it, CJK and most
/// symbols among them, are written as `?` and counted in a warning. Width
/// estimates in [`crate::pipeline::typeset`] assume the same repertoire.
pub async fn text_pages_to_pdf(pages: Vec<TypesetPage>) -> Result<Vec<u8>, FileConvError> {
    tokio::task::spawn_blocking(move || text_pages_to_pdf_blocking(&pages))
        .await
        .map_err(|e| FileConvError::Internal(format!("Assembly task panicked: {}", e)))?
}

fn text_pages_to_pdf_blocking(pages: &[TypesetPage]) -> Result<Vec<u8>, FileConvError> {
    let pdfium = engine::bind()?;
    let mut document = pdfium.create_new_pdf().map_err(assembly_err)?;
    let regular = document.fonts_mut().helvetica();
    let bold = document.fonts_mut().helvetica_bold();

    let mut replaced = 0usize;
    for page in pages {
        let mut pdf_page = document
            .pages_mut()
            .create_page_at_end(PdfPagePaperSize::from_points(
                PdfPoints::new(page.width),
                PdfPoints::new(page.height),
            ))
            .map_err(assembly_err)?;

        for line in &page.lines {
            if line.text.is_empty() {
                continue;
            }
            let font = if line.bold { bold } else { regular };
            let (text, lost) = to_winansi(&line.text);
            replaced += lost;
            let mut object = pdf_page
                .objects_mut()
                .create_text_object(
                    PdfPoints::new(line.x),
                    PdfPoints::new(line.y),
                    &text,
                    font,
                    PdfPoints::new(line.font_size),
                )
                .map_err(assembly_err)?;
            if line.gray > 0 {
                object
                    .set_fill_color(PdfColor::new(line.gray, line.gray, line.gray, 255))
                    .map_err(assembly_err)?;
            }
        }
    }

    if replaced > 0 {
        warn!(
            "{} character(s) outside the Helvetica (WinAnsi) repertoire were replaced with '?'",
            replaced
        );
    }
    let bytes = document.save_to_bytes().map_err(assembly_err)?;
    info!("Assembled {} text pages ({} bytes)", pages.len(), bytes.len());
    Ok(bytes)
}

/// cp1252 characters above U+00FF that the standard fonts can still show.
const CP1252_EXTRAS: &[char] = &[
    '\u{20AC}', '\u{201A}', '\u{0192}', '\u{201E}', '\u{2026}', '\u{2020}', '\u{2021}',
    '\u{02C6}', '\u{2030}', '\u{0160}', '\u{2039}', '\u{0152}', '\u{017D}', '\u{2018}',
    '\u{2019}', '\u{201C}', '\u{201D}', '\u{2022}', '\u{2013}', '\u{2014}', '\u{02DC}',
    '\u{2122}', '\u{0161}', '\u{203A}', '\u{0153}', '\u{017E}', '\u{0178}',
];

/// Replace characters the WinAnsi encoding cannot hold with `?`. Returns
/// the text and the number of replacements.
fn to_winansi(text: &str) -> (String, usize) {
    let mut replaced = 0;
    let out = text
        .chars()
        .map(|c| match c {
            '\u{0020}'..='\u{007E}' | '\u{00A0}'..='\u{00FF}' => c,
            c if CP1252_EXTRAS.contains(&c) => c,
            _ => {
                replaced += 1;
                '?'
            }
        })
        .collect();
    (out, replaced)
}
