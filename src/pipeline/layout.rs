//! Image layout: one page per image, oriented to the image, image centered.
//!
//! Every image gets its own page. The page takes the image's orientation
//! (landscape when `width >= height`), the image is scaled by
//! `min(avail_w / w, avail_h / h)` where `avail = page - 2 * margin`, and
//! then centered. Small images are scaled up to fill the printable area;
//! large ones are scaled down. Aspect ratio is always preserved.
//!
//! The engine is pure geometry in millimetres. It never reorders its input
//! and never returns an empty layout.

use crate::config::PageGeometry;
use crate::error::FileConvError;
use serde::Serialize;

/// Pixel dimensions of one source image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageSize {
    pub width: u32,
    pub height: u32,
}

impl ImageSize {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn is_landscape(&self) -> bool {
        self.width >= self.height
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    Portrait,
    Landscape,
}

/// Placement of one image on its page. All lengths in millimetres; `x`/`y`
/// measure from the page's left/bottom edge to the image's.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PagePlacement {
    pub orientation: Orientation,
    pub page_width: f32,
    pub page_height: f32,
    pub x: f32,
    pub y: f32,
    pub render_width: f32,
    pub render_height: f32,
}

/// Lay out `images` in order, one page each.
///
/// # Errors
/// - [`FileConvError::NoImages`] when `images` is empty.
/// - [`FileConvError::InvalidImageDimensions`] when an image has a zero side.
pub fn layout_pages(
    images: &[ImageSize],
    page: &PageGeometry,
) -> Result<Vec<PagePlacement>, FileConvError> {
    if images.is_empty() {
        return Err(FileConvError::NoImages);
    }

    images
        .iter()
        .enumerate()
        .map(|(i, img)| place(img, page, i + 1))
        .collect()
}

fn place(img: &ImageSize, page: &PageGeometry, position: usize) -> Result<PagePlacement, FileConvError> {
    if img.width == 0 || img.height == 0 {
        return Err(FileConvError::InvalidImageDimensions {
            name: format!("#{position}"),
            width: img.width,
            height: img.height,
        });
    }

    let landscape = img.is_landscape();
    let (page_width, page_height) = page.oriented(landscape);
    let avail_w = page_width - 2.0 * page.margin_mm;
    let avail_h = page_height - 2.0 * page.margin_mm;

    let (w, h) = (img.width as f32, img.height as f32);
    let scale = (avail_w / w).min(avail_h / h);
    let render_width = w * scale;
    let render_height = h * scale;

    Ok(PagePlacement {
        orientation: if landscape {
            Orientation::Landscape
        } else {
            Orientation::Portrait
        },
        page_width,
        page_height,
        x: (page_width - render_width) / 2.0,
        y: (page_height - render_height) / 2.0,
        render_width,
        render_height,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f32 = 1e-3;

    fn a4() -> PageGeometry {
        PageGeometry::a4()
    }

    #[test]
    fn empty_input_is_an_error() {
        assert!(matches!(layout_pages(&[], &a4()), Err(FileConvError::NoImages)));
    }

    #[test]
    fn zero_dimension_is_rejected() {
        let err = layout_pages(&[ImageSize::new(0, 10)], &a4()).unwrap_err();
        assert!(matches!(err, FileConvError::InvalidImageDimensions { .. }));
    }

    #[test]
    fn landscape_then_portrait() {
        let pages = layout_pages(&[ImageSize::new(800, 600), ImageSize::new(600, 800)], &a4()).unwrap();
        assert_eq!(pages.len(), 2);

        let p1 = pages[0];
        assert_eq!(p1.orientation, Orientation::Landscape);
        assert_eq!((p1.page_width, p1.page_height), (297.0, 210.0));
        // Height-bound: 190 mm available vertically.
        assert!((p1.render_height - 190.0).abs() < EPS);
        assert!((p1.render_width - 190.0 * 4.0 / 3.0).abs() < EPS);

        let p2 = pages[1];
        assert_eq!(p2.orientation, Orientation::Portrait);
        assert_eq!((p2.page_width, p2.page_height), (210.0, 297.0));
        // Width-bound: 190 mm available horizontally.
        assert!((p2.render_width - 190.0).abs() < EPS);
    }

    #[test]
    fn square_image_is_landscape() {
        let pages = layout_pages(&[ImageSize::new(500, 500)], &a4()).unwrap();
        assert_eq!(pages[0].orientation, Orientation::Landscape);
    }

    #[test]
    fn placements_are_centered() {
        let pages = layout_pages(&[ImageSize::new(1000, 200), ImageSize::new(30, 900)], &a4()).unwrap();
        for p in pages {
            assert!((p.x * 2.0 + p.render_width - p.page_width).abs() < EPS);
            assert!((p.y * 2.0 + p.render_height - p.page_height).abs() < EPS);
        }
    }

    #[test]
    fn invariants_hold_for_many_sizes() {
        let page = a4();
        let mut sizes = Vec::new();
        for w in [1u32, 7, 64, 599, 600, 601, 1920, 4000, 12000] {
            for h in [1u32, 9, 480, 600, 1080, 3000, 9000] {
                sizes.push(ImageSize::new(w, h));
            }
        }
        let pages = layout_pages(&sizes, &page).unwrap();
        assert_eq!(pages.len(), sizes.len());

        for (img, p) in sizes.iter().zip(&pages) {
            let landscape = img.width >= img.height;
            assert_eq!(p.orientation == Orientation::Landscape, landscape);
            assert_eq!(p.page_width >= p.page_height, landscape);

            let src_ratio = img.width as f64 / img.height as f64;
            let out_ratio = p.render_width as f64 / p.render_height as f64;
            assert!(
                (src_ratio - out_ratio).abs() / src_ratio < 1e-4,
                "{img:?}: {src_ratio} vs {out_ratio}"
            );

            assert!(p.render_width <= p.page_width - 2.0 * page.margin_mm + EPS);
            assert!(p.render_height <= p.page_height - 2.0 * page.margin_mm + EPS);
            assert!(p.x >= page.margin_mm - EPS && p.y >= page.margin_mm - EPS);
        }
    }

    #[test]
    fn input_order_is_preserved() {
        let sizes = [ImageSize::new(10, 20), ImageSize::new(20, 10), ImageSize::new(10, 20)];
        let orientations: Vec<_> = layout_pages(&sizes, &a4())
            .unwrap()
            .iter()
            .map(|p| p.orientation)
            .collect();
        assert_eq!(
            orientations,
            [Orientation::Portrait, Orientation::Landscape, Orientation::Portrait]
        );
    }
}
