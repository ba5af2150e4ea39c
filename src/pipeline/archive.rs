//! ZIP packaging for multi-image exports.

use crate::error::FileConvError;
use crate::preview::ImagePreviewItem;
use std::io::{Cursor, Write};
use tracing::debug;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

/// Pack images into an in-memory ZIP, one entry per image, named
/// `page-N.<ext>` by position (1-based) regardless of the item's own name.
pub fn zip_images(images: &[ImagePreviewItem]) -> Result<Vec<u8>, FileConvError> {
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    // Already-compressed image data gains nothing from deflate.
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);

    for (i, item) in images.iter().enumerate() {
        let entry = entry_name(i, item);
        zip.start_file(entry.as_str(), options)?;
        zip.write_all(&item.data)
            .map_err(|e| FileConvError::ArchiveFailed(format!("{entry}: {e}")))?;
    }

    let bytes = zip.finish()?.into_inner();
    debug!("Packed {} images into {} byte archive", images.len(), bytes.len());
    Ok(bytes)
}

fn entry_name(index: usize, item: &ImagePreviewItem) -> String {
    format!("page-{}.{}", index + 1, item.format.extension())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::preview::PixelFormat;
    use zip::ZipArchive;

    #[test]
    fn entries_are_numbered_by_position() {
        let images = vec![
            ImagePreviewItem::new("cover.png", vec![1], PixelFormat::Png, 1, 1),
            ImagePreviewItem::new("b.jpg", vec![2, 2], PixelFormat::Jpeg, 1, 1),
            ImagePreviewItem::new("c.png", vec![3, 3, 3], PixelFormat::Png, 1, 1),
        ];
        let bytes = zip_images(&images).unwrap();

        let mut archive = ZipArchive::new(Cursor::new(bytes)).unwrap();
        assert_eq!(archive.len(), 3);
        let names: Vec<String> = (0..3)
            .map(|i| archive.by_index(i).unwrap().name().to_string())
            .collect();
        assert_eq!(names, ["page-1.png", "page-2.jpg", "page-3.png"]);

        let mut second = Vec::new();
        std::io::Read::read_to_end(&mut archive.by_name("page-2.jpg").unwrap(), &mut second).unwrap();
        assert_eq!(second, [2, 2]);
    }

    #[test]
    fn empty_input_gives_empty_archive() {
        let bytes = zip_images(&[]).unwrap();
        let archive = ZipArchive::new(Cursor::new(bytes)).unwrap();
        assert_eq!(archive.len(), 0);
    }
}
