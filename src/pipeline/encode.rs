//! Image codecs: decode uploads into preview items, encode rendered pages.
//!
//! Uploaded images keep their original bytes whenever they are already in
//! one of the four preview formats (PNG, JPEG, WebP, GIF); only their
//! dimensions are read. Anything else the decoder understands (BMP, TIFF…)
//! is re-encoded as PNG once, on ingest.

use crate::config::RasterFormat;
use crate::error::FileConvError;
use crate::pipeline::input::SourceFile;
use crate::preview::{ImagePreviewItem, PixelFormat};
use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, ImageFormat, ImageReader};
use std::io::Cursor;
use tracing::debug;

/// Decode an uploaded image into a preview item.
pub fn decode_upload(file: &SourceFile) -> Result<ImagePreviewItem, FileConvError> {
    let decode_err = |detail: String| FileConvError::ImageDecodeFailed {
        name: file.name.clone(),
        detail,
    };

    let reader = ImageReader::new(Cursor::new(&file.bytes))
        .with_guessed_format()
        .map_err(|e| decode_err(e.to_string()))?;
    let detected = reader
        .format()
        .ok_or_else(|| decode_err("unrecognised image format".into()))?;

    match PixelFormat::from_image_format(detected) {
        Some(format) => {
            let (width, height) = reader
                .into_dimensions()
                .map_err(|e| decode_err(e.to_string()))?;
            debug!("Image {} → {:?} {}x{}", file.name, format, width, height);
            Ok(ImagePreviewItem::new(
                file.name.clone(),
                file.bytes.clone(),
                format,
                width,
                height,
            ))
        }
        None => {
            let img = reader.decode().map_err(|e| decode_err(e.to_string()))?;
            let png = encode_png(&img)?;
            debug!(
                "Image {} re-encoded {:?} → PNG {}x{}",
                file.name,
                detected,
                img.width(),
                img.height()
            );
            Ok(ImagePreviewItem::new(
                file.name.clone(),
                png,
                PixelFormat::Png,
                img.width(),
                img.height(),
            ))
        }
    }
}

/// Decode a preview item's bytes back into pixels.
pub fn decode_item(item: &ImagePreviewItem) -> Result<DynamicImage, FileConvError> {
    let format = match item.format {
        PixelFormat::Png => ImageFormat::Png,
        PixelFormat::Jpeg => ImageFormat::Jpeg,
        PixelFormat::Webp => ImageFormat::WebP,
        PixelFormat::Gif => ImageFormat::Gif,
    };
    image::load_from_memory_with_format(&item.data, format).map_err(|e| {
        FileConvError::ImageDecodeFailed {
            name: item.name.clone(),
            detail: e.to_string(),
        }
    })
}

/// Encode a rendered page in the configured raster format.
pub fn encode_page(
    img: &DynamicImage,
    format: RasterFormat,
    jpeg_quality: u8,
) -> Result<(Vec<u8>, PixelFormat), FileConvError> {
    match format {
        RasterFormat::Png => Ok((encode_png(img)?, PixelFormat::Png)),
        RasterFormat::Jpeg => Ok((encode_jpeg(img, jpeg_quality)?, PixelFormat::Jpeg)),
    }
}

fn encode_png(img: &DynamicImage) -> Result<Vec<u8>, FileConvError> {
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
        .map_err(|e| FileConvError::ImageEncodeFailed {
            format: "PNG".into(),
            detail: e.to_string(),
        })?;
    Ok(buf)
}

fn encode_jpeg(img: &DynamicImage, quality: u8) -> Result<Vec<u8>, FileConvError> {
    // JPEG has no alpha channel.
    let rgb = DynamicImage::ImageRgb8(img.to_rgb8());
    let mut buf = Vec::new();
    let encoder = JpegEncoder::new_with_quality(&mut buf, quality);
    rgb.write_with_encoder(encoder)
        .map_err(|e| FileConvError::ImageEncodeFailed {
            format: "JPEG".into(),
            detail: e.to_string(),
        })?;
    Ok(buf)
}
