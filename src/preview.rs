//! The editable preview of a pending conversion.
//!
//! A conversion never produces a file directly. It produces a
//! [`PreviewState`] that the caller may inspect and edit (reorder or drop
//! pages, rewrite markup or text) before [`crate::export`] turns it into
//! exactly one artifact.

use crate::error::FileConvError;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};

/// Encoded pixel format of a preview image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PixelFormat {
    Png,
    Jpeg,
    Webp,
    Gif,
}

impl PixelFormat {
    pub fn mime_type(&self) -> &'static str {
        match self {
            PixelFormat::Png => "image/png",
            PixelFormat::Jpeg => "image/jpeg",
            PixelFormat::Webp => "image/webp",
            PixelFormat::Gif => "image/gif",
        }
    }

    /// File extension without the dot.
    pub fn extension(&self) -> &'static str {
        match self {
            PixelFormat::Png => "png",
            PixelFormat::Jpeg => "jpg",
            PixelFormat::Webp => "webp",
            PixelFormat::Gif => "gif",
        }
    }

    /// Map a decoder-detected format; anything outside the four preview
    /// formats returns `None` and is re-encoded as PNG by the caller.
    pub fn from_image_format(format: image::ImageFormat) -> Option<Self> {
        match format {
            image::ImageFormat::Png => Some(PixelFormat::Png),
            image::ImageFormat::Jpeg => Some(PixelFormat::Jpeg),
            image::ImageFormat::WebP => Some(PixelFormat::Webp),
            image::ImageFormat::Gif => Some(PixelFormat::Gif),
            _ => None,
        }
    }
}

/// One page or image of an image-sequence preview.
///
/// Serialises with the encoded bytes as a `data:` URL under `src`.
#[derive(Debug, Clone)]
pub struct ImagePreviewItem {
    pub id: String,
    /// Encoded image bytes in `format`.
    pub data: Vec<u8>,
    pub name: String,
    pub format: PixelFormat,
    pub width: u32,
    pub height: u32,
}

impl ImagePreviewItem {
    pub fn new(
        name: impl Into<String>,
        data: Vec<u8>,
        format: PixelFormat,
        width: u32,
        height: u32,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            data,
            name: name.into(),
            format,
            width,
            height,
        }
    }

    pub fn data_url(&self) -> String {
        format!(
            "data:{};base64,{}",
            self.format.mime_type(),
            STANDARD.encode(&self.data)
        )
    }
}

impl Serialize for ImagePreviewItem {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut s = serializer.serialize_struct("ImagePreviewItem", 6)?;
        s.serialize_field("id", &self.id)?;
        s.serialize_field("src", &self.data_url())?;
        s.serialize_field("name", &self.name)?;
        s.serialize_field("format", &self.format)?;
        s.serialize_field("width", &self.width)?;
        s.serialize_field("height", &self.height)?;
        s.end()
    }
}

/// Size and type of the file a text preview was generated from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceStats {
    pub size_bytes: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub media_type: Option<String>,
}

/// Where an exported preview ends up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputContainer {
    Pdf,
    Zip,
    /// A single image file in the item's own format.
    Image,
    Docx,
}

/// The pending result of one conversion attempt.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum PreviewState {
    ImageSequence {
        images: Vec<ImagePreviewItem>,
        container: OutputContainer,
    },
    Html {
        html: String,
        container: OutputContainer,
    },
    Text {
        text: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        title: Option<String>,
        /// Printed under a summary PDF when present.
        #[serde(skip_serializing_if = "Option::is_none")]
        source: Option<SourceStats>,
        container: OutputContainer,
    },
}

impl PreviewState {
    pub fn container(&self) -> OutputContainer {
        match self {
            PreviewState::ImageSequence { container, .. }
            | PreviewState::Html { container, .. }
            | PreviewState::Text { container, .. } => *container,
        }
    }

    /// Short name of the variant, for messages.
    pub fn kind_name(&self) -> &'static str {
        match self {
            PreviewState::ImageSequence { .. } => "an image sequence",
            PreviewState::Html { .. } => "HTML markup",
            PreviewState::Text { .. } => "plain text",
        }
    }

    /// Extension (with dot) the export of this preview will carry.
    pub fn default_extension(&self) -> String {
        match self {
            PreviewState::ImageSequence { images, container } => match (container, images.as_slice()) {
                (OutputContainer::Image, [only]) => format!(".{}", only.format.extension()),
                (OutputContainer::Image | OutputContainer::Zip, _) => ".zip".into(),
                (OutputContainer::Pdf, _) => ".pdf".into(),
                (OutputContainer::Docx, _) => ".docx".into(),
            },
            PreviewState::Html { .. } => ".pdf".into(),
            PreviewState::Text { container, .. } => match container {
                OutputContainer::Docx => ".docx".into(),
                OutputContainer::Pdf | OutputContainer::Zip | OutputContainer::Image => ".pdf".into(),
            },
        }
    }

    /// Number of images, or `None` for markup/text previews.
    pub fn image_count(&self) -> Option<usize> {
        match self {
            PreviewState::ImageSequence { images, .. } => Some(images.len()),
            PreviewState::Html { .. } | PreviewState::Text { .. } => None,
        }
    }

    fn images_mut(&mut self, action: &str) -> Result<&mut Vec<ImagePreviewItem>, FileConvError> {
        let kind = self.kind_name();
        match self {
            PreviewState::ImageSequence { images, .. } => Ok(images),
            PreviewState::Html { .. } | PreviewState::Text { .. } => {
                Err(FileConvError::PreviewMismatch {
                    action: action.to_string(),
                    kind: kind.to_string(),
                })
            }
        }
    }

    /// Move the image at `from` to position `to` (0-based), shifting the
    /// others.
    pub fn move_image(&mut self, from: usize, to: usize) -> Result<(), FileConvError> {
        let images = self.images_mut("reorder pages")?;
        let len = images.len();
        for index in [from, to] {
            if index >= len {
                return Err(FileConvError::PreviewIndexOutOfRange { index, len });
            }
        }
        let item = images.remove(from);
        images.insert(to, item);
        Ok(())
    }

    /// Remove the image at `index` (0-based) and return it.
    pub fn remove_image(&mut self, index: usize) -> Result<ImagePreviewItem, FileConvError> {
        let images = self.images_mut("remove pages")?;
        let len = images.len();
        if index >= len {
            return Err(FileConvError::PreviewIndexOutOfRange { index, len });
        }
        Ok(images.remove(index))
    }

    /// Reorder images by a permutation of 0-based positions. Positions not
    /// listed are dropped; duplicates and out-of-range positions are errors.
    pub fn reorder_images(&mut self, order: &[usize]) -> Result<(), FileConvError> {
        let images = self.images_mut("reorder pages")?;
        let len = images.len();
        let mut seen = vec![false; len];
        for &index in order {
            if index >= len {
                return Err(FileConvError::PreviewIndexOutOfRange { index, len });
            }
            if seen[index] {
                return Err(FileConvError::DuplicatePreviewPosition { index });
            }
            seen[index] = true;
        }
        let mut slots: Vec<Option<ImagePreviewItem>> = images.drain(..).map(Some).collect();
        images.extend(order.iter().filter_map(|&i| slots[i].take()));
        Ok(())
    }

    /// Replace the markup of an HTML preview.
    pub fn set_html(&mut self, new_html: impl Into<String>) -> Result<(), FileConvError> {
        let kind = self.kind_name();
        match self {
            PreviewState::Html { html, .. } => {
                *html = new_html.into();
                Ok(())
            }
            PreviewState::ImageSequence { .. } | PreviewState::Text { .. } => {
                Err(FileConvError::PreviewMismatch {
                    action: "edit markup".into(),
                    kind: kind.into(),
                })
            }
        }
    }

    /// Replace the text of a plain-text preview.
    pub fn set_text(&mut self, new_text: impl Into<String>) -> Result<(), FileConvError> {
        let kind = self.kind_name();
        match self {
            PreviewState::Text { text, .. } => {
                *text = new_text.into();
                Ok(())
            }
            PreviewState::ImageSequence { .. } | PreviewState::Html { .. } => {
                Err(FileConvError::PreviewMismatch {
                    action: "edit text".into(),
                    kind: kind.into(),
                })
            }
        }
    }
}
