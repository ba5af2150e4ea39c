//! The fixed catalogue of conversions.
//!
//! Six conversions exist, each described by a static [`ConversionOption`].
//! [`ConversionKind`] is the closed enumeration used everywhere else; string
//! tags only exist at the edges (CLI flags, JSON) and are parsed once.

use crate::error::FileConvError;
use crate::pipeline::input::SourceFile;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// One of the six supported conversions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ConversionKind {
    ImageToPdf,
    PdfToImage,
    HtmlToPdf,
    DocxToPdf,
    PptToPdf,
    PdfToDocx,
}

/// Static descriptor of a conversion.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct ConversionOption {
    pub id: ConversionKind,
    pub label: &'static str,
    /// Lower-case extensions (without the dot) this conversion accepts.
    pub from: &'static [&'static str],
    /// Extension (without the dot) of the produced artifact.
    pub to: &'static str,
    pub description: &'static str,
}

/// Every conversion, in display order.
pub static CONVERSION_OPTIONS: [ConversionOption; 6] = [
    ConversionOption {
        id: ConversionKind::ImageToPdf,
        label: "Image to PDF",
        from: &["jpg", "jpeg", "png", "gif", "webp", "bmp"],
        to: "pdf",
        description: "Convert images to PDF format",
    },
    ConversionOption {
        id: ConversionKind::PdfToImage,
        label: "PDF to Image",
        from: &["pdf"],
        to: "jpg",
        description: "Convert PDF pages to images",
    },
    ConversionOption {
        id: ConversionKind::HtmlToPdf,
        label: "HTML to PDF",
        from: &["html", "htm"],
        to: "pdf",
        description: "Convert HTML files to PDF",
    },
    ConversionOption {
        id: ConversionKind::DocxToPdf,
        label: "DOCX to PDF",
        from: &["docx", "doc"],
        to: "pdf",
        description: "Convert Word documents to PDF",
    },
    ConversionOption {
        id: ConversionKind::PptToPdf,
        label: "PPT to PDF",
        from: &["ppt", "pptx"],
        to: "pdf",
        description: "Convert PowerPoint presentations to PDF",
    },
    ConversionOption {
        id: ConversionKind::PdfToDocx,
        label: "PDF to DOCX",
        from: &["pdf"],
        to: "docx",
        description: "Convert PDF to Word document",
    },
];

impl ConversionKind {
    /// All kinds, in display order.
    pub fn all() -> impl Iterator<Item = ConversionKind> {
        CONVERSION_OPTIONS.iter().map(|o| o.id)
    }

    /// The kebab-case tag, e.g. `"image-to-pdf"`.
    pub fn tag(&self) -> &'static str {
        match self {
            ConversionKind::ImageToPdf => "image-to-pdf",
            ConversionKind::PdfToImage => "pdf-to-image",
            ConversionKind::HtmlToPdf => "html-to-pdf",
            ConversionKind::DocxToPdf => "docx-to-pdf",
            ConversionKind::PptToPdf => "ppt-to-pdf",
            ConversionKind::PdfToDocx => "pdf-to-docx",
        }
    }

    /// The static descriptor for this kind.
    pub fn option(&self) -> &'static ConversionOption {
        match self {
            ConversionKind::ImageToPdf => &CONVERSION_OPTIONS[0],
            ConversionKind::PdfToImage => &CONVERSION_OPTIONS[1],
            ConversionKind::HtmlToPdf => &CONVERSION_OPTIONS[2],
            ConversionKind::DocxToPdf => &CONVERSION_OPTIONS[3],
            ConversionKind::PptToPdf => &CONVERSION_OPTIONS[4],
            ConversionKind::PdfToDocx => &CONVERSION_OPTIONS[5],
        }
    }

    /// Whether the conversion takes several source files at once.
    pub fn accepts_multiple(&self) -> bool {
        matches!(self, ConversionKind::ImageToPdf)
    }
}

impl fmt::Display for ConversionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl FromStr for ConversionKind {
    type Err = FileConvError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let tag = s.trim().to_ascii_lowercase();
        if let Some(kind) = ConversionKind::all().find(|k| k.tag() == tag) {
            return Ok(kind);
        }
        // Advertised but never built: slide decks need an office suite.
        if tag == "pdf-to-ppt" {
            return Err(FileConvError::RequiresServer {
                conversion: "PDF to PPT".into(),
            });
        }
        Err(FileConvError::UnknownConversion(s.to_string()))
    }
}

impl ConversionOption {
    /// Whether `file` is an acceptable source: its extension is listed, or
    /// its reported media type mentions one of the listed extensions.
    pub fn accepts(&self, file: &SourceFile) -> bool {
        let ext = file.extension();
        if self.from.contains(&ext.as_str()) {
            return true;
        }
        match file.media_type.as_deref() {
            Some(mt) => {
                let mt = mt.to_ascii_lowercase();
                self.from.iter().any(|e| mt.contains(e))
            }
            None => false,
        }
    }
}

/// The conversions applicable to `file`, in display order.
pub fn options_for_file(file: &SourceFile) -> Vec<&'static ConversionOption> {
    CONVERSION_OPTIONS.iter().filter(|o| o.accepts(file)).collect()
}

/// Check that `file` can be converted with `kind`.
pub fn ensure_valid_conversion(file: &SourceFile, kind: ConversionKind) -> Result<(), FileConvError> {
    let option = kind.option();
    if option.accepts(file) {
        Ok(())
    } else {
        Err(FileConvError::UnsupportedFileType {
            name: file.name.clone(),
            conversion: option.label.to_string(),
            expected: option.from.join(", "),
        })
    }
}
