//! Plain-text products: page-marked extraction output, the RTF wrapper used
//! for the `.docx` download, and the presentation summary.

/// Heading printed at the top of a summary PDF.
pub const SUMMARY_HEADING: &str = "PowerPoint Presentation";

/// Default title for a text preview that has none.
pub const DEFAULT_TITLE: &str = "Document";

/// Explanation shown in place of rendered slides.
const PRESENTATION_SUMMARY: [&str; 12] = [
    "This PDF was generated from a PowerPoint file.",
    "",
    "Note: Full PowerPoint rendering requires:",
    "- LibreOffice or Microsoft Office",
    "- Server-side processing",
    "",
    "For complete conversion with formatting, animations,",
    "and graphics, please use professional tools like:",
    "- Adobe Acrobat",
    "- CloudConvert.com",
    "- Smallpdf.com",
    "- Microsoft PowerPoint (Save as PDF)",
];

const RTF_HEADER: &str = "{\\rtf1\\ansi\\deff0\n\
{\\fonttbl{\\f0\\fnil\\fcharset0 Arial;}}\n\
{\\colortbl;\\red0\\green0\\blue0;}\n\
\\viewkind4\\uc1\\pard\\cf1\\f0\\fs22\n";

/// Join per-page text, each page preceded by a `--- Page N ---` marker.
///
/// Whitespace inside a page is collapsed to single spaces, so the result
/// has one line per page between markers.
pub fn join_page_texts(pages: &[String]) -> String {
    let mut out = String::new();
    for (i, page) in pages.iter().enumerate() {
        let flat = page.split_whitespace().collect::<Vec<_>>().join(" ");
        out.push_str(&format!("\n\n--- Page {} ---\n\n{}", i + 1, flat));
    }
    out
}

/// The summary text for a presentation, one line per entry.
pub fn presentation_summary() -> String {
    PRESENTATION_SUMMARY.join("\n")
}

/// Wrap `text` in a minimal RTF document. Line breaks become paragraph
/// breaks; RTF control characters and non-ASCII are escaped.
pub fn build_rtf(text: &str) -> String {
    let mut out = String::with_capacity(RTF_HEADER.len() + text.len() + 16);
    out.push_str(RTF_HEADER);

    for ch in text.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '{' => out.push_str("\\{"),
            '}' => out.push_str("\\}"),
            '\n' => out.push_str("\\par\n"),
            '\r' => {}
            '\t' => out.push_str("\\tab "),
            c if c.is_ascii() => out.push(c),
            c => {
                let mut units = [0u16; 2];
                for unit in c.encode_utf16(&mut units) {
                    // RTF takes signed 16-bit code units.
                    out.push_str(&format!("\\u{}?", *unit as i16));
                }
            }
        }
    }

    out.push_str("\n}");
    out
}
