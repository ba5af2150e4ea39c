//! Text typesetting: wrap and paginate text into positioned lines.
//!
//! Pure geometry in PDF points (1/72 in), origin at the page's bottom-left
//! corner, `y` being the baseline. Glyph widths are estimated from coarse
//! Helvetica character classes rather than measured, so wrapping is
//! deterministic and needs no font engine. The estimate errs wide, which
//! keeps lines inside the margin.

use crate::config::PageGeometry;
use crate::pipeline::markup::{BlockKind, TextBlock};
use crate::preview::SourceStats;

/// Points per millimetre.
pub const PT_PER_MM: f32 = 72.0 / 25.4;

const LINE_SPACING: f32 = 1.2;
const BULLET: &str = "• ";

/// One positioned line of text.
#[derive(Debug, Clone, PartialEq)]
pub struct TypesetLine {
    pub text: String,
    pub x: f32,
    pub y: f32,
    pub font_size: f32,
    pub bold: bool,
    /// Fill gray level, 0 = black.
    pub gray: u8,
}

/// One page of positioned lines. Dimensions in points.
#[derive(Debug, Clone, PartialEq)]
pub struct TypesetPage {
    pub width: f32,
    pub height: f32,
    pub lines: Vec<TypesetLine>,
}

/// Estimated advance width of `text` in Helvetica at `size` points.
pub fn estimate_width(text: &str, size: f32) -> f32 {
    let em: f32 = text
        .chars()
        .map(|c| match c {
            ' ' | 'i' | 'j' | 'l' | 't' | 'f' | 'r' | 'I' | '.' | ',' | ':' | ';' | '\'' | '|'
            | '!' | '(' | ')' | '[' | ']' | '-' => 0.34,
            'm' | 'w' | 'M' | 'W' | '@' | '%' => 0.89,
            c if c.is_ascii_uppercase() => 0.72,
            c if c.is_ascii_digit() || c.is_ascii_lowercase() => 0.56,
            _ => 0.6,
        })
        .sum();
    em * size
}

/// Greedy word wrap to `max_width` points. Words wider than a line are
/// split by character. Never returns an empty vector.
pub fn wrap(text: &str, size: f32, max_width: f32) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();

    for word in text.split_whitespace() {
        let candidate = if current.is_empty() {
            word.to_string()
        } else {
            format!("{current} {word}")
        };
        if estimate_width(&candidate, size) <= max_width {
            current = candidate;
            continue;
        }
        if !current.is_empty() {
            lines.push(std::mem::take(&mut current));
        }
        if estimate_width(word, size) <= max_width {
            current = word.to_string();
        } else {
            for ch in word.chars() {
                let mut next = current.clone();
                next.push(ch);
                if !current.is_empty() && estimate_width(&next, size) > max_width {
                    lines.push(std::mem::take(&mut current));
                    current.push(ch);
                } else {
                    current = next;
                }
            }
        }
    }

    if !current.is_empty() || lines.is_empty() {
        lines.push(current);
    }
    lines
}

fn block_style(kind: BlockKind, base: f32) -> (f32, bool) {
    match kind {
        BlockKind::Paragraph | BlockKind::ListItem => (base, false),
        BlockKind::Heading(1) => (base * 2.0, true),
        BlockKind::Heading(2) => (base * 1.5, true),
        BlockKind::Heading(3) => (base * 1.25, true),
        BlockKind::Heading(_) => (base * 1.1, true),
    }
}

struct Cursor {
    pages: Vec<TypesetPage>,
    width: f32,
    height: f32,
    top: f32,
    bottom: f32,
    y: f32,
}

impl Cursor {
    fn new(width: f32, height: f32, margin: f32) -> Self {
        Self {
            pages: vec![TypesetPage {
                width,
                height,
                lines: Vec::new(),
            }],
            width,
            height,
            top: height - margin,
            bottom: margin,
            y: height - margin,
        }
    }

    /// Reserve one line of `size` and return its baseline, breaking the
    /// page first when it would cross the bottom margin.
    fn next_baseline(&mut self, size: f32) -> f32 {
        let advance = size * LINE_SPACING;
        let page_is_fresh = self.y >= self.top;
        if !page_is_fresh && self.y - advance < self.bottom {
            self.pages.push(TypesetPage {
                width: self.width,
                height: self.height,
                lines: Vec::new(),
            });
            self.y = self.top;
        }
        self.y -= advance;
        self.y + (advance - size)
    }

    fn push(&mut self, line: TypesetLine) {
        if let Some(page) = self.pages.last_mut() {
            page.lines.push(line);
        }
    }

    fn gap(&mut self, amount: f32) {
        if self.y < self.top {
            self.y -= amount;
        }
    }
}

/// Lay out flattened blocks on portrait pages of `page`, left-aligned.
/// Always returns at least one page.
pub fn typeset_blocks(blocks: &[TextBlock], page: &PageGeometry, base_size: f32) -> Vec<TypesetPage> {
    let (w_mm, h_mm) = page.oriented(false);
    let margin = page.margin_mm * PT_PER_MM;
    let mut cursor = Cursor::new(w_mm * PT_PER_MM, h_mm * PT_PER_MM, margin);
    let text_width = cursor.width - 2.0 * margin;

    for block in blocks {
        let (size, bold) = block_style(block.kind, base_size);
        let (indent, prefix) = match block.kind {
            BlockKind::ListItem => (estimate_width(BULLET, size), BULLET),
            _ => (0.0, ""),
        };

        let mut first = true;
        for hard_line in block.text.split('\n') {
            for wrapped in wrap(hard_line, size, text_width - indent) {
                let y = cursor.next_baseline(size);
                let (x, text) = if first {
                    (margin, format!("{prefix}{wrapped}"))
                } else {
                    (margin + indent, wrapped)
                };
                first = false;
                cursor.push(TypesetLine {
                    text,
                    x,
                    y,
                    font_size: size,
                    bold,
                    gray: 0,
                });
            }
        }
        cursor.gap(base_size * 0.6);
    }

    cursor.pages
}

/// Lay out a centered summary: heading, title, each line of `body`, and
/// optionally the source size and type. Positions follow the summary
/// design on an A4-like page: heading at 40 mm from the top, title at
/// 60 mm, body from 100 mm in 8 mm steps.
pub fn typeset_summary(
    heading: &str,
    title: &str,
    body: &str,
    footer: Option<&SourceStats>,
    page: &PageGeometry,
) -> Vec<TypesetPage> {
    let (w_mm, h_mm) = page.oriented(false);
    let width = w_mm * PT_PER_MM;
    let height = h_mm * PT_PER_MM;
    let bottom = page.margin_mm * PT_PER_MM;

    let mut pages = vec![TypesetPage {
        width,
        height,
        lines: Vec::new(),
    }];
    let mut y_mm = 40.0_f32;

    let place = |pages: &mut Vec<TypesetPage>, y_mm: &mut f32, text: &str, size: f32, bold: bool, gray: u8| {
        let mut y = height - *y_mm * PT_PER_MM;
        if y < bottom {
            pages.push(TypesetPage {
                width,
                height,
                lines: Vec::new(),
            });
            *y_mm = page.margin_mm + size / PT_PER_MM;
            y = height - *y_mm * PT_PER_MM;
        }
        if let Some(current) = pages.last_mut() {
            current.lines.push(TypesetLine {
                text: text.to_string(),
                x: ((width - estimate_width(text, size)) / 2.0).max(0.0),
                y,
                font_size: size,
                bold,
                gray,
            });
        }
    };

    place(&mut pages, &mut y_mm, heading, 24.0, true, 40);
    y_mm = 60.0;
    place(&mut pages, &mut y_mm, title, 14.0, false, 100);
    y_mm = 100.0;
    for line in body.split('\n') {
        place(&mut pages, &mut y_mm, line, 12.0, false, 60);
        y_mm += 8.0;
    }

    if let Some(footer) = footer {
        y_mm += 12.0;
        let size = format!("File Size: {:.2} KB", footer.size_bytes as f64 / 1024.0);
        place(&mut pages, &mut y_mm, &size, 10.0, false, 120);
        y_mm += 8.0;
        let kind = format!(
            "File Type: {}",
            footer
                .media_type
                .as_deref()
                .unwrap_or("application/vnd.ms-powerpoint")
        );
        place(&mut pages, &mut y_mm, &kind, 10.0, false, 120);
    }

    pages
}

#[cfg(test)]
mod tests {
    use super::*;

    fn para(text: &str) -> TextBlock {
        TextBlock {
            kind: BlockKind::Paragraph,
            text: text.into(),
        }
    }

    #[test]
    fn wrap_respects_width() {
        let text = "the quick brown fox jumps over the lazy dog ".repeat(10);
        let lines = wrap(&text, 12.0, 200.0);
        assert!(lines.len() > 1);
        for l in &lines {
            assert!(estimate_width(l, 12.0) <= 200.0, "{l}");
        }
        assert_eq!(
            lines.join(" ").split_whitespace().count(),
            text.split_whitespace().count()
        );
    }

    #[test]
    fn overlong_word_is_split() {
        let word = "x".repeat(200);
        let lines = wrap(&word, 12.0, 100.0);
        assert!(lines.len() > 1);
        assert_eq!(lines.concat(), word);
    }

    #[test]
    fn empty_text_wraps_to_one_empty_line() {
        assert_eq!(wrap("", 12.0, 100.0), vec![String::new()]);
    }

    #[test]
    fn letter_pages_with_margins() {
        let pages = typeset_blocks(&[para("hello")], &PageGeometry::letter(), 12.0);
        assert_eq!(pages.len(), 1);
        let p = &pages[0];
        assert!((p.width - 612.0).abs() < 0.01);
        assert!((p.height - 792.0).abs() < 0.01);
        let line = &p.lines[0];
        assert!((line.x - 72.0).abs() < 0.01);
        assert!(line.y < 792.0 - 72.0 && line.y > 792.0 - 72.0 - 20.0);
    }

    #[test]
    fn long_documents_paginate_inside_margins() {
        let blocks: Vec<_> = (0..200).map(|i| para(&format!("Paragraph number {i}"))).collect();
        let pages = typeset_blocks(&blocks, &PageGeometry::letter(), 12.0);
        assert!(pages.len() > 1);
        let total: usize = pages.iter().map(|p| p.lines.len()).sum();
        assert_eq!(total, 200);
        for p in &pages {
            for l in &p.lines {
                assert!(l.y >= 72.0 - 0.01, "{l:?}");
                assert!(l.y <= 792.0 - 72.0);
            }
        }
    }

    #[test]
    fn headings_are_larger_and_bullets_prefixed() {
        let blocks = vec![
            TextBlock {
                kind: BlockKind::Heading(1),
                text: "Title".into(),
            },
            TextBlock {
                kind: BlockKind::ListItem,
                text: "item".into(),
            },
        ];
        let pages = typeset_blocks(&blocks, &PageGeometry::letter(), 12.0);
        let lines = &pages[0].lines;
        assert_eq!(lines[0].font_size, 24.0);
        assert!(lines[0].bold);
        assert_eq!(lines[1].text, "• item");
        assert!(lines[1].y < lines[0].y);
    }

    #[test]
    fn empty_input_gives_one_blank_page() {
        let pages = typeset_blocks(&[], &PageGeometry::letter(), 12.0);
        assert_eq!(pages.len(), 1);
        assert!(pages[0].lines.is_empty());
    }

    #[test]
    fn summary_is_centered_and_stepped() {
        let footer = SourceStats {
            size_bytes: 2048,
            media_type: None,
        };
        let pages = typeset_summary("Heading", "deck.pptx", "a\nb", Some(&footer), &PageGeometry::a4());
        assert_eq!(pages.len(), 1);
        let lines = &pages[0].lines;
        let texts: Vec<_> = lines.iter().map(|l| l.text.as_str()).collect();
        assert_eq!(
            texts,
            [
                "Heading",
                "deck.pptx",
                "a",
                "b",
                "File Size: 2.00 KB",
                "File Type: application/vnd.ms-powerpoint"
            ]
        );
        let h = pages[0].height;
        assert!((lines[2].y - (h - 100.0 * PT_PER_MM)).abs() < 0.01);
        assert!((lines[2].y - lines[3].y - 8.0 * PT_PER_MM).abs() < 0.01);
        for l in lines {
            let w = estimate_width(&l.text, l.font_size);
            assert!((l.x * 2.0 + w - pages[0].width).abs() < 0.01);
        }
    }

    #[test]
    fn long_summary_spills_onto_new_page() {
        let body = vec!["line"; 60].join("\n");
        let pages = typeset_summary("H", "T", &body, None, &PageGeometry::a4());
        assert!(pages.len() > 1);
        let total: usize = pages.iter().map(|p| p.lines.len()).sum();
        assert_eq!(total, 62);
    }
}
