//! Markup handling: DOCX → HTML, and HTML → flat text blocks for typesetting.
//!
//! ## DOCX
//!
//! A DOCX file is a ZIP archive; the body lives in `word/document.xml` as
//! WordprocessingML. Only the structure that survives as plain HTML is kept:
//!
//! | WordprocessingML              | HTML                         |
//! |-------------------------------|------------------------------|
//! | `w:p`                         | `<p>`                        |
//! | `w:p` with `Heading N` style  | `<hN>`                       |
//! | `w:p` with `w:numPr`          | `<li>` inside `<ul>`         |
//! | `w:b` / `w:i` / `w:u` on run  | `<strong>` / `<em>` / `<u>`  |
//! | `w:br` / `w:tab`              | `<br>` / tab character       |
//!
//! Empty paragraphs are dropped. Legacy binary `.doc` files are not ZIP
//! archives and fail with [`FileConvError::MalformedDocument`].
//!
//! ## HTML
//!
//! [`flatten_html`] is not a browser. It drops `<head>`, `<script>`,
//! `<style>` and comments, splits on block-level tags, keeps heading levels
//! and list items, decodes entities and collapses whitespace. The result is
//! what the typesetter lays out.

use crate::error::FileConvError;
use once_cell::sync::Lazy;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use regex::Regex;
use std::io::{Cursor, Read};
use tracing::debug;
use zip::ZipArchive;

// ── DOCX → HTML ──────────────────────────────────────────────────────────

#[derive(Debug, Default)]
struct Run {
    text: String,
    bold: bool,
    italic: bool,
    underline: bool,
}

#[derive(Debug, Default)]
struct Paragraph {
    heading: Option<u8>,
    list_item: bool,
    runs: Vec<Run>,
}

impl Paragraph {
    fn is_blank(&self) -> bool {
        self.runs.iter().all(|r| r.text.trim().is_empty())
    }
}

/// Convert DOCX bytes to an HTML fragment.
pub fn docx_to_html(name: &str, bytes: &[u8]) -> Result<String, FileConvError> {
    let malformed = |detail: String| FileConvError::MalformedDocument {
        name: name.to_string(),
        detail,
    };

    let mut archive = ZipArchive::new(Cursor::new(bytes))
        .map_err(|e| malformed(format!("not a DOCX (ZIP) archive: {e}")))?;

    let xml = {
        let mut file = archive
            .by_name("word/document.xml")
            .map_err(|_| malformed("archive has no word/document.xml".into()))?;
        let mut content = String::new();
        file.read_to_string(&mut content)
            .map_err(|e| malformed(format!("failed to read document.xml: {e}")))?;
        content
    };

    let paragraphs = parse_document(&xml).map_err(malformed)?;
    debug!("DOCX {}: {} paragraphs", name, paragraphs.len());
    Ok(render_html(&paragraphs))
}

fn parse_document(xml: &str) -> Result<Vec<Paragraph>, String> {
    // No trim_text: `w:t` content may carry significant edge whitespace.
    let mut reader = Reader::from_str(xml);
    let mut buf = Vec::new();

    let mut paragraphs = Vec::new();
    let mut para = Paragraph::default();
    let mut run = Run::default();
    let mut in_paragraph = false;
    let mut in_run = false;
    let mut in_text = false;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) => match e.local_name().as_ref() {
                b"p" => {
                    in_paragraph = true;
                    para = Paragraph::default();
                }
                b"r" => {
                    in_run = true;
                    run = Run::default();
                }
                b"t" => in_text = true,
                b"numPr" if in_paragraph => para.list_item = true,
                other => apply_property(other, e, in_paragraph, in_run, &mut para, &mut run),
            },
            Ok(Event::Empty(ref e)) => match e.local_name().as_ref() {
                b"br" | b"cr" if in_run => run.text.push('\n'),
                b"tab" if in_run => run.text.push('\t'),
                b"numPr" if in_paragraph => para.list_item = true,
                other => apply_property(other, e, in_paragraph, in_run, &mut para, &mut run),
            },
            Ok(Event::End(ref e)) => match e.local_name().as_ref() {
                b"p" => {
                    in_paragraph = false;
                    if !para.is_blank() {
                        paragraphs.push(std::mem::take(&mut para));
                    }
                }
                b"r" => {
                    in_run = false;
                    if !run.text.is_empty() {
                        para.runs.push(std::mem::take(&mut run));
                    }
                }
                b"t" => in_text = false,
                _ => {}
            },
            Ok(Event::Text(e)) => {
                if in_text && in_run {
                    let text = e.unescape().map_err(|e| format!("XML text error: {e}"))?;
                    run.text.push_str(&text);
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(format!("XML parse error: {e}")),
            _ => {}
        }
        buf.clear();
    }

    Ok(paragraphs)
}

fn apply_property(
    tag: &[u8],
    e: &BytesStart,
    in_paragraph: bool,
    in_run: bool,
    para: &mut Paragraph,
    run: &mut Run,
) {
    match tag {
        b"b" if in_run => run.bold = is_on(e),
        b"i" if in_run => run.italic = is_on(e),
        b"u" if in_run => run.underline = get_attribute(e, "val").as_deref() != Some("none"),
        b"pStyle" if in_paragraph => para.heading = get_attribute(e, "val").and_then(heading_level),
        _ => {}
    }
}

/// `<w:b/>` and `<w:b w:val="1"/>` switch on; `w:val="0"|"false"` off.
fn is_on(e: &BytesStart) -> bool {
    !matches!(get_attribute(e, "val").as_deref(), Some("0" | "false" | "off"))
}

/// `Heading2` / `heading 2` → 2; `Title` → 1. Levels clamp to 1..=6.
fn heading_level(style: String) -> Option<u8> {
    let lower = style.to_ascii_lowercase();
    if lower == "title" {
        return Some(1);
    }
    if !lower.starts_with("heading") {
        return None;
    }
    let digits: String = lower.chars().filter(|c| c.is_ascii_digit()).collect();
    Some(digits.parse::<u8>().unwrap_or(1).clamp(1, 6))
}

fn get_attribute(e: &BytesStart, name: &str) -> Option<String> {
    for attr in e.attributes().flatten() {
        if attr.key.local_name().as_ref() == name.as_bytes() {
            return Some(String::from_utf8_lossy(&attr.value).to_string());
        }
    }
    None
}

fn render_html(paragraphs: &[Paragraph]) -> String {
    let mut html = String::new();
    let mut in_list = false;

    for para in paragraphs {
        let listed = para.list_item && para.heading.is_none();
        if listed && !in_list {
            html.push_str("<ul>");
            in_list = true;
        } else if !listed && in_list {
            html.push_str("</ul>");
            in_list = false;
        }

        let tag = match para.heading {
            Some(level) => format!("h{level}"),
            None if listed => "li".to_string(),
            None => "p".to_string(),
        };

        html.push_str(&format!("<{tag}>"));
        for run in &para.runs {
            html.push_str(&render_run(run));
        }
        html.push_str(&format!("</{tag}>"));
    }

    if in_list {
        html.push_str("</ul>");
    }
    html
}

fn render_run(run: &Run) -> String {
    let mut inner = escape_html(&run.text).replace('\n', "<br>");
    if run.underline {
        inner = format!("<u>{inner}</u>");
    }
    if run.italic {
        inner = format!("<em>{inner}</em>");
    }
    if run.bold {
        inner = format!("<strong>{inner}</strong>");
    }
    inner
}

fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}

// ── HTML → blocks ────────────────────────────────────────────────────────

/// Typographic role of a flattened block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockKind {
    Paragraph,
    /// Heading level 1..=6.
    Heading(u8),
    ListItem,
}

/// One paragraph-level run of text. `text` may contain `\n` for hard
/// line breaks from `<br>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextBlock {
    pub kind: BlockKind,
    pub text: String,
}

static RE_STRIP: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)<!--.*?-->|<head\b.*?</head\s*>|<script\b.*?</script\s*>|<style\b.*?</style\s*>")
        .unwrap()
});

static RE_TAG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<(/?)([a-zA-Z][a-zA-Z0-9]*)\b[^>]*>").unwrap());

static RE_ENTITY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"&(#[xX][0-9a-fA-F]+|#[0-9]+|[a-zA-Z]+);").unwrap());

static RE_SPACES: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

const BLOCK_TAGS: &[&str] = &[
    "p", "div", "section", "article", "header", "footer", "main", "nav", "aside", "blockquote",
    "pre", "ul", "ol", "li", "table", "thead", "tbody", "tfoot", "tr", "caption", "h1", "h2",
    "h3", "h4", "h5", "h6", "hr", "body", "html", "dl", "dt", "dd", "figure", "figcaption",
];

/// Table cells separate words but do not start a new block.
const CELL_TAGS: &[&str] = &["td", "th"];

/// Tags whose start implicitly ends an open sibling of the same name.
const SIBLING_CLOSED: &[&str] = &["p", "li", "dt", "dd", "tr"];

/// Flatten HTML into ordered text blocks. Never fails; markup that is not
/// understood is ignored and its text kept.
///
/// The innermost open heading or list item decides a block's kind, so
/// `<li><p>x</p></li>` stays a list item.
pub fn flatten_html(html: &str) -> Vec<TextBlock> {
    let cleaned = RE_STRIP.replace_all(html, "");
    let mut builder = BlockBuilder::default();
    let mut last = 0;

    for caps in RE_TAG.captures_iter(&cleaned) {
        let Some(whole) = caps.get(0) else { continue };
        builder.push_text(&cleaned[last..whole.start()]);
        last = whole.end();

        let closing = &caps[1] == "/";
        let tag = caps[2].to_ascii_lowercase();

        if tag == "br" {
            builder.line_break();
            continue;
        }
        if CELL_TAGS.contains(&tag.as_str()) {
            builder.word_break();
            continue;
        }
        if !BLOCK_TAGS.contains(&tag.as_str()) {
            continue;
        }

        builder.flush();
        if closing {
            builder.close(&tag);
        } else if tag != "hr" {
            builder.open(tag);
        }
    }
    builder.push_text(&cleaned[last..]);
    builder.flush();
    builder.blocks
}

fn block_kind(tag: &str) -> BlockKind {
    match tag {
        "li" => BlockKind::ListItem,
        t if t.len() == 2 && t.starts_with('h') => t[1..]
            .parse::<u8>()
            .map(BlockKind::Heading)
            .unwrap_or(BlockKind::Paragraph),
        _ => BlockKind::Paragraph,
    }
}

#[derive(Default)]
struct BlockBuilder {
    blocks: Vec<TextBlock>,
    /// Open block elements, outermost first.
    open: Vec<(String, BlockKind)>,
    text: String,
}

impl BlockBuilder {
    fn push_text(&mut self, raw: &str) {
        if raw.is_empty() {
            return;
        }
        let decoded = decode_entities(raw);
        let collapsed = RE_SPACES.replace_all(&decoded, " ");
        if self.text.ends_with(' ') {
            self.text.push_str(collapsed.trim_start_matches(' '));
        } else {
            self.text.push_str(&collapsed);
        }
    }

    fn line_break(&mut self) {
        self.text.push('\n');
    }

    fn word_break(&mut self) {
        if !self.text.is_empty() && !self.text.ends_with(char::is_whitespace) {
            self.text.push(' ');
        }
    }

    fn open(&mut self, tag: String) {
        if SIBLING_CLOSED.contains(&tag.as_str())
            && self.open.last().is_some_and(|(t, _)| *t == tag)
        {
            self.open.pop();
        }
        let kind = block_kind(&tag);
        self.open.push((tag, kind));
    }

    /// Close `tag` and anything left open inside it. A stray closing tag
    /// is ignored.
    fn close(&mut self, tag: &str) {
        if let Some(pos) = self.open.iter().rposition(|(t, _)| t == tag) {
            self.open.truncate(pos);
        }
    }

    fn current_kind(&self) -> BlockKind {
        self.open
            .iter()
            .rev()
            .map(|(_, k)| *k)
            .find(|k| *k != BlockKind::Paragraph)
            .unwrap_or(BlockKind::Paragraph)
    }

    fn flush(&mut self) {
        let text = self
            .text
            .split('\n')
            .map(|l| l.trim())
            .filter(|l| !l.is_empty())
            .collect::<Vec<_>>()
            .join("\n");
        self.text.clear();
        if !text.is_empty() {
            let kind = self.current_kind();
            self.blocks.push(TextBlock { kind, text });
        }
    }
}

fn decode_entities(s: &str) -> String {
    RE_ENTITY
        .replace_all(s, |caps: &regex::Captures| {
            let body = &caps[1];
            let decoded = if let Some(hex) = body.strip_prefix("#x").or_else(|| body.strip_prefix("#X")) {
                u32::from_str_radix(hex, 16).ok().and_then(char::from_u32)
            } else if let Some(dec) = body.strip_prefix('#') {
                dec.parse::<u32>().ok().and_then(char::from_u32)
            } else {
                named_entity(body)
            };
            match decoded {
                Some(c) => c.to_string(),
                None => caps[0].to_string(),
            }
        })
        .into_owned()
}

fn named_entity(name: &str) -> Option<char> {
    Some(match name {
        "amp" => '&',
        "lt" => '<',
        "gt" => '>',
        "quot" => '"',
        "apos" => '\'',
        "nbsp" => ' ',
        "copy" => '©',
        "reg" => '®',
        "trade" => '™',
        "hellip" => '…',
        "mdash" => '—',
        "ndash" => '–',
        "lsquo" => '‘',
        "rsquo" => '’',
        "ldquo" => '“',
        "rdquo" => '”',
        "bull" => '•',
        "euro" => '€',
        _ => return None,
    })
}
