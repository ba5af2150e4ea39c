//! Pipeline stages for file conversion.
//!
//! Each submodule implements exactly one transformation step.
//! Keeping stages separate makes each independently testable and lets us
//! swap implementations (e.g. another PDF backend) without touching
//! other stages.
//!
//! ## Data Flow
//!
//! ```text
//!                 ┌─ encode ──────────────┐
//! input ──▶ ──────┼─ render (pdfium) ─────┼──▶ PreviewState ──▶ layout/typeset ──▶ assemble ──▶ artifact
//! (path/URL)      ├─ markup (DOCX/HTML) ──┤     (editable)       archive / text
//!                 └─ text ────────────────┘
//! ```
//!
//! 1. [`input`]    — load a local path or download a URL, enforcing the size ceiling
//! 2. [`encode`]   — decode uploaded images; encode rendered pages as JPEG/PNG
//! 3. [`render`]   — rasterise pages, extract page text, read PDF details;
//!    runs in `spawn_blocking` because pdfium is not async-safe
//! 4. [`markup`]   — DOCX → HTML, HTML → flat text blocks
//! 5. [`text`]     — page markers, RTF wrapper, presentation summary
//! 6. [`layout`]   — one page per image, oriented and centered (pure)
//! 7. [`typeset`]  — wrap and paginate text blocks (pure)
//! 8. [`assemble`] — write image or text pages into a PDF via pdfium
//! 9. [`archive`]  — ZIP multi-image output
//!
//! [`engine`] binds the pdfium shared library for stages 3 and 8.

pub mod archive;
pub mod assemble;
pub mod encode;
pub mod engine;
pub mod input;
pub mod layout;
pub mod markup;
pub mod render;
pub mod text;
pub mod typeset;
