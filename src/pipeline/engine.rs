//! Binding to the pdfium shared library.
//!
//! Lookup order, first hit wins:
//!
//! 1. `FILECONV_PDFIUM_PATH`: a library file, or a directory containing it
//! 2. the current working directory and `./lib`
//! 3. the executable's directory and `../lib` next to it
//! 4. the system library search path

use crate::error::FileConvError;
use pdfium_render::prelude::*;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Environment variable naming an explicit pdfium library or directory.
pub const PDFIUM_PATH_ENV: &str = "FILECONV_PDFIUM_PATH";

/// Bind to pdfium, trying each candidate location in turn.
pub fn bind() -> Result<Pdfium, FileConvError> {
    let mut last_error = String::from("no candidate locations");

    for candidate in candidate_paths() {
        match Pdfium::bind_to_library(&candidate) {
            Ok(bindings) => {
                debug!("Bound pdfium from {}", candidate.display());
                return Ok(Pdfium::new(bindings));
            }
            Err(e) => last_error = format!("{}: {e}", candidate.display()),
        }
    }

    Pdfium::bind_to_system_library()
        .map(Pdfium::new)
        .map_err(|e| FileConvError::PdfiumBindingFailed(format!("{last_error}; system: {e}")))
}

/// Whether a pdfium library can be bound in this environment.
pub fn is_available() -> bool {
    bind().is_ok()
}

fn candidate_paths() -> Vec<PathBuf> {
    let mut paths = Vec::new();

    if let Ok(p) = std::env::var(PDFIUM_PATH_ENV) {
        let p = PathBuf::from(p);
        if p.is_dir() {
            paths.push(library_in(&p));
        } else {
            paths.push(p);
        }
    }

    paths.push(library_in(Path::new("./")));
    paths.push(library_in(Path::new("./lib")));

    if let Some(exe_dir) = std::env::current_exe()
        .ok()
        .and_then(|e| e.parent().map(Path::to_path_buf))
    {
        paths.push(library_in(&exe_dir));
        if let Some(parent) = exe_dir.parent() {
            paths.push(library_in(&parent.join("lib")));
        }
    }

    paths
}

fn library_in(dir: &Path) -> PathBuf {
    Pdfium::pdfium_platform_library_name_at_path(dir)
}
