//! Progress-callback trait for per-item conversion events.
//!
//! Inject an [`Arc<dyn ConversionProgressCallback>`] via
//! [`crate::config::ConversionConfigBuilder::progress_callback`] to receive
//! events as the pipeline works through each image or page.
//!
//! An "item" is whatever the running conversion iterates over: uploaded
//! images for image-to-PDF, rendered pages for PDF-to-image, extracted pages
//! for PDF-to-DOCX. Conversions that handle the file in one step (HTML,
//! DOCX, PPT) report a single item.
//!
//! # Example
//!
//! ```rust
//! use edgequake_fileconv::{ConversionProgressCallback, ConversionConfig};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct CountingCallback {
//!     completed: AtomicUsize,
//! }
//!
//! impl ConversionProgressCallback for CountingCallback {
//!     fn on_item_complete(&self, index: usize, total: usize, output_bytes: usize) {
//!         self.completed.fetch_add(1, Ordering::SeqCst);
//!         eprintln!("Item {}/{} done ({} bytes)", index, total, output_bytes);
//!     }
//! }
//!
//! let counter = Arc::new(CountingCallback { completed: AtomicUsize::new(0) });
//!
//! let config = ConversionConfig::builder()
//!     .progress_callback(counter as Arc<dyn ConversionProgressCallback>)
//!     .build()
//!     .unwrap();
//! ```

use std::sync::Arc;

/// Called by the conversion pipeline as it processes each item.
///
/// Items are processed strictly one after another, but the callback may be
/// invoked from a blocking worker thread, hence `Send + Sync`. All methods
/// have default no-op implementations.
pub trait ConversionProgressCallback: Send + Sync {
    /// Called once before the first item.
    fn on_conversion_start(&self, total_items: usize) {
        let _ = total_items;
    }

    /// Called before an item is processed. `index` is 1-based.
    fn on_item_start(&self, index: usize, total_items: usize) {
        let _ = (index, total_items);
    }

    /// Called when an item has been processed.
    ///
    /// `output_bytes` is the size of what the item produced (encoded image,
    /// extracted text), useful for progress displays.
    fn on_item_complete(&self, index: usize, total_items: usize, output_bytes: usize) {
        let _ = (index, total_items, output_bytes);
    }

    /// Called when an item fails. The conversion stops after this call.
    fn on_item_error(&self, index: usize, total_items: usize, error: &str) {
        let _ = (index, total_items, error);
    }

    /// Called once after the last item succeeded.
    fn on_conversion_complete(&self, total_items: usize) {
        let _ = total_items;
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl ConversionProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::ConversionConfig`].
pub type ProgressCallback = Arc<dyn ConversionProgressCallback>;

/// Thin wrapper so pipeline stages can report without `if let Some` at
/// every call site.
#[derive(Clone, Default)]
pub(crate) struct Reporter {
    cb: Option<ProgressCallback>,
}

impl Reporter {
    pub(crate) fn new(cb: Option<ProgressCallback>) -> Self {
        Self { cb }
    }

    pub(crate) fn start(&self, total: usize) {
        if let Some(ref cb) = self.cb {
            cb.on_conversion_start(total);
        }
    }

    pub(crate) fn item_start(&self, index: usize, total: usize) {
        if let Some(ref cb) = self.cb {
            cb.on_item_start(index, total);
        }
    }

    pub(crate) fn item_complete(&self, index: usize, total: usize, bytes: usize) {
        if let Some(ref cb) = self.cb {
            cb.on_item_complete(index, total, bytes);
        }
    }

    pub(crate) fn item_error(&self, index: usize, total: usize, error: &str) {
        if let Some(ref cb) = self.cb {
            cb.on_item_error(index, total, error);
        }
    }

    pub(crate) fn complete(&self, total: usize) {
        if let Some(ref cb) = self.cb {
            cb.on_conversion_complete(total);
        }
    }
}
