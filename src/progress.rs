//! Progress-callback trait for conversion events.
//!
//! Inject an [`Arc<dyn ConversionProgressCallback>`] via
//! [`crate::config::ConversionConfigBuilder::progress_callback`] to receive
//! events as the pipeline advances through its stages, publishes each image
//! and writes each page.
//!
//! # Example
//!
//! ```rust
//! use paper2md::{ConversionConfig, ConversionProgressCallback, Stage};
//! use std::sync::Arc;
//!
//! struct StageLogger;
//!
//! impl ConversionProgressCallback for StageLogger {
//!     fn on_stage_start(&self, stage: Stage) {
//!         eprintln!("→ {stage}");
//!     }
//! }
//!
//! let config = ConversionConfig::builder()
//!     .progress_callback(Arc::new(StageLogger) as Arc<dyn ConversionProgressCallback>)
//!     .build()
//!     .unwrap();
//! ```

use crate::output::ConversionStats;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;

/// Pipeline stages, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Stage {
    Validate,
    Configure,
    PrepareOutput,
    Ocr,
    PublishImages,
    Assemble,
}

impl Stage {
    pub const ALL: [Stage; 6] = [
        Stage::Validate,
        Stage::Configure,
        Stage::PrepareOutput,
        Stage::Ocr,
        Stage::PublishImages,
        Stage::Assemble,
    ];
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Stage::Validate => "validating inputs",
            Stage::Configure => "loading configuration",
            Stage::PrepareOutput => "preparing output directory",
            Stage::Ocr => "running OCR",
            Stage::PublishImages => "publishing images",
            Stage::Assemble => "writing Markdown",
        };
        f.write_str(label)
    }
}

/// Called by the conversion pipeline as it runs.
///
/// All methods have default no-op implementations so callers only override
/// what they care about. With `upload_concurrency > 1`, `on_image_published`
/// may be called from several tasks; protect shared state accordingly.
pub trait ConversionProgressCallback: Send + Sync {
    /// Called when a stage begins. Stages run strictly in [`Stage::ALL`] order.
    fn on_stage_start(&self, stage: Stage) {
        let _ = stage;
    }

    /// Called once OCR has returned.
    ///
    /// # Arguments
    /// * `page_count`  — pages in the OCR result
    /// * `image_count` — embedded images across all pages
    fn on_ocr_complete(&self, page_count: usize, image_count: usize) {
        let _ = (page_count, image_count);
    }

    /// Called after each successful upload.
    ///
    /// # Arguments
    /// * `id`    — image id as reported by OCR
    /// * `url`   — public URL of the uploaded object
    /// * `total` — images that will be uploaded this run
    fn on_image_published(&self, id: &str, url: &str, total: usize) {
        let _ = (id, url, total);
    }

    /// Called for an image that had no inline bytes or an undecodable payload.
    fn on_image_skipped(&self, id: &str, reason: &str) {
        let _ = (id, reason);
    }

    /// Called after each `page-<n>.md` is written.
    fn on_page_written(&self, page_num: usize, total_pages: usize) {
        let _ = (page_num, total_pages);
    }

    /// Called once after `all-pages.md` is written.
    fn on_conversion_complete(&self, stats: &ConversionStats) {
        let _ = stats;
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl ConversionProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::ConversionConfig`].
pub type ProgressCallback = Arc<dyn ConversionProgressCallback>;
