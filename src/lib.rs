//! # paper2md
//!
//! Convert a PDF into Markdown with Mistral OCR, hosting every embedded image
//! in S3-compatible object storage.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF
//!  │
//!  ├─ 1. Validate  input is a regular file, output is a directory
//!  ├─ 2. Settings  six required values from the environment
//!  ├─ 3. Prepare   ensure the output directory exists
//!  ├─ 4. OCR       upload → signed URL → mistral-ocr-latest
//!  ├─ 5. Publish   base64 → PNG → PUT <prefix>/<date>/<id>.png
//!  └─ 6. Assemble  page-<n>.md per page + all-pages.md
//! ```
//!
//! Each stage runs only if every earlier one succeeded. The first failure is
//! returned as a [`Paper2MdError`] whose [`ErrorKind`] tells bad input
//! (`Validation`) apart from an external failure (`System`).
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use paper2md::{convert, ConversionConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Reads MISTRAL_OCR_API_KEY and the S3_* variables from the environment.
//!     let config = ConversionConfig::default();
//!     let output = convert("paper.pdf", "out/", &config).await?;
//!     eprintln!(
//!         "{} pages, {} images published",
//!         output.stats.page_count, output.stats.images_published
//!     );
//!     Ok(())
//! }
//! ```
//!
//! ## Environment
//!
//! | Variable | Purpose |
//! |----------|---------|
//! | `MISTRAL_OCR_API_KEY` | Bearer token for the OCR API |
//! | `S3_ENDPOINT` | Object storage endpoint URL |
//! | `S3_ACCESS_KEY_ID` | Storage access key |
//! | `S3_SECRET_ACCESS_KEY` | Storage secret key |
//! | `S3_BUCKET` | Target bucket |
//! | `S3_PUBLIC_URL` | Public base URL images are served from |
//! | `S3_REGION` | Optional, defaults to `us-east-1` |
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `paper2md` binary (clap + anyhow + tracing-subscriber + dotenvy) |

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod convert;
pub mod document;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod storage;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{ConversionConfig, ConversionConfigBuilder, Settings};
pub use convert::{convert, convert_sync};
pub use document::{BoundingBox, EmbeddedImage, OcrPage, PageDimensions, SourceDocument};
pub use error::{ErrorKind, Paper2MdError};
pub use output::{
    ConversionOutput, ConversionStats, ImageMap, PublishedImage, RenderedDocument, RenderedPage,
};
pub use pipeline::ocr::{MistralOcrClient, OcrError, OcrProvider};
pub use progress::{ConversionProgressCallback, NoopProgressCallback, ProgressCallback, Stage};
pub use storage::{ImageStore, S3ImageStore, StoreError};
