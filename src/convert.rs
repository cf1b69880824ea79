//! Conversion entry points.
//!
//! The pipeline is strictly linear:
//!
//! ```text
//! validate → configure → prepare output → OCR → publish images → assemble
//! ```
//!
//! Each stage runs only if every earlier one succeeded, and the first error is
//! returned to the caller unchanged. Nothing is retried.

use crate::config::{ConversionConfig, Settings};
use crate::document::all_images;
use crate::error::{messages, Paper2MdError};
use crate::output::{ConversionOutput, ConversionStats};
use crate::pipeline::assemble::assemble;
use crate::pipeline::ocr::{run_ocr, MistralOcrClient, OcrProvider};
use crate::pipeline::publish::{publish_images, PublishTarget};
use crate::pipeline::validate::validate_paths;
use crate::progress::Stage;
use crate::storage::{ImageStore, S3ImageStore};
use chrono::Utc;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

/// Convert the PDF at `input` into Markdown files under `out_dir`.
///
/// Writes `page-<n>.md` for every page and `all-pages.md` for the whole
/// document; embedded images are uploaded to object storage and linked by
/// public URL.
///
/// # Errors
/// * `Validation` if a path is of the wrong kind or a required setting is
///   missing. No network request has been made at that point.
/// * `System` if OCR, an image upload, directory creation or a file write
///   fails.
pub async fn convert(
    input: impl AsRef<Path>,
    out_dir: impl AsRef<Path>,
    config: &ConversionConfig,
) -> Result<ConversionOutput, Paper2MdError> {
    let total_start = Instant::now();
    let input = input.as_ref();
    let out_dir = out_dir.as_ref();
    let progress = config.progress_callback.as_ref();
    let stage = |s: Stage| {
        debug!("Stage: {}", s);
        if let Some(cb) = progress {
            cb.on_stage_start(s);
        }
    };
    info!("Starting conversion: {}", input.display());

    // ── Step 1: Validate paths ───────────────────────────────────────────
    stage(Stage::Validate);
    let paths = validate_paths(input, out_dir)?;

    // ── Step 2: Load settings ────────────────────────────────────────────
    stage(Stage::Configure);
    let settings = config.load_settings()?;

    // ── Step 3: Ensure the output directory exists ───────────────────────
    stage(Stage::PrepareOutput);
    tokio::fs::create_dir_all(&paths.out_dir)
        .await
        .map_err(|e| Paper2MdError::system(messages::CREATE_DIR_FAILED, e))?;

    // ── Step 4: OCR ──────────────────────────────────────────────────────
    stage(Stage::Ocr);
    let provider = resolve_provider(config, &settings)?;
    let ocr_start = Instant::now();
    let pages = run_ocr(provider.as_ref(), &paths.input).await?;
    let ocr_duration_ms = ocr_start.elapsed().as_millis() as u64;

    let images = all_images(&pages);
    info!(
        "OCR returned {} pages with {} images in {}ms",
        pages.len(),
        images.len(),
        ocr_duration_ms
    );
    if let Some(cb) = progress {
        cb.on_ocr_complete(pages.len(), images.len());
    }

    // ── Step 5: Publish images ───────────────────────────────────────────
    stage(Stage::PublishImages);
    let store = resolve_store(config, &settings);
    let date = config.run_date.unwrap_or_else(|| Utc::now().date_naive());
    let target = PublishTarget::new(&settings.public_base_url, &config.key_prefix, date);
    debug!("Run date for image keys: {}", target.date());
    let upload_start = Instant::now();
    let published = publish_images(
        &images,
        store.as_ref(),
        &target,
        config.upload_concurrency,
        progress,
    )
    .await?;
    let upload_duration_ms = upload_start.elapsed().as_millis() as u64;

    // ── Step 6: Assemble and write Markdown ──────────────────────────────
    stage(Stage::Assemble);
    let (document, files) = assemble(&pages, &published.images, &paths.out_dir, progress).await?;

    let stats = ConversionStats {
        page_count: pages.len(),
        images_seen: images.len(),
        images_published: published.images.len(),
        images_skipped: published.skipped,
        files_written: files.len(),
        ocr_duration_ms,
        upload_duration_ms,
        total_duration_ms: total_start.elapsed().as_millis() as u64,
    };

    info!(
        "Conversion complete: {} pages, {}/{} images published, {}ms total",
        stats.page_count, stats.images_published, stats.images_seen, stats.total_duration_ms
    );
    if let Some(cb) = progress {
        cb.on_conversion_complete(&stats);
    }

    Ok(ConversionOutput {
        pages,
        images: published.images,
        document,
        files,
        stats,
    })
}

/// Synchronous wrapper around [`convert`].
///
/// Creates a temporary tokio runtime internally.
pub fn convert_sync(
    input: impl AsRef<Path>,
    out_dir: impl AsRef<Path>,
    config: &ConversionConfig,
) -> Result<ConversionOutput, Paper2MdError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| Paper2MdError::system(messages::RUNTIME_FAILED, e))?
        .block_on(convert(input, out_dir, config))
}

/// Injected provider first, otherwise a Mistral client built from settings.
fn resolve_provider(
    config: &ConversionConfig,
    settings: &Settings,
) -> Result<Arc<dyn OcrProvider>, Paper2MdError> {
    if let Some(ref provider) = config.ocr_provider {
        return Ok(Arc::clone(provider));
    }
    let client = MistralOcrClient::new(&settings.ocr_api_key, config)
        .map_err(|e| Paper2MdError::system(messages::OCR_FAILED, e))?;
    Ok(Arc::new(client))
}

/// Injected store first, otherwise an S3 client built from settings.
fn resolve_store(config: &ConversionConfig, settings: &Settings) -> Arc<dyn ImageStore> {
    match config.image_store {
        Some(ref store) => Arc::clone(store),
        None => {
            let s3 = S3ImageStore::new(settings, config.resolved_region());
            debug!("Uploading images to bucket '{}'", s3.bucket());
            Arc::new(s3)
        }
    }
}
