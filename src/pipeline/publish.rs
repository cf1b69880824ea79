//! Image publishing: decode every inline image and upload it to object storage.
//!
//! Keys have the form `<prefix>/<YYYY-MM-DD>/<id>.png`. The date is fixed in
//! [`PublishTarget`] once per run, so a run that crosses midnight still
//! writes every image under the same day.
//!
//! Images without inline bytes, or whose payload is not valid base64, are
//! skipped: they never enter the [`ImageMap`] and the assembler never links
//! them. The first failed upload aborts the batch. Objects uploaded before the
//! failure stay in the bucket; re-running overwrites them under the same keys.

use crate::document::EmbeddedImage;
use crate::error::{messages, Paper2MdError};
use crate::output::{ImageMap, PublishedImage};
use crate::pipeline::decode::decode_to_png;
use crate::progress::ProgressCallback;
use crate::storage::ImageStore;
use chrono::NaiveDate;
use futures::stream::{self, StreamExt, TryStreamExt};
use thiserror::Error;
use tokio::task::JoinError;
use tracing::{debug, info, warn};

/// The blocking decode task panicked or was cancelled.
#[derive(Debug, Error)]
#[error("image decoding task failed: {0}")]
pub struct DecodeTaskError(#[from] JoinError);

/// Where and under which date images are published.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishTarget {
    public_base_url: String,
    key_prefix: String,
    date: NaiveDate,
}

impl PublishTarget {
    pub fn new(
        public_base_url: impl Into<String>,
        key_prefix: impl Into<String>,
        date: NaiveDate,
    ) -> Self {
        let public_base_url = public_base_url.into();
        let key_prefix = key_prefix.into();
        Self {
            public_base_url: public_base_url.trim_end_matches('/').to_string(),
            key_prefix: key_prefix.trim_matches('/').to_string(),
            date,
        }
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    /// Object key for an image id.
    pub fn key(&self, id: &str) -> String {
        format!("{}/{}/{}.png", self.key_prefix, self.date.format("%Y-%m-%d"), id)
    }

    /// Public URL for an object key.
    pub fn url(&self, key: &str) -> String {
        format!("{}/{}", self.public_base_url, key)
    }
}

/// Result of the publish stage.
#[derive(Debug, Clone, Default)]
pub struct PublishOutcome {
    pub images: ImageMap,
    /// Images that had no inline bytes or an undecodable payload.
    pub skipped: usize,
}

/// Decode and upload `images`, in encounter order.
///
/// With `concurrency > 1` up to that many images are decoded and uploaded at
/// once; results are still collected in encounter order and the first
/// failure still aborts the batch.
pub async fn publish_images(
    images: &[&EmbeddedImage],
    store: &dyn ImageStore,
    target: &PublishTarget,
    concurrency: usize,
    progress: Option<&ProgressCallback>,
) -> Result<PublishOutcome, Paper2MdError> {
    let total = images.iter().filter(|i| i.has_inline_bytes()).count();
    info!(
        "Publishing {} of {} images under {}",
        total,
        images.len(),
        target.key("<id>")
    );

    let results: Vec<Option<PublishedImage>> = stream::iter(images.iter().copied())
        .map(|image| publish_one(image, store, target, total, progress))
        .buffered(concurrency.max(1))
        .try_collect()
        .await?;

    let published: ImageMap = results.into_iter().flatten().collect();
    let skipped = images.len() - published.len();
    info!("Published {} images, skipped {}", published.len(), skipped);

    Ok(PublishOutcome {
        images: published,
        skipped,
    })
}

async fn publish_one(
    image: &EmbeddedImage,
    store: &dyn ImageStore,
    target: &PublishTarget,
    total: usize,
    progress: Option<&ProgressCallback>,
) -> Result<Option<PublishedImage>, Paper2MdError> {
    let payload = match image.image_base64.as_deref() {
        Some(p) if !p.trim().is_empty() => p.to_string(),
        _ => {
            debug!("Image '{}' has no inline bytes; skipping", image.id);
            if let Some(cb) = progress {
                cb.on_image_skipped(&image.id, "no inline bytes");
            }
            return Ok(None);
        }
    };

    let decoded = tokio::task::spawn_blocking(move || decode_to_png(&payload))
        .await
        .map_err(decode_task_failed)?;

    let png = match decoded {
        Ok(png) => png,
        Err(e) => {
            warn!("Image '{}' could not be decoded ({}); skipping", image.id, e);
            if let Some(cb) = progress {
                cb.on_image_skipped(&image.id, &e.to_string());
            }
            return Ok(None);
        }
    };

    let key = target.key(&image.id);
    store
        .put_png(&key, png)
        .await
        .map_err(|e| Paper2MdError::system(messages::UPLOAD_FAILED, e))?;

    let url = target.url(&key);
    match image.bbox {
        Some(b) => debug!(
            "Published '{}' ({}x{} px on page) → {}",
            image.id,
            b.width(),
            b.height(),
            url
        ),
        None => debug!("Published '{}' → {}", image.id, url),
    }
    if let Some(cb) = progress {
        cb.on_image_published(&image.id, &url, total);
    }

    Ok(Some(PublishedImage {
        id: image.id.clone(),
        key,
        url,
    }))
}

/// Decoding happens inside the publish stage, so a lost task still surfaces
/// as an upload failure; the cause names the decoder.
fn decode_task_failed(e: JoinError) -> Paper2MdError {
    Paper2MdError::system(messages::UPLOAD_FAILED, DecodeTaskError(e))
}
