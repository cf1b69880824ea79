//! Image decoding: inline base64 payload → PNG bytes.
//!
//! The OCR service embeds each detected image as base64, usually behind a
//! `data:image/jpeg;base64,` header and occasionally line-wrapped. Every
//! image is stored under a `.png` key whatever its original encoding: PNG
//! input passes through untouched, rasters the `image` crate can read are
//! re-encoded, and anything else is stored as the decoded bytes. Only an
//! empty payload or invalid base64 loses the image.

use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use base64::Engine as _;
use image::ImageFormat;
use once_cell::sync::Lazy;
use regex::Regex;
use std::io::Cursor;
use thiserror::Error;
use tracing::{debug, warn};

/// Standard alphabet, padding optional.
const LENIENT_BASE64: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

static RE_DATA_URI_PREFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^data:image/[\w.+-]+;base64,").unwrap());

/// Why an inline payload could not be turned into PNG bytes.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("payload is empty")]
    Empty,

    #[error("invalid base64: {0}")]
    Base64(#[from] base64::DecodeError),
}

/// Strip the data-URI header and all whitespace from an inline payload.
pub fn strip_payload(payload: &str) -> String {
    let compact: String = payload.chars().filter(|c| !c.is_whitespace()).collect();
    RE_DATA_URI_PREFIX.replace(&compact, "").into_owned()
}

/// Decode an inline payload to the raw bytes it carries.
pub fn decode_inline(payload: &str) -> Result<Vec<u8>, DecodeError> {
    let stripped = strip_payload(payload);
    if stripped.is_empty() {
        return Err(DecodeError::Empty);
    }
    Ok(LENIENT_BASE64.decode(stripped.as_bytes())?)
}

/// Normalise raster bytes to PNG.
///
/// Bytes the `image` crate cannot read (GIF, WebP, vector data, ...) are
/// returned unchanged.
pub fn to_png(bytes: Vec<u8>) -> Vec<u8> {
    if matches!(image::guess_format(&bytes), Ok(ImageFormat::Png)) {
        return bytes;
    }

    let img = match image::load_from_memory(&bytes) {
        Ok(img) => img,
        Err(e) => {
            debug!("Keeping {} raw bytes, not a readable raster: {}", bytes.len(), e);
            return bytes;
        }
    };

    let mut buf = Vec::new();
    if let Err(e) = img.write_to(&mut Cursor::new(&mut buf), ImageFormat::Png) {
        warn!("PNG re-encoding failed ({}); keeping original bytes", e);
        return bytes;
    }
    debug!(
        "Re-encoded {}x{} image as PNG ({} → {} bytes)",
        img.width(),
        img.height(),
        bytes.len(),
        buf.len()
    );
    buf
}

/// [`decode_inline`] followed by [`to_png`].
pub fn decode_to_png(payload: &str) -> Result<Vec<u8>, DecodeError> {
    Ok(to_png(decode_inline(payload)?))
}
