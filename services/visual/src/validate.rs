//! Input validation for image payloads.
//!
//! The endpoint documents hard limits on uploads; violating them wastes a
//! round trip on a guaranteed rejection, so they are enforced before any
//! network call.

use reqpoll_core::{Error, Result};

/// Documented maximum ratio between the longer and shorter image edge.
pub const MAX_ASPECT_RATIO: f64 = 3.0;
/// Documented maximum edge length in pixels.
pub const MAX_DIMENSION: u32 = 4096;
/// Documented maximum encoded size: 4.7 MiB.
pub const MAX_BYTES: usize = 4_928_307;

/// An image about to be uploaded inline.
#[derive(Debug, Clone)]
pub struct ImagePayload {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Encoded image bytes, as they will be base64-wrapped into the body.
    pub bytes: Vec<u8>,
}

impl ImagePayload {
    /// Check the payload against the documented constraints.
    pub fn validate(&self) -> Result<()> {
        validate_image(self.width, self.height, self.bytes.len())
    }
}

/// Check image dimensions and encoded size against the documented limits.
///
/// Violations fail with the constraint named in the message, before any
/// request is built.
pub fn validate_image(width: u32, height: u32, encoded_len: usize) -> Result<()> {
    if width == 0 || height == 0 {
        return Err(Error::validation_failed("image has a zero dimension"));
    }

    let ratio = f64::from(width.max(height)) / f64::from(width.min(height));
    if ratio > MAX_ASPECT_RATIO {
        return Err(Error::validation_failed(format!(
            "image aspect ratio ({ratio:.2}) exceeds the maximum allowed ratio of {MAX_ASPECT_RATIO:.1}"
        )));
    }

    if width > MAX_DIMENSION || height > MAX_DIMENSION {
        return Err(Error::validation_failed(format!(
            "image dimensions ({width}x{height}) exceed the maximum allowed size of \
             {MAX_DIMENSION}x{MAX_DIMENSION}"
        )));
    }

    if encoded_len > MAX_BYTES {
        return Err(Error::validation_failed(format!(
            "image size ({encoded_len} bytes) exceeds the maximum allowed size of {MAX_BYTES} bytes"
        )));
    }

    Ok(())
}
