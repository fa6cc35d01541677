//! Decoding uploaded images and encoding results.

use std::io::Cursor;

use facelift_core::GatewayError;
use image::codecs::jpeg::JpegEncoder;
use image::{ImageReader, Limits, RgbImage};

/// JPEG quality of enhanced output.
pub const JPEG_QUALITY: u8 = 90;

/// MIME type of [`encode_jpeg`] output.
pub const OUTPUT_MIME: &str = "image/jpeg";

/// Largest accepted width or height of an upload.
pub const MAX_DIMENSION: u32 = 8192;

/// Largest single allocation the decoder may make, 320 MiB.
pub const MAX_DECODE_ALLOC: u64 = 320 * 1024 * 1024;

/// Decode any supported format into an 8-bit RGB buffer.
///
/// Alpha is discarded. Images wider or taller than [`MAX_DIMENSION`] are
/// refused from their header, before any pixel buffer is allocated.
pub fn decode(bytes: &[u8]) -> Result<RgbImage, GatewayError> {
    decode_with_limits(bytes, upload_limits())
}

fn upload_limits() -> Limits {
    let mut limits = Limits::default();
    limits.max_image_width = Some(MAX_DIMENSION);
    limits.max_image_height = Some(MAX_DIMENSION);
    limits.max_alloc = Some(MAX_DECODE_ALLOC);
    limits
}

fn decode_with_limits(bytes: &[u8], limits: Limits) -> Result<RgbImage, GatewayError> {
    if bytes.is_empty() {
        return Err(GatewayError::InvalidImage(String::from("empty payload")));
    }
    let mut reader = ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|err| GatewayError::InvalidImage(err.to_string()))?;
    reader.limits(limits);
    let image = reader
        .decode()
        .map_err(|err| GatewayError::InvalidImage(err.to_string()))?;
    Ok(image.to_rgb8())
}

/// Encode as JPEG at [`JPEG_QUALITY`].
pub fn encode_jpeg(image: &RgbImage) -> Result<Vec<u8>, GatewayError> {
    let mut out = Cursor::new(Vec::new());
    image
        .write_with_encoder(JpegEncoder::new_with_quality(&mut out, JPEG_QUALITY))
        .map_err(|err| GatewayError::Processing(format!("JPEG encoding failed: {err}")))?;
    Ok(out.into_inner())
}
