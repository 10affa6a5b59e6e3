use std::io::Cursor;

use base64::Engine;
use image::{DynamicImage, GenericImageView, ImageReader};

use super::result::ContextResolution;
use crate::error::{OcrError, Result};

/// Decode image bytes, sniffing the format from the content.
///
/// Empty input, undecodable data and zero-sized images are all decode
/// errors. Nothing else about the image is checked here.
pub fn decode_image(bytes: &[u8]) -> Result<DynamicImage> {
    if bytes.is_empty() {
        return Err(OcrError::Decode("image payload is empty".to_string()));
    }

    let img = ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| OcrError::Decode(format!("Failed to read image: {e}")))?
        .decode()
        .map_err(|e| OcrError::Decode(format!("Failed to decode image: {e}")))?;

    let (width, height) = img.dimensions();
    if width == 0 || height == 0 {
        return Err(OcrError::Decode(format!(
            "decoded image is empty ({width}x{height})"
        )));
    }

    Ok(img)
}

/// Decode a base64 payload. A `data:<mime>;base64,` prefix and embedded
/// whitespace are tolerated.
pub fn decode_base64(payload: &str) -> Result<Vec<u8>> {
    let trimmed = payload.trim();
    let encoded = match trimmed.strip_prefix("data:") {
        Some(rest) => rest
            .split_once(',')
            .map(|(_, data)| data)
            .ok_or_else(|| OcrError::Decode("data URL has no payload".to_string()))?,
        None => trimmed,
    };

    let compact: String = encoded.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    if compact.is_empty() {
        return Err(OcrError::Decode("image payload is empty".to_string()));
    }

    base64::engine::general_purpose::STANDARD
        .decode(compact.as_bytes())
        .map_err(|e| OcrError::Decode(format!("Failed to decode base64 image: {e}")))
}

pub fn context_resolution(img: &DynamicImage) -> ContextResolution {
    let (width, height) = img.dimensions();
    ContextResolution { width, height }
}
