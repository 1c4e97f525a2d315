//! Image normalization.
//!
//! Every raw input shape (bitmap, path, base64 string) is normalized here
//! into the canonical transport form before any request is built: RGB, the
//! longest side capped at [`MAX_DIMENSION`] pixels, JPEG at
//! [`JPEG_QUALITY`]. Inputs that cannot be normalized fail with
//! [`VlmError::UnsupportedInput`].

use std::path::Path;

use base64::{Engine as _, engine::general_purpose::STANDARD};
use image::DynamicImage;
use image::codecs::jpeg::JpegEncoder;

use crate::error::VlmError;
use crate::types::ImageSource;

/// Longest image side sent over the wire.
pub(crate) const MAX_DIMENSION: u32 = 768;

/// JPEG quality used when transcoding for transport.
pub(crate) const JPEG_QUALITY: u8 = 95;

/// Decode a raw image source into a bitmap.
pub(crate) fn load(source: &ImageSource) -> Result<DynamicImage, VlmError> {
    match source {
        ImageSource::Bitmap(img) => Ok(img.clone()),
        ImageSource::Path(path) => open_path(path),
        ImageSource::Base64(data) => decode_base64(data),
        ImageSource::Encoded(_) => Err(VlmError::UnsupportedInput(
            "already-encoded images carry no decodable pixels".to_string(),
        )),
    }
}

/// Decode a raw image source into an RGB bitmap.
pub(crate) fn to_rgb(source: &ImageSource) -> Result<image::RgbImage, VlmError> {
    Ok(load(source)?.to_rgb8())
}

/// Normalize a raw image source into transport-ready JPEG bytes.
pub(crate) fn to_jpeg(source: &ImageSource) -> Result<Vec<u8>, VlmError> {
    encode_jpeg(&load(source)?)
}

fn open_path(path: &Path) -> Result<DynamicImage, VlmError> {
    if !path.exists() {
        return Err(VlmError::UnsupportedInput(format!(
            "image file not found: {}",
            path.display()
        )));
    }
    image::open(path).map_err(|e| {
        VlmError::UnsupportedInput(format!("failed to open {}: {e}", path.display()))
    })
}

fn decode_base64(data: &str) -> Result<DynamicImage, VlmError> {
    let payload = match parse_data_url(data) {
        Some((_, payload)) => payload,
        None => data.trim().to_string(),
    };
    let bytes = STANDARD
        .decode(payload.as_bytes())
        .map_err(|e| VlmError::UnsupportedInput(format!("invalid base64 image data: {e}")))?;
    if !infer::is_image(&bytes) {
        return Err(VlmError::UnsupportedInput(
            "decoded bytes are not a recognized image format".to_string(),
        ));
    }
    image::load_from_memory(&bytes)
        .map_err(|e| VlmError::UnsupportedInput(format!("failed to decode image bytes: {e}")))
}

/// Transcode a bitmap to RGB JPEG, downscaling so the longest side fits
/// [`MAX_DIMENSION`].
pub(crate) fn encode_jpeg(img: &DynamicImage) -> Result<Vec<u8>, VlmError> {
    let scaled;
    let img = if img.width().max(img.height()) > MAX_DIMENSION {
        scaled = img.resize(
            MAX_DIMENSION,
            MAX_DIMENSION,
            image::imageops::FilterType::Lanczos3,
        );
        &scaled
    } else {
        img
    };
    let rgb = img.to_rgb8();
    let mut buf = Vec::new();
    let encoder = JpegEncoder::new_with_quality(&mut buf, JPEG_QUALITY);
    rgb.write_with_encoder(encoder)
        .map_err(|e| VlmError::UnsupportedInput(format!("failed to transcode to JPEG: {e}")))?;
    Ok(buf)
}

/// Wrap JPEG bytes in a self-describing data URL.
pub(crate) fn to_data_url(jpeg: &[u8]) -> String {
    format!("data:image/jpeg;base64,{}", STANDARD.encode(jpeg))
}

/// Split a data URL into its MIME type and base64 payload.
pub(crate) fn parse_data_url(data_url: &str) -> Option<(String, String)> {
    if !data_url.starts_with("data:") {
        return None;
    }
    let comma = data_url.find(',')?;
    let header = &data_url[5..comma];
    let payload = &data_url[comma + 1..];
    let mime = header.split(';').next().unwrap_or_default().to_string();
    Some((mime, payload.to_string()))
}

/// Recover the raw bytes of a data URL.
pub(crate) fn data_url_bytes(data_url: &str) -> Result<Vec<u8>, VlmError> {
    let (_, payload) = parse_data_url(data_url).ok_or_else(|| {
        VlmError::UnsupportedInput("expected a self-describing data URL".to_string())
    })?;
    STANDARD
        .decode(payload.as_bytes())
        .map_err(|e| VlmError::UnsupportedInput(format!("invalid data URL payload: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_bitmap(width: u32, height: u32) -> DynamicImage {
        DynamicImage::ImageRgb8(image::RgbImage::from_pixel(
            width,
            height,
            image::Rgb([120, 80, 40]),
        ))
    }

    #[test]
    fn bitmap_transcodes_to_jpeg() {
        let jpeg = to_jpeg(&ImageSource::Bitmap(test_bitmap(8, 8))).unwrap();
        let decoded = image::load_from_memory(&jpeg).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (8, 8));
    }

    #[test]
    fn oversized_bitmap_is_downscaled() {
        let jpeg = to_jpeg(&ImageSource::Bitmap(test_bitmap(2000, 500))).unwrap();
        let decoded = image::load_from_memory(&jpeg).unwrap();
        assert!(decoded.width() <= MAX_DIMENSION);
        assert!(decoded.height() <= MAX_DIMENSION);
        // Aspect ratio survives the downscale.
        assert_eq!(decoded.width(), MAX_DIMENSION);
    }

    #[test]
    fn base64_round_trip() {
        let jpeg = encode_jpeg(&test_bitmap(6, 4)).unwrap();
        let encoded = STANDARD.encode(&jpeg);
        let decoded = load(&ImageSource::base64(encoded)).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (6, 4));
    }

    #[test]
    fn data_url_input_is_accepted() {
        let jpeg = encode_jpeg(&test_bitmap(5, 5)).unwrap();
        let url = to_data_url(&jpeg);
        let decoded = load(&ImageSource::base64(url)).unwrap();
        assert_eq!(decoded.width(), 5);
    }

    #[test]
    fn malformed_base64_is_rejected() {
        let err = load(&ImageSource::base64("not valid base64!!!")).unwrap_err();
        assert!(matches!(err, VlmError::UnsupportedInput(_)));
    }

    #[test]
    fn non_image_bytes_are_rejected() {
        let encoded = STANDARD.encode(b"plain text payload");
        let err = load(&ImageSource::base64(encoded)).unwrap_err();
        assert!(matches!(err, VlmError::UnsupportedInput(_)));
    }

    #[test]
    fn missing_path_is_rejected() {
        let err = load(&ImageSource::path("/no/such/image.jpg")).unwrap_err();
        assert!(matches!(err, VlmError::UnsupportedInput(_)));
    }

    #[test]
    fn data_url_parsing() {
        let (mime, payload) = parse_data_url("data:image/jpeg;base64,QUJD").unwrap();
        assert_eq!(mime, "image/jpeg");
        assert_eq!(payload, "QUJD");
        assert!(parse_data_url("https://example.com/a.jpg").is_none());

        assert_eq!(data_url_bytes("data:image/jpeg;base64,QUJD").unwrap(), b"ABC");
    }
}
