//! Image inputs and the opaque encoded-image representation.
//!
//! [`ImageSource`] is the input boundary: callers hand over an in-memory
//! bitmap, a filesystem path, a base64 string, or an already-encoded image,
//! and backends normalize the raw shapes into one canonical transport form
//! before any request is built.
//!
//! [`EncodedImage`] is the backend-specific preprocessed form. Encoding is
//! the expensive step (a vision-tower forward pass, or a resize/transcode);
//! holding an `EncodedImage` lets callers amortize it across any number of
//! subsequent calls. The value is immutable after creation and is read-only
//! input to every downstream call.

use std::fmt;
use std::path::{Path, PathBuf};

use ndarray::ArrayD;

use crate::error::VlmError;
use crate::utils::image as image_util;

/// An image accepted by the capability methods.
pub enum ImageSource {
    /// Decoded in-memory bitmap.
    Bitmap(image::DynamicImage),
    /// Path to an image file on disk.
    Path(PathBuf),
    /// Base64-encoded image bytes; a `data:` URL prefix is tolerated.
    Base64(String),
    /// A previously encoded image, passed through unchanged.
    Encoded(EncodedImage),
}

impl ImageSource {
    /// Image at a filesystem path.
    pub fn path(path: impl Into<PathBuf>) -> Self {
        Self::Path(path.into())
    }

    /// Base64-encoded image bytes.
    pub fn base64(data: impl Into<String>) -> Self {
        Self::Base64(data.into())
    }
}

impl From<image::DynamicImage> for ImageSource {
    fn from(img: image::DynamicImage) -> Self {
        Self::Bitmap(img)
    }
}

impl From<PathBuf> for ImageSource {
    fn from(path: PathBuf) -> Self {
        Self::Path(path)
    }
}

impl From<&Path> for ImageSource {
    fn from(path: &Path) -> Self {
        Self::Path(path.to_path_buf())
    }
}

impl From<EncodedImage> for ImageSource {
    fn from(encoded: EncodedImage) -> Self {
        Self::Encoded(encoded)
    }
}

impl fmt::Debug for ImageSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bitmap(img) => f
                .debug_struct("Bitmap")
                .field("width", &img.width())
                .field("height", &img.height())
                .finish(),
            Self::Path(path) => f.debug_tuple("Path").field(path).finish(),
            Self::Base64(data) => f
                .debug_struct("Base64")
                .field("len", &data.len())
                .finish(),
            Self::Encoded(encoded) => f.debug_tuple("Encoded").field(encoded).finish(),
        }
    }
}

/// Opaque, backend-specific preprocessed representation of an image.
///
/// The two variants are not interchangeable: passing a
/// [`EncodedImage::Remote`] to the local backend (or vice versa) fails with
/// [`VlmError::CapabilityMismatch`]. The representation is not guaranteed to
/// be compatible across versions and must not be persisted out of band.
#[derive(Debug, Clone)]
pub enum EncodedImage {
    /// Key-value-cache snapshot produced by the in-process model.
    Local(LocalEncodedImage),
    /// Transcoded JPEG bytes wrapped in a self-describing data URL,
    /// accepted by the hosted endpoint.
    Remote(RemoteEncodedImage),
}

impl EncodedImage {
    /// Short tag naming the producing backend family.
    pub fn format(&self) -> &'static str {
        match self {
            Self::Local(_) => "local",
            Self::Remote(_) => "remote",
        }
    }
}

/// Cache state captured by the local backend's image encode.
///
/// Holds the sequence position reached after the vision-tower forward pass
/// and the key-value cache tensor itself. Downstream generation clones the
/// tensor as a call-scoped working copy; the snapshot held here is never
/// mutated in place.
#[derive(Clone)]
pub struct ImageCache {
    pos: usize,
    kv_cache: ArrayD<f32>,
}

impl ImageCache {
    /// Create a cache snapshot at `pos` over the given tensor.
    pub fn new(pos: usize, kv_cache: ArrayD<f32>) -> Self {
        Self { pos, kv_cache }
    }

    /// Sequence position after the image prefix.
    pub fn pos(&self) -> usize {
        self.pos
    }

    /// The cache tensor.
    pub fn kv_cache(&self) -> &ArrayD<f32> {
        &self.kv_cache
    }
}

impl fmt::Debug for ImageCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImageCache")
            .field("pos", &self.pos)
            .field("kv_shape", &self.kv_cache.shape())
            .finish()
    }
}

/// Encoded form produced and consumed by the local backend.
#[derive(Debug, Clone)]
pub struct LocalEncodedImage {
    cache: ImageCache,
}

impl LocalEncodedImage {
    /// Wrap a cache snapshot produced by the model.
    pub fn new(cache: ImageCache) -> Self {
        Self { cache }
    }

    /// The captured cache state.
    pub fn cache(&self) -> &ImageCache {
        &self.cache
    }
}

/// Encoded form produced and consumed by the remote backend.
///
/// Owns a `data:image/jpeg;base64,…` URL over the already-transcoded JPEG
/// bytes. Valid only for the lifetime of the originating session and
/// credentials.
#[derive(Clone, PartialEq, Eq)]
pub struct RemoteEncodedImage {
    image_url: String,
}

impl RemoteEncodedImage {
    /// Wrap transcoded JPEG bytes in a data URL.
    pub fn from_jpeg(bytes: &[u8]) -> Self {
        Self {
            image_url: image_util::to_data_url(bytes),
        }
    }

    /// The self-describing image URL.
    pub fn image_url(&self) -> &str {
        &self.image_url
    }

    /// Recover the JPEG bytes for transport.
    pub(crate) fn jpeg_bytes(&self) -> Result<Vec<u8>, VlmError> {
        image_util::data_url_bytes(&self.image_url)
    }
}

impl fmt::Debug for RemoteEncodedImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RemoteEncodedImage")
            .field("url_len", &self.image_url.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encoded_image_format_tags() {
        let local = EncodedImage::Local(LocalEncodedImage::new(ImageCache::new(
            4,
            ArrayD::zeros(ndarray::IxDyn(&[1, 2])),
        )));
        let remote = EncodedImage::Remote(RemoteEncodedImage::from_jpeg(&[0xFF, 0xD8, 0xFF]));
        assert_eq!(local.format(), "local");
        assert_eq!(remote.format(), "remote");
    }

    #[test]
    fn remote_encoded_round_trips_bytes() {
        let bytes = vec![0xFF, 0xD8, 0xFF, 0xE0, 0x01, 0x02];
        let encoded = RemoteEncodedImage::from_jpeg(&bytes);
        assert!(encoded.image_url().starts_with("data:image/jpeg;base64,"));
        assert_eq!(encoded.jpeg_bytes().unwrap(), bytes);
    }

    #[test]
    fn image_source_debug_is_compact() {
        let src = ImageSource::base64("aGVsbG8=");
        let rendered = format!("{src:?}");
        assert!(rendered.contains("Base64"));
        assert!(!rendered.contains("aGVsbG8="));
    }
}
