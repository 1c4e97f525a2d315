//! Local backend lifecycle tests over a scripted model.
//!
//! The scripted collaborator stands in for the network: deterministic
//! fragments, fixed detections, and an encode-call counter for asserting
//! the caching discipline.

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use base64::{Engine as _, engine::general_purpose::STANDARD};
use image::DynamicImage;
use ndarray::{ArrayD, IxDyn};
use visage::prelude::*;
use visage::types::{ImageCache, Point, Region, RemoteEncodedImage};
use visage::{DecodeSession, collect_text};

struct ScriptedSession {
    fragments: VecDeque<String>,
}

impl DecodeSession for ScriptedSession {
    fn next_fragment(&mut self) -> Result<Option<String>, VlmError> {
        Ok(self.fragments.pop_front())
    }
}

struct ScriptedModel {
    fragments: Vec<String>,
    regions: Vec<Region>,
    points: Vec<Point>,
    encode_calls: AtomicUsize,
}

impl ScriptedModel {
    fn new(fragments: &[&str]) -> Self {
        Self {
            fragments: fragments.iter().map(|s| s.to_string()).collect(),
            regions: Vec::new(),
            points: Vec::new(),
            encode_calls: AtomicUsize::new(0),
        }
    }

    fn encode_calls(&self) -> usize {
        self.encode_calls.load(Ordering::SeqCst)
    }
}

impl VisionModel for ScriptedModel {
    fn encode_image(&self, image: &image::RgbImage) -> Result<ImageCache, VlmError> {
        self.encode_calls.fetch_add(1, Ordering::SeqCst);
        Ok(ImageCache::new(
            image.width() as usize,
            ArrayD::zeros(IxDyn(&[1, 4])),
        ))
    }

    fn caption_tokens(&self, _length: CaptionLength) -> Result<Vec<u32>, VlmError> {
        Ok(vec![1, 2])
    }

    fn query_tokens(&self, _question: &str) -> Result<Vec<u32>, VlmError> {
        Ok(vec![3, 4])
    }

    fn begin_generation(
        &self,
        _cache: &ImageCache,
        _prompt: &[u32],
    ) -> Result<Box<dyn DecodeSession>, VlmError> {
        Ok(Box::new(ScriptedSession {
            fragments: self.fragments.iter().cloned().collect(),
        }))
    }

    fn detect(&self, _cache: &ImageCache, _object: &str) -> Result<Vec<Region>, VlmError> {
        Ok(self.regions.clone())
    }

    fn point(&self, _cache: &ImageCache, _object: &str) -> Result<Vec<Point>, VlmError> {
        Ok(self.points.clone())
    }
}

fn test_bitmap() -> DynamicImage {
    DynamicImage::ImageRgb8(image::RgbImage::from_pixel(6, 6, image::Rgb([10, 200, 30])))
}

fn jpeg_bytes(img: &DynamicImage) -> Vec<u8> {
    let mut buf = Vec::new();
    img.write_to(&mut std::io::Cursor::new(&mut buf), image::ImageFormat::Jpeg)
        .expect("jpeg encodes");
    buf
}

#[tokio::test]
async fn caption_encodes_transparently_and_reuses_encodings() {
    let model = Arc::new(ScriptedModel::new(&["A ", "green ", "square."]));
    let vlm = LocalVlm::new(model.clone());

    let direct = vlm
        .caption(test_bitmap().into(), CaptionLength::Normal, None)
        .await
        .expect("caption ok");
    assert_eq!(direct.caption, "A green square.");
    assert_eq!(model.encode_calls(), 1);

    let encoded = vlm
        .encode_image(test_bitmap().into())
        .await
        .expect("encode ok");
    assert_eq!(model.encode_calls(), 2);

    // Two calls over one encoding pay no further encode cost.
    let first = vlm
        .caption(encoded.clone().into(), CaptionLength::Normal, None)
        .await
        .expect("caption ok");
    let second = vlm
        .query(encoded.into(), "what is it?", None)
        .await
        .expect("query ok");
    assert_eq!(first.caption, direct.caption);
    assert_eq!(second.answer, "A green square.");
    assert_eq!(model.encode_calls(), 2);
}

#[tokio::test]
async fn encode_image_is_idempotent() {
    let model = Arc::new(ScriptedModel::new(&["x"]));
    let vlm = LocalVlm::new(model.clone());

    let encoded = vlm
        .encode_image(test_bitmap().into())
        .await
        .expect("encode ok");
    let again = vlm
        .encode_image(encoded.into())
        .await
        .expect("re-encode ok");
    assert_eq!(again.format(), "local");
    assert_eq!(model.encode_calls(), 1);
}

#[tokio::test]
async fn streaming_concatenation_matches_non_streaming() {
    let model = Arc::new(ScriptedModel::new(&["One", ", two", ", three."]));
    let vlm = LocalVlm::new(model);

    let buffered = vlm
        .caption(test_bitmap().into(), CaptionLength::Normal, None)
        .await
        .expect("caption ok");
    let stream = vlm
        .caption_stream(test_bitmap().into(), CaptionLength::Normal, None)
        .await
        .expect("stream opens");
    let streamed = collect_text(stream).await.expect("stream drains");
    assert_eq!(streamed, buffered.caption);
}

#[tokio::test]
async fn max_tokens_caps_generation() {
    let model = Arc::new(ScriptedModel::new(&["a", "b", "c", "d"]));
    let vlm = LocalVlm::new(model);

    let capped = vlm
        .caption(
            test_bitmap().into(),
            CaptionLength::Normal,
            Some(SamplingSettings::with_max_tokens(2)),
        )
        .await
        .expect("caption ok");
    assert_eq!(capped.caption, "ab");
}

#[tokio::test]
async fn all_raw_shapes_normalize_to_the_same_result() {
    let model = Arc::new(ScriptedModel::new(&["same"]));
    let vlm = LocalVlm::new(model);

    let bitmap = test_bitmap();
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("input.jpg");
    bitmap.save(&path).expect("image saves");
    let b64 = STANDARD.encode(jpeg_bytes(&bitmap));

    let from_bitmap = vlm
        .query(bitmap.into(), "?", None)
        .await
        .expect("bitmap ok");
    let from_path = vlm
        .query(ImageSource::path(&path), "?", None)
        .await
        .expect("path ok");
    let from_base64 = vlm
        .query(ImageSource::base64(b64), "?", None)
        .await
        .expect("base64 ok");

    assert_eq!(from_bitmap.answer, "same");
    assert_eq!(from_path.answer, from_bitmap.answer);
    assert_eq!(from_base64.answer, from_bitmap.answer);
}

#[tokio::test]
async fn unreadable_inputs_are_unsupported() {
    let vlm = LocalVlm::new(Arc::new(ScriptedModel::new(&[])));

    let err = vlm
        .caption(
            ImageSource::path("/definitely/missing.jpg"),
            CaptionLength::Normal,
            None,
        )
        .await
        .unwrap_err();
    assert!(matches!(err, VlmError::UnsupportedInput(_)));

    let err = vlm
        .caption(ImageSource::base64("%%%"), CaptionLength::Normal, None)
        .await
        .unwrap_err();
    assert!(matches!(err, VlmError::UnsupportedInput(_)));
}

#[tokio::test]
async fn remote_encoded_image_is_a_capability_mismatch() {
    let vlm = LocalVlm::new(Arc::new(ScriptedModel::new(&[])));

    let remote = EncodedImage::Remote(RemoteEncodedImage::from_jpeg(&jpeg_bytes(&test_bitmap())));
    let err = vlm
        .caption(remote.into(), CaptionLength::Normal, None)
        .await
        .unwrap_err();
    assert!(matches!(err, VlmError::CapabilityMismatch(_)));
}

#[tokio::test]
async fn detect_and_point_return_empty_when_nothing_matches() {
    let vlm = LocalVlm::new(Arc::new(ScriptedModel::new(&[])));

    let detected = vlm
        .detect(test_bitmap().into(), "unicorn")
        .await
        .expect("detect ok");
    assert!(detected.objects.is_empty());

    let points = vlm
        .point(test_bitmap().into(), "unicorn")
        .await
        .expect("point ok");
    assert!(points.points.is_empty());
}
