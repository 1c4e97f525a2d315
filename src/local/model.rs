//! Collaborator traits for in-process inference.
//!
//! The network itself lives behind [`VisionModel`]; the backend only
//! depends on the operations below. Implementations wrap whatever runtime
//! actually executes the weights.

use image::RgbImage;

use crate::error::VlmError;
use crate::types::{CaptionLength, ImageCache, Point, Region};

/// In-process model collaborator.
pub trait VisionModel: Send + Sync {
    /// Run the vision tower over a normalized RGB image and capture the
    /// resulting cache state.
    fn encode_image(&self, image: &RgbImage) -> Result<ImageCache, VlmError>;

    /// Prompt tokens for a caption of the given length.
    fn caption_tokens(&self, length: CaptionLength) -> Result<Vec<u32>, VlmError>;

    /// Prompt tokens for a free-text question.
    fn query_tokens(&self, question: &str) -> Result<Vec<u32>, VlmError>;

    /// Start a decode pass over the prompt.
    ///
    /// `cache` is a shared snapshot: implementations must work on their own
    /// copy and leave the passed tensor untouched, so concurrent calls can
    /// reuse one encoded image.
    fn begin_generation(
        &self,
        cache: &ImageCache,
        prompt: &[u32],
    ) -> Result<Box<dyn DecodeSession>, VlmError>;

    /// Detect regions containing the named object.
    fn detect(&self, cache: &ImageCache, object: &str) -> Result<Vec<Region>, VlmError>;

    /// Locate the named object as points.
    fn point(&self, cache: &ImageCache, object: &str) -> Result<Vec<Point>, VlmError>;
}

/// One in-flight decode pass.
///
/// Owns its call-scoped working state; each call advances the decoding loop
/// by one step.
pub trait DecodeSession: Send {
    /// Produce the next detokenized fragment, or `None` at end of
    /// sequence.
    fn next_fragment(&mut self) -> Result<Option<String>, VlmError>;
}
