//! The polymorphic VLM capability contract.

use async_trait::async_trait;

use crate::error::VlmError;
use crate::stream::TokenStream;
use crate::types::{
    CaptionLength, CaptionResponse, DetectResponse, EncodedImage, ImageSource, PointResponse,
    QueryResponse, SamplingSettings,
};

/// The capability contract implemented identically by every backend.
///
/// Application code and tests are written once against this trait and run
/// unchanged against [`LocalVlm`](crate::local::LocalVlm) and
/// [`RemoteVlm`](crate::remote::RemoteVlm). The trait is object-safe, so
/// `Box<dyn VlmCapability>` works for backend-agnostic wiring.
///
/// Streaming is offered on captioning and querying through the paired
/// `_stream` methods, which return a lazy [`TokenStream`] yielding fragments
/// as they become available. For identical inputs and settings, the
/// non-streaming form returns exactly the concatenation of the streaming
/// form's fragments. Detection and pointing are always non-streaming.
#[async_trait]
pub trait VlmCapability: Send + Sync {
    /// Preprocess an image into the backend's reusable encoded form.
    ///
    /// Encoding is the expensive step: the local backend runs a
    /// vision-tower forward pass and captures cache state, the remote
    /// backend performs the resize/transcode whose bytes travel with each
    /// request. Holding the returned [`EncodedImage`] amortizes that cost
    /// across any number of subsequent calls.
    ///
    /// Passing an already-encoded image of the matching variant is a no-op
    /// that returns it unchanged; the other backend's variant fails with
    /// [`VlmError::CapabilityMismatch`]. The encoded form is not guaranteed
    /// to be compatible across versions and must not be persisted out of
    /// band.
    async fn encode_image(&self, image: ImageSource) -> Result<EncodedImage, VlmError>;

    /// Generate a caption for the image.
    async fn caption(
        &self,
        image: ImageSource,
        length: CaptionLength,
        settings: Option<SamplingSettings>,
    ) -> Result<CaptionResponse, VlmError>;

    /// Generate a caption, yielding fragments as they are produced.
    async fn caption_stream(
        &self,
        image: ImageSource,
        length: CaptionLength,
        settings: Option<SamplingSettings>,
    ) -> Result<TokenStream, VlmError>;

    /// Answer a free-text question about the image.
    async fn query(
        &self,
        image: ImageSource,
        question: &str,
        settings: Option<SamplingSettings>,
    ) -> Result<QueryResponse, VlmError>;

    /// Answer a free-text question, yielding fragments as they are
    /// produced.
    async fn query_stream(
        &self,
        image: ImageSource,
        question: &str,
        settings: Option<SamplingSettings>,
    ) -> Result<TokenStream, VlmError>;

    /// Detect and localize the named object.
    ///
    /// An empty region list means "not found" and is not an error.
    async fn detect(&self, image: ImageSource, object: &str) -> Result<DetectResponse, VlmError>;

    /// Locate the named object as one or more points.
    async fn point(&self, image: ImageSource, object: &str) -> Result<PointResponse, VlmError>;
}
