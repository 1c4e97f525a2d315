//! Local (in-process) VLM backend.
//!
//! Owns the encode → cache → reuse lifecycle: `encode_image` runs the
//! vision tower once and captures a cache-bearing [`EncodedImage`];
//! subsequent calls reuse that cache, or encode transparently when handed a
//! raw image. Generation yields each detokenized fragment as the decode
//! loop produces it and stops at end-of-sequence or at the `max_tokens`
//! cap, whichever comes first.

mod model;

pub use model::{DecodeSession, VisionModel};

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use crate::error::VlmError;
use crate::stream::{TokenStream, collect_text};
use crate::traits::VlmCapability;
use crate::types::{
    CaptionLength, CaptionResponse, DetectResponse, EncodedImage, ImageSource, LocalEncodedImage,
    PointResponse, QueryResponse, SamplingSettings,
};
use crate::utils::image as image_util;

/// VLM backend running the model in-process.
#[derive(Clone)]
pub struct LocalVlm {
    model: Arc<dyn VisionModel>,
}

impl LocalVlm {
    /// Create a backend over an in-process model.
    pub fn new(model: Arc<dyn VisionModel>) -> Self {
        Self { model }
    }

    /// Resolve an input to the local encoded form, encoding raw images
    /// transparently.
    fn encode_source(&self, image: ImageSource) -> Result<LocalEncodedImage, VlmError> {
        match image {
            ImageSource::Encoded(EncodedImage::Local(local)) => Ok(local),
            ImageSource::Encoded(EncodedImage::Remote(_)) => Err(VlmError::CapabilityMismatch(
                "remote-encoded image passed to the local backend".to_string(),
            )),
            raw => {
                let rgb = image_util::to_rgb(&raw)?;
                debug!(width = rgb.width(), height = rgb.height(), "encoding image");
                let cache = self.model.encode_image(&rgb)?;
                Ok(LocalEncodedImage::new(cache))
            }
        }
    }

    fn open_stream(
        &self,
        image: ImageSource,
        prompt: Vec<u32>,
        settings: Option<&SamplingSettings>,
    ) -> Result<TokenStream, VlmError> {
        let encoded = self.encode_source(image)?;
        let session = self.model.begin_generation(encoded.cache(), &prompt)?;
        let max_tokens = SamplingSettings::resolve_max_tokens(settings);
        Ok(generation_stream(session, max_tokens))
    }
}

impl fmt::Debug for LocalVlm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocalVlm").finish_non_exhaustive()
    }
}

/// Expose a decode session as a lazy token stream capped at `max_tokens`
/// fragments.
///
/// Reaching the cap and hitting end-of-sequence terminate identically: the
/// stream simply ends.
fn generation_stream(mut session: Box<dyn DecodeSession>, max_tokens: usize) -> TokenStream {
    let stream = async_stream::try_stream! {
        let mut produced = 0usize;
        while produced < max_tokens {
            match session.next_fragment()? {
                Some(fragment) => {
                    produced += 1;
                    yield fragment;
                }
                None => break,
            }
        }
    };
    Box::pin(stream)
}

#[async_trait]
impl VlmCapability for LocalVlm {
    async fn encode_image(&self, image: ImageSource) -> Result<EncodedImage, VlmError> {
        Ok(EncodedImage::Local(self.encode_source(image)?))
    }

    async fn caption(
        &self,
        image: ImageSource,
        length: CaptionLength,
        settings: Option<SamplingSettings>,
    ) -> Result<CaptionResponse, VlmError> {
        let stream = self.caption_stream(image, length, settings).await?;
        Ok(CaptionResponse {
            caption: collect_text(stream).await?,
        })
    }

    async fn caption_stream(
        &self,
        image: ImageSource,
        length: CaptionLength,
        settings: Option<SamplingSettings>,
    ) -> Result<TokenStream, VlmError> {
        let prompt = self.model.caption_tokens(length)?;
        self.open_stream(image, prompt, settings.as_ref())
    }

    async fn query(
        &self,
        image: ImageSource,
        question: &str,
        settings: Option<SamplingSettings>,
    ) -> Result<QueryResponse, VlmError> {
        let stream = self.query_stream(image, question, settings).await?;
        Ok(QueryResponse {
            answer: collect_text(stream).await?,
        })
    }

    async fn query_stream(
        &self,
        image: ImageSource,
        question: &str,
        settings: Option<SamplingSettings>,
    ) -> Result<TokenStream, VlmError> {
        let prompt = self.model.query_tokens(question)?;
        self.open_stream(image, prompt, settings.as_ref())
    }

    async fn detect(&self, image: ImageSource, object: &str) -> Result<DetectResponse, VlmError> {
        let encoded = self.encode_source(image)?;
        Ok(DetectResponse {
            objects: self.model.detect(encoded.cache(), object)?,
        })
    }

    async fn point(&self, image: ImageSource, object: &str) -> Result<PointResponse, VlmError> {
        let encoded = self.encode_source(image)?;
        Ok(PointResponse {
            points: self.model.point(encoded.cache(), object)?,
        })
    }
}
