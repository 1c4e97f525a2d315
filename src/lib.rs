//! # Visage — A Unified VLM Client Library
//!
//! Visage is a client library for vision-language models, exposing image
//! encoding, captioning, visual question answering, and object
//! detection/localization behind one capability trait — regardless of
//! whether inference runs in-process or against a hosted endpoint.
//!
//! ## Features
//!
//! - **One contract, two backends**: [`VlmCapability`] is implemented
//!   identically by [`LocalVlm`] (in-process inference) and [`RemoteVlm`]
//!   (hosted endpoint), so application code and tests are written once.
//! - **Encoded-image reuse**: `encode_image` pays the expensive
//!   preprocessing once and returns an opaque [`types::EncodedImage`] that
//!   any number of later calls can reuse.
//! - **Streaming on demand**: captioning and querying offer paired
//!   `_stream` methods returning a lazy, pull-based [`TokenStream`] of text
//!   fragments.
//! - **Type safety**: results, regions, points, and errors are plain typed
//!   values; the two encoded-image variants are an exhaustively matched
//!   enum.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use visage::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let vlm = RemoteVlm::builder().api_key("your-api-key").build()?;
//!
//!     // Encode once, query many times.
//!     let encoded = vlm.encode_image(ImageSource::path("photo.jpg")).await?;
//!     let caption = vlm
//!         .caption(encoded.clone().into(), CaptionLength::Normal, None)
//!         .await?;
//!     println!("caption: {}", caption.caption);
//!
//!     let answer = vlm
//!         .query(encoded.into(), "What is in the foreground?", None)
//!         .await?;
//!     println!("answer: {}", answer.answer);
//!     Ok(())
//! }
//! ```
//!
//! ## Streaming
//!
//! ```rust,no_run
//! use futures_util::StreamExt;
//! use visage::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let vlm = RemoteVlm::builder().api_key("your-api-key").build()?;
//!     let mut stream = vlm
//!         .caption_stream(ImageSource::path("photo.jpg"), CaptionLength::Normal, None)
//!         .await?;
//!     while let Some(fragment) = stream.next().await {
//!         print!("{}", fragment?);
//!     }
//!     Ok(())
//! }
//! ```
#![deny(unsafe_code)]

pub mod classifier;
pub mod error;
pub mod local;
pub mod remote;
pub mod stream;
pub mod traits;
pub mod types;

mod utils;

pub use classifier::{Classifier, ClassifierBuilder};
pub use error::VlmError;
pub use local::{DecodeSession, LocalVlm, VisionModel};
pub use remote::{RemoteVlm, RemoteVlmBuilder};
pub use stream::{CancelHandle, TokenStream, collect_text, make_cancellable};
pub use traits::VlmCapability;

/// Commonly used imports.
pub mod prelude {
    pub use crate::classifier::Classifier;
    pub use crate::error::VlmError;
    pub use crate::local::{LocalVlm, VisionModel};
    pub use crate::remote::RemoteVlm;
    pub use crate::stream::{TokenStream, collect_text};
    pub use crate::traits::VlmCapability;
    pub use crate::types::{
        CaptionLength, CaptionResponse, Classification, ClassifyResponse, DetectResponse,
        EncodedImage, ImageSource, Point, PointResponse, QueryResponse, Region, SamplingSettings,
    };
}
