//! Core types shared by every backend.

pub mod image;
pub mod results;
pub mod sampling;

pub use self::image::{EncodedImage, ImageCache, ImageSource, LocalEncodedImage, RemoteEncodedImage};
pub use results::{
    CaptionResponse, Classification, ClassifyResponse, DetectResponse, LabelScore, Point,
    PointResponse, QueryResponse, Region,
};
pub use sampling::{CaptionLength, DEFAULT_MAX_TOKENS, SamplingSettings};
