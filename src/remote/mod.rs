//! Remote (hosted-endpoint) VLM backend.
//!
//! Translates capability calls into authenticated multipart POSTs against
//! `{base_url}/{api_version}/{endpoint}` and decodes buffered JSON or SSE
//! streaming responses back into the shared result types.

mod streaming;

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::VlmError;
use crate::stream::TokenStream;
use crate::traits::VlmCapability;
use crate::types::{
    CaptionLength, CaptionResponse, DetectResponse, EncodedImage, ImageSource, PointResponse,
    QueryResponse, RemoteEncodedImage, SamplingSettings,
};
use crate::utils::image as image_util;

/// Header carrying the API key on every request.
pub const AUTH_HEADER: &str = "X-Visage-Auth";

pub(crate) const DEFAULT_BASE_URL: &str = "https://api.visage.dev";
pub(crate) const DEFAULT_API_VERSION: &str = "v1";
pub(crate) const DEFAULT_TIMEOUT: Duration = Duration::from_secs(20);

/// VLM backend talking to the hosted inference service.
#[derive(Clone)]
pub struct RemoteVlm {
    api_key: SecretString,
    base_url: String,
    api_version: String,
    timeout: Duration,
    http_client: reqwest::Client,
}

impl fmt::Debug for RemoteVlm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RemoteVlm")
            .field("base_url", &self.base_url)
            .field("api_version", &self.api_version)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

/// Builder for [`RemoteVlm`].
#[derive(Debug, Default)]
pub struct RemoteVlmBuilder {
    api_key: Option<String>,
    base_url: Option<String>,
    timeout: Option<Duration>,
    http_client: Option<reqwest::Client>,
}

impl RemoteVlmBuilder {
    /// API key used to authenticate every request.
    pub fn api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Override the service base URL.
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Per-request timeout for non-streaming calls and connection
    /// establishment. Defaults to 20 seconds.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Supply a preconfigured HTTP client.
    pub fn http_client(mut self, http_client: reqwest::Client) -> Self {
        self.http_client = Some(http_client);
        self
    }

    /// Build the backend.
    pub fn build(self) -> Result<RemoteVlm, VlmError> {
        let api_key = self
            .api_key
            .filter(|key| !key.is_empty())
            .ok_or_else(|| {
                VlmError::ConfigurationError(
                    "an API key is required for remote inference".to_string(),
                )
            })?;
        let timeout = self.timeout.unwrap_or(DEFAULT_TIMEOUT);
        let http_client = match self.http_client {
            Some(client) => client,
            None => reqwest::Client::builder()
                .connect_timeout(timeout)
                .build()
                .map_err(|e| {
                    VlmError::ConfigurationError(format!("failed to build HTTP client: {e}"))
                })?,
        };
        Ok(RemoteVlm {
            api_key: SecretString::from(api_key),
            base_url: self
                .base_url
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
            api_version: DEFAULT_API_VERSION.to_string(),
            timeout,
            http_client,
        })
    }
}

#[derive(Serialize)]
struct CaptionBody {
    length: CaptionLength,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<usize>,
}

#[derive(Serialize)]
struct QueryBody<'a> {
    question: &'a str,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<usize>,
}

#[derive(Serialize)]
struct ObjectBody<'a> {
    object: &'a str,
}

impl RemoteVlm {
    /// Start building a remote backend.
    pub fn builder() -> RemoteVlmBuilder {
        RemoteVlmBuilder::default()
    }

    /// Backend against the default hosted endpoint.
    pub fn from_api_key(api_key: impl Into<String>) -> Result<Self, VlmError> {
        Self::builder().api_key(api_key).build()
    }

    fn endpoint_url(&self, endpoint: &str) -> String {
        format!("{}/{}/{}", self.base_url, self.api_version, endpoint)
    }

    /// Resolve an input to the remote encoded form, transcoding raw images
    /// transparently.
    fn encode_source(&self, image: ImageSource) -> Result<RemoteEncodedImage, VlmError> {
        match image {
            ImageSource::Encoded(EncodedImage::Remote(remote)) => Ok(remote),
            ImageSource::Encoded(EncodedImage::Local(_)) => Err(VlmError::CapabilityMismatch(
                "locally-encoded image passed to the remote backend".to_string(),
            )),
            raw => {
                let jpeg = image_util::to_jpeg(&raw)?;
                Ok(RemoteEncodedImage::from_jpeg(&jpeg))
            }
        }
    }

    /// Multipart form with the JPEG attachment and the operation's JSON
    /// parameters. The UUID names the attachment only; no retry or dedup
    /// semantics attach to it.
    fn multipart_form(jpeg: Vec<u8>, body: &impl Serialize) -> Result<Form, VlmError> {
        let body_json = serde_json::to_string(body)?;
        let request_id = Uuid::new_v4();
        let part = Part::bytes(jpeg)
            .file_name(format!("{request_id}.jpg"))
            .mime_str("image/jpeg")
            .map_err(|e| {
                VlmError::ConfigurationError(format!("invalid attachment MIME type: {e}"))
            })?;
        Ok(Form::new().part("content", part).text("body", body_json))
    }

    async fn post_json(
        &self,
        endpoint: &str,
        jpeg: Vec<u8>,
        body: &impl Serialize,
    ) -> Result<serde_json::Value, VlmError> {
        let url = self.endpoint_url(endpoint);
        let form = Self::multipart_form(jpeg, body)?;
        debug!(%url, "sending request");
        let response = self
            .http_client
            .post(&url)
            .header(AUTH_HEADER, self.api_key.expose_secret())
            .multipart(form)
            .timeout(self.timeout)
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            warn!(%url, status = status.as_u16(), "request failed");
            let body = response.text().await.unwrap_or_default();
            return Err(VlmError::from_status(status.as_u16(), body));
        }
        let text = response.text().await?;
        serde_json::from_str(&text)
            .map_err(|e| VlmError::ParseError(format!("invalid JSON response: {e}")))
    }

    async fn fetch<T>(
        &self,
        endpoint: &str,
        jpeg: Vec<u8>,
        body: &impl Serialize,
    ) -> Result<T, VlmError>
    where
        T: serde::de::DeserializeOwned,
    {
        let value = self.post_json(endpoint, jpeg, body).await?;
        serde_json::from_value(value).map_err(|e| {
            VlmError::ParseError(format!("unexpected `{endpoint}` response shape: {e}"))
        })
    }

    /// Streaming POST. The configured timeout bounds connection
    /// establishment only; once the stream is open, the transport's read
    /// timeout governs inter-chunk delay.
    async fn post_stream(
        &self,
        endpoint: &str,
        jpeg: Vec<u8>,
        body: &impl Serialize,
    ) -> Result<TokenStream, VlmError> {
        let url = self.endpoint_url(endpoint);
        let form = Self::multipart_form(jpeg, body)?;
        debug!(%url, "opening stream");
        let response = self
            .http_client
            .post(&url)
            .header(AUTH_HEADER, self.api_key.expose_secret())
            .header(reqwest::header::ACCEPT, "text/event-stream")
            .multipart(form)
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            warn!(%url, status = status.as_u16(), "stream request failed");
            let body = response.text().await.unwrap_or_default();
            return Err(VlmError::from_status(status.as_u16(), body));
        }
        Ok(streaming::token_stream(response))
    }
}

#[async_trait]
impl VlmCapability for RemoteVlm {
    async fn encode_image(&self, image: ImageSource) -> Result<EncodedImage, VlmError> {
        Ok(EncodedImage::Remote(self.encode_source(image)?))
    }

    async fn caption(
        &self,
        image: ImageSource,
        length: CaptionLength,
        settings: Option<SamplingSettings>,
    ) -> Result<CaptionResponse, VlmError> {
        let encoded = self.encode_source(image)?;
        let body = CaptionBody {
            length,
            stream: false,
            max_tokens: settings.as_ref().and_then(|s| s.max_tokens),
        };
        self.fetch("caption", encoded.jpeg_bytes()?, &body).await
    }

    async fn caption_stream(
        &self,
        image: ImageSource,
        length: CaptionLength,
        settings: Option<SamplingSettings>,
    ) -> Result<TokenStream, VlmError> {
        let encoded = self.encode_source(image)?;
        let body = CaptionBody {
            length,
            stream: true,
            max_tokens: settings.as_ref().and_then(|s| s.max_tokens),
        };
        self.post_stream("caption", encoded.jpeg_bytes()?, &body).await
    }

    async fn query(
        &self,
        image: ImageSource,
        question: &str,
        settings: Option<SamplingSettings>,
    ) -> Result<QueryResponse, VlmError> {
        let encoded = self.encode_source(image)?;
        let body = QueryBody {
            question,
            stream: false,
            max_tokens: settings.as_ref().and_then(|s| s.max_tokens),
        };
        self.fetch("query", encoded.jpeg_bytes()?, &body).await
    }

    async fn query_stream(
        &self,
        image: ImageSource,
        question: &str,
        settings: Option<SamplingSettings>,
    ) -> Result<TokenStream, VlmError> {
        let encoded = self.encode_source(image)?;
        let body = QueryBody {
            question,
            stream: true,
            max_tokens: settings.as_ref().and_then(|s| s.max_tokens),
        };
        self.post_stream("query", encoded.jpeg_bytes()?, &body).await
    }

    async fn detect(&self, image: ImageSource, object: &str) -> Result<DetectResponse, VlmError> {
        let encoded = self.encode_source(image)?;
        self.fetch("detect", encoded.jpeg_bytes()?, &ObjectBody { object })
            .await
    }

    async fn point(&self, image: ImageSource, object: &str) -> Result<PointResponse, VlmError> {
        let encoded = self.encode_source(image)?;
        self.fetch("point", encoded.jpeg_bytes()?, &ObjectBody { object })
            .await
    }
}
