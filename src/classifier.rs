//! Image classification client.
//!
//! A single-purpose HTTP client scoped to exactly one configured model
//! endpoint and one request shape: image in, label(s) out. It shares the
//! remote backend's non-streaming transport but is intentionally outside
//! the [`VlmCapability`](crate::traits::VlmCapability) contract — no
//! streaming, no encoded-image reuse.

use std::fmt;
use std::time::Duration;

use reqwest::multipart::{Form, Part};
use secrecy::{ExposeSecret, SecretString};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::VlmError;
use crate::remote::{AUTH_HEADER, DEFAULT_API_VERSION, DEFAULT_BASE_URL, DEFAULT_TIMEOUT};
use crate::types::{ClassifyResponse, ImageSource};
use crate::utils::image as image_util;

/// Client for hosted classification models.
///
/// Expert models answer with a single label, distilled models with a
/// confidence-ranked list; which shape comes back is a property of the
/// configured endpoint, not of the request.
#[derive(Clone)]
pub struct Classifier {
    api_key: SecretString,
    base_url: String,
    api_version: String,
    model_endpoint: Option<String>,
    timeout: Duration,
    http_client: reqwest::Client,
}

impl fmt::Debug for Classifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Classifier")
            .field("base_url", &self.base_url)
            .field("model_endpoint", &self.model_endpoint)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

/// Builder for [`Classifier`].
#[derive(Debug, Default)]
pub struct ClassifierBuilder {
    api_key: Option<String>,
    base_url: Option<String>,
    model_endpoint: Option<String>,
    timeout: Option<Duration>,
    http_client: Option<reqwest::Client>,
}

impl ClassifierBuilder {
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

    /// Endpoint path of the classification model to call.
    pub fn model_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.model_endpoint = Some(endpoint.into());
        self
    }

    /// Per-request timeout. Defaults to 20 seconds.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Supply a preconfigured HTTP client.
    pub fn http_client(mut self, http_client: reqwest::Client) -> Self {
        self.http_client = Some(http_client);
        self
    }

    /// Build the classifier.
    pub fn build(self) -> Result<Classifier, VlmError> {
        let api_key = self
            .api_key
            .filter(|key| !key.is_empty())
            .ok_or_else(|| {
                VlmError::ConfigurationError(
                    "an API key is required for classification".to_string(),
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
        Ok(Classifier {
            api_key: SecretString::from(api_key),
            base_url: self
                .base_url
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
            api_version: DEFAULT_API_VERSION.to_string(),
            model_endpoint: self.model_endpoint,
            timeout,
            http_client,
        })
    }
}

impl Classifier {
    /// Start building a classifier.
    pub fn builder() -> ClassifierBuilder {
        ClassifierBuilder::default()
    }

    /// Classify an image against the configured model endpoint.
    ///
    /// Fails with [`VlmError::ConfigurationError`] before any image
    /// processing or network I/O when no endpoint is configured. Encoded
    /// images are rejected: the classifier has no encoded-image reuse.
    pub async fn classify(&self, image: ImageSource) -> Result<ClassifyResponse, VlmError> {
        let endpoint = self.model_endpoint.as_deref().ok_or_else(|| {
            VlmError::ConfigurationError(
                "a model endpoint must be configured before calling classify".to_string(),
            )
        })?;

        if matches!(image, ImageSource::Encoded(_)) {
            return Err(VlmError::UnsupportedInput(
                "the classifier accepts raw images only".to_string(),
            ));
        }
        let jpeg = image_util::to_jpeg(&image)?;

        let url = format!("{}/{}/{endpoint}", self.base_url, self.api_version);
        let request_id = Uuid::new_v4();
        let part = Part::bytes(jpeg)
            .file_name(format!("{request_id}.jpg"))
            .mime_str("image/jpeg")
            .map_err(|e| {
                VlmError::ConfigurationError(format!("invalid attachment MIME type: {e}"))
            })?;
        let form = Form::new().part("content", part);

        debug!(%url, "sending classification request");
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
            warn!(%url, status = status.as_u16(), "classification request failed");
            let body = response.text().await.unwrap_or_default();
            return Err(VlmError::from_status(status.as_u16(), body));
        }
        let text = response.text().await?;
        serde_json::from_str(&text)
            .map_err(|e| VlmError::ParseError(format!("unexpected classification response: {e}")))
    }
}
