//! Error handling for the VLM client library.
//!
//! All fallible operations return [`VlmError`]. The library performs no
//! silent retries and no local recovery: failures surface directly to the
//! caller, and a failed streaming read terminates the token stream by
//! yielding the error at the next pull.

use thiserror::Error;

/// Errors surfaced by VLM backends and the classifier client.
#[derive(Debug, Error)]
pub enum VlmError {
    /// The image input could not be normalized (corrupt data, unreadable
    /// path, malformed base64 or data URL).
    #[error("Unsupported image input: {0}")]
    UnsupportedInput(String),

    /// The service rejected the request credentials (HTTP 401/403).
    #[error("Authentication failed: {0}")]
    AuthenticationError(String),

    /// The service returned a non-2xx status other than an auth rejection.
    #[error("API error {status}: {body}")]
    ApiError {
        /// HTTP status code.
        status: u16,
        /// Raw response body.
        body: String,
    },

    /// The request could not be dispatched or the connection failed.
    #[error("Transport error: {0}")]
    TransportError(String),

    /// A streaming response failed mid-stream.
    #[error("Stream error: {0}")]
    StreamError(String),

    /// A response body or stream chunk could not be parsed.
    #[error("Parse error: {0}")]
    ParseError(String),

    /// An encoded image produced by one backend was passed to the other.
    #[error("Capability mismatch: {0}")]
    CapabilityMismatch(String),

    /// A required endpoint or model was not configured.
    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    /// The in-process model collaborator failed.
    #[error("Model error: {0}")]
    ModelError(String),
}

impl VlmError {
    /// HTTP status carried by the error, if any.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::ApiError { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Whether the error is a credential rejection.
    pub fn is_auth_error(&self) -> bool {
        matches!(self, Self::AuthenticationError(_))
    }

    /// Whether the error originated below the API layer (connection,
    /// timeout, or mid-stream transport failure).
    pub fn is_transport_error(&self) -> bool {
        matches!(self, Self::TransportError(_) | Self::StreamError(_))
    }

    /// Classify a non-2xx response into the matching error kind.
    ///
    /// 401 and 403 map to [`VlmError::AuthenticationError`]; everything
    /// else carries the status and body verbatim.
    pub fn from_status(status: u16, body: String) -> Self {
        match status {
            401 | 403 => Self::AuthenticationError(body),
            _ => Self::ApiError { status, body },
        }
    }
}

impl From<reqwest::Error> for VlmError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::TransportError(format!("request timed out: {e}"))
        } else if e.is_connect() {
            Self::TransportError(format!("connection failed: {e}"))
        } else {
            Self::TransportError(e.to_string())
        }
    }
}

impl From<serde_json::Error> for VlmError {
    fn from(e: serde_json::Error) -> Self {
        Self::ParseError(e.to_string())
    }
}

impl From<image::ImageError> for VlmError {
    fn from(e: image::ImageError) -> Self {
        Self::UnsupportedInput(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_classification() {
        assert!(VlmError::from_status(401, "bad key".into()).is_auth_error());
        assert!(VlmError::from_status(403, "forbidden".into()).is_auth_error());

        let err = VlmError::from_status(500, "boom".into());
        assert_eq!(err.status_code(), Some(500));
        assert!(!err.is_auth_error());
    }

    #[test]
    fn transport_predicates() {
        assert!(VlmError::TransportError("refused".into()).is_transport_error());
        assert!(VlmError::StreamError("reset".into()).is_transport_error());
        assert!(!VlmError::ParseError("bad json".into()).is_transport_error());
    }
}
