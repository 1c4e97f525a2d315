//! Generation settings shared by both backends.

use serde::{Deserialize, Serialize};

/// Token cap applied when [`SamplingSettings::max_tokens`] is unset.
pub const DEFAULT_MAX_TOKENS: usize = 1024;

/// Optional per-call generation settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct SamplingSettings {
    /// Caps the number of generated tokens; `None` means the backend
    /// default.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<usize>,
}

impl SamplingSettings {
    /// Settings capping generation at `max_tokens`.
    pub fn with_max_tokens(max_tokens: usize) -> Self {
        Self {
            max_tokens: Some(max_tokens),
        }
    }

    /// The effective token cap for a call.
    pub(crate) fn resolve_max_tokens(settings: Option<&SamplingSettings>) -> usize {
        settings
            .and_then(|s| s.max_tokens)
            .unwrap_or(DEFAULT_MAX_TOKENS)
    }
}

/// Requested caption length.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CaptionLength {
    /// Full descriptive caption.
    #[default]
    Normal,
    /// One-line caption.
    Short,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn max_tokens_defaults_when_unset() {
        assert_eq!(SamplingSettings::resolve_max_tokens(None), DEFAULT_MAX_TOKENS);
        assert_eq!(
            SamplingSettings::resolve_max_tokens(Some(&SamplingSettings::default())),
            DEFAULT_MAX_TOKENS
        );
        assert_eq!(
            SamplingSettings::resolve_max_tokens(Some(&SamplingSettings::with_max_tokens(8))),
            8
        );
    }

    #[test]
    fn caption_length_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&CaptionLength::Normal).unwrap(),
            r#""normal""#
        );
        assert_eq!(
            serde_json::to_string(&CaptionLength::Short).unwrap(),
            r#""short""#
        );
    }
}
