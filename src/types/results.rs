//! Result types returned by the capability methods.
//!
//! Non-streaming calls return the full typed response; streaming calls
//! return a [`TokenStream`](crate::stream::TokenStream) instead. Detection
//! and pointing are always non-streaming.

use serde::{Deserialize, Serialize};

/// Caption for an image.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CaptionResponse {
    /// The generated caption.
    pub caption: String,
}

/// Answer to a free-text question about an image.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QueryResponse {
    /// The generated answer.
    pub answer: String,
}

/// Bounding box in normalized image-fraction coordinates.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Region {
    /// Left boundary of the detection box.
    pub x_min: f64,
    /// Top boundary of the detection box.
    pub y_min: f64,
    /// Right boundary of the detection box.
    pub x_max: f64,
    /// Bottom boundary of the detection box.
    pub y_max: f64,
}

/// Detected regions, in the detector's output order.
///
/// An empty `objects` list is a valid result meaning "not found", not an
/// error.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DetectResponse {
    /// Zero or more detected regions.
    pub objects: Vec<Region>,
}

/// A point in normalized image-fraction coordinates.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Point {
    /// Horizontal coordinate.
    pub x: f64,
    /// Vertical coordinate.
    pub y: f64,
}

/// Located points, in the model's output order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PointResponse {
    /// Zero or more located points.
    pub points: Vec<Point>,
}

/// Classification result from the classifier client.
///
/// The shape is determined by which model endpoint was configured: expert
/// models return a single label, distilled models return a
/// confidence-descending ranking.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum Classification {
    /// Single predicted label (expert models).
    Label(String),
    /// Labels ordered by descending confidence (distilled models).
    Ranked(Vec<LabelScore>),
}

/// One label with its confidence.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LabelScore {
    /// Predicted class label.
    pub label: String,
    /// Confidence in `[0, 1]`.
    pub confidence: f64,
}

/// Response from the classification endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ClassifyResponse {
    /// The predicted label or ranking.
    pub result: Classification,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classification_parses_expert_shape() {
        let parsed: ClassifyResponse =
            serde_json::from_str(r#"{"result": "hotdog"}"#).unwrap();
        assert_eq!(parsed.result, Classification::Label("hotdog".to_string()));
    }

    #[test]
    fn classification_parses_distilled_shape() {
        let parsed: ClassifyResponse = serde_json::from_str(
            r#"{"result": [{"label": "hotdog", "confidence": 0.9}, {"label": "not hotdog", "confidence": 0.1}]}"#,
        )
        .unwrap();
        match parsed.result {
            Classification::Ranked(ranked) => {
                assert_eq!(ranked.len(), 2);
                assert_eq!(ranked[0].label, "hotdog");
                assert!(ranked[0].confidence > ranked[1].confidence);
            }
            other => panic!("expected ranked shape, got {other:?}"),
        }
    }

    #[test]
    fn detect_response_parses_empty_objects() {
        let parsed: DetectResponse = serde_json::from_str(r#"{"objects": []}"#).unwrap();
        assert!(parsed.objects.is_empty());
    }

    #[test]
    fn region_fields_use_wire_names() {
        let parsed: Region = serde_json::from_str(
            r#"{"x_min": 0.1, "y_min": 0.2, "x_max": 0.8, "y_max": 0.9}"#,
        )
        .unwrap();
        assert_eq!(parsed.x_min, 0.1);
        assert_eq!(parsed.y_max, 0.9);
    }
}
