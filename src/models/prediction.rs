//! Prediction result returned by `/upload`
//!
//! One transient value per request, serialized straight to JSON.
//! Error cases (model absent, decode/inference failure) are represented
//! as error-shaped values rather than HTTP failure codes, matching the
//! behavior clients already depend on.

use serde::Serialize;

/// Outcome of classifying one uploaded image
#[derive(Debug, Clone, Serialize)]
pub struct Prediction {
    /// True iff the predicted class is `trim`; null on error
    pub needs_trimming: Option<bool>,

    /// Probability mass of the predicted class, rounded to 3 decimals
    pub confidence: f64,

    /// Predicted class label; omitted on error
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prediction: Option<String>,

    /// Human-readable status line
    pub status: String,

    pub error: Option<String>,
}

impl Prediction {
    /// Successful classification of `label` with the given softmax probability
    pub fn success(label: &str, confidence: f32) -> Self {
        let needs_trimming = label == "trim";
        Self {
            needs_trimming: Some(needs_trimming),
            confidence: round3(confidence),
            prediction: Some(label.to_string()),
            status: if needs_trimming {
                "Needs Trimming".to_string()
            } else {
                "Does Not Need Trimming".to_string()
            },
            error: None,
        }
    }

    /// The classifier never loaded; requests short-circuit with this payload
    pub fn model_absent() -> Self {
        Self {
            needs_trimming: None,
            confidence: 0.0,
            prediction: None,
            status: "unknown".to_string(),
            error: Some("Model not loaded".to_string()),
        }
    }

    /// Decode or inference failure
    pub fn failed(message: String) -> Self {
        Self {
            needs_trimming: None,
            confidence: 0.0,
            prediction: None,
            status: "error".to_string(),
            error: Some(message),
        }
    }
}

fn round3(confidence: f32) -> f64 {
    (confidence as f64 * 1000.0).round() / 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trim_label_needs_trimming() {
        let p = Prediction::success("trim", 0.87);
        assert_eq!(p.needs_trimming, Some(true));
        assert_eq!(p.prediction.as_deref(), Some("trim"));
        assert_eq!(p.status, "Needs Trimming");
        assert_eq!(p.confidence, 0.87);
        assert!(p.error.is_none());
    }

    #[test]
    fn test_no_trim_label() {
        let p = Prediction::success("no_trim", 0.6);
        assert_eq!(p.needs_trimming, Some(false));
        assert_eq!(p.status, "Does Not Need Trimming");
    }

    #[test]
    fn test_confidence_rounded_to_three_decimals() {
        let p = Prediction::success("trim", 0.8674999);
        assert_eq!(p.confidence, 0.867);

        let p = Prediction::success("trim", 1.0);
        assert_eq!(p.confidence, 1.0);

        let p = Prediction::success("trim", 0.5004);
        assert_eq!(p.confidence, 0.5);
    }

    #[test]
    fn test_model_absent_shape() {
        let json = serde_json::to_value(Prediction::model_absent()).unwrap();
        assert_eq!(json["needs_trimming"], serde_json::Value::Null);
        assert_eq!(json["confidence"], 0.0);
        assert_eq!(json["status"], "unknown");
        assert_eq!(json["error"], "Model not loaded");
        // prediction key is omitted entirely on error
        assert!(json.get("prediction").is_none());
    }

    #[test]
    fn test_failed_shape() {
        let p = Prediction::failed("bad image".to_string());
        assert_eq!(p.status, "error");
        assert_eq!(p.error.as_deref(), Some("bad image"));
        assert_eq!(p.needs_trimming, None);
    }
}
