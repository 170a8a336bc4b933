//! REST API types for the site and dashboard frontends.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

/// Response sent to the frontend once a submission settles.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitResponse {
    /// Unique id for this submission.
    pub submission_id: String,

    /// Logical destination the payload went to.
    pub destination: String,

    /// Resting state: "succeeded" or "failed".
    pub status: String,

    /// Destination-defined result (e.g. the stored document URL).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,

    /// User-displayable failure message.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SubmitResponse {
    /// Build the response for a successful submission.
    pub fn succeeded(destination: &str, result: Value) -> Self {
        Self {
            submission_id: Uuid::new_v4().to_string(),
            destination: destination.to_string(),
            status: "succeeded".to_string(),
            result: Some(result),
            error: None,
        }
    }

    /// Build the response for a failed submission.
    pub fn failed(destination: &str, error: impl Into<String>) -> Self {
        Self {
            submission_id: Uuid::new_v4().to_string(),
            destination: destination.to_string(),
            status: "failed".to_string(),
            result: None,
            error: Some(error.into()),
        }
    }
}

/// Create an error response body.
pub fn error_response(error: &str) -> Value {
    json!({
        "submissionId": Uuid::new_v4().to_string(),
        "status": "failed",
        "error": error,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_succeeded_response_omits_error() {
        let response = SubmitResponse::succeeded(
            "document-upload",
            json!({"url": "https://cdn.rxflow.app/uploads/licence.pdf"}),
        );
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["status"], "succeeded");
        assert_eq!(json["destination"], "document-upload");
        assert!(json["result"]["url"].is_string());
        assert!(json.get("error").is_none());
        assert!(json.get("submissionId").is_some());
    }

    #[test]
    fn test_failed_response_carries_message() {
        let response = SubmitResponse::failed("demo-request", "network down");
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["status"], "failed");
        assert_eq!(json["error"], "network down");
        assert!(json.get("result").is_none());
    }

    #[test]
    fn test_error_response_shape() {
        let body = error_response("File size exceeds 5MB limit");
        assert_eq!(body["status"], "failed");
        assert_eq!(body["error"], "File size exceeds 5MB limit");
    }
}
