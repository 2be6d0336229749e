//! The response envelope every backend endpoint wraps its data in, and the
//! lenient body parsing underneath it.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::ApiError;

/// Envelope code the backend uses for logical success.
pub const SUCCESS_CODE: i64 = 200;

/// Uniform response wrapper returned by every backend endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiEnvelope {
    pub code: i64,
    #[serde(default)]
    pub data: Option<Value>,
    #[serde(default)]
    pub message: Option<String>,
}

impl ApiEnvelope {
    pub fn is_success(&self) -> bool {
        self.code == SUCCESS_CODE
    }

    /// Split the envelope into its data on success or an application error.
    pub fn into_result(self) -> Result<Option<Value>, ApiError> {
        if self.is_success() {
            Ok(self.data)
        } else {
            Err(ApiError::application(self.code, self.message))
        }
    }

    pub fn from_payload(payload: Payload) -> Result<Self, ApiError> {
        match payload {
            Payload::Json(value) => serde_json::from_value(value)
                .map_err(|e| ApiError::InvalidResponse(format!("Unexpected response shape: {}", e))),
            // Bodies served without a JSON content type may still be JSON
            Payload::Raw(text) => serde_json::from_str(&text)
                .map_err(|e| ApiError::InvalidResponse(format!("Response is not JSON: {}", e))),
        }
    }
}

/// Response body, leniently parsed.
///
/// A body is `Json` only when the server labelled it as JSON *and* it
/// parsed; anything else, including malformed JSON, is kept as `Raw` text
/// so callers can still inspect it.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Json(Value),
    Raw(String),
}

impl Payload {
    pub fn parse(content_type: Option<&str>, text: String) -> Self {
        let is_json = content_type
            .map(|ct| ct.to_ascii_lowercase().contains("application/json"))
            .unwrap_or(false);
        if is_json {
            if let Ok(value) = serde_json::from_str(&text) {
                return Payload::Json(value);
            }
        }
        Payload::Raw(text)
    }

    pub fn as_json(&self) -> Option<&Value> {
        match self {
            Payload::Json(value) => Some(value),
            Payload::Raw(_) => None,
        }
    }
}
