use thiserror::Error;

use crate::utils::truncate_body;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Network error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Request timed out after {timeout_ms}ms, check the network connection or server status (backend host: {host})")]
    Timeout { timeout_ms: u64, host: String },

    #[error("HTTP {code}: {status_text}")]
    HttpStatus {
        code: u16,
        status_text: String,
        body: String,
    },

    /// Envelope code other than 200. `message` is `None` when the backend
    /// sent no usable text.
    #[error("{}", application_text(.code, .message))]
    Application { code: i64, message: Option<String> },

    #[error("No refresh token available")]
    NoRefreshToken,

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

/// Maximum length for response bodies kept in error values
const MAX_ERROR_BODY_LENGTH: usize = 500;

impl ApiError {
    pub fn from_status(status: reqwest::StatusCode, body: &str) -> Self {
        ApiError::HttpStatus {
            code: status.as_u16(),
            status_text: status.canonical_reason().unwrap_or_default().to_string(),
            body: truncate_body(body, MAX_ERROR_BODY_LENGTH),
        }
    }

    /// Build an application-level failure from an envelope's code and message.
    pub fn application(code: i64, message: Option<String>) -> Self {
        ApiError::Application {
            code,
            message: message.filter(|m| !m.trim().is_empty()),
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, ApiError::Timeout { .. })
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ApiError::HttpStatus { code: 401, .. })
    }
}

fn application_text(code: &i64, message: &Option<String>) -> String {
    match message {
        Some(m) => m.clone(),
        None => format!("Request failed with code {}", code),
    }
}
