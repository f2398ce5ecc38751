use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    Unauthorized,
    Forbidden,
    NotFound,
    Conflict,
    Validation,
    RateLimited,
    Internal,
    Unknown,
}

impl ErrorCode {
    pub fn from_status(status: u16) -> Self {
        match status {
            401 => ErrorCode::Unauthorized,
            403 => ErrorCode::Forbidden,
            404 => ErrorCode::NotFound,
            409 => ErrorCode::Conflict,
            400 | 422 => ErrorCode::Validation,
            429 => ErrorCode::RateLimited,
            500..=599 => ErrorCode::Internal,
            _ => ErrorCode::Unknown,
        }
    }
}

/// A non-success response declared by the catalog API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
#[error("{message} (status {status})")]
pub struct ApiError {
    pub code: ErrorCode,
    pub status: u16,
    pub message: String,
    /// Whether `message` came from the response body rather than the status line.
    pub server_supplied: bool,
}

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

impl ApiError {
    pub fn new(status: u16, message: impl Into<String>) -> Self {
        Self {
            code: ErrorCode::from_status(status),
            status,
            message: message.into(),
            server_supplied: true,
        }
    }

    /// Builds the error from a raw response; `reason` is the canonical status phrase.
    pub fn from_response(status: u16, reason: Option<&str>, body: &str) -> Self {
        match server_message(body) {
            Some(message) => Self::new(status, message),
            None => Self {
                code: ErrorCode::from_status(status),
                status,
                message: fallback_message(status, reason),
                server_supplied: false,
            },
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        self.code == ErrorCode::Unauthorized
    }
}

/// Extracts the human-readable message from an error body.
///
/// JSON bodies contribute their `message` (or `error`) field; a JSON body
/// without either yields nothing. Anything else is taken as plain text.
pub fn server_message(body: &str) -> Option<String> {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Ok(value) = serde_json::from_str::<serde_json::Value>(trimmed) {
        if !value.is_object() {
            return value
                .as_str()
                .map(str::trim)
                .filter(|text| !text.is_empty())
                .map(str::to_string);
        }
        let parsed: ErrorBody = serde_json::from_value(value).ok()?;
        return parsed
            .message
            .or(parsed.error)
            .map(|text| text.trim().to_string())
            .filter(|text| !text.is_empty());
    }

    Some(trimmed.to_string())
}

pub fn fallback_message(status: u16, reason: Option<&str>) -> String {
    match reason {
        Some(reason) => format!("Request failed with status {status} ({reason})"),
        None => format!("Request failed with status {status}"),
    }
}
