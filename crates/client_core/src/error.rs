use shared::error::ApiError;
use thiserror::Error;

pub const CONNECTIVITY_MESSAGE: &str =
    "Could not reach the server. Check your connection and try again.";
pub const UNEXPECTED_RESPONSE_MESSAGE: &str = "The server sent a response that could not be read.";
pub const NO_SESSION_MESSAGE: &str = "Please log in first.";

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("api error: {0}")]
    Api(#[from] ApiError),
    #[error("transport failure: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("malformed response body: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("invalid base url: {0}")]
    Url(#[from] url::ParseError),
    #[error("no active session")]
    NoSession,
}

impl ClientError {
    /// 401 from the API; routed to session recovery rather than shown as a generic error.
    pub fn requires_reauth(&self) -> bool {
        matches!(self, ClientError::Api(api) if api.is_unauthorized())
    }

    pub fn is_transport(&self) -> bool {
        matches!(self, ClientError::Transport(_))
    }

    /// Text suitable for an inline form error or a toast.
    pub fn user_message(&self) -> String {
        match self {
            ClientError::Validation(message) => message.clone(),
            ClientError::Api(api) => api.message.clone(),
            ClientError::Transport(_) => CONNECTIVITY_MESSAGE.to_string(),
            ClientError::Decode(_) => UNEXPECTED_RESPONSE_MESSAGE.to_string(),
            ClientError::Url(err) => format!("Invalid server address: {err}"),
            ClientError::NoSession => NO_SESSION_MESSAGE.to_string(),
        }
    }
}
