//! Data client error types

use thiserror::Error;

use crate::model::ExpenseId;

/// Errors that can occur when talking to the data service
#[derive(Error, Debug)]
pub enum ClientError {
    #[error("Data service unavailable")]
    Unavailable,

    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("API error {status}: {message}")]
    ApiError { status: u16, message: String },

    #[error("Request timeout")]
    Timeout,

    #[error("Not authorized for this collection")]
    Unauthorized,

    #[error("Expense not found: {0}")]
    NotFound(ExpenseId),

    #[error("Malformed response: {0}")]
    Decode(String),

    #[error("WebSocket error: {0}")]
    WebSocket(String),

    #[error("Invalid endpoint: {0}")]
    InvalidEndpoint(String),
}

impl From<serde_json::Error> for ClientError {
    fn from(err: serde_json::Error) -> Self {
        ClientError::Decode(err.to_string())
    }
}

impl From<tokio_tungstenite::tungstenite::Error> for ClientError {
    fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
        ClientError::WebSocket(err.to_string())
    }
}

/// Result type alias for data client operations
pub type ClientResult<T> = Result<T, ClientError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ClientError::NotFound(ExpenseId::new("e-9"));
        assert_eq!(err.to_string(), "Expense not found: e-9");

        let err = ClientError::ApiError {
            status: 503,
            message: "down".to_string(),
        };
        assert_eq!(err.to_string(), "API error 503: down");
    }

    #[test]
    fn test_json_error_conversion() {
        let json_err = serde_json::from_str::<u32>("nope").unwrap_err();
        let err: ClientError = json_err.into();
        assert!(matches!(err, ClientError::Decode(_)));
    }
}
