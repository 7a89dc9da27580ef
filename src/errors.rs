use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Errors surfaced by the lookup pipeline.
///
/// Every variant maps to an HTTP status and a `{"error": "<text>"}` body at
/// the boundary; cache write failures never reach here, they are logged at
/// the call site and the response is sent anyway.
#[derive(Error, Debug)]
pub enum LookupError {
    #[error("{0}")]
    BadRequest(String),

    /// Upstream 404, or a WHOIS parser that could not find the domain.
    #[error("resource not found")]
    ResourceNotFound,

    /// Upstream 403.
    #[error("the registry denied the query")]
    RegistryDenied,

    #[error("unexpected status code: {0}")]
    UnexpectedStatus(u16),

    /// Network-level failure talking to an RDAP or WHOIS server.
    #[error("{0}")]
    Upstream(String),

    #[error("malformed upstream response: {0}")]
    Parse(String),

    /// No registry is configured for the TLD, CIDR block or ASN range.
    /// Carries the full explanatory message.
    #[error("{0}")]
    NoRegistry(String),

    #[error("cache error: {0}")]
    Cache(String),
}

impl From<reqwest::Error> for LookupError {
    fn from(err: reqwest::Error) -> Self {
        LookupError::Upstream(err.to_string())
    }
}

impl From<std::io::Error> for LookupError {
    fn from(err: std::io::Error) -> Self {
        LookupError::Upstream(err.to_string())
    }
}

impl From<tokio::time::error::Elapsed> for LookupError {
    fn from(_: tokio::time::error::Elapsed) -> Self {
        LookupError::Upstream("network timeout".to_string())
    }
}

impl From<serde_json::Error> for LookupError {
    fn from(err: serde_json::Error) -> Self {
        LookupError::Parse(err.to_string())
    }
}

impl IntoResponse for LookupError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            LookupError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            LookupError::ResourceNotFound => {
                (StatusCode::NOT_FOUND, "Resource not found".to_string())
            }
            LookupError::RegistryDenied => (
                StatusCode::FORBIDDEN,
                "The registry denied the query".to_string(),
            ),
            _ => (StatusCode::INTERNAL_SERVER_ERROR, self.to_string()),
        };

        let body = Json(json!({ "error": message }));
        (status, body).into_response()
    }
}
