use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use processors::ProcessorError;

pub type ServerResult<T> = Result<T, ServerError>;

/// Server error types. Validation/decoding failures abort the request
/// (405); row-local failures (`MissingField`, `DuplicateRecord`) never
/// reach here, they are counted in a batch's `IngestSummary` instead;
/// `EdgeNotFound` and store failures are surfaced as 422/500 when a
/// processor call made directly from a request handler (rather than a
/// background worker) fails before a batch is even opened.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("authentication failed: {0}")]
    Authentication(String),

    #[error("rate limit exceeded")]
    RateLimitExceeded,

    #[error("request timeout")]
    Timeout,

    #[error("payload validation failed: {0}")]
    Validation(String),

    #[error("request body is not valid JSON: {0}")]
    NotJson(String),

    #[error("payload too large: max {0}MB allowed")]
    PayloadTooLarge(usize),

    #[error(transparent)]
    Processor(#[from] ProcessorError),

    #[error(transparent)]
    Store(#[from] store::StoreError),

    #[error(transparent)]
    Graph(#[from] graph::GraphError),

    #[error(transparent)]
    Match(#[from] match_engine::MatchError),

    #[error("internal server error: {0}")]
    Internal(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("not found")]
    NotFound,
}

/// API error response structure
#[derive(Debug, serde::Serialize, serde::Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

#[derive(Debug, serde::Serialize, serde::Deserialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
}

impl ServerError {
    fn status_code(&self) -> StatusCode {
        match self {
            ServerError::Authentication(_) => StatusCode::UNAUTHORIZED,
            ServerError::RateLimitExceeded => StatusCode::TOO_MANY_REQUESTS,
            ServerError::Timeout => StatusCode::REQUEST_TIMEOUT,
            ServerError::Validation(_) | ServerError::NotJson(_) => {
                StatusCode::from_u16(405).unwrap()
            }
            ServerError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            ServerError::NotFound => StatusCode::NOT_FOUND,
            ServerError::Processor(ProcessorError::EdgeNotFound { .. })
            | ServerError::Processor(ProcessorError::ActionNotFound { .. })
            | ServerError::Processor(ProcessorError::RecordNotFound { .. }) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            ServerError::Processor(_) | ServerError::Store(_) | ServerError::Graph(_) | ServerError::Match(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            ServerError::Internal(_) | ServerError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            ServerError::Authentication(_) => "AUTH_FAILED",
            ServerError::RateLimitExceeded => "RATE_LIMIT_EXCEEDED",
            ServerError::Timeout => "REQUEST_TIMEOUT",
            ServerError::Validation(_) => "VALIDATION_FAILURE",
            ServerError::NotJson(_) => "NOT_JSON",
            ServerError::PayloadTooLarge(_) => "PAYLOAD_TOO_LARGE",
            ServerError::Processor(ProcessorError::EdgeNotFound { .. }) => "EDGE_NOT_FOUND",
            ServerError::Processor(_) => "PROCESSOR_ERROR",
            ServerError::Store(_) => "DATABASE_ERROR",
            ServerError::Graph(_) => "GRAPH_ERROR",
            ServerError::Match(_) => "MATCH_ERROR",
            ServerError::Internal(_) => "INTERNAL_ERROR",
            ServerError::Config(_) => "CONFIG_ERROR",
            ServerError::NotFound => "NOT_FOUND",
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let error_code = self.error_code().to_string();
        let message = self.to_string();

        let body = Json(json!({
            "error": {
                "code": error_code,
                "message": message,
            }
        }));

        (status, body).into_response()
    }
}

impl From<std::net::AddrParseError> for ServerError {
    fn from(err: std::net::AddrParseError) -> Self {
        ServerError::Config(format!("invalid address: {err}"))
    }
}

impl From<serde_json::Error> for ServerError {
    fn from(err: serde_json::Error) -> Self {
        ServerError::NotJson(err.to_string())
    }
}

impl From<anyhow::Error> for ServerError {
    fn from(err: anyhow::Error) -> Self {
        ServerError::Internal(err.to_string())
    }
}
