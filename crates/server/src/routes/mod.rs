//! API route handlers
//!
//! Routes are organized by functionality:
//!
//! - `health`: Health checks, readiness, and metrics
//! - `process`: the POST dispatcher — validates a request body against
//!   an endpoint's required fields, mints a batch, and enqueues it
//! - `query`: the GET dispatcher — equality-filtered reads over any
//!   table `store::Entity` names

pub mod health;
pub mod process;
pub mod query;

pub use process::post_by_endpoint;
pub use query::{get_by_endpoint, query_records_handler};

use crate::error::{ServerError, ServerResult};
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;
use store::TABLE_NAMES;

/// API version and base info
///
/// Returns server information including version and the full list of
/// addressable endpoints. This is the root endpoint (GET /) and
/// requires no authentication.
pub async fn api_info() -> ServerResult<impl IntoResponse> {
    let endpoints: Vec<&str> = TABLE_NAMES.iter().map(|(_, name)| *name).collect();
    Ok(Json(json!({
        "name": "EMPI Server",
        "version": env!("CARGO_PKG_VERSION"),
        "api_version": "v1",
        "endpoints": endpoints,
    })))
}

/// 404 Not Found handler
///
/// Returns a standardized error response for undefined routes.
pub async fn not_found() -> ServerError {
    ServerError::NotFound
}
