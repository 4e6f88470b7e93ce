//! The GET dispatcher: an equality-filtered read over any table
//! `store::Entity` names, plus the `query_records` meta-endpoint that
//! takes its target table as an `endpoint` payload field instead of
//! the URL path.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::Json;
use serde_json::{json, Map, Value};

use store::Entity;

use crate::error::{ServerError, ServerResult};
use crate::state::ServerState;

fn filter_object(body: &Option<Json<Value>>) -> Map<String, Value> {
    body.as_ref()
        .and_then(|Json(value)| value.as_object().cloned())
        .unwrap_or_default()
}

/// `GET /api_{version}/{endpoint}` for every table `Entity` names.
/// The request body (if present) is the equality filter.
pub async fn get_by_endpoint(
    State(state): State<Arc<ServerState>>,
    Path(endpoint): Path<String>,
    body: Option<Json<Value>>,
) -> ServerResult<impl IntoResponse> {
    let entity = Entity::from_table_name(&endpoint)
        .ok_or_else(|| ServerError::Validation(format!("unknown endpoint: {endpoint}")))?;
    let filter = filter_object(&body);
    let rows = processors::query_records(&state.store, entity, &filter)?;
    Ok(Json(json!({ "status": 200, "response": rows })))
}

/// `GET /api_{version}/query_records`: the `endpoint` payload field
/// names the target table; every other field is the equality filter.
pub async fn query_records_handler(
    State(state): State<Arc<ServerState>>,
    body: Option<Json<Value>>,
) -> ServerResult<impl IntoResponse> {
    let mut filter = filter_object(&body);
    let endpoint = filter
        .remove("endpoint")
        .and_then(|value| value.as_str().map(str::to_string))
        .ok_or_else(|| ServerError::Validation("missing required field: endpoint".to_string()))?;
    let entity = Entity::from_table_name(&endpoint)
        .ok_or_else(|| ServerError::Validation(format!("unknown endpoint: {endpoint}")))?;
    let rows = processors::query_records(&state.store, entity, &filter)?;
    Ok(Json(json!({ "status": 200, "response": rows })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filter_object_defaults_to_empty_when_body_absent() {
        assert!(filter_object(&None).is_empty());
    }
}
