//! The POST dispatcher: validates a request body against an
//! endpoint's required fields, mints the batch synchronously (the
//! `Auditor`'s borrow of `Store` can't cross the `tokio::spawn`
//! boundary the worker runs on — see [`crate::worker`]), and hands
//! the row set off to the [`crate::worker::WorkerPool`].

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::Json;
use serde_json::{json, Value};

use store::{Batch, BatchStatus, Store};

use crate::error::{ServerError, ServerResult};
use crate::state::ServerState;
use crate::worker::Job;

fn required_str(body: &Value, field: &str) -> ServerResult<String> {
    body.get(field)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| ServerError::Validation(format!("missing required field: {field}")))
}

fn required_i64(body: &Value, field: &str) -> ServerResult<i64> {
    body.get(field)
        .and_then(Value::as_i64)
        .ok_or_else(|| ServerError::Validation(format!("missing required field: {field}")))
}

fn required_array(body: &Value, field: &str) -> ServerResult<Vec<Value>> {
    body.get(field)
        .and_then(Value::as_array)
        .cloned()
        .ok_or_else(|| ServerError::Validation(format!("missing required field: {field}")))
}

/// Mint `batch_id` and insert `Batch(STARTING)`, the synchronous half
/// of what `processors::Auditor::open` does — the asynchronous half
/// (`stamp`ing each row) happens inside the worker via
/// `Auditor::resume`.
fn open_batch(store: &Store, batch_action: &str, user: &str, version: &str) -> ServerResult<i64> {
    let batch_id = store.minter().mint(user, version)?;
    store.put_batch(&Batch {
        batch_id,
        batch_action: batch_action.to_string(),
        batch_status: BatchStatus::Starting,
    })?;
    Ok(batch_id)
}

/// Dispatch a POST to the processor named by `endpoint`. Endpoints
/// with no POST processor (`archive_demographic`, and every read-only
/// table) fail validation here rather than reaching a handler.
pub async fn post_by_endpoint(
    State(state): State<Arc<ServerState>>,
    Path(endpoint): Path<String>,
    Json(body): Json<Value>,
) -> ServerResult<impl IntoResponse> {
    let version = env!("CARGO_PKG_VERSION");
    let batch_id = match endpoint.as_str() {
        "demographic" => post_demographic(&state, &body, version).await?,
        "activate_demographic" => post_activate(&state, &body, version).await?,
        "deactivate_demographic" => post_deactivate(&state, &body, version).await?,
        "delete_demographic" => post_delete(&state, &body, version).await?,
        "match_affirm" => post_match_affirm(&state, &body, version).await?,
        "match_deny" => post_match_deny(&state, &body, version).await?,
        "delete_action" => post_delete_action(&state, &body, version).await?,
        other => {
            return Err(ServerError::Validation(format!(
                "endpoint '{other}' has no POST processor"
            )))
        }
    };

    Ok(Json(json!({ "batch_key": batch_id, "status": 200 })))
}

async fn post_demographic(state: &ServerState, body: &Value, version: &str) -> ServerResult<i64> {
    let user = required_str(body, "user")?;
    let rows = required_array(body, "demographics")?;
    let batch_id = open_batch(&state.store, "demographic", &user, version)?;
    state
        .workers
        .enqueue(Job::Ingest { batch_id, user, version: version.to_string(), rows })
        .await
        .map_err(|_| ServerError::Internal("worker pool closed".to_string()))?;
    Ok(batch_id)
}

async fn post_activate(state: &ServerState, body: &Value, version: &str) -> ServerResult<i64> {
    let user = required_str(body, "user")?;
    let record_id = required_i64(body, "record_id")?;
    let batch_id = open_batch(&state.store, "activate_demographic", &user, version)?;
    state
        .workers
        .enqueue(Job::Activate { batch_id, user, version: version.to_string(), record_id })
        .await
        .map_err(|_| ServerError::Internal("worker pool closed".to_string()))?;
    Ok(batch_id)
}

async fn post_deactivate(state: &ServerState, body: &Value, version: &str) -> ServerResult<i64> {
    let user = required_str(body, "user")?;
    let record_id = required_i64(body, "record_id")?;
    let batch_id = open_batch(&state.store, "deactivate_demographic", &user, version)?;
    state
        .workers
        .enqueue(Job::Deactivate { batch_id, user, version: version.to_string(), record_id })
        .await
        .map_err(|_| ServerError::Internal("worker pool closed".to_string()))?;
    Ok(batch_id)
}

async fn post_delete(state: &ServerState, body: &Value, version: &str) -> ServerResult<i64> {
    let user = required_str(body, "user")?;
    let record_id = required_i64(body, "record_id")?;
    let batch_id = open_batch(&state.store, "delete_demographic", &user, version)?;
    state
        .workers
        .enqueue(Job::Delete { batch_id, user, version: version.to_string(), record_id })
        .await
        .map_err(|_| ServerError::Internal("worker pool closed".to_string()))?;
    Ok(batch_id)
}

async fn post_match_affirm(state: &ServerState, body: &Value, version: &str) -> ServerResult<i64> {
    let user = required_str(body, "user")?;
    let record_id_low = required_i64(body, "record_id_low")?;
    let record_id_high = required_i64(body, "record_id_high")?;
    let batch_id = open_batch(&state.store, "match_affirm", &user, version)?;
    state
        .workers
        .enqueue(Job::Affirm { batch_id, user, version: version.to_string(), record_id_low, record_id_high })
        .await
        .map_err(|_| ServerError::Internal("worker pool closed".to_string()))?;
    Ok(batch_id)
}

async fn post_match_deny(state: &ServerState, body: &Value, version: &str) -> ServerResult<i64> {
    let user = required_str(body, "user")?;
    let record_id_low = required_i64(body, "record_id_low")?;
    let record_id_high = required_i64(body, "record_id_high")?;
    let batch_id = open_batch(&state.store, "match_deny", &user, version)?;
    state
        .workers
        .enqueue(Job::Deny { batch_id, user, version: version.to_string(), record_id_low, record_id_high })
        .await
        .map_err(|_| ServerError::Internal("worker pool closed".to_string()))?;
    Ok(batch_id)
}

async fn post_delete_action(state: &ServerState, body: &Value, version: &str) -> ServerResult<i64> {
    let user = required_str(body, "user")?;
    let target_batch_id = required_i64(body, "batch_id")?;
    let target_proc_id = required_i64(body, "proc_id")?;
    let action = required_str(body, "action")?;
    let batch_id = open_batch(&state.store, "delete_action", &user, version)?;
    state
        .workers
        .enqueue(Job::Undo {
            batch_id,
            user,
            version: version.to_string(),
            target_batch_id,
            target_proc_id,
            action,
        })
        .await
        .map_err(|_| ServerError::Internal("worker pool closed".to_string()))?;
    Ok(batch_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn required_str_reports_the_missing_field_name() {
        let err = required_str(&json!({}), "user").unwrap_err();
        assert!(matches!(err, ServerError::Validation(msg) if msg.contains("user")));
    }

    #[test]
    fn required_array_rejects_a_non_array_value() {
        let err = required_array(&json!({"demographics": "not-an-array"}), "demographics").unwrap_err();
        assert!(matches!(err, ServerError::Validation(_)));
    }
}
