//! Synchronous command dispatch against an embedded [`Store`].
//!
//! Mirrors `server::routes::process`/`server::routes::query`'s
//! endpoint validation and processor dispatch, but runs the processor
//! inline on the calling thread instead of handing it to a worker
//! pool: a CLI invocation has no concurrent request to isolate from.

use std::fs::File;
use std::path::{Path, PathBuf};

use serde_json::{Map, Value};

use match_engine::MatchConfig;
use processors::{Auditor, RowContext};
use store::{Entity, Store};

use crate::error::{CliError, CliResult};

/// Threshold every batch in this deployment uses for edge validity and
/// component re-expansion, matching `server::config`'s default.
pub const GRAPH_THRESHOLD: f64 = 0.5;

pub struct PostArgs {
    pub endpoint: String,
    pub user: Option<String>,
    pub record_id: Option<i64>,
    pub record_id_low: Option<i64>,
    pub record_id_high: Option<i64>,
    pub batch_id: Option<i64>,
    pub proc_id: Option<i64>,
    pub action: Option<String>,
    pub demographics_file: Option<PathBuf>,
}

pub struct GetArgs {
    pub endpoint: String,
    pub filters: Vec<(String, String)>,
}

fn require<T>(value: Option<T>, field: &str) -> CliResult<T> {
    value.ok_or_else(|| CliError::Validation(format!("missing required field: {field}")))
}

fn read_json_array(path: &Path) -> CliResult<Vec<Value>> {
    let file = File::open(path).map_err(|source| CliError::Io {
        path: path.display().to_string(),
        source,
    })?;
    let value: Value = serde_json::from_reader(file).map_err(|source| CliError::Json {
        path: path.display().to_string(),
        source,
    })?;
    match value {
        Value::Array(rows) => Ok(rows),
        other => Ok(vec![other]),
    }
}

/// Drop (if present) and recreate the database file at `db_path`, then
/// open it — `Store::new` lays down whatever on-disk structures the
/// backend needs on first access, so "recreate schema" is just
/// "start from an empty file".
pub fn create_db(db_path: &str) -> CliResult<()> {
    if Path::new(db_path).exists() {
        std::fs::remove_file(db_path).map_err(|source| CliError::Io {
            path: db_path.to_string(),
            source,
        })?;
    }
    let store = open_store(db_path)?;
    // Touch the minter so the high-water mark row exists before the
    // first `post`/`get` opens the file.
    store.minter().mint("system", env!("CARGO_PKG_VERSION"))?;
    Ok(())
}

pub fn open_store(db_path: &str) -> CliResult<Store> {
    Ok(Store::new(store::BackendConfig::redb(db_path))?)
}

/// Runs the POST processor named by `args.endpoint`, returning the
/// minted `batch_id` on success.
pub fn run_post(store: &Store, args: &PostArgs, version: &str) -> CliResult<i64> {
    match args.endpoint.as_str() {
        "demographic" => post_demographic(store, args, version),
        "activate_demographic" => post_activate(store, args, version),
        "deactivate_demographic" => post_deactivate(store, args, version),
        "delete_demographic" => post_delete(store, args, version),
        "match_affirm" => post_match_affirm(store, args, version),
        "match_deny" => post_match_deny(store, args, version),
        "delete_action" => post_delete_action(store, args, version),
        other => Err(CliError::Validation(format!(
            "endpoint '{other}' has no POST processor"
        ))),
    }
}

fn post_demographic(store: &Store, args: &PostArgs, version: &str) -> CliResult<i64> {
    let user = require(args.user.clone(), "user")?;
    let file = require(args.demographics_file.clone(), "demographics_file")?;
    let rows = read_json_array(&file)?;
    let match_cfg = MatchConfig::default();

    let mut auditor = Auditor::open(store, "demographic", &user, version)?;
    processors::ingest_demographic(store, &mut auditor, &match_cfg, GRAPH_THRESHOLD, &user, version, &rows)?;
    let batch_id = auditor.batch_id();
    auditor.finish()?;
    Ok(batch_id)
}

fn post_activate(store: &Store, args: &PostArgs, version: &str) -> CliResult<i64> {
    let user = require(args.user.clone(), "user")?;
    let record_id = require(args.record_id, "record_id")?;
    let match_cfg = MatchConfig::default();

    let mut auditor = Auditor::open(store, "activate_demographic", &user, version)?;
    let ctx = stamp_ctx(&mut auditor, &user, version)?;
    processors::activate_demographic(store, &ctx, &match_cfg, GRAPH_THRESHOLD, record_id)?;
    let batch_id = auditor.batch_id();
    auditor.finish()?;
    Ok(batch_id)
}

fn post_deactivate(store: &Store, args: &PostArgs, version: &str) -> CliResult<i64> {
    let user = require(args.user.clone(), "user")?;
    let record_id = require(args.record_id, "record_id")?;

    let mut auditor = Auditor::open(store, "deactivate_demographic", &user, version)?;
    let ctx = stamp_ctx(&mut auditor, &user, version)?;
    processors::deactivate_demographic(store, &ctx, GRAPH_THRESHOLD, record_id)?;
    let batch_id = auditor.batch_id();
    auditor.finish()?;
    Ok(batch_id)
}

fn post_delete(store: &Store, args: &PostArgs, version: &str) -> CliResult<i64> {
    let user = require(args.user.clone(), "user")?;
    let record_id = require(args.record_id, "record_id")?;

    let mut auditor = Auditor::open(store, "delete_demographic", &user, version)?;
    let ctx = stamp_ctx(&mut auditor, &user, version)?;
    processors::delete_demographic(store, &ctx, GRAPH_THRESHOLD, record_id)?;
    let batch_id = auditor.batch_id();
    auditor.finish()?;
    Ok(batch_id)
}

fn post_match_affirm(store: &Store, args: &PostArgs, version: &str) -> CliResult<i64> {
    let user = require(args.user.clone(), "user")?;
    let record_id_low = require(args.record_id_low, "record_id_low")?;
    let record_id_high = require(args.record_id_high, "record_id_high")?;

    let mut auditor = Auditor::open(store, "match_affirm", &user, version)?;
    let ctx = stamp_ctx(&mut auditor, &user, version)?;
    processors::affirm_matching(store, &ctx, GRAPH_THRESHOLD, record_id_low, record_id_high)?;
    let batch_id = auditor.batch_id();
    auditor.finish()?;
    Ok(batch_id)
}

fn post_match_deny(store: &Store, args: &PostArgs, version: &str) -> CliResult<i64> {
    let user = require(args.user.clone(), "user")?;
    let record_id_low = require(args.record_id_low, "record_id_low")?;
    let record_id_high = require(args.record_id_high, "record_id_high")?;

    let mut auditor = Auditor::open(store, "match_deny", &user, version)?;
    let ctx = stamp_ctx(&mut auditor, &user, version)?;
    processors::deny_matching(store, &ctx, GRAPH_THRESHOLD, record_id_low, record_id_high)?;
    let batch_id = auditor.batch_id();
    auditor.finish()?;
    Ok(batch_id)
}

fn post_delete_action(store: &Store, args: &PostArgs, version: &str) -> CliResult<i64> {
    let user = require(args.user.clone(), "user")?;
    let target_batch_id = require(args.batch_id, "batch_id")?;
    let target_proc_id = require(args.proc_id, "proc_id")?;
    let action = require(args.action.clone(), "action")?;
    let match_cfg = MatchConfig::default();

    let mut auditor = Auditor::open(store, "delete_action", &user, version)?;
    let ctx = stamp_ctx(&mut auditor, &user, version)?;
    processors::delete_action(store, &ctx, &match_cfg, GRAPH_THRESHOLD, target_batch_id, target_proc_id, &action)?;
    let batch_id = auditor.batch_id();
    auditor.finish()?;
    Ok(batch_id)
}

fn stamp_ctx(auditor: &mut Auditor, user: &str, version: &str) -> CliResult<RowContext> {
    let batch_id = auditor.batch_id();
    let (proc_id, transaction_key) = auditor.stamp(0, None)?;
    Ok(RowContext {
        batch_id,
        proc_id,
        transaction_key,
        user: user.to_string(),
        version: version.to_string(),
    })
}

/// Runs an equality-filtered read over the table named by
/// `args.endpoint`.
pub fn run_get(store: &Store, args: &GetArgs) -> CliResult<Vec<Value>> {
    let entity = Entity::from_table_name(&args.endpoint)
        .ok_or_else(|| CliError::Validation(format!("unknown endpoint: {}", args.endpoint)))?;

    let mut filter = Map::new();
    for (key, value) in &args.filters {
        filter.insert(key.clone(), Value::String(value.clone()));
    }

    Ok(processors::query_records(store, entity, &filter)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn blank_post_args(endpoint: &str) -> PostArgs {
        PostArgs {
            endpoint: endpoint.to_string(),
            user: None,
            record_id: None,
            record_id_low: None,
            record_id_high: None,
            batch_id: None,
            proc_id: None,
            action: None,
            demographics_file: None,
        }
    }

    #[test]
    fn post_demographic_without_user_is_rejected() {
        let store = Store::in_memory();
        let args = blank_post_args("demographic");
        let err = run_post(&store, &args, "v1").unwrap_err();
        assert!(matches!(err, CliError::Validation(_)));
    }

    #[test]
    fn post_activate_without_record_id_is_rejected() {
        let store = Store::in_memory();
        let mut args = blank_post_args("activate_demographic");
        args.user = Some("tester".to_string());
        let err = run_post(&store, &args, "v1").unwrap_err();
        assert!(matches!(err, CliError::Validation(_)));
    }

    #[test]
    fn get_rejects_unknown_endpoint() {
        let store = Store::in_memory();
        let args = GetArgs {
            endpoint: "not_a_table".to_string(),
            filters: Vec::new(),
        };
        let err = run_get(&store, &args).unwrap_err();
        assert!(matches!(err, CliError::Validation(_)));
    }

    #[test]
    fn get_on_empty_table_returns_empty_response() {
        let store = Store::in_memory();
        let args = GetArgs {
            endpoint: "demographic".to_string(),
            filters: Vec::new(),
        };
        assert_eq!(run_get(&store, &args).unwrap(), Vec::<Value>::new());
    }

    #[test]
    fn unsupported_post_endpoint_is_rejected() {
        let store = Store::in_memory();
        let args = blank_post_args("bulletin");
        let err = run_post(&store, &args, "v1").unwrap_err();
        assert!(matches!(err, CliError::Validation(_)));
    }
}
