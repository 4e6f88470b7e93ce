//! Shared result/status types for the processor layer.

use serde::{Deserialize, Serialize};

use crate::ProcessorError;

/// `Process.proc_status` values used by this crate. Not an enum at the
/// storage layer (the column is free text, matching the original
/// schema) but these are the only values this crate ever writes.
pub mod proc_status {
    pub const PENDING: &str = "PENDING";
    pub const POSTED: &str = "POSTED";
    pub const ACTIVATED: &str = "ACTIVATED";
    pub const ARCHIVED: &str = "ARCHIVED";
    pub const DEACTIVATED: &str = "DEACTIVATED";
    pub const DELETED_DEMOGRAPHIC: &str = "DELETED DEMOGRAPHIC";
    pub const AFFIRMED: &str = "AFFIRMED";
    pub const DENIED: &str = "DENIED";
    pub const UNDONE: &str = "UNDONE";
    pub const ERROR: &str = "ERROR";
    pub const DUPLICATE: &str = "DUPLICATE";
}

/// The action a `delete_action` request is asked to undo.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeleteActionKind {
    Delete,
    Affirm,
    Deny,
}

impl DeleteActionKind {
    pub fn parse(raw: &str) -> Result<Self, ProcessorError> {
        match raw.to_ascii_lowercase().as_str() {
            "delete" => Ok(Self::Delete),
            "affirm" => Ok(Self::Affirm),
            "deny" => Ok(Self::Deny),
            other => Err(ProcessorError::UnsupportedDeleteAction(other.to_string())),
        }
    }
}

/// Outcome of one `demographic(payload)` batch: how many rows were
/// inserted (and activated), how many were skipped as duplicates, and
/// how many were dropped for missing a required field.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IngestSummary {
    pub inserted_record_ids: Vec<i64>,
    pub skipped: usize,
    pub errors: usize,
}

/// Outcome of `affirm_matching`/`deny_matching`: the edge's new
/// `match_weight` plus the record_ids whose group membership was
/// re-derived.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchActionOutcome {
    pub record_id_low: i64,
    pub record_id_high: i64,
    pub match_weight: f64,
    pub regrouped_record_ids: Vec<i64>,
}

/// The batch/row identity a processor function stamps its writes
/// with. Built by one [`crate::Auditor::stamp`] call and threaded
/// through every processor invoked for that row, including the ones
/// a processor calls internally (`demographic` calling
/// `activate_demographic`, `delete_demographic` calling `deactivate_demographic`
/// then `archive_demographic`).
#[derive(Debug, Clone)]
pub struct RowContext {
    pub batch_id: i64,
    pub proc_id: i64,
    pub transaction_key: String,
    pub user: String,
    pub version: String,
}
