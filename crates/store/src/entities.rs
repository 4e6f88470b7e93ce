//! Row types for every table the core identity-resolution engine reads
//! or writes. Field names and table shapes follow the original schema
//! one for one; nothing here is inferred.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// A person's demographic record as reported by one source system.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Demographic {
    pub record_id: i64,
    pub organization_key: String,
    pub system_key: String,
    pub system_id: String,
    pub given_name: String,
    pub middle_name: String,
    pub family_name: String,
    pub gender: String,
    pub name_day: NaiveDate,
    pub address_1: String,
    pub address_2: String,
    pub city: String,
    pub state: String,
    pub postal_code: String,
    pub social_security_number: String,
    pub uq_hash: String,
    pub composite_key: String,
    pub composite_name: String,
    pub composite_name_day_postal_code: Option<String>,
    pub is_active: bool,
    pub transaction_key: String,
    pub source_key: Option<String>,
    pub source_value: Option<String>,
    pub touched_by: String,
    pub touched_ts: DateTime<Utc>,
}

/// Snapshot of a [`Demographic`] row taken immediately before deletion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DemographicArchive {
    pub record_id: i64,
    pub organization_key: String,
    pub system_key: String,
    pub system_id: String,
    pub given_name: String,
    pub middle_name: String,
    pub family_name: String,
    pub gender: String,
    pub name_day: NaiveDate,
    pub address_1: String,
    pub address_2: String,
    pub city: String,
    pub state: String,
    pub postal_code: String,
    pub social_security_number: String,
    pub uq_hash: String,
    pub composite_key: String,
    pub composite_name: String,
    pub composite_name_day_postal_code: Option<String>,
    pub is_active: bool,
    /// `transaction_key` carried by the Demographic row being archived.
    pub archive_transaction_key: String,
    /// `transaction_key` that produced the archive itself.
    pub transaction_key: String,
    pub source_key: Option<String>,
    pub source_value: Option<String>,
    pub touched_by: String,
    pub touched_ts: DateTime<Utc>,
}

/// One row per successfully applied `activate_demographic`,
/// `deactivate_demographic`, or `delete_demographic` action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordActionLog {
    pub etl_id: i64,
    pub record_id: i64,
    pub transaction_key: String,
}

/// A logged request to reverse a prior action (`delete_action`
/// endpoint).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeleteAction {
    pub etl_id: i64,
    pub batch_action: String,
    pub archive_proc_id: Option<i64>,
    pub archive_batch_id: Option<i64>,
    pub transaction_key: String,
}

/// One row per `match_affirm` or `match_deny` action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchActionLog {
    pub etl_id: i64,
    pub record_id_low: i64,
    pub record_id_high: i64,
    pub transaction_key: String,
}

/// An undirected edge between two demographic records, stored
/// canonically with `record_id_low < record_id_high`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnterpriseMatch {
    pub etl_id: i64,
    pub record_id_low: i64,
    pub record_id_high: i64,
    pub match_weight: f64,
    pub is_valid: bool,
    pub transaction_key: String,
    pub touched_by: String,
    pub touched_ts: DateTime<Utc>,
}

/// A mapping of `record_id` to the `enterprise_id` of its connected
/// component. `record_id` is unique.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnterpriseGroup {
    pub etl_id: i64,
    pub enterprise_id: i64,
    pub record_id: i64,
    pub transaction_key: String,
    pub touched_by: String,
    pub touched_ts: DateTime<Utc>,
}

/// Append-only notification of an [`EnterpriseGroup`] change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bulletin {
    pub etl_id: i64,
    pub batch_id: i64,
    pub proc_id: i64,
    pub record_id: i64,
    pub empi_id: i64,
    pub transaction_key: String,
    pub bulletin_ts: DateTime<Utc>,
}

/// Lifecycle state of a [`Batch`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum BatchStatus {
    Starting,
    Pending,
    Computed,
}

/// One row per API request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Batch {
    pub batch_id: i64,
    pub batch_action: String,
    pub batch_status: BatchStatus,
}

/// One row per demographic touched within a [`Batch`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Process {
    pub proc_id: i64,
    pub batch_id: i64,
    pub transaction_key: String,
    pub proc_record_id: Option<i64>,
    pub proc_status: String,
    pub row: i64,
    pub foreign_record_id: Option<String>,
}

/// The source table for all minted primary keys, preserving
/// request metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EtlIdSource {
    pub etl_id: i64,
    pub user: String,
    pub version: String,
    pub id_created_ts: DateTime<Utc>,
}

/// A record's phone/email contact row, read-only outside of ingest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Telecom {
    pub etl_id: i64,
    pub record_id: i64,
    pub telecoms_type: String,
    pub telecoms_subtype: String,
    pub telecoms_value: String,
    pub transaction_key: String,
}
