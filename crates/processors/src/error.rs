//! Errors produced by the transactional record lifecycle.

use thiserror::Error;

/// Errors surfaced by the processor layer.
///
/// Most variants are row-local: the caller counts the row as an error
/// or a skip and continues the batch (see the per-function docs in
/// [`crate`]). Only [`ProcessorError::Store`], [`ProcessorError::Graph`],
/// and [`ProcessorError::Match`] can escape a row's scope entirely —
/// those are the ones the Auditor logs on exceptional exit.
#[derive(Debug, Error)]
pub enum ProcessorError {
    #[error("missing required field: {0}")]
    MissingField(String),

    #[error("duplicate uq_hash, row skipped: {uq_hash}")]
    DuplicateRecord { uq_hash: String },

    #[error("demographic record not found: {record_id}")]
    RecordNotFound { record_id: i64 },

    #[error("no EnterpriseMatch edge between {low} and {high}")]
    EdgeNotFound { low: i64, high: i64 },

    #[error("no action logged under transaction_key {transaction_key}")]
    ActionNotFound { transaction_key: String },

    #[error("unsupported delete_action action: {0}")]
    UnsupportedDeleteAction(String),

    #[error("invalid name_day: {0}")]
    InvalidDate(String),

    #[error(transparent)]
    Store(#[from] store::StoreError),

    #[error(transparent)]
    Graph(#[from] graph::GraphError),

    #[error(transparent)]
    Match(#[from] match_engine::MatchError),
}
