//! Scoped batch acquisition with guaranteed release on every exit path.
//!
//! Python's context-manager protocol has no direct analogue in Rust
//! because `Drop` cannot run fallible cleanup. [`Auditor::open`] mints
//! the batch and inserts `Batch(STARTING)`; the caller calls
//! [`Auditor::stamp`] once per row to mint a `Process(PENDING)` row,
//! then [`Auditor::finish`] on the happy path to promote the batch to
//! PENDING. An Auditor dropped without `finish` logs a warning and
//! leaves the batch exactly where it was — never COMPUTED.

use tracing::{info, warn};

use store::{Batch, BatchStatus, Process, Store};

use crate::ProcessorError;

pub struct Auditor<'a> {
    store: &'a Store,
    batch_id: i64,
    batch_action: String,
    user: String,
    version: String,
    row_count: usize,
    finished: bool,
}

impl<'a> Auditor<'a> {
    /// Mint `batch_id`, insert `Batch(STARTING)`.
    pub fn open(store: &'a Store, batch_action: &str, user: &str, version: &str) -> Result<Self, ProcessorError> {
        let batch_id = store.minter().mint(user, version)?;
        store.put_batch(&Batch {
            batch_id,
            batch_action: batch_action.to_string(),
            batch_status: BatchStatus::Starting,
        })?;
        Ok(Self {
            store,
            batch_id,
            batch_action: batch_action.to_string(),
            user: user.to_string(),
            version: version.to_string(),
            row_count: 0,
            finished: false,
        })
    }

    /// Attach to a batch a caller already minted and inserted as
    /// `Batch(STARTING)` (the HTTP server does this synchronously
    /// before handing the row off to a worker task, since `Auditor`
    /// borrows `Store` and can't cross a `tokio::spawn` boundary on
    /// its own). No new batch_id is minted and no row is written.
    pub fn resume(store: &'a Store, batch_id: i64, batch_action: &str, user: &str, version: &str) -> Self {
        Self {
            store,
            batch_id,
            batch_action: batch_action.to_string(),
            user: user.to_string(),
            version: version.to_string(),
            row_count: 0,
            finished: false,
        }
    }

    pub fn batch_id(&self) -> i64 {
        self.batch_id
    }

    /// Mint a `proc_id`, build `transaction_key = "{batch_id}_{proc_id}"`,
    /// insert `Process(PENDING)`, and return both.
    pub fn stamp(&mut self, row: usize, foreign_record_id: Option<String>) -> Result<(i64, String), ProcessorError> {
        let proc_id = self.store.minter().mint(&self.user, &self.version)?;
        let transaction_key = format!("{}_{proc_id}", self.batch_id);
        self.store.put_process(&Process {
            proc_id,
            batch_id: self.batch_id,
            transaction_key: transaction_key.clone(),
            proc_record_id: None,
            proc_status: crate::types::proc_status::PENDING.to_string(),
            row: row as i64,
            foreign_record_id,
        })?;
        self.row_count += 1;
        Ok((proc_id, transaction_key))
    }

    /// Clean exit: promote the batch to PENDING, unless a processor
    /// already drove it all the way to COMPUTED via `update_status`
    /// while the last row's terminal status was being set (every row
    /// routes its terminal status through `update_status`, which may
    /// run before this call). Never regress COMPUTED back to PENDING.
    pub fn finish(mut self) -> Result<(), ProcessorError> {
        let already_computed = matches!(
            self.store.get_batch(self.batch_id)?,
            Some(batch) if batch.batch_status == BatchStatus::Computed
        );
        if !already_computed {
            self.store.put_batch(&Batch {
                batch_id: self.batch_id,
                batch_action: self.batch_action.clone(),
                batch_status: BatchStatus::Pending,
            })?;
        }
        info!(batch_id = self.batch_id, rows = self.row_count, "batch_finished");
        self.finished = true;
        Ok(())
    }
}

impl Drop for Auditor<'_> {
    fn drop(&mut self) {
        if !self.finished {
            warn!(
                batch_id = self.batch_id,
                rows = self.row_count,
                "batch_abandoned, left non-COMPUTED"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_inserts_starting_batch() {
        let store = Store::in_memory();
        let auditor = Auditor::open(&store, "demographic", "tester", "v1").unwrap();
        let batch = store.get_batch(auditor.batch_id()).unwrap().unwrap();
        assert_eq!(batch.batch_status, BatchStatus::Starting);
    }

    #[test]
    fn stamp_inserts_pending_process_with_composed_transaction_key() {
        let store = Store::in_memory();
        let mut auditor = Auditor::open(&store, "demographic", "tester", "v1").unwrap();
        let (proc_id, transaction_key) = auditor.stamp(0, None).unwrap();
        assert_eq!(transaction_key, format!("{}_{proc_id}", auditor.batch_id()));
        let process = store.get_process(proc_id).unwrap().unwrap();
        assert_eq!(process.proc_status, crate::types::proc_status::PENDING);
    }

    #[test]
    fn resume_attaches_to_an_already_minted_batch() {
        let store = Store::in_memory();
        let batch_id = store.minter().mint("tester", "v1").unwrap();
        store
            .put_batch(&Batch {
                batch_id,
                batch_action: "demographic".to_string(),
                batch_status: BatchStatus::Starting,
            })
            .unwrap();

        let mut auditor = Auditor::resume(&store, batch_id, "demographic", "tester", "v1");
        assert_eq!(auditor.batch_id(), batch_id);
        auditor.stamp(0, None).unwrap();
        auditor.finish().unwrap();
        assert_eq!(store.get_batch(batch_id).unwrap().unwrap().batch_status, BatchStatus::Pending);
    }

    #[test]
    fn finish_promotes_batch_to_pending() {
        let store = Store::in_memory();
        let auditor = Auditor::open(&store, "demographic", "tester", "v1").unwrap();
        let batch_id = auditor.batch_id();
        auditor.finish().unwrap();
        assert_eq!(store.get_batch(batch_id).unwrap().unwrap().batch_status, BatchStatus::Pending);
    }

    #[test]
    fn dropping_without_finish_leaves_batch_starting() {
        let store = Store::in_memory();
        let auditor = Auditor::open(&store, "demographic", "tester", "v1").unwrap();
        let batch_id = auditor.batch_id();
        drop(auditor);
        assert_eq!(store.get_batch(batch_id).unwrap().unwrap().batch_status, BatchStatus::Starting);
    }
}
