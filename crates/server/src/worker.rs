//! Bounded job queue draining into a fixed pool of workers.
//!
//! Mirrors the bounded-channel worker-pool shape the original content
//! pipeline used for `process_batch`, but constrained to one worker per
//! job at a time: a job is an entire batch's row set, run start to
//! finish by whichever worker dequeues it, so rows within a batch are
//! never split across workers. The HTTP handler mints the
//! batch_id and writes `Batch(STARTING)` itself before enqueueing,
//! since [`processors::Auditor`] borrows `Store` and can't cross the
//! `tokio::spawn` boundary a queued job runs on; the worker picks the
//! batch back up with [`processors::Auditor::resume`].

use std::sync::Arc;

use serde_json::Value;
use tokio::sync::{mpsc, Mutex};
use tracing::{error, info, warn};

use match_engine::MatchConfig;
use processors::{Auditor, RowContext};
use store::Store;

/// One unit of work a worker drains and runs end to end.
pub enum Job {
    Ingest {
        batch_id: i64,
        user: String,
        version: String,
        rows: Vec<Value>,
    },
    Activate {
        batch_id: i64,
        user: String,
        version: String,
        record_id: i64,
    },
    Deactivate {
        batch_id: i64,
        user: String,
        version: String,
        record_id: i64,
    },
    Delete {
        batch_id: i64,
        user: String,
        version: String,
        record_id: i64,
    },
    Affirm {
        batch_id: i64,
        user: String,
        version: String,
        record_id_low: i64,
        record_id_high: i64,
    },
    Deny {
        batch_id: i64,
        user: String,
        version: String,
        record_id_low: i64,
        record_id_high: i64,
    },
    Undo {
        batch_id: i64,
        user: String,
        version: String,
        target_batch_id: i64,
        target_proc_id: i64,
        action: String,
    },
}

impl Job {
    fn batch_id(&self) -> i64 {
        match self {
            Job::Ingest { batch_id, .. }
            | Job::Activate { batch_id, .. }
            | Job::Deactivate { batch_id, .. }
            | Job::Delete { batch_id, .. }
            | Job::Affirm { batch_id, .. }
            | Job::Deny { batch_id, .. }
            | Job::Undo { batch_id, .. } => *batch_id,
        }
    }

    fn batch_action(&self) -> &'static str {
        match self {
            Job::Ingest { .. } => "demographic",
            Job::Activate { .. } => "activate_demographic",
            Job::Deactivate { .. } => "deactivate_demographic",
            Job::Delete { .. } => "delete_demographic",
            Job::Affirm { .. } => "match_affirm",
            Job::Deny { .. } => "match_deny",
            Job::Undo { .. } => "delete_action",
        }
    }
}

/// Handle used by request handlers to enqueue a job; cheap to clone.
#[derive(Clone)]
pub struct WorkerPool {
    sender: mpsc::Sender<Job>,
}

impl WorkerPool {
    /// Spawn `worker_count` tasks draining a bounded queue against
    /// `store`, each built with the same matching config/threshold
    /// every batch in this deployment uses.
    pub fn spawn(
        store: Arc<Store>,
        match_cfg: MatchConfig,
        graph_threshold: f64,
        worker_count: usize,
        queue_depth: usize,
    ) -> Self {
        let (sender, receiver) = mpsc::channel(queue_depth);
        let receiver = Arc::new(Mutex::new(receiver));

        for worker_id in 0..worker_count.max(1) {
            let store = store.clone();
            let match_cfg = match_cfg;
            let receiver = receiver.clone();
            tokio::task::spawn(async move {
                loop {
                    let job = {
                        let mut guard = receiver.lock().await;
                        guard.recv().await
                    };
                    match job {
                        Some(job) => run_job(&store, &match_cfg, graph_threshold, job, worker_id),
                        None => break,
                    }
                }
                info!(worker_id, "worker shut down");
            });
        }

        Self { sender }
    }

    pub async fn enqueue(&self, job: Job) -> Result<(), Job> {
        self.sender.send(job).await.map_err(|e| e.0)
    }
}

fn run_job(store: &Store, match_cfg: &MatchConfig, graph_threshold: f64, job: Job, worker_id: usize) {
    let batch_id = job.batch_id();
    let batch_action = job.batch_action();
    let mut auditor = Auditor::resume(store, batch_id, batch_action, job_user(&job), job_version(&job));

    let started = std::time::Instant::now();
    let result = run_job_inner(store, &mut auditor, match_cfg, graph_threshold, job);
    metrics::histogram!("empi_batch_job_duration_seconds", "action" => batch_action)
        .record(started.elapsed().as_secs_f64());
    match result {
        Ok(()) => {
            metrics::counter!("empi_batch_jobs_total", "action" => batch_action, "result" => "success")
                .increment(1);
            if let Err(err) = auditor.finish() {
                error!(worker_id, batch_id, error = %err, "failed to finish batch");
            }
        }
        Err(err) => {
            metrics::counter!("empi_batch_jobs_total", "action" => batch_action, "result" => "failure")
                .increment(1);
            warn!(worker_id, batch_id, error = %err, "batch job failed, left non-COMPUTED");
        }
    }
}

fn job_user(job: &Job) -> &str {
    match job {
        Job::Ingest { user, .. }
        | Job::Activate { user, .. }
        | Job::Deactivate { user, .. }
        | Job::Delete { user, .. }
        | Job::Affirm { user, .. }
        | Job::Deny { user, .. }
        | Job::Undo { user, .. } => user,
    }
}

fn job_version(job: &Job) -> &str {
    match job {
        Job::Ingest { version, .. }
        | Job::Activate { version, .. }
        | Job::Deactivate { version, .. }
        | Job::Delete { version, .. }
        | Job::Affirm { version, .. }
        | Job::Deny { version, .. }
        | Job::Undo { version, .. } => version,
    }
}

fn run_job_inner(
    store: &Store,
    auditor: &mut Auditor,
    match_cfg: &MatchConfig,
    graph_threshold: f64,
    job: Job,
) -> Result<(), processors::ProcessorError> {
    match job {
        Job::Ingest { user, version, rows, .. } => {
            processors::ingest_demographic(store, auditor, match_cfg, graph_threshold, &user, &version, &rows)?;
            Ok(())
        }
        Job::Activate { user, version, record_id, .. } => {
            let ctx = stamp_ctx(auditor, &user, &version)?;
            processors::activate_demographic(store, &ctx, match_cfg, graph_threshold, record_id)?;
            Ok(())
        }
        Job::Deactivate { user, version, record_id, .. } => {
            let ctx = stamp_ctx(auditor, &user, &version)?;
            processors::deactivate_demographic(store, &ctx, graph_threshold, record_id)?;
            Ok(())
        }
        Job::Delete { user, version, record_id, .. } => {
            let ctx = stamp_ctx(auditor, &user, &version)?;
            processors::delete_demographic(store, &ctx, graph_threshold, record_id)?;
            Ok(())
        }
        Job::Affirm { user, version, record_id_low, record_id_high, .. } => {
            let ctx = stamp_ctx(auditor, &user, &version)?;
            processors::affirm_matching(store, &ctx, graph_threshold, record_id_low, record_id_high)?;
            Ok(())
        }
        Job::Deny { user, version, record_id_low, record_id_high, .. } => {
            let ctx = stamp_ctx(auditor, &user, &version)?;
            processors::deny_matching(store, &ctx, graph_threshold, record_id_low, record_id_high)?;
            Ok(())
        }
        Job::Undo { user, version, target_batch_id, target_proc_id, action, .. } => {
            let ctx = stamp_ctx(auditor, &user, &version)?;
            processors::delete_action(store, &ctx, match_cfg, graph_threshold, target_batch_id, target_proc_id, &action)?;
            Ok(())
        }
    }
}

fn stamp_ctx(auditor: &mut Auditor, user: &str, version: &str) -> Result<RowContext, processors::ProcessorError> {
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
