//! Workspace umbrella crate for the Enterprise Master Patient Index (EMPI).
//!
//! The `empi` crate ties the `store`, `graph`, `match-engine`, and
//! `processors` layers together behind one dependency and provides the
//! cross-cutting concerns none of them owns individually: batch event
//! hooks ([`EmpiMetrics`]/[`BatchEvent`]) and YAML deployment
//! configuration ([`config::EmpiConfig`]). [`run_batch`] is the single
//! entry point that drives a batch of rows through `processors` end to
//! end, the EMPI analogue of the fingerprinting pipeline's combined
//! ingest-through-index helpers.
//!
//! ## Quick start
//!
//! ```
//! use empi::run_batch;
//! use match_engine::MatchConfig;
//! use store::Store;
//! use serde_json::json;
//!
//! let store = Store::in_memory();
//! let rows = vec![json!({
//!     "organization_key": "ORG", "system_key": "SYS", "system_id": "1",
//!     "given_name": "JON", "family_name": "SMITH", "name_day": "1980-06-15",
//!     "postal_code": "62704",
//! })];
//! let summary = run_batch(&store, "tester", "v1", &MatchConfig::default(), 0.5, &rows).unwrap();
//! assert_eq!(summary.inserted_record_ids.len(), 1);
//! ```
//!
//! ## Observability
//!
//! Batch-level latency and outcome can be captured by installing an
//! [`EmpiMetrics`] recorder via [`set_empi_metrics`] and/or a
//! [`BatchEventLogger`] with [`set_empi_logger`]. Both hooks receive the
//! `batch_id`/`proc_id`/`record_id` context plus the concrete stage
//! outcome so deployments can correlate batches with upstream systems.
//! `EmpiMetrics` is best suited for latency/histogram telemetry, whereas
//! `BatchEventLogger` provides structured events for centralized
//! logging. These hooks are installed once at server startup
//! ([`server`]'s `main.rs`); library crates never install a subscriber
//! or recorder themselves.
//!
//! ## Errors
//!
//! [`EmpiError`] wraps the error produced by whichever `processors` call
//! `run_batch` made, preserving the original variant for downstream
//! handling.

pub mod config;

use std::fmt;
use std::io::{self, Write};
use std::sync::{Arc, Mutex, OnceLock, RwLock};
use std::time::{Duration, Instant};

use processors::{Auditor, IngestSummary, ProcessorError, RowContext};
use serde_json::Value;
use store::Store;

pub use match_engine::MatchConfig;

/// Error produced by [`run_batch`]; a thin wrapper so callers that only
/// depend on `empi` (not `processors` directly) have a stable type.
#[derive(Debug, thiserror::Error)]
#[error(transparent)]
pub struct EmpiError(#[from] pub ProcessorError);

/// Which processors stage an [`EmpiMetrics`]/[`BatchEvent`] observation
/// describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchStage {
    Processor,
    Recursor,
    Cursor,
}

impl fmt::Display for BatchStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BatchStage::Processor => "processor",
            BatchStage::Recursor => "recursor",
            BatchStage::Cursor => "cursor",
        };
        f.write_str(name)
    }
}

/// Outcome of a batch-level observation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchEventStatus {
    Success,
    Failure,
}

impl fmt::Display for BatchEventStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            BatchEventStatus::Success => "success",
            BatchEventStatus::Failure => "failure",
        };
        f.write_str(label)
    }
}

/// Metrics observer for batch-level stages: one `record_*` call per
/// processor/recursor/cursor invocation `run_batch` makes.
pub trait EmpiMetrics: Send + Sync {
    fn record_processor(&self, latency: Duration, result: Result<(), String>);
    fn record_recursor(&self, latency: Duration, result: Result<(), String>);
    fn record_cursor(&self, latency: Duration, result: Result<(), String>);
}

/// Structured observation describing the outcome of a batch stage.
#[derive(Debug, Clone)]
pub struct BatchEvent {
    pub stage: BatchStage,
    pub status: BatchEventStatus,
    pub latency: Duration,
    pub batch_id: i64,
    pub proc_id: Option<i64>,
    pub record_id: Option<i64>,
    pub error: Option<String>,
}

impl BatchEvent {
    fn format_key_values(&self, include_timestamp: bool) -> String {
        let mut parts = Vec::new();
        if include_timestamp {
            let ts = chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true);
            parts.push(format!("timestamp=\"{ts}\""));
        }
        let stage = self.stage;
        parts.push(format!("stage={stage}"));
        let status = self.status;
        parts.push(format!("status={status}"));
        let latency_us = self.latency.as_micros();
        parts.push(format!("latency_us={latency_us}"));
        parts.push(format!("batch_id={}", self.batch_id));
        if let Some(proc_id) = self.proc_id {
            parts.push(format!("proc_id={proc_id}"));
        }
        if let Some(record_id) = self.record_id {
            parts.push(format!("record_id={record_id}"));
        }
        if let Some(error) = &self.error {
            let error = escape_kv(error);
            parts.push(format!("error=\"{error}\""));
        }
        parts.join(" ")
    }
}

fn escape_kv(input: &str) -> String {
    input
        .replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\n', "\\n")
        .replace('\r', "\\r")
}

/// Hook for emitting structured events per batch stage.
pub trait BatchEventLogger: Send + Sync {
    fn log(&self, event: &BatchEvent);
}

/// Simple key-value logger that writes structured events to any writer.
pub struct KeyValueLogger {
    writer: Arc<Mutex<Box<dyn Write + Send>>>,
    include_timestamp: bool,
}

impl KeyValueLogger {
    /// Create a logger that writes to stdout.
    pub fn stdout() -> Self {
        Self::new(Box::new(io::stdout()))
    }

    /// Create a logger backed by the provided writer.
    pub fn new(writer: Box<dyn Write + Send>) -> Self {
        Self {
            writer: Arc::new(Mutex::new(writer)),
            include_timestamp: true,
        }
    }

    /// Toggle timestamp emission for the structured log line.
    pub fn with_timestamps(mut self, include_timestamp: bool) -> Self {
        self.include_timestamp = include_timestamp;
        self
    }
}

impl BatchEventLogger for KeyValueLogger {
    fn log(&self, event: &BatchEvent) {
        if let Ok(mut writer) = self.writer.lock() {
            let line = event.format_key_values(self.include_timestamp);
            let _ = writeln!(writer, "{line}");
        }
    }
}

/// Install or clear the global batch metrics recorder.
pub fn set_empi_metrics(recorder: Option<Arc<dyn EmpiMetrics>>) {
    let lock = metrics_lock();
    let mut guard = lock.write().expect("empi metrics lock poisoned");
    *guard = recorder;
}

fn metrics_lock() -> &'static RwLock<Option<Arc<dyn EmpiMetrics>>> {
    static METRICS: OnceLock<RwLock<Option<Arc<dyn EmpiMetrics>>>> = OnceLock::new();
    METRICS.get_or_init(|| RwLock::new(None))
}

fn metrics_recorder() -> Option<Arc<dyn EmpiMetrics>> {
    let guard = metrics_lock()
        .read()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    guard.clone()
}

/// Install or clear the structured batch event logger.
pub fn set_empi_logger(logger: Option<Arc<dyn BatchEventLogger>>) {
    let lock = logger_lock();
    let mut guard = lock.write().expect("empi logger lock poisoned");
    *guard = logger;
}

fn logger_lock() -> &'static RwLock<Option<Arc<dyn BatchEventLogger>>> {
    static LOGGER: OnceLock<RwLock<Option<Arc<dyn BatchEventLogger>>>> = OnceLock::new();
    LOGGER.get_or_init(|| RwLock::new(None))
}

fn batch_logger() -> Option<Arc<dyn BatchEventLogger>> {
    let guard = logger_lock()
        .read()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    guard.clone()
}

fn emit_processor_event(batch_id: i64, latency: Duration, error: Option<String>) {
    let recorder = metrics_recorder();
    let logger = batch_logger();
    if recorder.is_none() && logger.is_none() {
        return;
    }
    let status = if error.is_some() {
        BatchEventStatus::Failure
    } else {
        BatchEventStatus::Success
    };
    if let Some(logger) = logger.as_ref() {
        logger.log(&BatchEvent {
            stage: BatchStage::Processor,
            status,
            latency,
            batch_id,
            proc_id: None,
            record_id: None,
            error: error.clone(),
        });
    }
    if let Some(recorder) = recorder {
        recorder.record_processor(latency, error.map_or(Ok(()), Err));
    }
}

/// Drive one batch of demographic rows through [`processors::ingest_demographic`]
/// end to end: opens an [`Auditor`], ingests every row (which internally
/// activates it and rewrites the match graph around it), finishes the
/// batch, and emits one [`BatchEvent`] for the whole call. The EMPI
/// analogue of the fingerprinting pipeline's combined
/// `process_record_with_configs` helper.
pub fn run_batch(
    store: &Store,
    user: &str,
    version: &str,
    match_cfg: &MatchConfig,
    graph_threshold: f64,
    rows: &[Value],
) -> Result<IngestSummary, EmpiError> {
    let start = Instant::now();
    let outcome = (|| -> Result<(i64, IngestSummary), ProcessorError> {
        let mut auditor = Auditor::open(store, "demographic", user, version)?;
        let batch_id = auditor.batch_id();
        let summary = processors::ingest_demographic(
            store,
            &mut auditor,
            match_cfg,
            graph_threshold,
            user,
            version,
            rows,
        )?;
        auditor.finish()?;
        Ok((batch_id, summary))
    })();

    match outcome {
        Ok((batch_id, summary)) => {
            emit_processor_event(batch_id, start.elapsed(), None);
            Ok(summary)
        }
        Err(err) => {
            emit_processor_event(0, start.elapsed(), Some(err.to_string()));
            Err(EmpiError(err))
        }
    }
}

/// Affirm or deny a pair's match, threading a fresh [`RowContext`]
/// through the same `Auditor` lifecycle as [`run_batch`]. Returns the
/// set of record_ids whose enterprise group was re-derived.
pub fn run_match_action(
    store: &Store,
    user: &str,
    version: &str,
    graph_threshold: f64,
    record_id_low: i64,
    record_id_high: i64,
    affirm: bool,
) -> Result<processors::MatchActionOutcome, EmpiError> {
    let start = Instant::now();
    let outcome = (|| -> Result<(i64, processors::MatchActionOutcome), ProcessorError> {
        let mut auditor = Auditor::open(store, if affirm { "affirm" } else { "deny" }, user, version)?;
        let batch_id = auditor.batch_id();
        let (proc_id, transaction_key) = auditor.stamp(0, None)?;
        let ctx = RowContext {
            batch_id,
            proc_id,
            transaction_key,
            user: user.to_string(),
            version: version.to_string(),
        };
        let result = if affirm {
            processors::affirm_matching(store, &ctx, graph_threshold, record_id_low, record_id_high)?
        } else {
            processors::deny_matching(store, &ctx, graph_threshold, record_id_low, record_id_high)?
        };
        auditor.finish()?;
        Ok((batch_id, result))
    })();

    match outcome {
        Ok((batch_id, result)) => {
            emit_processor_event(batch_id, start.elapsed(), None);
            Ok(result)
        }
        Err(err) => {
            emit_processor_event(0, start.elapsed(), Some(err.to_string()));
            Err(EmpiError(err))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn sample_row() -> Value {
        json!({
            "organization_key": "ORG", "system_key": "SYS", "system_id": "1",
            "given_name": "JON", "family_name": "SMITH", "name_day": "1980-06-15",
            "postal_code": "62704",
        })
    }

    #[test]
    fn run_batch_ingests_and_activates_rows() {
        let store = Store::in_memory();
        let summary = run_batch(&store, "tester", "v1", &MatchConfig::default(), 0.5, &[sample_row()]).unwrap();
        assert_eq!(summary.inserted_record_ids.len(), 1);
        assert_eq!(summary.errors, 0);
    }

    #[test]
    fn run_batch_reports_errors_for_malformed_rows() {
        let store = Store::in_memory();
        let rows = vec![json!({"organization_key": "ORG"})];
        let summary = run_batch(&store, "tester", "v1", &MatchConfig::default(), 0.5, &rows).unwrap();
        assert_eq!(summary.errors, 1);
        assert!(summary.inserted_record_ids.is_empty());
    }

    #[test]
    fn run_match_action_affirms_an_edge() {
        let store = Store::in_memory();
        run_batch(&store, "tester", "v1", &MatchConfig::default(), 0.0, &[sample_row()]).unwrap();
        let mut second = sample_row();
        second["system_id"] = json!("2");
        run_batch(&store, "tester", "v1", &MatchConfig::default(), 0.0, &[second]).unwrap();

        let edge = store.list_edges_touching(1).unwrap().into_iter().next();
        if let Some(edge) = edge {
            let outcome = run_match_action(&store, "tester", "v1", 0.0, edge.record_id_low, edge.record_id_high, true).unwrap();
            assert!(outcome.match_weight > edge.match_weight);
        }
    }

    #[test]
    fn batch_event_logger_receives_an_event() {
        struct CountingLogger(AtomicUsize);
        impl BatchEventLogger for CountingLogger {
            fn log(&self, _event: &BatchEvent) {
                self.0.fetch_add(1, Ordering::SeqCst);
            }
        }
        let logger = Arc::new(CountingLogger(AtomicUsize::new(0)));
        set_empi_logger(Some(logger.clone()));

        let store = Store::in_memory();
        run_batch(&store, "tester", "v1", &MatchConfig::default(), 0.5, &[sample_row()]).unwrap();

        assert!(logger.0.load(Ordering::SeqCst) > 0);
        set_empi_logger(None);
    }
}
