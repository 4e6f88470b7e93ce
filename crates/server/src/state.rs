use std::sync::{Arc, OnceLock};

use dashmap::DashMap;
use match_engine::MatchConfig;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use store::Store;

use crate::config::ServerConfig;
use crate::error::ServerResult;
use crate::worker::WorkerPool;

/// The process installs exactly one global `metrics` recorder;
/// building a second `ServerState` (as tests do) must reuse it rather
/// than panic on a second `install_recorder` call.
static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

fn metrics_handle() -> PrometheusHandle {
    METRICS_HANDLE
        .get_or_init(|| {
            PrometheusBuilder::new()
                .install_recorder()
                .expect("install the global Prometheus recorder")
        })
        .clone()
}

/// Shared application state
#[derive(Clone)]
pub struct ServerState {
    /// Server configuration
    pub config: Arc<ServerConfig>,

    /// Rate limit tracking: API key -> (count, window_start)
    pub rate_limiter: Arc<DashMap<String, (u32, std::time::Instant)>>,

    /// The store every request and every worker job reads and writes.
    pub store: Arc<Store>,

    /// Handle used to hand a minted batch off to the worker pool.
    pub workers: WorkerPool,

    /// Matching config shared by every batch this server drives.
    pub match_cfg: Arc<MatchConfig>,

    /// Renders the `metrics` crate's counters/histograms (worker job
    /// outcomes, job latency) as Prometheus text for `/metrics`.
    pub metrics_handle: PrometheusHandle,
}

impl ServerState {
    /// Create new server state, spawning the worker pool against an
    /// in-memory store. A `redb`-backed deployment would construct
    /// `Store::with_backend` here instead, under the `backend-redb`
    /// feature.
    pub fn new(config: ServerConfig) -> ServerResult<Self> {
        let store = Arc::new(Store::in_memory());
        let match_cfg = Arc::new(MatchConfig::default());

        let workers = WorkerPool::spawn(
            store.clone(),
            (*match_cfg).clone(),
            config.graph_threshold,
            config.worker_count,
            256,
        );

        Ok(Self {
            config: Arc::new(config),
            rate_limiter: Arc::new(DashMap::new()),
            store,
            workers,
            match_cfg,
            metrics_handle: metrics_handle(),
        })
    }

    /// Check if API key is valid
    pub fn is_valid_api_key(&self, key: &str) -> bool {
        self.config.api_keys.contains(key)
    }

    /// Check rate limit for API key
    pub fn check_rate_limit(&self, key: &str) -> bool {
        let now = std::time::Instant::now();
        let window = std::time::Duration::from_secs(60);
        let limit = self.config.rate_limit_per_minute;

        let mut entry = self.rate_limiter.entry(key.to_string()).or_insert((0, now));
        let (count, window_start) = entry.value_mut();

        // Reset if window has passed
        if now.duration_since(*window_start) > window {
            *count = 0;
            *window_start = now;
        }

        // Check limit
        if *count >= limit {
            return false;
        }

        *count += 1;
        true
    }
}

/// Server metadata for health checks
#[derive(Debug, serde::Serialize)]
pub struct ServerMetadata {
    pub version: String,
    pub uptime_seconds: u64,
    pub worker_count: usize,
}
