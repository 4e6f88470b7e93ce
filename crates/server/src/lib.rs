//! EMPI Server - HTTP REST API for the Enterprise Master Patient Index
//!
//! This crate exposes the identity-resolution engine (`store`, `graph`,
//! `match-engine`, `processors`) over a REST API under
//! `/api_{version}/`, per spec.md §6. It supports:
//!
//! - **Ingest & lifecycle**: `demographic`, `activate_demographic`,
//!   `deactivate_demographic`, `delete_demographic`, `delete_action`
//! - **Match actions**: `match_affirm`, `match_deny`
//! - **Generic reads**: every table accepts an equality-filtered GET;
//!   `query_records` takes its target table as an `endpoint` field
//! - **Health & Metrics**: liveness/readiness probes and a metrics endpoint
//!
//! # Features
//!
//! - **Authentication**: API key-based authentication with rate limiting
//! - **Middleware**: Compression, CORS, request ID tracking, structured logging
//! - **Configuration**: Environment variable and file-based configuration
//! - **Error Handling**: Comprehensive error responses with error codes
//! - **Graceful Shutdown**: Proper signal handling for production deployments
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use server::ServerConfig;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = ServerConfig::load()?;
//!     server::start_server(config).await?;
//!     Ok(())
//! }
//! ```
//!
//! # API Endpoints
//!
//! ## Public Endpoints (No Authentication)
//!
//! - `GET /` - API information
//! - `GET /health` - Liveness probe
//! - `GET /ready` - Readiness probe
//! - `GET /metrics` - Prometheus-style metrics
//!
//! ## Protected Endpoints (API Key Required)
//!
//! - `POST /api_{version}/demographic` - ingest (returns `{batch_key, status}`)
//! - `POST /api_{version}/activate_demographic` - activate
//! - `POST /api_{version}/deactivate_demographic` - deactivate
//! - `POST /api_{version}/delete_demographic` - delete
//! - `POST /api_{version}/match_affirm` - affirm
//! - `POST /api_{version}/match_deny` - deny
//! - `POST /api_{version}/delete_action` - undo a prior action
//! - `GET /api_{version}/{endpoint}` - equality-filtered read over any table
//! - `GET /api_{version}/query_records` - equality-filtered read naming its table via `endpoint`
//! - `GET /api_{version}/metadata` - server metadata

pub mod config;
pub mod error;
pub mod middleware;
pub mod routes;
pub mod server;
pub mod state;

pub use config::ServerConfig;
pub use error::{ServerError, ServerResult};
pub use server::start_server;
pub use state::ServerState;
