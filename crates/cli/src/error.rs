//! Mirrors [`server::ServerError`]'s shape (validation vs. processor
//! vs. store failure) but renders to a `{status, message}` line on
//! stderr and a process exit code instead of an HTTP response.

use thiserror::Error;

pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug, Error)]
pub enum CliError {
    #[error("payload validation failed: {0}")]
    Validation(String),

    #[error(transparent)]
    Processor(#[from] processors::ProcessorError),

    #[error(transparent)]
    Store(#[from] store::StoreError),

    #[error("could not read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{path} is not valid JSON: {source}")]
    Json {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

impl CliError {
    /// The exit code `main` reports: 405 mirrors the HTTP surface's
    /// validation-failure status for a bad request, 1 covers every
    /// backend failure uniformly since there is no caller to
    /// distinguish them by status code.
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Validation(_) => 2,
            _ => 1,
        }
    }
}
