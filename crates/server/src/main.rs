//! EMPI Server - HTTP REST API for the Enterprise Master Patient Index
//!
//! This binary provides a production-ready HTTP server exposing the
//! identity-resolution engine via REST endpoints with authentication
//! and rate limiting.

use server::ServerConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    let config = ServerConfig::load()?;

    // Start server
    server::start_server(config).await?;

    Ok(())
}
