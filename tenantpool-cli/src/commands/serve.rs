//! Management server command
//!
//! Runs the HTTP management API over a registry shared for the process
//! lifetime, then closes every pool on the way out.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tenantpool_core::{PoolRegistry, TenantPoolConfig};
use tenantpool_server::{run_server, ServerConfig};

/// Arguments for the serve command
#[derive(Parser, Debug)]
pub struct ServeArgs {
    /// Address to bind to (default: 127.0.0.1:3040)
    #[arg(long, short = 'b', default_value = "127.0.0.1:3040")]
    pub bind: SocketAddr,

    /// Allow permissive CORS (all origins) - use with caution
    #[arg(long)]
    pub cors_permissive: bool,
}

/// Run the management server
pub async fn run_serve(args: ServeArgs) -> Result<()> {
    let config = TenantPoolConfig::load().context("Failed to load configuration")?;
    let registry = Arc::new(PoolRegistry::from_config(&config));

    tracing::info!(tenant = %registry.tenant(), "Starting tenantpool server on {}", args.bind);

    let server_config = ServerConfig {
        bind_addr: args.bind,
        cors_permissive: args.cors_permissive,
    };

    // Pools are closed even when the server fails
    let served = run_server(Arc::clone(&registry), server_config).await;

    let report = registry.clear_all().await;
    tracing::info!(
        closed = report.closed,
        failures = report.failures.len(),
        "Pools closed on shutdown"
    );

    served.context("Server error")?;
    Ok(())
}
