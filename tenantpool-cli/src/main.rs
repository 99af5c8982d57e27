//! tenantpool CLI - tenant-scoped MySQL connection pools
//!
//! Entry point for the `tenantpool` binary:
//! - `serve` runs the management server over a shared pool registry
//! - `check` and `exec` obtain a pool and run statements against it
//! - `config` shows the resolved configuration

use anyhow::Result;
use clap::{ArgAction, Parser, Subcommand};

mod commands;
mod tracing_setup;

use commands::{ConfigArgs, DbArgs, ExecArgs, ServeArgs};
use tracing_setup::{init_tracing, TracingConfig};

#[derive(Parser, Debug)]
#[command(
    name = "tenantpool",
    author,
    version,
    about = "Tenant-scoped MySQL connection pools with primary/replica routing",
    long_about = "Lazily creates one connection pool per tenant and role (primary or read-only \
                  replica), runs statements against them, and serves a small management API \
                  for listing and clearing pools."
)]
struct Cli {
    /// Enable debug logging (overridden by RUST_LOG)
    #[arg(long, global = true, action = ArgAction::SetTrue)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the management HTTP server
    Serve(ServeArgs),
    /// Obtain a pool and verify the database answers
    Check(DbArgs),
    /// Execute a SQL statement and print the rows affected
    Exec(ExecArgs),
    /// Inspect the resolved configuration
    Config(ConfigArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(&TracingConfig { debug: cli.debug }).ok();
    tenantpool_core::config::load_dotenv();

    match cli.command {
        Commands::Serve(args) => commands::run_serve(args).await?,
        Commands::Check(args) => commands::run_check(args).await?,
        Commands::Exec(args) => commands::run_exec(args).await?,
        Commands::Config(args) => commands::run_config(args)?,
    }

    Ok(())
}
