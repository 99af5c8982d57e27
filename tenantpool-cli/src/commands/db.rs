//! Database commands
//!
//! Commands: check, exec

use anyhow::{Context, Result};
use clap::Parser;
use tenantpool_core::{MySqlPoolFactory, PoolKey, PoolRegistry, SqlExecutor, TenantPoolConfig};

// === Arg Structs ===

#[derive(Parser, Debug)]
pub struct DbArgs {
    /// Use the read-only replica instead of the primary
    #[arg(long)]
    pub read_only: bool,
}

#[derive(Parser, Debug)]
pub struct ExecArgs {
    #[command(flatten)]
    pub db: DbArgs,

    /// SQL statement to execute
    pub sql: String,
}

// === Command Implementations ===

pub async fn run_check(args: DbArgs) -> Result<()> {
    let registry = registry()?;
    let outcome = check(&registry, args.read_only).await;
    registry.clear_all().await;
    outcome
}

pub async fn run_exec(args: ExecArgs) -> Result<()> {
    let registry = registry()?;
    let outcome = exec(&registry, args.db.read_only, &args.sql).await;
    registry.clear_all().await;
    outcome
}

fn registry() -> Result<PoolRegistry<MySqlPoolFactory>> {
    let config = TenantPoolConfig::load().context("Failed to load configuration")?;
    Ok(PoolRegistry::from_config(&config))
}

async fn check(registry: &PoolRegistry<MySqlPoolFactory>, read_only: bool) -> Result<()> {
    let pool = registry
        .get(read_only)
        .await
        .context("Failed to obtain connection pool")?;

    SqlExecutor::new(pool)
        .ping()
        .await
        .context("Database did not answer health query")?;

    let key = PoolKey::new(registry.tenant(), read_only);
    if let Some(summary) = registry.summary(&key) {
        println!("✓ {} ({})", summary.pool_name, summary.host);
    }
    Ok(())
}

async fn exec(registry: &PoolRegistry<MySqlPoolFactory>, read_only: bool, sql: &str) -> Result<()> {
    let pool = registry
        .get(read_only)
        .await
        .context("Failed to obtain connection pool")?;

    let affected = SqlExecutor::new(pool)
        .execute(sql)
        .await
        .context("Statement failed")?;

    println!("{} row(s) affected", affected);
    Ok(())
}
