use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tenantpool_core::{PoolKey, PoolSettings, TenantPoolConfig};

#[derive(Parser, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommands,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Show derived pool settings for the primary and read-only roles
    Show,
    /// Show config file path
    Path,
}

pub fn run_config(args: ConfigArgs) -> Result<()> {
    match args.command {
        ConfigCommands::Show => run_show(),
        ConfigCommands::Path => run_path(),
    }
}

fn run_show() -> Result<()> {
    let config = TenantPoolConfig::load().context("Failed to load configuration")?;

    println!("tenant: {}", config.tenant);
    println!("close timeout: {:?}", config.db.close_timeout());

    for read_only in [false, true] {
        let key = PoolKey::new(config.tenant.as_str(), read_only);
        println!();
        match PoolSettings::for_key(&config.db, &key) {
            Ok(settings) => print_settings(&settings),
            Err(e) => println!("[{}]\n  ✗ {}", key, e),
        }
    }

    Ok(())
}

fn print_settings(settings: &PoolSettings) {
    println!("[{}]", settings.pool_name);
    println!("  url:          {}", settings.url);
    println!("  username:     {}", settings.username);
    println!(
        "  password:     {}",
        if settings.password().is_empty() { "(empty)" } else { "***" }
    );
    println!("  pool size:    {} (min idle {})", settings.max_size, settings.min_idle);
    println!("  health check: {}", settings.health_check);
    for statement in settings.session_statements() {
        println!("  on connect:   {}", statement);
    }
}

fn run_path() -> Result<()> {
    println!("{}", TenantPoolConfig::config_path().display());
    Ok(())
}
