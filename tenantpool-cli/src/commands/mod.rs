//! Command implementations for the tenantpool CLI

pub mod config;
pub mod db;
pub mod serve;

// Re-export dispatcher functions for flat access from main.rs
pub use config::{run_config, ConfigArgs};
pub use db::{run_check, run_exec, DbArgs, ExecArgs};
pub use serve::{run_serve, ServeArgs};
