pub mod config;
pub mod error;
pub mod executor;
pub mod factory;
pub mod key;
pub mod registry;

pub use config::{DatabaseConfig, TenantPoolConfig};
pub use error::{PoolError, Result};
pub use executor::SqlExecutor;
pub use factory::{HealthCheck, IsolationLevel, MySqlPoolFactory, PoolFactory, PoolSettings};
pub use key::{PoolKey, DEFAULT_TENANT};
pub use registry::{ClearReport, PoolRegistry, PoolSummary, TeardownFailure};
