//! Pool construction
//!
//! Derives per-key `PoolSettings` from the shared `DatabaseConfig` and turns
//! them into a live sqlx `MySqlPool`. Everything tunable here is a deployment
//! constant; only the host, the pool name and the read-only behavior depend
//! on the key.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use sqlx::mysql::{MySqlConnectOptions, MySqlPool, MySqlPoolOptions};
use sqlx::{Connection, Executor};

use crate::config::DatabaseConfig;
use crate::error::{PoolError, Result};
use crate::key::PoolKey;

/// Driver flags appended verbatim to every connection URL.
pub const URL_TUNING_PARAMS: &str =
    "ssl-mode=disabled&charset=utf8mb4&statement-cache-capacity=2048";

pub const MAX_POOL_SIZE: u32 = 10;
pub const MIN_IDLE: u32 = 2;

/// Upper bound on waiting for a connection, including the first one.
pub const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(30);

const POOL_NAME_SUFFIX: &str = " Master Data Source";
const READ_ONLY_SUFFIX: &str = " (Read-Only)";

/// Transaction isolation applied to every session.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum IsolationLevel {
    RepeatableRead,
}

impl IsolationLevel {
    pub fn set_session_statement(self) -> &'static str {
        match self {
            IsolationLevel::RepeatableRead => {
                "SET SESSION TRANSACTION ISOLATION LEVEL REPEATABLE READ"
            }
        }
    }
}

/// Validation performed on a connection before it is handed out.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HealthCheck {
    /// Protocol-level ping, no statement executed
    Ping,
    /// Run a real statement
    Query(&'static str),
}

impl fmt::Display for HealthCheck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HealthCheck::Ping => write!(f, "/* ping */"),
            HealthCheck::Query(sql) => write!(f, "{}", sql),
        }
    }
}

/// Fully derived parameters for one pool.
#[derive(Clone)]
pub struct PoolSettings {
    pub pool_name: String,
    pub host: String,
    pub database: String,
    /// Connection URL without credentials
    pub url: String,
    pub username: String,
    password: String,
    pub isolation: IsolationLevel,
    pub max_size: u32,
    pub min_idle: u32,
    pub health_check: HealthCheck,
    pub read_only: bool,
    pub close_timeout: Duration,
}

impl fmt::Debug for PoolSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PoolSettings")
            .field("pool_name", &self.pool_name)
            .field("url", &self.url)
            .field("username", &self.username)
            .field("password", &"***")
            .field("isolation", &self.isolation)
            .field("max_size", &self.max_size)
            .field("min_idle", &self.min_idle)
            .field("health_check", &self.health_check)
            .field("read_only", &self.read_only)
            .finish()
    }
}

fn required<'a>(value: &'a str, field: &'static str) -> Result<&'a str> {
    let value = value.trim();
    if value.is_empty() {
        return Err(PoolError::Config { field });
    }
    Ok(value)
}

impl PoolSettings {
    /// Derive the settings for `key`.
    ///
    /// Read-only keys go to the replica host. Only the values this key
    /// needs are checked, so a missing replica host does not prevent
    /// building the primary pool.
    pub fn for_key(config: &DatabaseConfig, key: &PoolKey) -> Result<Self> {
        let read_only = key.is_read_only();
        let host = if read_only {
            required(&config.read_only_host, "db.read-only-host")?
        } else {
            required(&config.host, "db.host")?
        };
        let database = required(&config.name, "db.name")?;
        let username = required(&config.username, "db.username")?;

        let mut pool_name = format!("{}{}", key.tenant(), POOL_NAME_SUFFIX);
        if read_only {
            pool_name.push_str(READ_ONLY_SUFFIX);
        }

        Ok(Self {
            pool_name,
            host: host.to_string(),
            database: database.to_string(),
            url: format!("mysql://{}/{}?{}", host, database, URL_TUNING_PARAMS),
            username: username.to_string(),
            password: config.password.clone(),
            isolation: IsolationLevel::RepeatableRead,
            max_size: MAX_POOL_SIZE,
            min_idle: MIN_IDLE,
            health_check: if read_only {
                HealthCheck::Query("select 1")
            } else {
                HealthCheck::Ping
            },
            read_only,
            close_timeout: config.close_timeout(),
        })
    }

    pub fn password(&self) -> &str {
        &self.password
    }

    /// Statements run once on every new connection.
    pub fn session_statements(&self) -> Vec<&'static str> {
        let mut statements = vec![self.isolation.set_session_statement()];
        if self.read_only {
            statements.push("SET SESSION TRANSACTION READ ONLY");
        }
        statements
    }

    /// Parse the URL and attach credentials.
    pub fn connect_options(&self) -> Result<MySqlConnectOptions> {
        let options =
            MySqlConnectOptions::from_str(&self.url).map_err(|source| PoolError::InvalidUrl {
                pool_name: self.pool_name.clone(),
                source,
            })?;

        Ok(options
            .username(&self.username)
            .password(&self.password))
    }

    /// Pool sizing plus the session and health-check hooks.
    pub fn pool_options(&self) -> MySqlPoolOptions {
        let statements = self.session_statements();
        let health_check = self.health_check;

        MySqlPoolOptions::new()
            .max_connections(self.max_size)
            .min_connections(self.min_idle)
            .acquire_timeout(ACQUIRE_TIMEOUT)
            .test_before_acquire(false)
            .after_connect(move |conn, _meta| {
                let statements = statements.clone();
                Box::pin(async move {
                    for statement in statements {
                        (&mut *conn).execute(statement).await?;
                    }
                    Ok(())
                })
            })
            .before_acquire(move |conn, _meta| {
                Box::pin(async move {
                    let healthy = match health_check {
                        HealthCheck::Ping => conn.ping().await.is_ok(),
                        HealthCheck::Query(sql) => (&mut *conn).execute(sql).await.is_ok(),
                    };
                    Ok(healthy)
                })
            })
    }
}

/// Builds and tears down pools for the registry.
///
/// `connect` is the only place physical connections get opened.
#[async_trait]
pub trait PoolFactory: Send + Sync + 'static {
    type Pool: Clone + Send + Sync + 'static;

    fn settings(&self, key: &PoolKey) -> Result<PoolSettings>;

    async fn connect(&self, settings: &PoolSettings) -> Result<Self::Pool>;

    async fn close(&self, pool: Self::Pool, settings: &PoolSettings) -> Result<()>;
}

/// Production factory backed by sqlx's MySQL pool.
#[derive(Debug, Clone)]
pub struct MySqlPoolFactory {
    config: DatabaseConfig,
}

impl MySqlPoolFactory {
    pub fn new(config: DatabaseConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl PoolFactory for MySqlPoolFactory {
    type Pool = MySqlPool;

    fn settings(&self, key: &PoolKey) -> Result<PoolSettings> {
        PoolSettings::for_key(&self.config, key)
    }

    async fn connect(&self, settings: &PoolSettings) -> Result<MySqlPool> {
        let options = settings.connect_options()?;
        settings
            .pool_options()
            .connect_with(options)
            .await
            .map_err(|source| PoolError::Connect {
                pool_name: settings.pool_name.clone(),
                source,
            })
    }

    async fn close(&self, pool: MySqlPool, settings: &PoolSettings) -> Result<()> {
        tokio::time::timeout(settings.close_timeout, pool.close())
            .await
            .map_err(|_| {
                PoolError::close(
                    &settings.pool_name,
                    format!("timed out after {:?}", settings.close_timeout),
                )
            })
    }
}
