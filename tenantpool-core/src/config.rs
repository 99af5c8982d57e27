use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::fmt;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info};

use crate::key::DEFAULT_TENANT;

/// Default time allowed for a pool to close gracefully during a clear.
pub const DEFAULT_CLOSE_TIMEOUT_SECS: u64 = 30;

/// Environment variables that override values from the config file.
const ENV_OVERRIDES: &[(&str, Field)] = &[
    ("TENANTPOOL_TENANT", Field::Tenant),
    ("DB_HOST", Field::Host),
    ("DB_READ_ONLY_HOST", Field::ReadOnlyHost),
    ("DB_NAME", Field::Name),
    ("DB_USERNAME", Field::Username),
    ("DB_PASSWORD", Field::Password),
];

#[derive(Clone, Copy)]
enum Field {
    Tenant,
    Host,
    ReadOnlyHost,
    Name,
    Username,
    Password,
}

/// Process-wide configuration for tenantpool
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub struct TenantPoolConfig {
    /// Tenant served by `PoolRegistry::get`
    #[serde(default = "default_tenant")]
    pub tenant: String,

    #[serde(default)]
    pub db: DatabaseConfig,
}

/// Connection parameters shared by every pool.
///
/// Blank values are accepted here; they surface as a configuration error the
/// first time a pool needing them is built.
#[derive(Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub struct DatabaseConfig {
    /// Writable primary, `host[:port]`
    #[serde(default)]
    pub host: String,

    /// Read replica, `host[:port]`
    #[serde(default)]
    pub read_only_host: String,

    /// Database (schema) name
    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub username: String,

    #[serde(default)]
    pub password: String,

    #[serde(default = "default_close_timeout_secs")]
    pub close_timeout_secs: u64,
}

fn default_tenant() -> String {
    DEFAULT_TENANT.to_string()
}

fn default_close_timeout_secs() -> u64 {
    DEFAULT_CLOSE_TIMEOUT_SECS
}

impl Default for TenantPoolConfig {
    fn default() -> Self {
        Self {
            tenant: default_tenant(),
            db: DatabaseConfig::default(),
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            host: String::new(),
            read_only_host: String::new(),
            name: String::new(),
            username: String::new(),
            password: String::new(),
            close_timeout_secs: DEFAULT_CLOSE_TIMEOUT_SECS,
        }
    }
}

impl fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("host", &self.host)
            .field("read_only_host", &self.read_only_host)
            .field("name", &self.name)
            .field("username", &self.username)
            .field("password", &"***")
            .field("close_timeout_secs", &self.close_timeout_secs)
            .finish()
    }
}

impl DatabaseConfig {
    pub fn close_timeout(&self) -> Duration {
        Duration::from_secs(self.close_timeout_secs)
    }
}

impl TenantPoolConfig {
    /// Load config from the config file, environment and `${var}` expansion.
    ///
    /// A missing config file is not an error: deployments may configure
    /// everything through the environment.
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path();

        let mut config = if config_path.exists() {
            let content = fs::read_to_string(&config_path)
                .context(format!("Failed to read config file: {:?}", config_path))?;
            Self::from_toml_str(&content)?
        } else {
            debug!("No config file at {:?}, using environment only", config_path);
            Self::default()
        };

        config.apply_env_overrides(|name| env::var(name).ok());
        config.expand_variables(|name| env::var(name).ok());

        Ok(config)
    }

    /// Parse a config document without touching the environment.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse config file (invalid TOML)")
    }

    /// Config file path: $TENANTPOOL_CONFIG or ~/.tenantpool/config.toml
    pub fn config_path() -> PathBuf {
        if let Ok(path) = env::var("TENANTPOOL_CONFIG") {
            return PathBuf::from(path);
        }

        config_dir()
            .unwrap_or_else(|| PathBuf::from(".tenantpool"))
            .join("config.toml")
    }

    /// Apply `DB_*` / `TENANTPOOL_TENANT` overrides from `lookup`.
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        for &(name, field) in ENV_OVERRIDES {
            let Some(value) = lookup(name) else { continue };
            let slot = match field {
                Field::Tenant => &mut self.tenant,
                Field::Host => &mut self.db.host,
                Field::ReadOnlyHost => &mut self.db.read_only_host,
                Field::Name => &mut self.db.name,
                Field::Username => &mut self.db.username,
                Field::Password => &mut self.db.password,
            };
            *slot = value;
        }
    }

    /// Expand `${VAR}` references in string values. Unknown variables expand
    /// to the empty string.
    pub fn expand_variables<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        for value in [
            &mut self.tenant,
            &mut self.db.host,
            &mut self.db.read_only_host,
            &mut self.db.name,
            &mut self.db.username,
            &mut self.db.password,
        ] {
            *value = expand_string(value, &lookup);
        }
    }
}

/// Expand `${VAR}` references in a string
fn expand_string<F>(s: &str, lookup: &F) -> String
where
    F: Fn(&str) -> Option<String>,
{
    let mut result = String::with_capacity(s.len());
    let mut rest = s;

    while let Some(start) = rest.find("${") {
        let Some(len) = rest[start + 2..].find('}') else {
            break;
        };
        result.push_str(&rest[..start]);
        let name = &rest[start + 2..start + 2 + len];
        result.push_str(&lookup(name).unwrap_or_default());
        rest = &rest[start + 2 + len + 1..];
    }

    result.push_str(rest);
    result
}

/// Get the tenantpool config directory path (~/.tenantpool)
pub fn config_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".tenantpool"))
}

/// Load environment variables from .env files.
///
/// The current directory wins over ~/.tenantpool/.env; dotenvy never
/// overwrites variables that are already set.
pub fn load_dotenv() {
    let mut loaded_from = Vec::new();

    if let Ok(path) = dotenvy::dotenv() {
        loaded_from.push(path.display().to_string());
    }

    if let Some(env_file) = config_dir().map(|dir| dir.join(".env")) {
        if env_file.exists() {
            match dotenvy::from_path(&env_file) {
                Ok(()) => loaded_from.push(env_file.display().to_string()),
                Err(e) => debug!("Failed to load {}: {}", env_file.display(), e),
            }
        }
    }

    if loaded_from.is_empty() {
        debug!("No .env files found (current dir or ~/.tenantpool)");
    } else {
        info!("Loaded environment from: {}", loaded_from.join(", "));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    const SAMPLE: &str = r#"
tenant = "acme"

[db]
host = "primary.internal:3306"
read-only-host = "replica.internal:3306"
name = "cheddar"
username = "app"
password = "${DB_SECRET}"
close-timeout-secs = 5
"#;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn parses_full_document() {
        let config = TenantPoolConfig::from_toml_str(SAMPLE).unwrap();
        assert_eq!(config.tenant, "acme");
        assert_eq!(config.db.host, "primary.internal:3306");
        assert_eq!(config.db.read_only_host, "replica.internal:3306");
        assert_eq!(config.db.name, "cheddar");
        assert_eq!(config.db.close_timeout(), Duration::from_secs(5));
    }

    #[test]
    fn empty_document_uses_defaults() {
        let config = TenantPoolConfig::from_toml_str("").unwrap();
        assert_eq!(config.tenant, DEFAULT_TENANT);
        assert!(config.db.host.is_empty());
        assert_eq!(config.db.close_timeout_secs, DEFAULT_CLOSE_TIMEOUT_SECS);
    }

    #[test]
    fn invalid_toml_is_rejected() {
        let err = TenantPoolConfig::from_toml_str("tenant = ").unwrap_err();
        assert!(err.to_string().contains("invalid TOML"));
    }

    #[test]
    fn env_overrides_file_values() {
        let mut config = TenantPoolConfig::from_toml_str(SAMPLE).unwrap();
        config.apply_env_overrides(lookup_from(&[
            ("DB_HOST", "failover.internal"),
            ("TENANTPOOL_TENANT", "globex"),
        ]));
        assert_eq!(config.db.host, "failover.internal");
        assert_eq!(config.tenant, "globex");
        assert_eq!(config.db.read_only_host, "replica.internal:3306");
    }

    #[test]
    fn expands_variables() {
        let mut config = TenantPoolConfig::from_toml_str(SAMPLE).unwrap();
        config.expand_variables(lookup_from(&[("DB_SECRET", "hunter2")]));
        assert_eq!(config.db.password, "hunter2");
    }

    #[test]
    fn unknown_variables_expand_to_empty() {
        assert_eq!(expand_string("a${MISSING}b", &lookup_from(&[])), "ab");
        assert_eq!(expand_string("no vars", &lookup_from(&[])), "no vars");
        assert_eq!(expand_string("open ${never", &lookup_from(&[])), "open ${never");
    }

    #[test]
    fn debug_redacts_password() {
        let mut config = TenantPoolConfig::default();
        config.db.password = "hunter2".into();
        let rendered = format!("{:?}", config);
        assert!(!rendered.contains("hunter2"));
        assert!(rendered.contains("***"));
    }

    #[test]
    fn reads_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, SAMPLE).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        let config = TenantPoolConfig::from_toml_str(&content).unwrap();
        assert_eq!(config.db.username, "app");
    }
}
