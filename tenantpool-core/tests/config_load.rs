use std::io::Write;

use tempfile::NamedTempFile;
use tenantpool_core::{PoolError, PoolRegistry, TenantPoolConfig};

// Kept as the only test in this binary: it mutates process environment variables.
#[tokio::test]
async fn load_reads_file_env_and_expands_variables() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(
        file,
        r#"
tenant = "acme"

[db]
host = "primary.internal:3306"
name = "cheddar"
username = "app"
password = "${{TENANTPOOL_TEST_SECRET}}"
"#
    )
    .unwrap();

    std::env::set_var("TENANTPOOL_CONFIG", file.path());
    std::env::set_var("TENANTPOOL_TEST_SECRET", "hunter2");
    std::env::set_var("DB_USERNAME", "override");
    for name in ["DB_HOST", "DB_READ_ONLY_HOST", "DB_NAME", "DB_PASSWORD", "TENANTPOOL_TENANT"] {
        std::env::remove_var(name);
    }

    let config = TenantPoolConfig::load().unwrap();
    assert_eq!(TenantPoolConfig::config_path(), file.path());
    assert_eq!(config.tenant, "acme");
    assert_eq!(config.db.password, "hunter2");
    assert_eq!(config.db.username, "override");

    // No replica host configured: only requesting the replica pool fails
    let registry = PoolRegistry::from_config(&config);
    let err = registry.get(true).await.unwrap_err();
    assert!(matches!(err, PoolError::Config { field: "db.read-only-host" }));
    assert!(registry.is_empty());
}
