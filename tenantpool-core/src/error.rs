/// Structured error types for tenantpool-core.
///
/// Uses `thiserror` so registry callers can match on the failure kind.
/// The binary (tenantpool-cli) wraps these in `anyhow` with context.
use thiserror::Error;

/// Main error type for pool construction, teardown and statement execution
#[derive(Error, Debug)]
pub enum PoolError {
    /// Required connection parameter is missing or blank
    #[error("Configuration error: missing value for '{field}'")]
    Config { field: &'static str },

    /// The driver rejected the connection URL
    #[error("Invalid connection URL for pool '{pool_name}': {source}")]
    InvalidUrl {
        pool_name: String,
        #[source]
        source: sqlx::Error,
    },

    /// The pool could not be built (unreachable host, bad credentials, ...)
    #[error("Failed to create pool '{pool_name}': {source}")]
    Connect {
        pool_name: String,
        #[source]
        source: sqlx::Error,
    },

    /// A concurrent construction of the same pool failed while this caller
    /// was waiting for it
    #[error("Pool for {key} is unavailable: {reason}")]
    Unavailable { key: String, reason: String },

    /// Closing a pool failed or did not finish in time
    #[error("Failed to close pool '{pool_name}': {reason}")]
    Close { pool_name: String, reason: String },

    /// A range query matched no rows
    #[error("No data in range {range}")]
    NoDataInRange { range: String },

    /// Statement execution failed
    #[error("Query failed: {0}")]
    Query(#[from] sqlx::Error),
}

/// Result type alias for tenantpool-core operations
pub type Result<T> = std::result::Result<T, PoolError>;

impl PoolError {
    /// Create a teardown error
    pub fn close(pool_name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Close {
            pool_name: pool_name.into(),
            reason: reason.into(),
        }
    }

    /// Create a no-data error for the given bounds
    pub fn no_data_in_range(start: impl std::fmt::Display, end: impl std::fmt::Display) -> Self {
        Self::NoDataInRange {
            range: format!("[{}, {}]", start, end),
        }
    }

    /// True for failures raised while building a pool
    pub fn is_construction_failure(&self) -> bool {
        matches!(
            self,
            Self::Config { .. }
                | Self::InvalidUrl { .. }
                | Self::Connect { .. }
                | Self::Unavailable { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = PoolError::Config { field: "db.host" };
        assert_eq!(
            err.to_string(),
            "Configuration error: missing value for 'db.host'"
        );

        let err = PoolError::close("cflow Master Data Source", "timed out after 5s");
        assert!(err.to_string().contains("cflow Master Data Source"));
        assert!(err.to_string().contains("timed out"));
    }

    #[test]
    fn test_no_data_in_range() {
        let err = PoolError::no_data_in_range("2024-01-01", "2024-01-31");
        assert_eq!(err.to_string(), "No data in range [2024-01-01, 2024-01-31]");
        assert!(!err.is_construction_failure());
    }

    #[test]
    fn test_construction_failures() {
        assert!(PoolError::Config { field: "db.name" }.is_construction_failure());
        let connect = PoolError::Connect {
            pool_name: "p".into(),
            source: sqlx::Error::PoolTimedOut,
        };
        assert!(connect.is_construction_failure());
        let unavailable = PoolError::Unavailable {
            key: "acme (read-only)".into(),
            reason: "connection refused".into(),
        };
        assert!(unavailable.is_construction_failure());
        assert_eq!(
            unavailable.to_string(),
            "Pool for acme (read-only) is unavailable: connection refused"
        );
        assert!(!PoolError::close("p", "x").is_construction_failure());
    }

    #[test]
    fn test_sqlx_error_conversion() {
        let err: PoolError = sqlx::Error::RowNotFound.into();
        assert!(matches!(err, PoolError::Query(_)));
    }
}
