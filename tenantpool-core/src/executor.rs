//! Thin statement runner over a registry pool.

use std::fmt;

use sqlx::mysql::{MySql, MySqlPool, MySqlRow};
use sqlx::{Encode, Type};

use crate::error::{PoolError, Result};

/// Runs SQL against one pool handed out by the registry.
#[derive(Clone, Debug)]
pub struct SqlExecutor {
    pool: MySqlPool,
}

impl SqlExecutor {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &MySqlPool {
        &self.pool
    }

    /// Execute a statement, returning the number of affected rows.
    pub async fn execute(&self, sql: &str) -> Result<u64> {
        let result = sqlx::query(sql).execute(&self.pool).await?;
        Ok(result.rows_affected())
    }

    pub async fn fetch_all(&self, sql: &str) -> Result<Vec<MySqlRow>> {
        Ok(sqlx::query(sql).fetch_all(&self.pool).await?)
    }

    /// Run a query with two bound range parameters (`?` placeholders).
    ///
    /// # Errors
    ///
    /// Returns `PoolError::NoDataInRange` when the query matches nothing.
    pub async fn fetch_range<'q, T>(&self, sql: &'q str, start: T, end: T) -> Result<Vec<MySqlRow>>
    where
        T: 'q + Encode<'q, MySql> + Type<MySql> + fmt::Display + Send,
    {
        let range = (start.to_string(), end.to_string());
        let rows = sqlx::query(sql)
            .bind(start)
            .bind(end)
            .fetch_all(&self.pool)
            .await?;
        require_rows(rows, &range.0, &range.1)
    }

    /// Round-trip `select 1` through the pool.
    pub async fn ping(&self) -> Result<()> {
        let one: i64 = sqlx::query_scalar("select 1").fetch_one(&self.pool).await?;
        if one != 1 {
            return Err(PoolError::Query(sqlx::Error::Protocol(format!(
                "unexpected ping result: {}",
                one
            ))));
        }
        Ok(())
    }
}

fn require_rows<R>(rows: Vec<R>, start: &str, end: &str) -> Result<Vec<R>> {
    if rows.is_empty() {
        return Err(PoolError::no_data_in_range(start, end));
    }
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_range_is_an_error() {
        let err = require_rows(Vec::<u8>::new(), "2024-01-01", "2024-01-31").unwrap_err();
        assert!(matches!(err, PoolError::NoDataInRange { .. }));
        assert!(err.to_string().contains("2024-01-01"));
    }

    #[test]
    fn non_empty_range_passes_rows_through() {
        let rows = require_rows(vec![1, 2, 3], "1", "3").unwrap();
        assert_eq!(rows, vec![1, 2, 3]);
    }

    // Integration tests require a real database
    // Run with: DATABASE_URL=mysql://... cargo test -p tenantpool-core -- --ignored

    #[tokio::test]
    #[ignore = "requires database"]
    async fn ping_round_trips() {
        let url = std::env::var("DATABASE_URL").expect("DATABASE_URL required");
        let pool = MySqlPool::connect(&url).await.expect("pool creation failed");
        let executor = SqlExecutor::new(pool);

        executor.ping().await.expect("ping failed");
    }

    #[tokio::test]
    #[ignore = "requires database"]
    async fn range_without_rows_is_reported() {
        let url = std::env::var("DATABASE_URL").expect("DATABASE_URL required");
        let pool = MySqlPool::connect(&url).await.expect("pool creation failed");
        let executor = SqlExecutor::new(pool);

        let err = executor
            .fetch_range("SELECT 1 FROM DUAL WHERE ? > ?", 1_i64, 2_i64)
            .await
            .unwrap_err();
        assert!(matches!(err, PoolError::NoDataInRange { .. }));
    }
}
