//! Database module
//!
//! Connection and schema verification utilities for the ledger workers.
//! Tables are created by the SQL files in `migrations/`.

use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

use crate::config::WorkerConfig;

/// Open the worker's connection pool
pub async fn connect(config: &WorkerConfig) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(config.database_max_connections)
        .connect(&config.database_url)
        .await
}

/// Verify database connectivity
pub async fn verify_connection(pool: &PgPool) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT 1").execute(pool).await?;
    Ok(())
}

/// Check if the configured balances and transactions tables exist
pub async fn check_schema(pool: &PgPool, config: &WorkerConfig) -> Result<bool, sqlx::Error> {
    for table in [&config.balances_table, &config.transactions_table] {
        let (schema, name) = split_table_name(table);

        let exists: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM information_schema.tables
                WHERE table_schema = $1 AND table_name = $2
            )
            "#,
        )
        .bind(schema)
        .bind(name)
        .fetch_one(pool)
        .await?;

        if !exists {
            tracing::error!("Required table '{}' does not exist", table);
            return Ok(false);
        }
    }

    Ok(true)
}

/// `schema.table` or `table` (in `public`)
fn split_table_name(table: &str) -> (&str, &str) {
    table.split_once('.').unwrap_or(("public", table))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_table_name() {
        assert_eq!(split_table_name("balances"), ("public", "balances"));
        assert_eq!(split_table_name("wallet.balances"), ("wallet", "balances"));
    }
}
