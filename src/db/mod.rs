pub mod models;
pub mod repository;

#[cfg(test)]
pub(crate) mod memory;

use anyhow::{Context, Result};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

use self::models::SchemaCapabilities;

pub async fn create_pool(database_url: &str) -> Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(database_url)
        .await?;
    Ok(pool)
}

pub async fn run_migrations(pool: &PgPool) -> Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

/// Inspect `sensor_records` once. Some deployments drop the humidity column;
/// the result is treated as static for the process lifetime.
pub async fn probe_schema(pool: &PgPool) -> Result<SchemaCapabilities> {
    let has_humidity: bool = sqlx::query_scalar(
        r#"
        SELECT EXISTS (
            SELECT 1
            FROM information_schema.columns
            WHERE table_schema = current_schema()
              AND table_name   = 'sensor_records'
              AND column_name  = 'humidity'
        )
        "#,
    )
    .fetch_one(pool)
    .await
    .context("Failed to inspect sensor_records columns")?;

    Ok(SchemaCapabilities { has_humidity })
}
