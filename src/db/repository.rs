use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::PgPool;

use super::models::{NewSensorRecord, SchemaCapabilities, SensorRecord, Statistics};

/// Storage seam shared by the persistence timer and the HTTP API.
#[async_trait]
pub trait SensorRepository: Send + Sync {
    fn schema(&self) -> SchemaCapabilities;

    async fn insert(&self, record: &NewSensorRecord) -> Result<SensorRecord>;

    /// Newest first, at most `limit` rows.
    async fn history(&self, limit: i64) -> Result<Vec<SensorRecord>>;

    /// Every row, newest first.
    async fn all(&self) -> Result<Vec<SensorRecord>>;

    async fn by_id(&self, id: i64) -> Result<Option<SensorRecord>>;

    async fn latest(&self) -> Result<Option<SensorRecord>>;

    async fn count(&self) -> Result<i64>;

    /// Delete every row and restart id assignment. Returns the number of rows deleted.
    async fn reset(&self) -> Result<u64>;

    async fn statistics(&self) -> Result<Statistics>;
}

// ---------------------------------------------------------------------------
// Postgres
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct PgSensorRepository {
    pool: PgPool,
    schema: SchemaCapabilities,
}

impl PgSensorRepository {
    pub fn new(pool: PgPool, schema: SchemaCapabilities) -> Self {
        Self { pool, schema }
    }

    /// Column list for reads. Without a humidity column the value is
    /// projected as NULL so every caller sees the same row shape.
    fn columns(&self) -> &'static str {
        if self.schema.has_humidity {
            "id, temperature, humidity, light, captured_at"
        } else {
            "id, temperature, NULL::double precision AS humidity, light, captured_at"
        }
    }
}

#[async_trait]
impl SensorRepository for PgSensorRepository {
    fn schema(&self) -> SchemaCapabilities {
        self.schema
    }

    async fn insert(&self, record: &NewSensorRecord) -> Result<SensorRecord> {
        let columns = self.columns();
        let row = if self.schema.has_humidity {
            let sql = format!(
                "INSERT INTO sensor_records (temperature, humidity, light, captured_at) \
                 VALUES ($1, $2, $3, $4) RETURNING {columns}"
            );
            sqlx::query_as::<_, SensorRecord>(&sql)
                .bind(record.temperature)
                .bind(record.humidity)
                .bind(record.light)
                .bind(record.captured_at)
                .fetch_one(&self.pool)
                .await
        } else {
            let sql = format!(
                "INSERT INTO sensor_records (temperature, light, captured_at) \
                 VALUES ($1, $2, $3) RETURNING {columns}"
            );
            sqlx::query_as::<_, SensorRecord>(&sql)
                .bind(record.temperature)
                .bind(record.light)
                .bind(record.captured_at)
                .fetch_one(&self.pool)
                .await
        };

        row.context("Failed to insert sensor record")
    }

    async fn history(&self, limit: i64) -> Result<Vec<SensorRecord>> {
        let sql = format!(
            "SELECT {} FROM sensor_records ORDER BY captured_at DESC, id DESC LIMIT $1",
            self.columns()
        );
        sqlx::query_as::<_, SensorRecord>(&sql)
            .bind(limit)
            .fetch_all(&self.pool)
            .await
            .context("Failed to fetch sensor history")
    }

    async fn all(&self) -> Result<Vec<SensorRecord>> {
        let sql = format!(
            "SELECT {} FROM sensor_records ORDER BY captured_at DESC, id DESC",
            self.columns()
        );
        sqlx::query_as::<_, SensorRecord>(&sql)
            .fetch_all(&self.pool)
            .await
            .context("Failed to fetch sensor records")
    }

    async fn by_id(&self, id: i64) -> Result<Option<SensorRecord>> {
        let sql = format!("SELECT {} FROM sensor_records WHERE id = $1", self.columns());
        sqlx::query_as::<_, SensorRecord>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to fetch sensor record by id")
    }

    async fn latest(&self) -> Result<Option<SensorRecord>> {
        let sql = format!(
            "SELECT {} FROM sensor_records ORDER BY captured_at DESC, id DESC LIMIT 1",
            self.columns()
        );
        sqlx::query_as::<_, SensorRecord>(&sql)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to fetch latest sensor record")
    }

    async fn count(&self) -> Result<i64> {
        sqlx::query_scalar("SELECT COUNT(*) FROM sensor_records")
            .fetch_one(&self.pool)
            .await
            .context("Failed to count sensor records")
    }

    async fn reset(&self) -> Result<u64> {
        let mut tx = self.pool.begin().await?;

        let deleted = sqlx::query("DELETE FROM sensor_records")
            .execute(&mut *tx)
            .await
            .context("Failed to delete sensor records")?
            .rows_affected();

        sqlx::query("ALTER SEQUENCE sensor_records_id_seq RESTART WITH 1")
            .execute(&mut *tx)
            .await
            .context("Failed to restart sensor record ids")?;

        tx.commit().await?;
        Ok(deleted)
    }

    async fn statistics(&self) -> Result<Statistics> {
        let humidity = if self.schema.has_humidity {
            "MIN(humidity) AS min_humidity, MAX(humidity) AS max_humidity, \
             AVG(humidity) AS avg_humidity"
        } else {
            "NULL::double precision AS min_humidity, NULL::double precision AS max_humidity, \
             NULL::double precision AS avg_humidity"
        };
        let sql = format!(
            "SELECT MIN(temperature) AS min_temperature, \
                    MAX(temperature) AS max_temperature, \
                    AVG(temperature) AS avg_temperature, \
                    {humidity}, \
                    MIN(light) AS min_light, \
                    MAX(light) AS max_light, \
                    AVG(light)::double precision AS avg_light, \
                    COUNT(*) AS total_records \
             FROM sensor_records"
        );

        sqlx::query_as::<_, Statistics>(&sql)
            .fetch_one(&self.pool)
            .await
            .context("Failed to compute sensor statistics")
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};
    use sqlx::PgPool;

    use super::*;

    fn record(temperature: f64, humidity: Option<f64>, light: i32, minutes_ago: i64) -> NewSensorRecord {
        NewSensorRecord {
            temperature,
            humidity,
            light,
            captured_at: Utc::now() - Duration::minutes(minutes_ago),
        }
    }

    fn repo(pool: PgPool) -> PgSensorRepository {
        PgSensorRepository::new(pool, SchemaCapabilities { has_humidity: true })
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "requires a Postgres DATABASE_URL"]
    async fn probe_detects_humidity_column(pool: PgPool) {
        let caps = crate::db::probe_schema(&pool).await.unwrap();
        assert!(caps.has_humidity);

        sqlx::query("ALTER TABLE sensor_records DROP COLUMN humidity")
            .execute(&pool)
            .await
            .unwrap();
        let caps = crate::db::probe_schema(&pool).await.unwrap();
        assert!(!caps.has_humidity);
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "requires a Postgres DATABASE_URL"]
    async fn history_is_newest_first_and_limited(pool: PgPool) {
        let repo = repo(pool);
        for i in 0..5 {
            repo.insert(&record(20.0 + i as f64, Some(50.0), 100, 10 - i)).await.unwrap();
        }

        let rows = repo.history(3).await.unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].temperature, 24.0);
        assert!(rows.windows(2).all(|w| w[0].captured_at >= w[1].captured_at));
        assert_eq!(repo.count().await.unwrap(), 5);
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "requires a Postgres DATABASE_URL"]
    async fn reset_restarts_ids(pool: PgPool) {
        let repo = repo(pool);
        repo.insert(&record(20.0, Some(40.0), 10, 2)).await.unwrap();
        repo.insert(&record(21.0, Some(41.0), 11, 1)).await.unwrap();

        assert_eq!(repo.reset().await.unwrap(), 2);
        assert_eq!(repo.count().await.unwrap(), 0);

        let next = repo.insert(&record(22.0, Some(42.0), 12, 0)).await.unwrap();
        assert_eq!(next.id, 1);
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "requires a Postgres DATABASE_URL"]
    async fn missing_humidity_column_reads_as_null(pool: PgPool) {
        sqlx::query("ALTER TABLE sensor_records DROP COLUMN humidity")
            .execute(&pool)
            .await
            .unwrap();
        let repo = PgSensorRepository::new(pool, SchemaCapabilities { has_humidity: false });

        let inserted = repo.insert(&record(23.5, Some(60.0), 400, 0)).await.unwrap();
        assert_eq!(inserted.humidity, None);

        let fetched = repo.by_id(inserted.id).await.unwrap().unwrap();
        assert_eq!(fetched.temperature, 23.5);
        assert_eq!(fetched.humidity, None);

        let stats = repo.statistics().await.unwrap();
        assert_eq!(stats.avg_humidity, None);
        assert_eq!(stats.total_records, 1);
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "requires a Postgres DATABASE_URL"]
    async fn statistics_aggregate_all_rows(pool: PgPool) {
        let repo = repo(pool);
        repo.insert(&record(20.0, Some(40.0), 100, 2)).await.unwrap();
        repo.insert(&record(30.0, Some(60.0), 300, 1)).await.unwrap();

        let stats = repo.statistics().await.unwrap();
        assert_eq!(stats.min_temperature, Some(20.0));
        assert_eq!(stats.max_temperature, Some(30.0));
        assert_eq!(stats.avg_temperature, Some(25.0));
        assert_eq!(stats.avg_humidity, Some(50.0));
        assert_eq!(stats.min_light, Some(100));
        assert_eq!(stats.avg_light, Some(200.0));
        assert_eq!(stats.total_records, 2);
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "requires a Postgres DATABASE_URL"]
    async fn by_id_and_latest_on_empty_table(pool: PgPool) {
        let repo = repo(pool);
        assert!(repo.by_id(1).await.unwrap().is_none());
        assert!(repo.latest().await.unwrap().is_none());
        assert!(repo.all().await.unwrap().is_empty());
    }
}
