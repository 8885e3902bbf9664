//! SQLite implementation of [`RateStore`].

use async_trait::async_trait;
use chrono::Utc;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use sqlx::Row;
use std::str::FromStr;
use std::time::Duration;

use crate::config::DatabaseConfig;
use crate::rates::types::ExchangeRatePoint;
use crate::store::{RateStore, StoreResult};

const DATE_FORMAT: &str = "%Y-%m-%d";

pub struct SqliteRateStore {
    pool: SqlitePool,
}

impl SqliteRateStore {
    /// Open (creating if needed) the database and ensure the schema exists.
    pub async fn connect(config: &DatabaseConfig) -> StoreResult<Self> {
        let options = SqliteConnectOptions::from_str(&config.url)?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(Duration::from_secs(5));

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .connect_with(options)
            .await?;

        let store = Self::from_pool(pool).await?;
        tracing::info!(url = %config.url, "Rate store ready");
        Ok(store)
    }

    /// Wrap an existing pool and ensure the schema exists.
    pub async fn from_pool(pool: SqlitePool) -> StoreResult<Self> {
        let store = Self { pool };
        store.migrate().await?;
        Ok(store)
    }

    async fn migrate(&self) -> StoreResult<()> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS exchange_rates (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                date TEXT NOT NULL UNIQUE,
                rate REAL NOT NULL,
                source TEXT NOT NULL DEFAULT 'banxico',
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_exchange_rates_date ON exchange_rates (date);")
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}

const UPSERT: &str = "INSERT INTO exchange_rates (date, rate, source, created_at, updated_at)
     VALUES (?, ?, ?, ?, ?)
     ON CONFLICT(date) DO UPDATE SET
        rate = excluded.rate,
        source = excluded.source,
        updated_at = excluded.updated_at";

#[async_trait]
impl RateStore for SqliteRateStore {
    async fn save_rates(&self, points: &[ExchangeRatePoint]) -> StoreResult<usize> {
        let now = Utc::now().to_rfc3339();
        let mut tx = self.pool.begin().await?;
        for point in points {
            sqlx::query(UPSERT)
                .bind(point.date.format(DATE_FORMAT).to_string())
                .bind(point.rate)
                .bind(&point.source)
                .bind(&now)
                .bind(&now)
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;
        Ok(points.len())
    }

    async fn ping(&self) -> StoreResult<bool> {
        let row = sqlx::query("SELECT 1 AS one").fetch_one(&self.pool).await?;
        let one: i64 = row.try_get("one")?;
        Ok(one == 1)
    }
}

/// Read-back helpers for tests.
#[cfg(test)]
impl SqliteRateStore {
    /// Every stored point, newest first.
    pub(crate) async fn all_rates(&self) -> StoreResult<Vec<ExchangeRatePoint>> {
        let rows = sqlx::query("SELECT date, rate, source FROM exchange_rates ORDER BY date DESC")
            .fetch_all(&self.pool)
            .await?;

        rows.iter()
            .map(|row| -> StoreResult<ExchangeRatePoint> {
                let date: String = row.try_get("date")?;
                let rate: f64 = row.try_get("rate")?;
                let source: String = row.try_get("source")?;
                let date = chrono::NaiveDate::parse_from_str(&date, DATE_FORMAT)
                    .map_err(|e| crate::store::StoreError::Data(format!("bad date '{}': {}", date, e)))?;
                ExchangeRatePoint::new(date, rate, source).map_err(|e| crate::store::StoreError::Data(e.to_string()))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::StoreError;
    use chrono::NaiveDate;

    async fn memory_store() -> SqliteRateStore {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        SqliteRateStore::from_pool(pool).await.unwrap()
    }

    fn point(d: u32, rate: f64) -> ExchangeRatePoint {
        ExchangeRatePoint::new(NaiveDate::from_ymd_opt(2025, 7, d).unwrap(), rate, "banxico").unwrap()
    }

    #[tokio::test]
    async fn test_empty_store() {
        let store = memory_store().await;
        assert!(store.ping().await.unwrap());
        assert!(store.all_rates().await.unwrap().is_empty());
        assert_eq!(store.save_rates(&[]).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_save_is_upsert_by_date() {
        let store = memory_store().await;
        let written = store
            .save_rates(&[point(16, 18.60), point(18, 18.70), point(17, 18.65)])
            .await
            .unwrap();
        assert_eq!(written, 3);

        store.save_rates(&[point(18, 18.75)]).await.unwrap();

        let rates = store.all_rates().await.unwrap();
        assert_eq!(rates, vec![point(18, 18.75), point(17, 18.65), point(16, 18.60)]);
    }

    #[tokio::test]
    async fn test_corrupt_row_is_data_error() {
        let store = memory_store().await;
        sqlx::query(
            "INSERT INTO exchange_rates (date, rate, source, created_at, updated_at)
             VALUES ('2025-07-18', -1.0, 'banxico', 'now', 'now')",
        )
        .execute(&store.pool)
        .await
        .unwrap();

        assert!(matches!(store.all_rates().await, Err(StoreError::Data(_))));
    }
}
