//! Durable rate store.
//!
//! # Responsibilities
//! - Keep a dated record of every point fetched from the provider
//!
//! # Design Decisions
//! - Writes are upserts keyed by date, so re-fetching a window is idempotent
//! - The service only writes here; reads go through cache and provider

pub mod sqlite;

use async_trait::async_trait;
use thiserror::Error;

use crate::rates::types::ExchangeRatePoint;

pub use sqlite::SqliteRateStore;

/// Errors raised by the store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(String),

    #[error("corrupt row: {0}")]
    Data(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        StoreError::Database(err.to_string())
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Persistence for daily exchange rate points.
#[async_trait]
pub trait RateStore: Send + Sync {
    /// Upsert many points atomically, replacing existing points with the
    /// same date. Returns the number written.
    async fn save_rates(&self, points: &[ExchangeRatePoint]) -> StoreResult<usize>;

    async fn ping(&self) -> StoreResult<bool>;
}
