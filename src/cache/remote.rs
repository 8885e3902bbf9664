//! Redis-backed cache store.
//!
//! # Responsibilities
//! - Establish the multiplexed connection lazily (construction never dials)
//! - Bound every round trip by the configured timeout
//! - Drop the connection after any failure so the next call reconnects

use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::AsyncCommands;
use std::future::Future;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::timeout;

use crate::cache::{CacheError, CacheResult, CacheStore};

impl From<redis::RedisError> for CacheError {
    fn from(err: redis::RedisError) -> Self {
        CacheError::Backend(err.to_string())
    }
}

/// Remote cache over a single shared Redis connection.
pub struct RedisCache {
    client: redis::Client,
    connection: Mutex<Option<MultiplexedConnection>>,
    op_timeout: Duration,
}

impl RedisCache {
    /// Parse the URL. No network traffic happens here.
    pub fn new(url: &str, op_timeout: Duration) -> CacheResult<Self> {
        let client = redis::Client::open(url)?;
        Ok(Self {
            client,
            connection: Mutex::new(None),
            op_timeout,
        })
    }

    async fn connection(&self) -> CacheResult<MultiplexedConnection> {
        let mut slot = self.connection.lock().await;
        if let Some(conn) = slot.as_ref() {
            return Ok(conn.clone());
        }

        let conn = timeout(self.op_timeout, self.client.get_multiplexed_async_connection())
            .await
            .map_err(|_| CacheError::Timeout(self.op_timeout))??;
        tracing::debug!("Redis connection established");

        *slot = Some(conn.clone());
        Ok(conn)
    }

    async fn run<T, F, Fut>(&self, op: F) -> CacheResult<T>
    where
        F: FnOnce(MultiplexedConnection) -> Fut,
        Fut: Future<Output = redis::RedisResult<T>>,
    {
        let conn = self.connection().await?;
        let result = match timeout(self.op_timeout, op(conn)).await {
            Ok(Ok(value)) => return Ok(value),
            Ok(Err(e)) => CacheError::from(e),
            Err(_) => CacheError::Timeout(self.op_timeout),
        };

        *self.connection.lock().await = None;
        Err(result)
    }
}

#[async_trait]
impl CacheStore for RedisCache {
    fn backend(&self) -> &'static str {
        "redis"
    }

    async fn get(&self, key: &str) -> CacheResult<Option<String>> {
        let key = key.to_string();
        self.run(|mut conn| async move {
            let value: Option<String> = conn.get(&key).await?;
            Ok(value)
        })
        .await
    }

    async fn set_with_expiry(&self, key: &str, value: &str, ttl: Duration) -> CacheResult<bool> {
        let key = key.to_string();
        let value = value.to_string();
        let seconds = ttl.as_secs().max(1);
        self.run(|mut conn| async move {
            let _: () = conn.set_ex(&key, &value, seconds).await?;
            Ok(true)
        })
        .await
    }

    async fn ping(&self) -> CacheResult<bool> {
        self.run(|mut conn| async move {
            let pong: String = redis::cmd("PING").query_async(&mut conn).await?;
            Ok(pong.eq_ignore_ascii_case("PONG"))
        })
        .await
    }
}
