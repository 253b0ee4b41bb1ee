use redis::AsyncCommands;
use redis::Client;
use std::fmt::Display;
use tokio::sync::mpsc;

use crate::error::AppError;
use crate::error::AppResult;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CacheKey {
    Genres,
    MovieDetails(String),
}

impl Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CacheKey::Genres => write!(f, "catalog:genres"),
            CacheKey::MovieDetails(guid) => write!(f, "catalog:details:{}", guid),
        }
    }
}

/// Creates a Redis client for caching
///
/// Opening the client does not connect; the first cache access does.
pub fn create_redis_client(redis_url: &str) -> anyhow::Result<Client> {
    let client = Client::open(redis_url)?;
    Ok(client)
}

/// Message for asynchronous cache writes
struct PendingWrite {
    key: String,
    value: String,
    ttl: u64,
}

/// Cache handler for storing and retrieving catalog data from Redis
///
/// A disabled cache always misses and drops writes, for clients that run
/// without Redis.
#[derive(Clone)]
pub struct Cache {
    redis_client: Option<Client>,
    write_tx: Option<mpsc::UnboundedSender<PendingWrite>>,
}

/// Handle for gracefully shutting down the cache writer
pub struct CacheWriterHandle {
    shutdown_tx: mpsc::Sender<()>,
}

impl CacheWriterHandle {
    /// Signals the writer task to flush pending writes and stop
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(()).await;
        tracing::info!("Cache writer shutdown signal sent");
    }
}

impl Cache {
    /// Creates a new Cache instance with an async write background task
    ///
    /// Writes are queued on a channel and applied by a spawned task so that
    /// cache population never delays a response.
    pub async fn new(redis_client: Client) -> (Self, CacheWriterHandle) {
        let (write_tx, write_rx) = mpsc::unbounded_channel();
        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);

        let client = redis_client.clone();
        tokio::spawn(async move {
            Self::cache_writer_task(client, write_rx, shutdown_rx).await;
        });

        let cache = Self {
            redis_client: Some(redis_client),
            write_tx: Some(write_tx),
        };

        let handle = CacheWriterHandle { shutdown_tx };

        (cache, handle)
    }

    /// A cache that never hits and never writes
    pub fn disabled() -> Self {
        Self {
            redis_client: None,
            write_tx: None,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.redis_client.is_some()
    }

    /// Background task that processes cache write messages
    ///
    /// On shutdown signal, flushes all remaining messages before exiting.
    async fn cache_writer_task(
        client: Client,
        mut write_rx: mpsc::UnboundedReceiver<PendingWrite>,
        mut shutdown_rx: mpsc::Receiver<()>,
    ) {
        tracing::info!("Cache writer task started");
        let mut pending_writes = 0;

        loop {
            tokio::select! {
                Some(msg) = write_rx.recv() => {
                    pending_writes += 1;
                    if let Err(e) = Self::write_to_redis(&client, msg).await {
                        tracing::error!(error = %e, "Failed to write to Redis cache");
                    } else {
                        pending_writes -= 1;
                    }
                }
                _ = shutdown_rx.recv() => {
                    tracing::info!(pending = pending_writes, "Cache writer shutting down, flushing remaining writes");

                    write_rx.close();
                    while let Some(msg) = write_rx.recv().await {
                        if let Err(e) = Self::write_to_redis(&client, msg).await {
                            tracing::error!(error = %e, "Failed to flush cache write during shutdown");
                        }
                    }

                    tracing::info!("Cache writer task stopped");
                    break;
                }
            }
        }
    }

    /// Writes a single message to Redis
    async fn write_to_redis(client: &Client, msg: PendingWrite) -> AppResult<()> {
        let mut conn = client.get_multiplexed_async_connection().await?;
        let _: () = conn.set_ex(msg.key, msg.value, msg.ttl).await?;
        Ok(())
    }

    /// Looks up a cached catalog value
    ///
    /// Returns `None` on a miss or when the cache is disabled. An unreachable
    /// Redis is logged and counts as a miss so catalog lookups still work.
    pub async fn get_from_cache<T: serde::de::DeserializeOwned>(
        &self,
        key: &CacheKey,
    ) -> AppResult<Option<T>> {
        let Some(client) = &self.redis_client else {
            return Ok(None);
        };

        let cached: Option<String> = match Self::read_from_redis(client, key).await {
            Ok(cached) => cached,
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "Cache read failed, treating as miss");
                return Ok(None);
            }
        };

        let Some(json) = cached else {
            tracing::debug!(key = %key, "Cache miss");
            return Ok(None);
        };

        let data = serde_json::from_str(&json)
            .map_err(|e| AppError::Internal(format!("Cache deserialization error: {}", e)))?;
        tracing::debug!(key = %key, "Cache hit");
        Ok(Some(data))
    }

    async fn read_from_redis(client: &Client, key: &CacheKey) -> AppResult<Option<String>> {
        let mut conn = client.get_multiplexed_async_connection().await?;
        let cached = conn.get::<_, Option<String>>(key.to_string()).await?;
        Ok(cached)
    }

    /// Queues a value for storage without waiting for Redis
    pub fn set_in_background<T: serde::Serialize>(&self, key: &CacheKey, value: &T, ttl: u64) {
        let Some(write_tx) = &self.write_tx else {
            return;
        };

        let json = match serde_json::to_string(value) {
            Ok(j) => j,
            Err(e) => {
                tracing::error!(error = %e, "Cache serialization error");
                return;
            }
        };

        let msg = PendingWrite {
            key: key.to_string(),
            value: json,
            ttl,
        };

        if let Err(e) = write_tx.send(msg) {
            tracing::error!(error = %e, "Failed to send cache write message");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn redis_url() -> String {
        std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://localhost:6379".to_string())
    }

    #[test]
    fn test_cache_key_display_genres() {
        assert_eq!(format!("{}", CacheKey::Genres), "catalog:genres");
    }

    #[test]
    fn test_cache_key_display_movie_details() {
        let key = CacheKey::MovieDetails("5d776b59ad5437001f79c6f8".to_string());
        assert_eq!(format!("{}", key), "catalog:details:5d776b59ad5437001f79c6f8");
    }

    #[tokio::test]
    async fn test_disabled_cache_always_misses() {
        let cache = Cache::disabled();
        assert!(!cache.is_enabled());

        cache.set_in_background(&CacheKey::Genres, &vec!["Drama".to_string()], 60);
        let retrieved: Option<Vec<String>> = cache.get_from_cache(&CacheKey::Genres).await.unwrap();

        assert_eq!(retrieved, None);
    }

    #[tokio::test]
    #[ignore = "requires a running Redis"]
    async fn test_set_in_background_writes_to_cache() {
        let client = create_redis_client(&redis_url()).unwrap();
        let (cache, _handle) = Cache::new(client.clone()).await;

        let key = CacheKey::MovieDetails("test_async_write".to_string());
        let value = vec!["item1".to_string(), "item2".to_string()];

        cache.set_in_background(&key, &value, 60);
        tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;

        let retrieved: Option<Vec<String>> = cache.get_from_cache(&key).await.unwrap();
        assert_eq!(retrieved, Some(value));

        let mut conn = client.get_multiplexed_async_connection().await.unwrap();
        let _: () = conn.del(format!("{}", key)).await.unwrap();
    }

    #[tokio::test]
    #[ignore = "requires a running Redis"]
    async fn test_cache_writer_graceful_shutdown() {
        let client = create_redis_client(&redis_url()).unwrap();
        let (cache, handle) = Cache::new(client.clone()).await;

        let key = CacheKey::MovieDetails("test_shutdown".to_string());
        let value = vec!["shutdown_test".to_string()];

        cache.set_in_background(&key, &value, 60);
        handle.shutdown().await;
        tokio::time::sleep(tokio::time::Duration::from_millis(50)).await;

        let retrieved: Option<Vec<String>> = cache.get_from_cache(&key).await.unwrap();
        assert_eq!(retrieved, Some(value));

        let mut conn = client.get_multiplexed_async_connection().await.unwrap();
        let _: () = conn.del(format!("{}", key)).await.unwrap();
    }
}
