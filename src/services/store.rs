use crate::models::{CustomLocation, GeoPoint, LocationPreference};
use async_trait::async_trait;
use redis::aio::ConnectionManager;
use serde::{de::DeserializeOwned, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::RwLock;

/// Errors that can occur with store operations
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Redis error: {0}")]
    RedisError(#[from] redis::RedisError),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

/// String key/value storage with get/set/remove semantics.
///
/// Unknown keys read as `Ok(None)`.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;
    async fn set(&self, key: &str, value: String) -> Result<(), StoreError>;
    async fn remove(&self, key: &str) -> Result<(), StoreError>;
}

/// Process-local store, used by default and in tests
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: String) -> Result<(), StoreError> {
        self.entries.write().await.insert(key.to_string(), value);
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.entries.write().await.remove(key);
        Ok(())
    }
}

/// Two-tier store
///
/// L1 is an in-memory moka cache with a TTL, L2 is Redis and holds the
/// durable copy. Reads go L1 first and back-fill it from L2.
pub struct RedisStore {
    // ConnectionManager behind a Mutex for interior mutability
    redis: Arc<tokio::sync::Mutex<ConnectionManager>>,
    l1_cache: moka::future::Cache<String, String>,
}

impl RedisStore {
    /// Connect to Redis and build the L1 tier
    pub async fn new(redis_url: &str, l1_size: u64, l1_ttl_secs: u64) -> Result<Self, StoreError> {
        let client = redis::Client::open(redis_url)?;
        let redis = ConnectionManager::new(client).await?;

        let l1_cache = moka::future::CacheBuilder::new(l1_size)
            .time_to_live(Duration::from_secs(l1_ttl_secs))
            .build();

        Ok(Self {
            redis: Arc::new(tokio::sync::Mutex::new(redis)),
            l1_cache,
        })
    }
}

#[async_trait]
impl KeyValueStore for RedisStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        if let Some(value) = self.l1_cache.get(key).await {
            tracing::trace!("L1 store hit: {}", key);
            return Ok(Some(value));
        }

        let mut conn = self.redis.lock().await;
        let value: Option<String> = redis::cmd("GET")
            .arg(key)
            .query_async(&mut *conn)
            .await?;
        drop(conn);

        if let Some(value) = &value {
            tracing::trace!("L2 store hit: {}", key);
            self.l1_cache.insert(key.to_string(), value.clone()).await;
        }

        Ok(value)
    }

    async fn set(&self, key: &str, value: String) -> Result<(), StoreError> {
        self.l1_cache.insert(key.to_string(), value.clone()).await;

        let mut conn = self.redis.lock().await;
        let _: () = redis::cmd("SET")
            .arg(key)
            .arg(value)
            .query_async(&mut *conn)
            .await?;

        tracing::trace!("Store set: {}", key);
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.l1_cache.invalidate(key).await;

        let mut conn = self.redis.lock().await;
        let _: () = redis::cmd("DEL")
            .arg(key)
            .query_async(&mut *conn)
            .await?;
        Ok(())
    }
}

/// Prefixes every key with a user namespace
pub struct ScopedStore {
    inner: Arc<dyn KeyValueStore>,
    prefix: String,
}

impl ScopedStore {
    pub fn for_user(inner: Arc<dyn KeyValueStore>, user_id: &str) -> Self {
        Self {
            inner,
            prefix: StoreKey::user_prefix(user_id),
        }
    }

    fn scoped(&self, key: &str) -> String {
        format!("{}{}", self.prefix, key)
    }
}

#[async_trait]
impl KeyValueStore for ScopedStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        self.inner.get(&self.scoped(key)).await
    }

    async fn set(&self, key: &str, value: String) -> Result<(), StoreError> {
        self.inner.set(&self.scoped(key), value).await
    }

    async fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.inner.remove(&self.scoped(key)).await
    }
}

/// Store key builder
pub struct StoreKey;

impl StoreKey {
    pub const LOCATION_SETTINGS: &'static str = "locationSettings";
    pub const CUSTOM_LOCATION: &'static str = "customLocation";
    pub const CURRENT_LOCATION: &'static str = "currentLocation";

    /// Namespace for one user's keys
    pub fn user_prefix(user_id: &str) -> String {
        format!("user:{}:", user_id)
    }
}

/// Typed access to the three location keys.
///
/// Reads never fail: a missing, unreadable or malformed value is logged and
/// read as absent. Writes are fire-and-forget.
#[derive(Clone)]
pub struct LocationStore {
    store: Arc<dyn KeyValueStore>,
}

impl LocationStore {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Stored preference, defaulting to "use current location"
    pub async fn preference(&self) -> LocationPreference {
        self.read_json(StoreKey::LOCATION_SETTINGS)
            .await
            .unwrap_or_default()
    }

    /// `None` when the preference has never been written
    pub async fn stored_preference(&self) -> Option<LocationPreference> {
        self.read_json(StoreKey::LOCATION_SETTINGS).await
    }

    pub async fn set_preference(&self, preference: LocationPreference) {
        self.write_json(StoreKey::LOCATION_SETTINGS, &preference).await;
    }

    pub async fn custom_location(&self) -> Option<CustomLocation> {
        self.read_json(StoreKey::CUSTOM_LOCATION).await
    }

    pub async fn set_custom_location(&self, location: &CustomLocation) {
        self.write_json(StoreKey::CUSTOM_LOCATION, location).await;
    }

    pub async fn clear_custom_location(&self) {
        if let Err(e) = self.store.remove(StoreKey::CUSTOM_LOCATION).await {
            tracing::warn!("Failed to remove {}: {}", StoreKey::CUSTOM_LOCATION, e);
        }
    }

    /// Last resolved search center
    pub async fn last_known(&self) -> Option<GeoPoint> {
        self.read_json(StoreKey::CURRENT_LOCATION).await
    }

    pub async fn set_last_known(&self, point: GeoPoint) {
        self.write_json(StoreKey::CURRENT_LOCATION, &point).await;
    }

    async fn read_json<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let raw = match self.store.get(key).await {
            Ok(raw) => raw?,
            Err(e) => {
                tracing::warn!("Failed to read {}: {}", key, e);
                return None;
            }
        };

        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!("Ignoring malformed value under {}: {}", key, e);
                None
            }
        }
    }

    async fn write_json<T: Serialize>(&self, key: &str, value: &T) {
        let json = match serde_json::to_string(value) {
            Ok(json) => json,
            Err(e) => {
                tracing::warn!("Failed to serialize {}: {}", key, e);
                return;
            }
        };

        if let Err(e) = self.store.set(key, json).await {
            tracing::warn!("Failed to write {}: {}", key, e);
        }
    }
}
