//! URL-keyed recipe cache over a key-value store.

use async_trait::async_trait;
use log::{debug, warn};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::RwLock;
use tokio::time::Instant;

use crate::model::ParsedRecipe;

pub const CACHE_KEY_PREFIX: &str = "recipe:";

/// One day
pub const CACHE_TTL: Duration = Duration::from_secs(86_400);

#[derive(Error, Debug)]
pub enum CacheError {
    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("cached value is not a recipe: {0}")]
    Corrupt(#[from] serde_json::Error),
}

/// Minimal key-value store with per-entry expiry.
#[async_trait]
pub trait KvStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError>;
    async fn put(&self, key: &str, value: String, ttl: Duration) -> Result<(), CacheError>;
}

/// In-process store; expired entries are dropped on read and swept on write.
#[derive(Default)]
pub struct MemoryKvStore {
    entries: RwLock<HashMap<String, (String, Instant)>>,
}

impl MemoryKvStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KvStore for MemoryKvStore {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        {
            let entries = self.entries.read().await;
            match entries.get(key) {
                Some((value, expires_at)) if *expires_at > Instant::now() => {
                    return Ok(Some(value.clone()))
                }
                Some(_) => {}
                None => return Ok(None),
            }
        }
        self.entries.write().await.remove(key);
        Ok(None)
    }

    async fn put(&self, key: &str, value: String, ttl: Duration) -> Result<(), CacheError> {
        let now = Instant::now();
        let mut entries = self.entries.write().await;
        entries.retain(|_, (_, expires_at)| *expires_at > now);
        entries.insert(key.to_string(), (value, now + ttl));
        Ok(())
    }
}

/// `"recipe:" + hex(sha256(lowercased url))`. Nothing but case is
/// normalized, so query-string variants are distinct entries.
pub fn cache_key(url: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(url.to_lowercase().as_bytes());
    format!("{}{:x}", CACHE_KEY_PREFIX, hasher.finalize())
}

pub async fn cache_recipe(
    store: &dyn KvStore,
    url: &str,
    recipe: &ParsedRecipe,
) -> Result<(), CacheError> {
    let value = serde_json::to_string(recipe)?;
    store.put(&cache_key(url), value, CACHE_TTL).await
}

pub async fn get_cached_recipe(
    store: &dyn KvStore,
    url: &str,
) -> Result<Option<ParsedRecipe>, CacheError> {
    match store.get(&cache_key(url)).await? {
        Some(value) => Ok(Some(serde_json::from_str(&value)?)),
        None => Ok(None),
    }
}

/// Cache read where any failure counts as a miss.
pub(crate) async fn lookup(store: &dyn KvStore, url: &str) -> Option<ParsedRecipe> {
    match get_cached_recipe(store, url).await {
        Ok(Some(recipe)) => {
            debug!("Cache hit for {}", url);
            Some(recipe)
        }
        Ok(None) => {
            debug!("Cache miss for {}", url);
            None
        }
        Err(e) => {
            warn!("Cache read failed for {}, treating as miss: {}", url, e);
            None
        }
    }
}

/// Cache write that only logs failures.
pub(crate) async fn write_through(store: &dyn KvStore, url: &str, recipe: &ParsedRecipe) {
    if let Err(e) = cache_recipe(store, url, recipe).await {
        warn!("Failed to cache recipe for {}: {}", url, e);
    }
}
