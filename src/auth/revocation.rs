//! Token Revocation
//! Mission: Remember logged-out token ids until the tokens would have expired anyway
//!
//! Revocations live in an expiring key-existence cache. Losing the cache
//! (e.g. on restart) re-admits revoked but unexpired tokens; that is accepted.

use crate::errors::AuthError;
use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Expiring key/value cache backing the revocation store
#[async_trait]
pub trait CacheBackend: Send + Sync {
    /// Upsert `key`, replacing any previous value and expiry.
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<()>;

    /// Whether `key` is present and not yet expired.
    async fn exists(&self, key: &str) -> Result<bool>;
}

struct CacheEntry {
    value: String,
    expires_at: Instant,
}

/// In-process cache with per-key TTL
#[derive(Default)]
pub struct MemoryCache {
    entries: Mutex<HashMap<String, CacheEntry>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop expired entries (call from a background task). Returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let mut entries = self.entries.lock();
        let now = Instant::now();
        let before = entries.len();

        entries.retain(|_, entry| entry.expires_at > now);

        before - entries.len()
    }

    /// Value stored under `key`, if still live.
    #[cfg(test)]
    pub fn get(&self, key: &str) -> Option<String> {
        let entries = self.entries.lock();
        entries
            .get(key)
            .filter(|entry| entry.expires_at > Instant::now())
            .map(|entry| entry.value.clone())
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

#[async_trait]
impl CacheBackend for MemoryCache {
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<()> {
        let mut entries = self.entries.lock();
        entries.insert(
            key.to_string(),
            CacheEntry {
                value: value.to_string(),
                expires_at: Instant::now() + ttl,
            },
        );
        Ok(())
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        let mut entries = self.entries.lock();
        let now = Instant::now();

        let live = match entries.get(key) {
            Some(entry) => entry.expires_at > now,
            None => return Ok(false),
        };

        // Lazy eviction
        if !live {
            entries.remove(key);
        }
        Ok(live)
    }
}

/// Denylist of revoked token ids
#[derive(Clone)]
pub struct RevocationStore {
    cache: Arc<dyn CacheBackend>,
}

impl RevocationStore {
    pub fn new(cache: Arc<dyn CacheBackend>) -> Self {
        Self { cache }
    }

    fn key(token_id: &str) -> String {
        format!("jwt:revoked:{}", token_id)
    }

    /// Mark `token_id` revoked until `expires_at` (unix seconds). Idempotent.
    pub async fn revoke(&self, token_id: &str, expires_at: i64) -> Result<(), AuthError> {
        let remaining = (expires_at - Utc::now().timestamp()).max(1) as u64;

        self.cache
            .set(&Self::key(token_id), "revoked", Duration::from_secs(remaining))
            .await?;

        info!("Revoked token {} for {}s", token_id, remaining);
        Ok(())
    }

    pub async fn is_revoked(&self, token_id: &str) -> Result<bool, AuthError> {
        let revoked = self.cache.exists(&Self::key(token_id)).await?;
        if revoked {
            debug!("Token {} is revoked", token_id);
        }
        Ok(revoked)
    }
}
