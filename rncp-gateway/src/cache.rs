//! Layered cache
//!
//! Per-user snapshots of upstream data governed by two windows:
//! - TTL (default 7 days): older entries are a miss and are evicted on read
//! - cooldown (default 10 minutes): younger entries must be served even when
//!   the caller asked for a refresh
//!
//! Payloads are stored as JSON values. The cache never fails: an entry that
//! no longer decodes into the requested type is logged, evicted and reported
//! as a miss.

use dashmap::DashMap;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::keys::CacheKey;

// ============================================================================
// Configuration
// ============================================================================

#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Entries older than this are a miss (default: 7 days)
    pub ttl: Duration,
    /// Entries younger than this ignore refresh requests (default: 10 minutes)
    pub cooldown: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(7 * 24 * 60 * 60), // 7 days
            cooldown: Duration::from_secs(10 * 60),     // 10 minutes
        }
    }
}

// ============================================================================
// Entries and statistics
// ============================================================================

struct CacheEntry {
    payload: Value,
    stored_at: Instant,
}

/// A cached payload and how old it is
#[derive(Debug, Clone, PartialEq)]
pub struct CacheHit<T> {
    pub payload: T,
    pub age: Duration,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub entries: usize,
    pub hits: u64,
    pub misses: u64,
    pub sets: u64,
    /// Entries dropped because they outlived the TTL
    pub expirations: u64,
    /// Entries dropped because they no longer decode
    pub corrupt: u64,
}

impl CacheStats {
    /// Hit rate as percentage
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            (self.hits as f64 / total as f64) * 100.0
        }
    }
}

// ============================================================================
// Cache
// ============================================================================

/// Thread-safe TTL + cooldown cache. Concurrent reads are lock-free per key;
/// a write replaces the whole entry.
pub struct LayeredCache {
    entries: DashMap<String, CacheEntry>,
    hits: AtomicU64,
    misses: AtomicU64,
    sets: AtomicU64,
    expirations: AtomicU64,
    corrupt: AtomicU64,
    config: CacheConfig,
}

impl LayeredCache {
    pub fn new(config: CacheConfig) -> Self {
        info!(
            ttl_secs = config.ttl.as_secs(),
            cooldown_secs = config.cooldown.as_secs(),
            "LayeredCache initialized"
        );

        Self {
            entries: DashMap::new(),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            sets: AtomicU64::new(0),
            expirations: AtomicU64::new(0),
            corrupt: AtomicU64::new(0),
            config,
        }
    }

    pub fn with_defaults() -> Self {
        Self::new(CacheConfig::default())
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Payload and age, or `None` on a miss (absent, expired or undecodable).
    pub fn get<T: DeserializeOwned>(&self, key: &CacheKey) -> Option<CacheHit<T>> {
        let storage_key = key.to_storage_key();

        let lookup = self
            .entries
            .get(&storage_key)
            .map(|entry| (entry.payload.clone(), entry.stored_at.elapsed()));

        let Some((payload, age)) = lookup else {
            self.misses.fetch_add(1, Ordering::Relaxed);
            debug!(key = %storage_key, "Cache miss");
            return None;
        };

        if age >= self.config.ttl {
            self.entries.remove(&storage_key);
            self.expirations.fetch_add(1, Ordering::Relaxed);
            self.misses.fetch_add(1, Ordering::Relaxed);
            debug!(key = %storage_key, age_secs = age.as_secs(), "Cache entry expired");
            return None;
        }

        match serde_json::from_value::<T>(payload) {
            Ok(payload) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                debug!(key = %storage_key, age_secs = age.as_secs(), "Cache hit");
                Some(CacheHit { payload, age })
            }
            Err(e) => {
                self.entries.remove(&storage_key);
                self.corrupt.fetch_add(1, Ordering::Relaxed);
                self.misses.fetch_add(1, Ordering::Relaxed);
                warn!(key = %storage_key, error = %e, "Corrupt cache entry, treating as miss");
                None
            }
        }
    }

    /// Store a payload, replacing any previous entry and resetting its age.
    pub fn set<T: Serialize>(&self, key: &CacheKey, payload: &T) {
        let storage_key = key.to_storage_key();
        let payload = match serde_json::to_value(payload) {
            Ok(value) => value,
            Err(e) => {
                warn!(key = %storage_key, error = %e, "Payload not cacheable, skipping");
                return;
            }
        };

        self.entries.insert(
            storage_key.clone(),
            CacheEntry {
                payload,
                stored_at: Instant::now(),
            },
        );
        self.sets.fetch_add(1, Ordering::Relaxed);
        debug!(key = %storage_key, "Cache set");
    }

    /// Store a raw JSON value as-is.
    pub fn set_raw(&self, key: &CacheKey, payload: Value) {
        self.entries.insert(
            key.to_storage_key(),
            CacheEntry {
                payload,
                stored_at: Instant::now(),
            },
        );
        self.sets.fetch_add(1, Ordering::Relaxed);
    }

    /// Age of the entry, if present (expired entries included).
    pub fn age(&self, key: &CacheKey) -> Option<Duration> {
        self.entries
            .get(&key.to_storage_key())
            .map(|entry| entry.stored_at.elapsed())
    }

    /// Whether an entry exists and is younger than the cooldown floor.
    pub fn is_within_cooldown(&self, key: &CacheKey) -> bool {
        self.age(key).is_some_and(|age| age < self.config.cooldown)
    }

    /// Drop every entry older than the TTL. Returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let ttl = self.config.ttl;
        let before = self.entries.len();
        self.entries.retain(|_, entry| entry.stored_at.elapsed() < ttl);
        let removed = before.saturating_sub(self.entries.len());
        self.expirations.fetch_add(removed as u64, Ordering::Relaxed);
        if removed > 0 {
            debug!(removed, "Expired cache entries purged");
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self.entries.len(),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            sets: self.sets.load(Ordering::Relaxed),
            expirations: self.expirations.load(Ordering::Relaxed),
            corrupt: self.corrupt.load(Ordering::Relaxed),
        }
    }
}

impl Default for LayeredCache {
    fn default() -> Self {
        Self::with_defaults()
    }
}
