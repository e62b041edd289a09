//! Embedding cache.
//!
//! Re-embedding unchanged text is the most expensive no-op in the pipeline,
//! so embeddings are cached under SHA-256(text | model). Keys are
//! model-qualified because different models produce different vectors for
//! the same text.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::types::Result;

// ============================================================================
// Cache Types
// ============================================================================

/// Cache performance counters.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    /// Approximate size in bytes.
    pub size_bytes: u64,
    pub entry_count: usize,
    pub evictions: u64,
}

impl CacheStats {
    /// Hit rate as a percentage.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            (self.hits as f64 / total as f64) * 100.0
        }
    }
}

/// Configuration for the embedding cache.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Maximum cache size in bytes.
    #[serde(default = "default_max_size_bytes")]
    pub max_size_bytes: u64,

    /// Default TTL for entries (None = no expiry).
    #[serde(default)]
    pub default_ttl: Option<Duration>,

    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_max_size_bytes() -> u64 {
    256 * 1024 * 1024
}

fn default_enabled() -> bool {
    true
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_size_bytes: default_max_size_bytes(),
            default_ttl: None,
            enabled: default_enabled(),
        }
    }
}

// ============================================================================
// Cache Trait
// ============================================================================

/// Interface for embedding caches.
pub trait EmbeddingCache: Send + Sync {
    /// Look up an embedding.
    fn get(&self, key: &str) -> Option<Vec<f32>>;

    /// Store an embedding with an optional TTL override.
    fn set(&self, key: &str, embedding: Vec<f32>, ttl: Option<Duration>) -> Result<()>;

    /// Remove one entry.
    fn invalidate(&self, key: &str) -> Result<()>;

    /// Drop every entry.
    fn clear(&self) -> Result<()>;

    /// Current counters.
    fn stats(&self) -> CacheStats;

    /// Cache key for a text/model pair.
    fn compute_key(&self, text: &str, model: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(text.as_bytes());
        hasher.update(b"|");
        hasher.update(model.as_bytes());
        format!("{:x}", hasher.finalize())
    }

    /// Whether lookups can ever hit.
    fn is_enabled(&self) -> bool;
}

// ============================================================================
// LRU Cache
// ============================================================================

#[derive(Debug, Clone)]
struct CacheEntry {
    embedding: Vec<f32>,
    last_accessed: Instant,
    expires_at: Option<Instant>,
    size_bytes: usize,
}

impl CacheEntry {
    fn new(embedding: Vec<f32>, ttl: Option<Duration>) -> Self {
        let now = Instant::now();
        let size_bytes = embedding.len() * std::mem::size_of::<f32>();
        Self {
            embedding,
            last_accessed: now,
            expires_at: ttl.map(|d| now + d),
            size_bytes,
        }
    }

    fn is_expired(&self) -> bool {
        self.expires_at
            .map(|exp| Instant::now() > exp)
            .unwrap_or(false)
    }

    fn touch(&mut self) {
        self.last_accessed = Instant::now();
    }
}

/// In-memory LRU cache, byte-bounded.
///
/// When an insertion would exceed `max_size_bytes`, least-recently-used
/// entries are evicted until it fits.
pub struct LruEmbeddingCache {
    cache: RwLock<HashMap<String, CacheEntry>>,
    config: CacheConfig,
    current_size: AtomicU64,
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
}

impl LruEmbeddingCache {
    pub fn new(config: CacheConfig) -> Self {
        Self {
            cache: RwLock::new(HashMap::new()),
            config,
            current_size: AtomicU64::new(0),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
        }
    }

    pub fn with_defaults() -> Self {
        Self::new(CacheConfig::default())
    }

    pub fn with_max_size(max_size_bytes: u64) -> Self {
        Self::new(CacheConfig {
            max_size_bytes,
            ..Default::default()
        })
    }

    fn evict_lru(&self, needed_bytes: usize) {
        let mut cache = self.cache.write();
        let target_size = self
            .config
            .max_size_bytes
            .saturating_sub(needed_bytes as u64);

        while self.current_size.load(Ordering::Relaxed) > target_size && !cache.is_empty() {
            let lru_key = cache
                .iter()
                .min_by_key(|(_, entry)| entry.last_accessed)
                .map(|(key, _)| key.clone());

            match lru_key {
                Some(key) => {
                    if let Some(entry) = cache.remove(&key) {
                        self.current_size
                            .fetch_sub(entry.size_bytes as u64, Ordering::Relaxed);
                        self.evictions.fetch_add(1, Ordering::Relaxed);
                    }
                }
                None => break,
            }
        }
    }

    /// Drop expired entries.
    pub fn cleanup_expired(&self) {
        let mut cache = self.cache.write();
        let expired: Vec<String> = cache
            .iter()
            .filter(|(_, entry)| entry.is_expired())
            .map(|(key, _)| key.clone())
            .collect();

        for key in expired {
            if let Some(entry) = cache.remove(&key) {
                self.current_size
                    .fetch_sub(entry.size_bytes as u64, Ordering::Relaxed);
            }
        }
    }

    pub fn size_bytes(&self) -> u64 {
        self.current_size.load(Ordering::Relaxed)
    }

    pub fn len(&self) -> usize {
        self.cache.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.read().is_empty()
    }
}

impl EmbeddingCache for LruEmbeddingCache {
    fn get(&self, key: &str) -> Option<Vec<f32>> {
        if !self.config.enabled {
            return None;
        }

        let mut cache = self.cache.write();
        match cache.get_mut(key) {
            Some(entry) if entry.is_expired() => {
                cache.remove(key);
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
            Some(entry) => {
                entry.touch();
                self.hits.fetch_add(1, Ordering::Relaxed);
                Some(entry.embedding.clone())
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    fn set(&self, key: &str, embedding: Vec<f32>, ttl: Option<Duration>) -> Result<()> {
        if !self.config.enabled {
            return Ok(());
        }

        let entry = CacheEntry::new(embedding, ttl.or(self.config.default_ttl));
        let entry_size = entry.size_bytes;

        if self.current_size.load(Ordering::Relaxed) + entry_size as u64
            > self.config.max_size_bytes
        {
            self.evict_lru(entry_size);
        }

        let mut cache = self.cache.write();
        if let Some(old_entry) = cache.remove(key) {
            self.current_size
                .fetch_sub(old_entry.size_bytes as u64, Ordering::Relaxed);
        }

        self.current_size
            .fetch_add(entry_size as u64, Ordering::Relaxed);
        cache.insert(key.to_string(), entry);

        Ok(())
    }

    fn invalidate(&self, key: &str) -> Result<()> {
        let mut cache = self.cache.write();
        if let Some(entry) = cache.remove(key) {
            self.current_size
                .fetch_sub(entry.size_bytes as u64, Ordering::Relaxed);
        }
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        self.cache.write().clear();
        self.current_size.store(0, Ordering::Relaxed);
        Ok(())
    }

    fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            size_bytes: self.current_size.load(Ordering::Relaxed),
            entry_count: self.cache.read().len(),
            evictions: self.evictions.load(Ordering::Relaxed),
        }
    }

    fn is_enabled(&self) -> bool {
        self.config.enabled
    }
}

// ============================================================================
// No-Op Cache
// ============================================================================

/// Cache that stores nothing. Disables caching without changing call sites.
#[derive(Debug, Default)]
pub struct NoOpCache;

impl NoOpCache {
    pub fn new() -> Self {
        Self
    }
}

impl EmbeddingCache for NoOpCache {
    fn get(&self, _key: &str) -> Option<Vec<f32>> {
        None
    }

    fn set(&self, _key: &str, _embedding: Vec<f32>, _ttl: Option<Duration>) -> Result<()> {
        Ok(())
    }

    fn invalidate(&self, _key: &str) -> Result<()> {
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        Ok(())
    }

    fn stats(&self) -> CacheStats {
        CacheStats::default()
    }

    fn is_enabled(&self) -> bool {
        false
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_depends_on_text_and_model() {
        let cache = LruEmbeddingCache::with_defaults();

        let key1 = cache.compute_key("hello world", "models/embedding-001");
        let key2 = cache.compute_key("hello world", "models/embedding-001");
        let key3 = cache.compute_key("hello world", "text-embedding-3-small");
        let key4 = cache.compute_key("different text", "models/embedding-001");

        assert_eq!(key1, key2);
        assert_ne!(key1, key3);
        assert_ne!(key1, key4);
    }

    #[test]
    fn set_and_get() {
        let cache = LruEmbeddingCache::with_defaults();
        let embedding = vec![1.0, 2.0, 3.0, 4.0];

        assert!(cache.get("k").is_none());
        assert_eq!(cache.stats().misses, 1);

        cache.set("k", embedding.clone(), None).unwrap();
        assert_eq!(cache.get("k").unwrap(), embedding);
        assert_eq!(cache.stats().hits, 1);
    }

    #[test]
    fn invalidate_removes_entry() {
        let cache = LruEmbeddingCache::with_defaults();
        cache.set("k", vec![1.0, 2.0], None).unwrap();
        assert!(cache.get("k").is_some());

        cache.invalidate("k").unwrap();
        assert!(cache.get("k").is_none());
    }

    #[test]
    fn clear_resets_size() {
        let cache = LruEmbeddingCache::with_defaults();
        cache.set("k1", vec![1.0, 2.0], None).unwrap();
        cache.set("k2", vec![3.0, 4.0], None).unwrap();
        assert_eq!(cache.len(), 2);
        assert!(cache.size_bytes() > 0);

        cache.clear().unwrap();
        assert_eq!(cache.len(), 0);
        assert_eq!(cache.size_bytes(), 0);
    }

    #[test]
    fn lru_eviction_drops_oldest() {
        // 8 floats fit at 32 bytes
        let cache = LruEmbeddingCache::with_max_size(32);

        cache.set("k1", vec![1.0, 2.0, 3.0, 4.0], None).unwrap();
        cache.set("k2", vec![5.0, 6.0, 7.0, 8.0], None).unwrap();
        assert!(cache.get("k1").is_some());
        assert!(cache.get("k2").is_some());

        // A third insert evicts k1, the least recently used.
        cache.set("k3", vec![9.0, 10.0, 11.0, 12.0], None).unwrap();

        assert!(cache.get("k1").is_none());
        assert!(cache.get("k2").is_some());
        assert!(cache.get("k3").is_some());
        assert!(cache.stats().evictions > 0);
    }

    #[test]
    fn ttl_expiry() {
        let cache = LruEmbeddingCache::with_defaults();
        cache
            .set("k", vec![1.0, 2.0], Some(Duration::from_nanos(1)))
            .unwrap();

        std::thread::sleep(Duration::from_millis(1));
        assert!(cache.get("k").is_none());
    }

    #[test]
    fn stats_track_activity() {
        let cache = LruEmbeddingCache::with_defaults();
        cache.set("k1", vec![1.0, 2.0], None).unwrap();
        let _ = cache.get("k1");
        let _ = cache.get("k2");
        let _ = cache.get("k3");

        let stats = cache.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 2);
        assert_eq!(stats.entry_count, 1);
        assert!((stats.hit_rate() - 100.0 / 3.0).abs() < 0.1);
    }

    #[test]
    fn disabled_cache_never_hits() {
        let cache = LruEmbeddingCache::new(CacheConfig {
            enabled: false,
            ..Default::default()
        });

        cache.set("k", vec![1.0, 2.0], None).unwrap();
        assert!(cache.get("k").is_none());
        assert!(!cache.is_enabled());
    }

    #[test]
    fn noop_cache_stores_nothing() {
        let cache = NoOpCache::new();
        cache.set("k", vec![1.0, 2.0], None).unwrap();
        assert!(cache.get("k").is_none());
        assert!(!cache.is_enabled());
    }

    #[test]
    fn updating_key_replaces_entry() {
        let cache = LruEmbeddingCache::with_defaults();
        cache.set("k", vec![1.0, 2.0], None).unwrap();
        cache.set("k", vec![3.0, 4.0, 5.0, 6.0], None).unwrap();

        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get("k").unwrap(), vec![3.0, 4.0, 5.0, 6.0]);
    }
}
