//! Response cache keyed by endpoint and serialized parameters
//!
//! Entries live until they are invalidated; there is no TTL and no
//! eviction, the cache grows with the number of distinct requests.

use serde_json::Value;
use spendview_transport::Endpoint;
use std::collections::HashMap;

/// Identity of one cacheable response
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    endpoint: Endpoint,
    params: Option<String>,
}

impl CacheKey {
    /// `serde_json` object maps are ordered, so the rendering is stable
    pub fn new(endpoint: Endpoint, params: Option<&Value>) -> Self {
        Self {
            endpoint,
            params: params.map(|p| p.to_string()),
        }
    }

    pub fn endpoint(&self) -> Endpoint {
        self.endpoint
    }

    pub fn params(&self) -> Option<&str> {
        self.params.as_deref()
    }
}

impl std::fmt::Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.params {
            Some(params) => write!(f, "{}@{}", self.endpoint, params),
            None => write!(f, "{}", self.endpoint),
        }
    }
}

/// Cache metrics for monitoring
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheMetrics {
    pub hits: u64,
    pub misses: u64,
    /// Callers that waited on another caller's retrieval for the same key
    pub coalesced: u64,
    pub retrievals: u64,
    pub inserts: u64,
    pub invalidations: u64,
}

impl CacheMetrics {
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

/// Unbounded response store
#[derive(Debug, Default)]
pub struct ResponseCache {
    entries: HashMap<CacheKey, Value>,
    metrics: CacheMetrics,
    /// Bumped by every invalidation, whether or not an entry was present
    generation: u64,
}

impl ResponseCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a response, counting the hit or miss
    pub fn get(&mut self, key: &CacheKey) -> Option<Value> {
        match self.entries.get(key) {
            Some(value) => {
                self.metrics.hits += 1;
                Some(value.clone())
            }
            None => {
                self.metrics.misses += 1;
                None
            }
        }
    }

    /// Look up a response without touching the metrics
    pub fn peek(&self, key: &CacheKey) -> Option<&Value> {
        self.entries.get(key)
    }

    pub fn insert(&mut self, key: CacheKey, value: Value) {
        self.entries.insert(key, value);
        self.metrics.inserts += 1;
    }

    /// Drop one entry
    pub fn remove(&mut self, key: &CacheKey) -> bool {
        self.generation += 1;
        let removed = self.entries.remove(key).is_some();
        if removed {
            self.metrics.invalidations += 1;
        }
        removed
    }

    /// Drop every entry of `endpoint`, whatever its params
    pub fn remove_endpoint(&mut self, endpoint: Endpoint) -> usize {
        self.generation += 1;
        let before = self.entries.len();
        self.entries.retain(|key, _| key.endpoint != endpoint);
        let removed = before - self.entries.len();
        self.metrics.invalidations += removed as u64;
        removed
    }

    /// Drop everything
    pub fn clear(&mut self) -> usize {
        self.generation += 1;
        let removed = self.entries.len();
        self.entries.clear();
        self.metrics.invalidations += removed as u64;
        removed
    }

    /// Invalidation counter; a retrieval that started under an older
    /// generation must not be inserted
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn record_retrieval(&mut self) {
        self.metrics.retrievals += 1;
    }

    pub fn record_coalesced(&mut self) {
        self.metrics.coalesced += 1;
    }

    pub fn metrics(&self) -> CacheMetrics {
        self.metrics.clone()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
