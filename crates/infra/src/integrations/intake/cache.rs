//! Customer reference-data caching with moka
//!
//! Keeps customer lookups off the reference-data source while a batch encodes.
//! Separate positive and negative caches share one TTL; only `Ok(None)` is
//! cached as negative, errors are never cached. Two concurrent misses for the
//! same id may both reach the source; the second write simply wins.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use moka::future::Cache;
use taxbridge_core::CustomerDirectory;
use taxbridge_domain::{CustomerData, ReferenceCacheConfig, Result};
use tracing::debug;

/// Cache result for get operations
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheResult {
    Hit(CustomerData),
    Miss,
    /// Known not to exist
    NotFound,
}

/// Point-in-time cache counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub negative_hits: u64,
    pub misses: u64,
    pub entries: u64,
}

/// TTL cache for customer reference data.
pub struct CustomerCache {
    positive_cache: Cache<String, CustomerData>,
    negative_cache: Cache<String, ()>,
    hits: AtomicU64,
    negative_hits: AtomicU64,
    misses: AtomicU64,
}

impl CustomerCache {
    pub fn new(config: &ReferenceCacheConfig) -> Self {
        Self::with_ttl(config.ttl(), config.max_capacity)
    }

    /// Create a cache with an explicit TTL (useful for testing).
    pub fn with_ttl(ttl: Duration, max_capacity: u64) -> Self {
        debug!(ttl_seconds = ttl.as_secs_f64(), max_capacity, "customer cache configured");
        Self {
            positive_cache: Cache::builder().time_to_live(ttl).max_capacity(max_capacity).build(),
            negative_cache: Cache::builder().time_to_live(ttl).max_capacity(max_capacity).build(),
            hits: AtomicU64::new(0),
            negative_hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Look up without falling back to the source.
    pub async fn get(&self, customer_id: &str) -> CacheResult {
        let key = normalize(customer_id);

        if self.negative_cache.get(&key).await.is_some() {
            self.negative_hits.fetch_add(1, Ordering::Relaxed);
            debug!(customer_id = %key, "customer negative cache hit");
            return CacheResult::NotFound;
        }

        if let Some(customer) = self.positive_cache.get(&key).await {
            self.hits.fetch_add(1, Ordering::Relaxed);
            debug!(customer_id = %key, "customer cache hit");
            return CacheResult::Hit(customer);
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        CacheResult::Miss
    }

    /// Look up, fetching from `source` on a miss and caching the answer.
    pub async fn get_or_fetch(
        &self,
        customer_id: &str,
        source: &dyn CustomerDirectory,
    ) -> Result<Option<CustomerData>> {
        match self.get(customer_id).await {
            CacheResult::Hit(customer) => return Ok(Some(customer)),
            CacheResult::NotFound => return Ok(None),
            CacheResult::Miss => {}
        }

        let key = normalize(customer_id);
        let fetched = source.customer_data(&key).await?;
        match &fetched {
            Some(customer) => self.positive_cache.insert(key, customer.clone()).await,
            None => self.negative_cache.insert(key, ()).await,
        }
        Ok(fetched)
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            negative_hits: self.negative_hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entries: self.positive_cache.entry_count() + self.negative_cache.entry_count(),
        }
    }
}

fn normalize(customer_id: &str) -> String {
    customer_id.trim().to_string()
}

/// [`CustomerDirectory`] decorator that serves lookups through a
/// [`CustomerCache`].
pub struct CachedCustomerDirectory {
    source: Arc<dyn CustomerDirectory>,
    cache: CustomerCache,
}

impl CachedCustomerDirectory {
    pub fn new(source: Arc<dyn CustomerDirectory>, config: &ReferenceCacheConfig) -> Self {
        Self::with_cache(source, CustomerCache::new(config))
    }

    pub fn with_cache(source: Arc<dyn CustomerDirectory>, cache: CustomerCache) -> Self {
        Self { source, cache }
    }

    pub fn cache(&self) -> &CustomerCache {
        &self.cache
    }
}

#[async_trait]
impl CustomerDirectory for CachedCustomerDirectory {
    async fn customer_data(&self, customer_id: &str) -> Result<Option<CustomerData>> {
        self.cache.get_or_fetch(customer_id, self.source.as_ref()).await
    }
}

#[cfg(test)]
mod tests {
    use parking_lot::Mutex;
    use taxbridge_domain::TaxBridgeError;

    use super::*;

    #[derive(Default)]
    struct CountingDirectory {
        known: Vec<String>,
        fail: Mutex<bool>,
        lookups: AtomicU64,
    }

    #[async_trait]
    impl CustomerDirectory for CountingDirectory {
        async fn customer_data(&self, customer_id: &str) -> Result<Option<CustomerData>> {
            self.lookups.fetch_add(1, Ordering::SeqCst);
            if *self.fail.lock() {
                return Err(TaxBridgeError::Transport("reference store offline".into()));
            }
            Ok(self.known.iter().any(|k| k == customer_id).then(|| CustomerData {
                customer_id: customer_id.to_string(),
                name: "Acme".into(),
                ..CustomerData::default()
            }))
        }
    }

    fn directory(known: &[&str]) -> Arc<CountingDirectory> {
        Arc::new(CountingDirectory {
            known: known.iter().map(|s| s.to_string()).collect(),
            ..CountingDirectory::default()
        })
    }

    #[tokio::test]
    async fn positive_results_are_cached() {
        let source = directory(&["C1"]);
        let cached = CachedCustomerDirectory::new(source.clone(), &ReferenceCacheConfig::default());

        assert!(cached.customer_data("C1").await.unwrap().is_some());
        assert!(cached.customer_data(" C1 ").await.unwrap().is_some());

        assert_eq!(source.lookups.load(Ordering::SeqCst), 1);
        let stats = cached.cache().stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
    }

    #[tokio::test]
    async fn not_found_is_cached_negatively() {
        let source = directory(&[]);
        let cached = CachedCustomerDirectory::new(source.clone(), &ReferenceCacheConfig::default());

        assert!(cached.customer_data("C9").await.unwrap().is_none());
        assert!(cached.customer_data("C9").await.unwrap().is_none());

        assert_eq!(source.lookups.load(Ordering::SeqCst), 1);
        assert_eq!(cached.cache().get("C9").await, CacheResult::NotFound);
    }

    #[tokio::test]
    async fn errors_are_not_cached() {
        let source = directory(&["C1"]);
        *source.fail.lock() = true;
        let cached = CachedCustomerDirectory::new(source.clone(), &ReferenceCacheConfig::default());

        assert!(cached.customer_data("C1").await.is_err());
        *source.fail.lock() = false;
        assert!(cached.customer_data("C1").await.unwrap().is_some());

        assert_eq!(source.lookups.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn entries_expire_after_ttl() {
        let source = directory(&["C1"]);
        let cache = CustomerCache::with_ttl(Duration::from_millis(50), 100);
        let cached = CachedCustomerDirectory::with_cache(source.clone(), cache);

        cached.customer_data("C1").await.unwrap();
        tokio::time::sleep(Duration::from_millis(150)).await;
        cached.customer_data("C1").await.unwrap();

        assert_eq!(source.lookups.load(Ordering::SeqCst), 2);
    }
}
