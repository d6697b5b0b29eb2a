//! Cache-backed fetcher
//!
//! Memoizes transport responses per `CacheKey` for the lifetime of the
//! fetcher. A hit is returned without re-validation. Concurrent requests
//! for the same key are coalesced: the first caller retrieves, the others
//! wait on the key's gate and then read the cache.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use spendview_transport::{Endpoint, TransportRef};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::cache::{CacheKey, CacheMetrics, ResponseCache};
use crate::error::{CoreError, CoreResult};

/// Fetcher reference type
pub type FetcherRef = Arc<Fetcher>;

/// `None` params for endpoints that take none
pub const NO_PARAMS: Option<&'static ()> = None;

/// Single-flight gate per key
type Gate = Arc<Mutex<()>>;

pub struct Fetcher {
    transport: TransportRef,
    cache: Mutex<ResponseCache>,
    inflight: Mutex<HashMap<CacheKey, Gate>>,
    pending: AtomicUsize,
}

/// Keeps `pending` accurate when a retrieval returns early or fails
struct PendingGuard<'a>(&'a AtomicUsize);

impl<'a> PendingGuard<'a> {
    fn enter(counter: &'a AtomicUsize) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(counter)
    }
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl Fetcher {
    pub fn new(transport: TransportRef) -> Self {
        Self {
            transport,
            cache: Mutex::new(ResponseCache::new()),
            inflight: Mutex::new(HashMap::new()),
            pending: AtomicUsize::new(0),
        }
    }

    /// Fetch through the cache. Mutations bypass it.
    pub async fn fetch_with_cache<T, P>(&self, endpoint: Endpoint, params: Option<&P>) -> CoreResult<T>
    where
        T: DeserializeOwned,
        P: Serialize + ?Sized,
    {
        if endpoint.is_mutation() {
            log::debug!("{} is a mutation, not caching", endpoint);
            return self.fetch_without_cache(endpoint, params).await;
        }

        let params = encode_params(endpoint, params)?;
        let key = CacheKey::new(endpoint, params.as_ref());

        if let Some(value) = self.cache.lock().await.get(&key) {
            log::debug!("cache hit: {}", key);
            return decode(endpoint, value);
        }

        let gate = self.gate(&key).await;
        let result = {
            let _permit = gate.lock().await;
            self.fill(endpoint, &key, params).await
        };
        self.release(&key, gate).await;

        decode(endpoint, result?)
    }

    /// Retrieve without reading or populating the cache
    pub async fn fetch_without_cache<T, P>(&self, endpoint: Endpoint, params: Option<&P>) -> CoreResult<T>
    where
        T: DeserializeOwned,
        P: Serialize + ?Sized,
    {
        let params = encode_params(endpoint, params)?;
        let value = self.retrieve(endpoint, params).await?;
        decode(endpoint, value)
    }

    /// Drop the entry for exactly `endpoint` + `params`
    pub async fn invalidate<P>(&self, endpoint: Endpoint, params: Option<&P>) -> CoreResult<bool>
    where
        P: Serialize + ?Sized,
    {
        let params = encode_params(endpoint, params)?;
        let key = CacheKey::new(endpoint, params.as_ref());
        let removed = self.cache.lock().await.remove(&key);
        if removed {
            log::debug!("invalidated {}", key);
        }
        Ok(removed)
    }

    /// Drop every entry of `endpoint`
    pub async fn invalidate_endpoint(&self, endpoint: Endpoint) -> usize {
        let removed = self.cache.lock().await.remove_endpoint(endpoint);
        log::debug!("invalidated {} entries of {}", removed, endpoint);
        removed
    }

    /// Drop every entry
    pub async fn clear(&self) -> usize {
        let removed = self.cache.lock().await.clear();
        log::debug!("cleared {} cache entries", removed);
        removed
    }

    /// True while any retrieval issued through this fetcher is in flight
    pub fn loading(&self) -> bool {
        self.pending.load(Ordering::SeqCst) > 0
    }

    pub async fn metrics(&self) -> CacheMetrics {
        self.cache.lock().await.metrics()
    }

    pub async fn cached_entries(&self) -> usize {
        self.cache.lock().await.len()
    }

    /// Called with the key's gate held
    async fn fill(&self, endpoint: Endpoint, key: &CacheKey, params: Option<Value>) -> CoreResult<Value> {
        let generation = {
            let mut cache = self.cache.lock().await;
            if let Some(value) = cache.peek(key).cloned() {
                cache.record_coalesced();
                log::debug!("coalesced onto earlier retrieval: {}", key);
                return Ok(value);
            }
            cache.generation()
        };

        let value = self.retrieve(endpoint, params).await?;
        let mut cache = self.cache.lock().await;
        if cache.generation() == generation {
            cache.insert(key.clone(), value.clone());
        } else {
            log::debug!("cache invalidated during retrieval of {}, not storing", key);
        }
        Ok(value)
    }

    async fn retrieve(&self, endpoint: Endpoint, params: Option<Value>) -> CoreResult<Value> {
        let _pending = PendingGuard::enter(&self.pending);
        self.cache.lock().await.record_retrieval();
        log::debug!("retrieving {}", endpoint);

        self.transport.retrieve(endpoint, params).await.map_err(|e| {
            log::warn!("retrieval of {} failed: {}", endpoint, e);
            CoreError::from(e)
        })
    }

    async fn gate(&self, key: &CacheKey) -> Gate {
        self.inflight
            .lock()
            .await
            .entry(key.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Forget the gate once nobody else holds it
    async fn release(&self, key: &CacheKey, gate: Gate) {
        let mut inflight = self.inflight.lock().await;
        let idle = inflight
            .get(key)
            .map(|current| Arc::ptr_eq(current, &gate) && Arc::strong_count(&gate) <= 2)
            .unwrap_or(false);
        if idle {
            inflight.remove(key);
        }
    }
}

fn encode_params<P: Serialize + ?Sized>(endpoint: Endpoint, params: Option<&P>) -> CoreResult<Option<Value>> {
    params
        .map(serde_json::to_value)
        .transpose()
        .map_err(|e| CoreError::Encode {
            endpoint,
            message: e.to_string(),
        })
}

fn decode<T: DeserializeOwned>(endpoint: Endpoint, value: Value) -> CoreResult<T> {
    serde_json::from_value(value).map_err(|e| CoreError::Decode {
        endpoint,
        message: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use spendview_transport::{
        ApprovalParams, Dataset, Employee, EmployeeParams, InMemoryTransport, Page, PageParams, Transaction,
        Transport, TransportError,
    };
    use std::sync::atomic::AtomicU64;
    use std::time::Duration;

    /// Answers with the version current when the request arrived
    struct VersionedTransport {
        version: AtomicU64,
        latency: Duration,
    }

    #[async_trait]
    impl Transport for VersionedTransport {
        async fn retrieve(&self, _endpoint: Endpoint, _params: Option<Value>) -> Result<Value, TransportError> {
            let version = self.version.load(Ordering::SeqCst);
            tokio::time::sleep(self.latency).await;
            Ok(Value::from(version))
        }
    }

    fn setup(latency: Duration) -> (Arc<InMemoryTransport>, Fetcher) {
        let transport = Arc::new(InMemoryTransport::new(Dataset::sample()).with_latency(latency));
        let fetcher = Fetcher::new(transport.clone());
        (transport, fetcher)
    }

    #[tokio::test]
    async fn test_second_fetch_is_served_from_cache() {
        let (transport, fetcher) = setup(Duration::ZERO);

        let first: Vec<Employee> = fetcher.fetch_with_cache(Endpoint::Employees, NO_PARAMS).await.unwrap();
        let second: Vec<Employee> = fetcher.fetch_with_cache(Endpoint::Employees, NO_PARAMS).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(transport.request_count(Endpoint::Employees).await, 1);
        let metrics = fetcher.metrics().await;
        assert_eq!(metrics.hits, 1);
        assert_eq!(metrics.retrievals, 1);
    }

    #[tokio::test]
    async fn test_params_are_part_of_the_key() {
        let (transport, fetcher) = setup(Duration::ZERO);

        let one: Page<Transaction> = fetcher
            .fetch_with_cache(Endpoint::TransactionsForAllEmployees, Some(&PageParams { page: 1 }))
            .await
            .unwrap();
        let two: Page<Transaction> = fetcher
            .fetch_with_cache(Endpoint::TransactionsForAllEmployees, Some(&PageParams { page: 2 }))
            .await
            .unwrap();

        assert_ne!(one.data, two.data);
        assert_eq!(transport.request_count(Endpoint::TransactionsForAllEmployees).await, 2);
        assert_eq!(fetcher.cached_entries().await, 2);
    }

    #[tokio::test]
    async fn test_concurrent_identical_fetches_coalesce() {
        let (transport, fetcher) = setup(Duration::from_millis(20));
        let params = EmployeeParams { employee_id: "emp-1".to_string() };

        let (a, b) = tokio::join!(
            fetcher.fetch_with_cache::<Vec<Transaction>, _>(Endpoint::TransactionsByEmployee, Some(&params)),
            fetcher.fetch_with_cache::<Vec<Transaction>, _>(Endpoint::TransactionsByEmployee, Some(&params)),
        );

        assert_eq!(a.unwrap(), b.unwrap());
        assert_eq!(transport.request_count(Endpoint::TransactionsByEmployee).await, 1);
        assert_eq!(fetcher.metrics().await.coalesced, 1);
        assert!(fetcher.inflight.lock().await.is_empty());
    }

    #[tokio::test]
    async fn test_failures_are_not_cached() {
        let (transport, fetcher) = setup(Duration::ZERO);
        transport
            .fail_next(
                Endpoint::Employees,
                TransportError::Server {
                    endpoint: Endpoint::Employees,
                    message: "503".to_string(),
                },
            )
            .await;

        let err = fetcher
            .fetch_with_cache::<Vec<Employee>, _>(Endpoint::Employees, NO_PARAMS)
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::Transport(TransportError::Server { .. })));
        assert!(!fetcher.loading());
        assert_eq!(fetcher.cached_entries().await, 0);

        let employees: Vec<Employee> = fetcher.fetch_with_cache(Endpoint::Employees, NO_PARAMS).await.unwrap();
        assert_eq!(employees.len(), 4);
        assert_eq!(transport.request_count(Endpoint::Employees).await, 2);
    }

    #[tokio::test]
    async fn test_invalidation_forces_retrieval() {
        let (transport, fetcher) = setup(Duration::ZERO);
        let page = PageParams { page: 1 };

        let _: Vec<Employee> = fetcher.fetch_with_cache(Endpoint::Employees, NO_PARAMS).await.unwrap();
        let _: Page<Transaction> = fetcher
            .fetch_with_cache(Endpoint::TransactionsForAllEmployees, Some(&page))
            .await
            .unwrap();

        assert!(fetcher.invalidate(Endpoint::TransactionsForAllEmployees, Some(&page)).await.unwrap());
        assert!(!fetcher.invalidate(Endpoint::TransactionsForAllEmployees, Some(&page)).await.unwrap());
        let _: Page<Transaction> = fetcher
            .fetch_with_cache(Endpoint::TransactionsForAllEmployees, Some(&page))
            .await
            .unwrap();
        assert_eq!(transport.request_count(Endpoint::TransactionsForAllEmployees).await, 2);

        assert_eq!(fetcher.invalidate_endpoint(Endpoint::Employees).await, 1);
        assert_eq!(fetcher.clear().await, 1);
        assert_eq!(fetcher.cached_entries().await, 0);
    }

    #[tokio::test]
    async fn test_retrieval_overtaken_by_invalidation_is_not_stored() {
        let transport = Arc::new(VersionedTransport {
            version: AtomicU64::new(1),
            latency: Duration::from_millis(40),
        });
        let fetcher = Arc::new(Fetcher::new(transport.clone()));

        let background = fetcher.clone();
        let handle = tokio::spawn(async move { background.fetch_with_cache::<u64, _>(Endpoint::Employees, NO_PARAMS).await });
        tokio::time::sleep(Duration::from_millis(10)).await;

        transport.version.store(2, Ordering::SeqCst);
        assert!(!fetcher.invalidate(Endpoint::Employees, NO_PARAMS).await.unwrap());
        assert_eq!(handle.await.unwrap().unwrap(), 1);
        assert_eq!(fetcher.cached_entries().await, 0);

        let current: u64 = fetcher.fetch_with_cache(Endpoint::Employees, NO_PARAMS).await.unwrap();
        assert_eq!(current, 2);
        assert_eq!(fetcher.metrics().await.retrievals, 2);
    }

    #[tokio::test]
    async fn test_clear_during_retrieval_is_honoured() {
        let transport = Arc::new(VersionedTransport {
            version: AtomicU64::new(1),
            latency: Duration::from_millis(30),
        });
        let fetcher = Arc::new(Fetcher::new(transport.clone()));

        let background = fetcher.clone();
        let handle = tokio::spawn(async move {
            background
                .fetch_with_cache::<u64, _>(Endpoint::TransactionsForAllEmployees, Some(&PageParams { page: 1 }))
                .await
        });
        tokio::time::sleep(Duration::from_millis(5)).await;
        fetcher.clear().await;
        handle.await.unwrap().unwrap();

        assert_eq!(fetcher.cached_entries().await, 0);
    }

    #[tokio::test]
    async fn test_mutations_are_never_cached() {
        let (transport, fetcher) = setup(Duration::ZERO);
        let params = ApprovalParams {
            transaction_id: "tx-001".to_string(),
            value: true,
        };

        for _ in 0..2 {
            let _: Value = fetcher
                .fetch_with_cache(Endpoint::SetTransactionApproval, Some(&params))
                .await
                .unwrap();
        }
        assert_eq!(transport.request_count(Endpoint::SetTransactionApproval).await, 2);
        assert_eq!(fetcher.cached_entries().await, 0);
        assert_eq!(fetcher.metrics().await.misses, 0);
    }

    #[tokio::test]
    async fn test_without_cache_always_retrieves() {
        let (transport, fetcher) = setup(Duration::ZERO);

        for _ in 0..2 {
            let _: Vec<Employee> = fetcher.fetch_without_cache(Endpoint::Employees, NO_PARAMS).await.unwrap();
        }
        assert_eq!(transport.request_count(Endpoint::Employees).await, 2);
        assert_eq!(fetcher.cached_entries().await, 0);
    }

    #[tokio::test]
    async fn test_loading_while_in_flight() {
        let (_transport, fetcher) = setup(Duration::from_millis(30));
        let fetcher = Arc::new(fetcher);

        let background = fetcher.clone();
        let handle = tokio::spawn(async move {
            background
                .fetch_with_cache::<Vec<Employee>, _>(Endpoint::Employees, NO_PARAMS)
                .await
        });

        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(fetcher.loading());
        handle.await.unwrap().unwrap();
        assert!(!fetcher.loading());
    }

    #[tokio::test]
    async fn test_decode_mismatch() {
        let (_transport, fetcher) = setup(Duration::ZERO);
        let err = fetcher
            .fetch_with_cache::<Page<Transaction>, _>(Endpoint::Employees, NO_PARAMS)
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::Decode { endpoint: Endpoint::Employees, .. }));
    }
}
