use std::sync::Arc;

use moka::future::Cache;
use moka::policy::EvictionPolicy;
use tracing::debug;

type Factory<A> = Arc<dyn Fn(&str) -> A + Send + Sync>;

/// Bounded product-id → agent map with least-recently-used eviction.
///
/// Concurrent first requests for the same product share one construction.
pub struct AgentCache<A: Send + Sync + 'static> {
    inner: Cache<String, Arc<A>>,
    factory: Factory<A>,
}

impl<A: Send + Sync + 'static> AgentCache<A> {
    pub fn new(capacity: u64, factory: impl Fn(&str) -> A + Send + Sync + 'static) -> Self {
        Self {
            inner: Cache::builder()
                .max_capacity(capacity)
                .eviction_policy(EvictionPolicy::lru())
                .build(),
            factory: Arc::new(factory),
        }
    }

    /// Return the cached agent for `product_id`, building it on first use.
    pub async fn get_or_create(&self, product_id: &str) -> Arc<A> {
        let factory = Arc::clone(&self.factory);
        let id = product_id.to_string();
        self.inner
            .get_with(product_id.to_string(), async move {
                debug!(product_id = %id, "Creating agent");
                Arc::new(factory(&id))
            })
            .await
    }

    pub fn contains(&self, product_id: &str) -> bool {
        self.inner.contains_key(product_id)
    }

    /// Approximate number of live agents.
    pub fn len(&self) -> u64 {
        self.inner.entry_count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Apply pending evictions so `len` is exact.
    pub async fn sync(&self) {
        self.inner.run_pending_tasks().await;
    }
}
