// Query cache - explicit, namespaced per collection, invalidated on writes

use crate::driver::{Driver, ListQuery, ListResult};
use crate::error::Result;
use crate::watcher::CollectionWatcher;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

/// Default number of entries kept per namespace.
pub const DEFAULT_NAMESPACE_CAPACITY: usize = 1024;

struct Namespace<V> {
    generation: u64,
    entries: HashMap<String, V>,
}

impl<V> Default for Namespace<V> {
    fn default() -> Self {
        Namespace {
            generation: 0,
            entries: HashMap::new(),
        }
    }
}

/// A cache of query results grouped by namespace.
///
/// One cache can be shared by drivers of different collections; each
/// driver only ever invalidates its own namespace. Every invalidation bumps
/// the namespace generation, and [`QueryCache::insert_at`] drops results
/// computed under an older one.
pub struct QueryCache<V> {
    namespaces: Mutex<HashMap<String, Namespace<V>>>,
    capacity: usize,
}

impl<V: Clone> QueryCache<V> {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_NAMESPACE_CAPACITY)
    }

    /// A cache holding at most `capacity` entries per namespace.
    pub fn with_capacity(capacity: usize) -> Self {
        QueryCache {
            namespaces: Mutex::new(HashMap::new()),
            capacity: capacity.max(1),
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Namespace<V>>> {
        // Entries are replaced whole, so a poisoned map is still consistent
        self.namespaces.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn get(&self, namespace: &str, key: &str) -> Option<V> {
        self.lock().get(namespace)?.entries.get(key).cloned()
    }

    /// Current generation of `namespace`. Read it before computing a value.
    pub fn generation(&self, namespace: &str) -> u64 {
        self.lock().get(namespace).map_or(0, |ns| ns.generation)
    }

    pub fn insert(&self, namespace: &str, key: String, value: V) {
        let mut namespaces = self.lock();
        let ns = namespaces.entry(namespace.to_string()).or_default();
        Self::store(ns, self.capacity, key, value);
    }

    /// Insert only if `namespace` was not invalidated since `generation`.
    /// Returns whether the value was stored.
    pub fn insert_at(&self, namespace: &str, generation: u64, key: String, value: V) -> bool {
        let mut namespaces = self.lock();
        let ns = namespaces.entry(namespace.to_string()).or_default();
        if ns.generation != generation {
            return false;
        }
        Self::store(ns, self.capacity, key, value);
        true
    }

    fn store(ns: &mut Namespace<V>, capacity: usize, key: String, value: V) {
        if ns.entries.len() >= capacity && !ns.entries.contains_key(&key) {
            let evicted = ns.entries.keys().next().cloned();
            if let Some(evicted) = evicted {
                ns.entries.remove(&evicted);
            }
        }
        ns.entries.insert(key, value);
    }

    pub fn invalidate(&self, namespace: &str) {
        let mut namespaces = self.lock();
        let ns = namespaces.entry(namespace.to_string()).or_default();
        ns.entries.clear();
        ns.generation += 1;
    }

    pub fn clear(&self) {
        for ns in self.lock().values_mut() {
            ns.entries.clear();
            ns.generation += 1;
        }
    }

    /// Number of cached entries across all namespaces.
    pub fn len(&self) -> usize {
        self.lock().values().map(|ns| ns.entries.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<V: Clone> Default for QueryCache<V> {
    fn default() -> Self {
        Self::new()
    }
}

/// A cached read result.
#[derive(Debug, Clone)]
pub enum Cached<T> {
    Get(Option<T>),
    List(ListResult<T>),
}

/// Wraps a driver with a read cache.
///
/// `get` and `list` results are cached under the driver's namespace; every
/// `create`, `patch` and `remove` invalidates that namespace, whether or
/// not it succeeded. Changes made outside the driver are only noticed when
/// a [`CollectionWatcher`] is attached.
pub struct CachedDriver<D: Driver> {
    inner: D,
    cache: Arc<QueryCache<Cached<D::Document>>>,
    watcher: Option<CollectionWatcher>,
}

impl<D> CachedDriver<D>
where
    D: Driver,
    D::Document: Clone,
{
    pub fn new(inner: D, cache: Arc<QueryCache<Cached<D::Document>>>) -> Self {
        CachedDriver {
            inner,
            cache,
            watcher: None,
        }
    }

    pub fn with_watcher(mut self, watcher: CollectionWatcher) -> Self {
        self.watcher = Some(watcher);
        self
    }

    pub fn inner(&self) -> &D {
        &self.inner
    }

    pub fn invalidate(&self) {
        self.cache.invalidate(self.inner.namespace());
    }

    fn sync_external(&self) {
        if let Some(watcher) = &self.watcher {
            let events = watcher.drain();
            if !events.is_empty() {
                log::debug!(
                    "{} out-of-band changes in {}, dropping cache",
                    events.len(),
                    self.inner.namespace()
                );
                self.invalidate();
            }
        }
    }
}

impl<D> Driver for CachedDriver<D>
where
    D: Driver,
    D::Document: Clone,
{
    type Document = D::Document;
    type Input = D::Input;
    type Patch = D::Patch;

    fn namespace(&self) -> &str {
        self.inner.namespace()
    }

    fn id(&self, raw: Option<&str>) -> String {
        self.inner.id(raw)
    }

    fn get(&self, id: &str) -> Result<Option<D::Document>> {
        self.sync_external();
        let key = format!("get:{id}");
        if let Some(Cached::Get(doc)) = self.cache.get(self.namespace(), &key) {
            return Ok(doc);
        }

        let generation = self.cache.generation(self.namespace());
        let doc = self.inner.get(id)?;
        self.cache
            .insert_at(self.namespace(), generation, key, Cached::Get(doc.clone()));
        Ok(doc)
    }

    fn list(&self, query: &ListQuery) -> Result<ListResult<D::Document>> {
        self.sync_external();
        let key = format!("list:{}", serde_json::to_string(query)?);
        if let Some(Cached::List(result)) = self.cache.get(self.namespace(), &key) {
            return Ok(result);
        }

        let generation = self.cache.generation(self.namespace());
        let result = self.inner.list(query)?;
        self.cache.insert_at(
            self.namespace(),
            generation,
            key,
            Cached::List(result.clone()),
        );
        Ok(result)
    }

    fn create(&self, doc: D::Input) -> Result<D::Document> {
        let result = self.inner.create(doc);
        self.invalidate();
        result
    }

    fn patch(&self, id: &str, patch: D::Patch) -> Result<Option<D::Document>> {
        let result = self.inner.patch(id, patch);
        self.invalidate();
        result
    }

    fn remove(&self, id: &str) -> Result<Option<D::Document>> {
        let result = self.inner.remove(id);
        self.invalidate();
        result
    }
}
