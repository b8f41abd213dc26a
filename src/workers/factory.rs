//! Worker factory
//!
//! Turns worker keys into live instances using a shared [`WorkerRegistry`].
//! Batch creation never fails: unresolvable keys are logged and skipped so a
//! single bad key cannot sink a whole request.

use crate::types::Result;
use crate::workers::{Worker, WorkerRegistry};
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// Whether the factory reuses instances across calls
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CachePolicy {
    /// Construct a new instance on every call
    #[default]
    Fresh,
    /// Keep one instance per key until [`WorkerFactory::clear_cache`]
    Cached,
}

/// Ordered set of `(key, worker)` pairs selected for one request
#[derive(Clone, Default)]
pub struct WorkerBatch {
    entries: Vec<(String, Arc<dyn Worker>)>,
}

impl WorkerBatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a worker unless its key is already present
    pub fn push(&mut self, key: impl Into<String>, worker: Arc<dyn Worker>) {
        let key = key.into();
        if !self.contains(&key) {
            self.entries.push((key, worker));
        }
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.iter().any(|(k, _)| k == key)
    }

    pub fn keys(&self) -> Vec<String> {
        self.entries.iter().map(|(k, _)| k.clone()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &(String, Arc<dyn Worker>)> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl std::fmt::Debug for WorkerBatch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.entries.iter().map(|(k, w)| (k, w.perspective())))
            .finish()
    }
}

/// Creates workers from registry keys
pub struct WorkerFactory {
    registry: Arc<WorkerRegistry>,
    policy: CachePolicy,
    cache: Mutex<HashMap<String, Arc<dyn Worker>>>,
}

impl WorkerFactory {
    /// Create a factory that builds fresh instances
    pub fn new(registry: Arc<WorkerRegistry>) -> Self {
        Self::with_policy(registry, CachePolicy::Fresh)
    }

    pub fn with_policy(registry: Arc<WorkerRegistry>, policy: CachePolicy) -> Self {
        Self {
            registry,
            policy,
            cache: Mutex::new(HashMap::new()),
        }
    }

    pub fn registry(&self) -> &Arc<WorkerRegistry> {
        &self.registry
    }

    pub fn policy(&self) -> CachePolicy {
        self.policy
    }

    /// Build a new worker for `key`
    ///
    /// Fails with `UnknownWorker` when the key is not registered; constructor
    /// errors are returned unchanged.
    pub fn create(&self, key: &str) -> Result<Arc<dyn Worker>> {
        let constructor = self.registry.resolve(key)?;
        constructor()
    }

    /// Return the cached worker for `key`, building it on first use
    ///
    /// With [`CachePolicy::Fresh`] this behaves like [`create`](Self::create).
    /// The constructor runs without the cache lock held; if two callers race
    /// on the same key the first instance stored wins.
    pub fn get_or_create(&self, key: &str) -> Result<Arc<dyn Worker>> {
        if self.policy == CachePolicy::Fresh {
            return self.create(key);
        }

        let key = WorkerRegistry::normalize_key(key);
        if let Some(worker) = self.cache.lock().get(&key) {
            return Ok(Arc::clone(worker));
        }

        let worker = self.create(&key)?;
        let mut cache = self.cache.lock();
        Ok(Arc::clone(cache.entry(key).or_insert(worker)))
    }

    /// Drop every cached instance
    pub fn clear_cache(&self) {
        let mut cache = self.cache.lock();
        let dropped = cache.len();
        cache.clear();
        tracing::debug!(dropped, "Cleared worker cache");
    }

    pub fn cached_len(&self) -> usize {
        self.cache.lock().len()
    }

    /// Resolve many keys at once, in order
    ///
    /// Duplicate keys collapse to their first occurrence. Keys that do not
    /// resolve, or whose constructor fails, are left out with a warning.
    pub fn create_batch<S: AsRef<str>>(&self, keys: &[S]) -> WorkerBatch {
        let mut batch = WorkerBatch::new();
        let mut seen = HashSet::new();

        for raw in keys {
            let key = WorkerRegistry::normalize_key(raw.as_ref());
            if !seen.insert(key.clone()) {
                continue;
            }

            match self.get_or_create(&key) {
                Ok(worker) => batch.push(key, worker),
                Err(e) => {
                    tracing::warn!(worker = %key, error = %e, "Skipping worker");
                }
            }
        }

        batch
    }
}
