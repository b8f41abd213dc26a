//! Worker registry
//!
//! Maps normalized worker keys to constructors. The registry is shared
//! behind an `Arc` and accepts registrations at any time; lookups take a
//! read lock only.

use crate::types::{AppError, Result};
use crate::workers::Worker;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

/// Builds a fresh worker instance. Must not perform network calls.
pub type WorkerConstructor = Arc<dyn Fn() -> Result<Arc<dyn Worker>> + Send + Sync>;

/// What happens when a key is registered twice
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RegistrationPolicy {
    /// Later registrations overwrite earlier ones
    #[default]
    Replace,
    /// A second registration of the same key is rejected
    Strict,
}

/// Registry of worker constructors keyed by lower-cased name
pub struct WorkerRegistry {
    constructors: RwLock<HashMap<String, WorkerConstructor>>,
    policy: RegistrationPolicy,
}

impl WorkerRegistry {
    /// Create an empty registry that replaces duplicate keys
    pub fn new() -> Self {
        Self::with_policy(RegistrationPolicy::Replace)
    }

    /// Create an empty registry with an explicit duplicate-key policy
    pub fn with_policy(policy: RegistrationPolicy) -> Self {
        Self {
            constructors: RwLock::new(HashMap::new()),
            policy,
        }
    }

    /// Normalize a worker key: trimmed and lower-cased
    pub fn normalize_key(key: &str) -> String {
        key.trim().to_lowercase()
    }

    /// Register a constructor under `key`
    ///
    /// Under [`RegistrationPolicy::Strict`] an existing key yields
    /// [`AppError::DuplicateWorker`].
    pub fn register(&self, key: &str, constructor: WorkerConstructor) -> Result<()> {
        let key = Self::normalize_key(key);
        if key.is_empty() {
            return Err(AppError::InvalidInput(
                "Worker key must not be empty".to_string(),
            ));
        }

        let mut constructors = self.constructors.write();
        if self.policy == RegistrationPolicy::Strict && constructors.contains_key(&key) {
            return Err(AppError::DuplicateWorker(key));
        }

        tracing::debug!(worker = %key, "Registered worker");
        constructors.insert(key, constructor);
        Ok(())
    }

    /// Register a closure directly, wrapping it in a [`WorkerConstructor`]
    pub fn register_fn<F>(&self, key: &str, constructor: F) -> Result<()>
    where
        F: Fn() -> Result<Arc<dyn Worker>> + Send + Sync + 'static,
    {
        self.register(key, Arc::new(constructor))
    }

    /// Look up the constructor for `key`
    pub fn resolve(&self, key: &str) -> Result<WorkerConstructor> {
        let key = Self::normalize_key(key);
        self.constructors
            .read()
            .get(&key)
            .cloned()
            .ok_or(AppError::UnknownWorker(key))
    }

    /// All registered keys, sorted
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.constructors.read().keys().cloned().collect();
        keys.sort();
        keys
    }

    pub fn contains(&self, key: &str) -> bool {
        self.constructors
            .read()
            .contains_key(&Self::normalize_key(key))
    }

    pub fn len(&self) -> usize {
        self.constructors.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.constructors.read().is_empty()
    }

    pub fn policy(&self) -> RegistrationPolicy {
        self.policy
    }
}

impl Default for WorkerRegistry {
    fn default() -> Self {
        Self::new()
    }
}
