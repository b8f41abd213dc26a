//! Perspective workers
//!
//! A [`Worker`] answers a query from one fixed viewpoint. Workers are
//! resolved by key through a [`WorkerRegistry`] and instantiated by a
//! [`WorkerFactory`], which may cache instances between requests.
//!
//! Workers only take `&self`, so a cached instance can be invoked by
//! many concurrent requests at once.

pub mod factory;
pub mod perspective;
pub mod registry;

use crate::types::{Result, WorkerResponse};
use async_trait::async_trait;

pub use factory::{CachePolicy, WorkerBatch, WorkerFactory};
pub use perspective::{
    default_system_prompt, register_builtin_workers, register_perspective, PerspectiveWorker,
    BUILTIN_PERSPECTIVES,
};
pub use registry::{RegistrationPolicy, WorkerConstructor, WorkerRegistry};

/// A unit that produces one perspective's answer to a query.
#[async_trait]
pub trait Worker: Send + Sync {
    /// Label attached to every response, fixed at construction
    fn perspective(&self) -> &str;

    /// Answer the query from this worker's perspective
    async fn produce(&self, query: &str) -> Result<WorkerResponse>;
}
