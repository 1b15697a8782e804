//! Port traits describing the host-environment adapters.
//!
//! The telemetry and search services are written against these seams; the
//! `infra` layer provides the HTTP and storage implementations, and tests
//! substitute recording doubles. A missing adapter models the absence of a
//! browser-like execution context: callers degrade to no-ops rather than
//! erroring.

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;

use crate::domain::events::TrackingEvent;
use crate::domain::search::SearchDocument;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("storage unavailable: {0}")]
    Unavailable(String),
    #[error("storage io failed: {0}")]
    Io(String),
}

impl StoreError {
    pub fn io(err: impl std::fmt::Display) -> Self {
        Self::Io(err.to_string())
    }
}

/// Synchronous string key-value storage, modeled on web session/local
/// storage. Scoped to a single origin and a single process; cross-process
/// races are out of contract.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;
    fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;
    fn remove(&self, key: &str) -> Result<(), StoreError>;
}

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("endpoint rejected event with status {status}")]
    Status { status: u16 },
    #[error("transport failure: {0}")]
    Connection(String),
}

/// Delivery path for tracking events. Any 2xx response is success; the
/// response body is ignored.
#[async_trait]
pub trait EventTransport: Send + Sync {
    async fn deliver(&self, event: &TrackingEvent) -> Result<(), TransportError>;
}

/// Fire-and-forget payload hand-off that is safe to call while the caller's
/// execution context is being torn down. No retry, no acknowledgment, no
/// failure signal.
pub trait BeaconTransport: Send + Sync {
    fn send(&self, payload: Bytes);
}

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("index fetch failed: {0}")]
    Fetch(String),
    #[error("index decode failed: {0}")]
    Decode(String),
}

/// Retrieval of the precomputed search corpus (a flat JSON array).
#[async_trait]
pub trait IndexFetcher: Send + Sync {
    async fn fetch(&self) -> Result<Vec<SearchDocument>, FetchError>;
}

#[derive(Debug, Error)]
pub enum ContentError {
    #[error("content key `{0}` not found")]
    NotFound(String),
    #[error("content read failed: {0}")]
    Read(String),
}

/// Narrow read interface over the content backend: list keys under a prefix
/// and read raw Markdown by key.
#[async_trait]
pub trait ContentStore: Send + Sync {
    async fn list_keys(&self, prefix: &str) -> Result<Vec<String>, ContentError>;
    async fn read(&self, key: &str) -> Result<String, ContentError>;
}
