//! Brezza: the engagement-telemetry and client-search core of a
//! server-rendered blog.
//!
//! The crate provides the pieces a blog front-end needs to observe reader
//! behavior and answer search queries without ever endangering page
//! rendering: a batched tracking-event dispatcher with retry and a durable
//! fallback store, a fire-and-forget beacon path for teardown-time events,
//! page-lifecycle instrumentation, and a lazily loaded fuzzy search index,
//! plus the builder that produces the index from stored Markdown content.
//!
//! Everything here is best-effort by contract: when the host environment
//! offers no storage or transport, operations degrade to no-ops, and no
//! error escapes into the caller's page path.

pub mod application;
pub mod config;
pub mod domain;
pub mod infra;
pub(crate) mod util;
