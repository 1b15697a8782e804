//! Infrastructure adapters: HTTP transports, key-value storage, content
//! access, and telemetry.

pub mod content;
pub mod error;
pub mod http;
pub mod store;
pub mod telemetry;
