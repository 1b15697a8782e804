//! Application services layer.

pub mod error;
pub mod ports;
pub mod search;
pub mod session;
pub mod tracking;
