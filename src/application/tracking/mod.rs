//! Tracking pipeline: batched dispatch with retry, beacon delivery, and
//! page- and site-lifecycle instrumentation.

pub mod beacon;
pub mod dispatcher;
pub mod page;
pub mod session_manager;
