//! Domain model: tracking events and search documents.

pub mod events;
pub mod search;
