//! Client search: fuzzy scoring, the lazily loaded index consumer, and the
//! corpus builder.

pub mod builder;
pub mod index;
pub mod score;
