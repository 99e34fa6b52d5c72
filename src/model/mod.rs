//! Data model shared across the search layer.

pub mod types;
