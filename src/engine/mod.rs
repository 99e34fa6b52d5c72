//! Search engine collaborators.
//!
//! - **[`elastic`]**: Elasticsearch over HTTP; lowers the query AST to the JSON
//!   search DSL and decodes the response.
//! - **[`memory`]**: evaluates the AST over in-memory JSON documents. Backs the
//!   tests and the CLI `--fixture` mode.
//!
//! The search layer only ever calls [`SearchEngine::execute`]. Index
//! management, mappings and ingestion belong to other tools.

pub mod elastic;
pub mod memory;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::future::Future;
use thiserror::Error;

use crate::search::ast::CompiledQuery;

pub use elastic::ElasticEngine;
pub use memory::MemoryEngine;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("{0}")]
    Unavailable(String),

    #[error("{0}")]
    Decode(String),
}

/// One hit as the engine returned it.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RawHit {
    pub id: String,
    pub score: Option<f64>,
    pub source: serde_json::Map<String, serde_json::Value>,
    pub highlight: Option<BTreeMap<String, Vec<String>>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RawBucket {
    pub key: String,
    pub doc_count: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RawHitSet {
    pub total: u64,
    pub elapsed_ms: u64,
    pub hits: Vec<RawHit>,
    pub aggregations: Option<BTreeMap<String, Vec<RawBucket>>>,
}

/// The single operation the search layer needs from an engine. One call is
/// one round trip: no retries, no backoff.
pub trait SearchEngine: Send + Sync {
    fn execute(
        &self,
        query: &CompiledQuery,
    ) -> impl Future<Output = Result<RawHitSet, EngineError>> + Send;
}

impl<E: SearchEngine> SearchEngine for std::sync::Arc<E> {
    fn execute(
        &self,
        query: &CompiledQuery,
    ) -> impl Future<Output = Result<RawHitSet, EngineError>> + Send {
        (**self).execute(query)
    }
}
