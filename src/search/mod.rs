//! Search layer facade.
//!
//! This module turns application-level requests into engine queries and raw
//! engine answers back into results:
//!
//! - **[`classify`]**: exact-phrase vs fuzzy classification of free text.
//! - **[`filters`]**: facet constraints to score-neutral predicates.
//! - **[`sort`]**: sort tokens to field + direction.
//! - **[`compiler`]**: catalog, legal and suggestion request compilation.
//! - **[`ast`]**: the engine-neutral query AST the compiler produces.
//! - **[`normalize`]**: raw hits to [`SearchResult`](crate::model::types::SearchResult).
//! - **[`facets`]**: aggregation-only facet requests and bucket reshaping.
//! - **[`highlight`]**: highlight directives and fragment rendering.
//! - **[`query`]**: [`SearchClient`](query::SearchClient), the entry point tying
//!   the above to an injected engine.

pub mod ast;
pub mod classify;
pub mod compiler;
pub mod error;
pub mod facets;
pub mod filters;
pub mod highlight;
pub mod normalize;
pub mod query;
pub mod sort;

pub use error::SearchError;
pub use query::SearchClient;
