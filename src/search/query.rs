use tracing::{debug, info};

use crate::config::SearchConfig;
use crate::engine::SearchEngine;
use crate::model::types::{
    FacetBuckets, Filters, LegalSearchRequest, SearchHit, SearchRequest, SearchResult,
};
use crate::search::compiler::SearchRequestCompiler;
use crate::search::error::SearchError;
use crate::search::facets::FacetAggregator;
use crate::search::normalize::normalize;

/// Catalog and legal-document search over an injected engine.
///
/// Holds no mutable state; share it behind an `Arc` and call it from as many
/// tasks as you like.
pub struct SearchClient<E> {
    engine: E,
    compiler: SearchRequestCompiler,
    facets: FacetAggregator,
}

impl<E: SearchEngine> SearchClient<E> {
    pub fn new(engine: E, config: &SearchConfig) -> Self {
        let compiler = SearchRequestCompiler::new(config);
        let facets = FacetAggregator::catalog(compiler.catalog_index());
        Self {
            engine,
            compiler,
            facets,
        }
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub async fn search(&self, request: &SearchRequest) -> Result<SearchResult, SearchError> {
        let compiled = self.compiler.compile(request)?;
        info!(
            backend = "engine",
            query = request.free_text.as_deref().unwrap_or(""),
            filters = request.filters.len(),
            sort = request.sort.as_deref().unwrap_or("relevance"),
            page = request.page,
            page_size = request.page_size,
            "search_start"
        );
        let explicit_sort = compiled.has_explicit_sort();
        let raw = self.engine.execute(&compiled).await?;
        let result = normalize(raw, explicit_sort);
        debug!(total = result.total, hits = result.hits.len(), elapsed_ms = result.elapsed_ms, "search_done");
        Ok(result)
    }

    pub async fn facets(&self, filters: &Filters) -> Result<FacetBuckets, SearchError> {
        let compiled = self.facets.compile(filters);
        info!(filters = filters.len(), facets = self.facets.facets().len(), "facets_start");
        let raw = self.engine.execute(&compiled).await?;
        Ok(self.facets.reshape(raw))
    }

    /// Search and facets in one call. The two requests are independent and
    /// run concurrently; the outcome is the same as calling them in turn.
    pub async fn search_with_facets(
        &self,
        request: &SearchRequest,
    ) -> Result<SearchResult, SearchError> {
        let compiled = self.compiler.compile(request)?;
        let facet_query = self.facets.compile(&request.filters);
        info!(
            query = request.free_text.as_deref().unwrap_or(""),
            page = request.page,
            page_size = request.page_size,
            "search_with_facets_start"
        );
        let explicit_sort = compiled.has_explicit_sort();
        let (hits, buckets) = tokio::join!(
            self.engine.execute(&compiled),
            self.engine.execute(&facet_query)
        );
        let mut result = normalize(hits?, explicit_sort);
        result.facets = Some(self.facets.reshape(buckets?));
        Ok(result)
    }

    pub async fn legal_search(
        &self,
        request: &LegalSearchRequest,
    ) -> Result<SearchResult, SearchError> {
        let compiled = self.compiler.compile_legal(request)?;
        info!(query = request.query.as_str(), page_size = request.page_size, "legal_search_start");
        let raw = self.engine.execute(&compiled).await?;
        Ok(normalize(raw, false))
    }

    /// Title/category/language completions for a partially typed query.
    pub async fn suggest(&self, prefix: &str, size: u32) -> Result<Vec<SearchHit>, SearchError> {
        let Some(compiled) = self.compiler.compile_suggest(prefix, size)? else {
            return Ok(Vec::new());
        };
        debug!(prefix, size, "suggest_start");
        let raw = self.engine.execute(&compiled).await?;
        Ok(normalize(raw, false).hits)
    }
}
