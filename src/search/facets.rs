//! Facet (filter panel) aggregation.
//!
//! Facets are computed from the filter predicates alone, never the free-text
//! clause, so the counts describe the filtered collection regardless of how
//! documents scored against the query text.

use crate::engine::RawHitSet;
use crate::model::types::{FacetBuckets, Filters};
use crate::search::ast::{BoolQuery, CompiledQuery, FacetSpec, Query, RangeEdge};
use crate::search::filters::compile_filters;
use crate::search::normalize::normalize_aggregations;

/// Max distinct values returned for a terms facet.
pub const TERMS_FACET_SIZE: u32 = 20;

/// Facets shown next to catalog results.
pub fn catalog_facets() -> Vec<FacetSpec> {
    vec![
        FacetSpec::terms("categories", "category", TERMS_FACET_SIZE),
        FacetSpec::terms("languages", "language", TERMS_FACET_SIZE),
        FacetSpec::ranges(
            "price_ranges",
            "price",
            vec![
                RangeEdge::new("budget", None, Some(25_000.0)),
                RangeEdge::new("standard", Some(25_000.0), Some(40_000.0)),
                RangeEdge::new("premium", Some(40_000.0), None),
            ],
        ),
        FacetSpec::ranges(
            "rating_ranges",
            "rating",
            vec![
                RangeEdge::new("3+", Some(3.0), None),
                RangeEdge::new("4+", Some(4.0), None),
                RangeEdge::new("4.5+", Some(4.5), None),
            ],
        ),
    ]
}

#[derive(Debug, Clone)]
pub struct FacetAggregator {
    index: String,
    facets: Vec<FacetSpec>,
}

impl FacetAggregator {
    pub fn new(index: impl Into<String>, facets: Vec<FacetSpec>) -> Self {
        Self {
            index: index.into(),
            facets,
        }
    }

    pub fn catalog(index: impl Into<String>) -> Self {
        Self::new(index, catalog_facets())
    }

    pub fn facets(&self) -> &[FacetSpec] {
        &self.facets
    }

    /// Zero-hit, aggregation-only query over the filtered collection.
    pub fn compile(&self, filters: &Filters) -> CompiledQuery {
        let predicates = compile_filters(filters);
        let query = if predicates.is_empty() {
            Query::MatchAll
        } else {
            Query::Bool(BoolQuery {
                filter: predicates,
                ..BoolQuery::default()
            })
        };
        CompiledQuery {
            index: self.index.clone(),
            query,
            sort: Vec::new(),
            from: 0,
            size: 0,
            highlight: None,
            aggregations: self.facets.clone(),
            source_fields: None,
        }
    }

    /// Buckets per requested facet. A facet the engine left out comes back
    /// with no buckets rather than missing.
    pub fn reshape(&self, raw: RawHitSet) -> FacetBuckets {
        let mut out = raw
            .aggregations
            .map(normalize_aggregations)
            .unwrap_or_default();
        for facet in &self.facets {
            out.entry(facet.name.clone()).or_default();
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::RawBucket;
    use crate::model::types::Constraint;
    use std::collections::BTreeMap;

    #[test]
    fn unfiltered_facets_match_everything_with_no_hits() {
        let q = FacetAggregator::catalog("tech_books").compile(&Filters::new());
        assert!(q.query.is_match_all());
        assert_eq!(q.size, 0);
        assert!(q.is_aggregation_only());
        assert!(q.highlight.is_none());
        assert_eq!(q.aggregations.len(), 4);
    }

    #[test]
    fn filters_become_filter_only_bool() {
        let mut filters = Filters::new();
        filters.insert("language".into(), Constraint::equals("Rust"));
        filters.insert("unknown".into(), Constraint::equals("x"));
        let q = FacetAggregator::catalog("tech_books").compile(&filters);
        let Query::Bool(b) = q.query else {
            panic!("expected bool");
        };
        assert!(b.must.is_empty());
        assert!(b.should.is_empty());
        assert_eq!(b.filter.len(), 1);
    }

    #[test]
    fn reshape_fills_missing_and_drops_empty() {
        let agg = FacetAggregator::catalog("tech_books");
        let mut aggs = BTreeMap::new();
        aggs.insert(
            "categories".to_string(),
            vec![
                RawBucket {
                    key: "ML".into(),
                    doc_count: 4,
                },
                RawBucket {
                    key: "Web".into(),
                    doc_count: 0,
                },
            ],
        );
        let out = agg.reshape(RawHitSet {
            aggregations: Some(aggs),
            ..RawHitSet::default()
        });
        assert_eq!(out.len(), 4);
        assert_eq!(out["categories"].len(), 1);
        assert!(out["rating_ranges"].is_empty());
    }
}
