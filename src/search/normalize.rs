//! Raw engine hits to application-facing results.
//!
//! Pure decoding: hits are never filtered, re-ranked or rewritten here.

use crate::engine::{RawBucket, RawHit, RawHitSet};
use crate::model::types::{Bucket, FacetBuckets, SearchHit, SearchResult};

/// Decode a hit set. When `explicit_sort` is set the engine ordered by a field
/// and scores are meaningless, so every hit's score is dropped.
pub fn normalize(raw: RawHitSet, explicit_sort: bool) -> SearchResult {
    let facets = raw.aggregations.map(normalize_aggregations);
    SearchResult {
        total: raw.total,
        elapsed_ms: raw.elapsed_ms,
        hits: raw
            .hits
            .into_iter()
            .map(|hit| normalize_hit(hit, explicit_sort))
            .collect(),
        facets,
    }
}

pub fn normalize_hit(hit: RawHit, explicit_sort: bool) -> SearchHit {
    SearchHit {
        id: hit.id,
        score: if explicit_sort { None } else { hit.score },
        fields: hit.source,
        highlights: hit.highlight.unwrap_or_default(),
    }
}

/// Reshape aggregation buckets, dropping empty ones. Facets are computed at
/// query time only; a zero count means "not present", not "present with 0".
pub fn normalize_aggregations(
    aggregations: std::collections::BTreeMap<String, Vec<RawBucket>>,
) -> FacetBuckets {
    aggregations
        .into_iter()
        .map(|(name, buckets)| {
            let buckets = buckets
                .into_iter()
                .filter(|b| b.doc_count > 0)
                .map(|b| Bucket {
                    label: b.key,
                    count: b.doc_count,
                })
                .collect();
            (name, buckets)
        })
        .collect()
}
