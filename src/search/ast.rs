//! Engine-neutral query AST.
//!
//! The compiler builds these values; each engine adapter lowers them to its own
//! representation (JSON for Elasticsearch, direct evaluation for the in-memory
//! engine). Nothing here knows about a wire format.

use serde::Serialize;

use crate::model::types::FilterValue;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Operator {
    And,
    Or,
}

/// Edit-distance tolerance for fuzzy term matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Fuzziness {
    Exact,
    /// Terms shorter than `low` chars must match exactly, terms shorter than
    /// `high` tolerate one edit, longer terms tolerate two.
    Auto { low: usize, high: usize },
}

impl Fuzziness {
    /// Length-banded policy: <=2 chars exact, 3..=5 one edit, >=6 two edits.
    pub const DEFAULT_AUTO: Fuzziness = Fuzziness::Auto { low: 3, high: 6 };

    pub fn max_edits(&self, term: &str) -> usize {
        match *self {
            Fuzziness::Exact => 0,
            Fuzziness::Auto { low, high } => {
                let len = term.chars().count();
                if len < low {
                    0
                } else if len < high {
                    1
                } else {
                    2
                }
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeightedField {
    pub name: String,
    pub boost: f32,
}

impl WeightedField {
    pub fn new(name: impl Into<String>, boost: f32) -> Self {
        Self {
            name: name.into(),
            boost,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MultiMatchQuery {
    pub text: String,
    pub fields: Vec<WeightedField>,
    pub operator: Operator,
    pub fuzziness: Fuzziness,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchQuery {
    pub field: String,
    pub text: String,
    pub operator: Operator,
    pub fuzziness: Fuzziness,
    pub boost: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RangeQuery {
    pub field: String,
    pub gte: Option<FilterValue>,
    pub lte: Option<FilterValue>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct BoolQuery {
    /// Required and scored.
    pub must: Vec<Query>,
    /// Optional and scored; at least one must match when `must` and `filter`
    /// are both empty.
    pub should: Vec<Query>,
    /// Required, never scored.
    pub filter: Vec<Query>,
}

impl BoolQuery {
    pub fn requires_should_match(&self) -> bool {
        self.must.is_empty() && self.filter.is_empty() && !self.should.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Query {
    MatchAll,
    MultiMatch(MultiMatchQuery),
    Match(MatchQuery),
    /// Contiguous, in-order token sequence.
    Phrase {
        field: String,
        text: String,
        boost: f32,
    },
    /// Phrase whose last token may be a prefix.
    PhrasePrefix {
        field: String,
        text: String,
        boost: f32,
    },
    Prefix {
        field: String,
        value: String,
        boost: f32,
    },
    Term {
        field: String,
        value: FilterValue,
    },
    Range(RangeQuery),
    Bool(BoolQuery),
}

impl Query {
    pub fn is_match_all(&self) -> bool {
        matches!(self, Query::MatchAll)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    Desc,
}

impl SortOrder {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortOrder::Asc => "asc",
            SortOrder::Desc => "desc",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SortSpec {
    pub field: String,
    pub order: SortOrder,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HighlightField {
    pub field: String,
    pub fragments: u32,
    pub fragment_size: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HighlightSpec {
    pub pre_tag: String,
    pub post_tag: String,
    pub fields: Vec<HighlightField>,
}

/// One bucket edge of a range facet. `from` is inclusive, `to` exclusive.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RangeEdge {
    pub key: String,
    pub from: Option<f64>,
    pub to: Option<f64>,
}

impl RangeEdge {
    pub fn new(key: impl Into<String>, from: Option<f64>, to: Option<f64>) -> Self {
        Self {
            key: key.into(),
            from,
            to,
        }
    }

    pub fn contains(&self, value: f64) -> bool {
        self.from.is_none_or(|f| value >= f) && self.to.is_none_or(|t| value < t)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum FacetKind {
    Terms { field: String, size: u32 },
    Ranges { field: String, ranges: Vec<RangeEdge> },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FacetSpec {
    pub name: String,
    pub kind: FacetKind,
}

impl FacetSpec {
    pub fn terms(name: impl Into<String>, field: impl Into<String>, size: u32) -> Self {
        Self {
            name: name.into(),
            kind: FacetKind::Terms {
                field: field.into(),
                size,
            },
        }
    }

    pub fn ranges(name: impl Into<String>, field: impl Into<String>, ranges: Vec<RangeEdge>) -> Self {
        Self {
            name: name.into(),
            kind: FacetKind::Ranges {
                field: field.into(),
                ranges,
            },
        }
    }
}

/// A fully compiled request: one per call, executed once.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompiledQuery {
    pub index: String,
    pub query: Query,
    /// Empty means relevance order.
    pub sort: Vec<SortSpec>,
    pub from: u64,
    pub size: u64,
    pub highlight: Option<HighlightSpec>,
    pub aggregations: Vec<FacetSpec>,
    /// Restrict returned fields; `None` returns the whole document.
    pub source_fields: Option<Vec<String>>,
}

impl CompiledQuery {
    pub fn has_explicit_sort(&self) -> bool {
        !self.sort.is_empty()
    }

    pub fn is_aggregation_only(&self) -> bool {
        self.size == 0 && !self.aggregations.is_empty()
    }
}
