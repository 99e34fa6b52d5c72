//! Request and result structs shared by the compiler, the engines and the CLI.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A scalar filter operand.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum FilterValue {
    Number(f64),
    Text(String),
}

impl FilterValue {
    /// Parse CLI/user input: numbers stay numeric, everything else is text.
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        match trimmed.parse::<f64>() {
            Ok(n) if n.is_finite() => FilterValue::Number(n),
            _ => FilterValue::Text(trimmed.to_string()),
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            FilterValue::Number(n) => Some(*n),
            FilterValue::Text(s) => s.parse().ok(),
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        match self {
            FilterValue::Number(n) => serde_json::json!(n),
            FilterValue::Text(s) => serde_json::Value::String(s.clone()),
        }
    }
}

impl std::fmt::Display for FilterValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FilterValue::Number(n) => write!(f, "{n}"),
            FilterValue::Text(s) => f.write_str(s),
        }
    }
}

impl From<&str> for FilterValue {
    fn from(s: &str) -> Self {
        FilterValue::Text(s.to_string())
    }
}

impl From<String> for FilterValue {
    fn from(s: String) -> Self {
        FilterValue::Text(s)
    }
}

impl From<f64> for FilterValue {
    fn from(n: f64) -> Self {
        FilterValue::Number(n)
    }
}

impl From<i64> for FilterValue {
    fn from(n: i64) -> Self {
        FilterValue::Number(n as f64)
    }
}

/// A constraint on one facet.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum Constraint {
    Equals(FilterValue),
    Range {
        min: Option<FilterValue>,
        max: Option<FilterValue>,
    },
}

impl Constraint {
    pub fn equals(value: impl Into<FilterValue>) -> Self {
        Constraint::Equals(value.into())
    }

    pub fn at_least(value: impl Into<FilterValue>) -> Self {
        Constraint::Range {
            min: Some(value.into()),
            max: None,
        }
    }

    pub fn at_most(value: impl Into<FilterValue>) -> Self {
        Constraint::Range {
            min: None,
            max: Some(value.into()),
        }
    }

    pub fn between(min: impl Into<FilterValue>, max: impl Into<FilterValue>) -> Self {
        Constraint::Range {
            min: Some(min.into()),
            max: Some(max.into()),
        }
    }
}

/// Facet name to constraint. Ordered so compiled queries are deterministic.
pub type Filters = BTreeMap<String, Constraint>;

/// An application-level catalog search.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchRequest {
    pub free_text: Option<String>,
    #[serde(default)]
    pub filters: Filters,
    pub sort: Option<String>,
    pub page: u32,
    pub page_size: u32,
}

impl Default for SearchRequest {
    fn default() -> Self {
        Self {
            free_text: None,
            filters: Filters::new(),
            sort: None,
            page: 1,
            page_size: 10,
        }
    }
}

impl SearchRequest {
    pub fn text(free_text: impl Into<String>) -> Self {
        Self {
            free_text: Some(free_text.into()),
            ..Self::default()
        }
    }

    pub fn with_filter(mut self, key: impl Into<String>, constraint: Constraint) -> Self {
        self.filters.insert(key.into(), constraint);
        self
    }

    pub fn with_sort(mut self, token: impl Into<String>) -> Self {
        self.sort = Some(token.into());
        self
    }

    pub fn with_page(mut self, page: u32, page_size: u32) -> Self {
        self.page = page;
        self.page_size = page_size;
        self
    }
}

/// A free-text query against the legal-document index.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LegalSearchRequest {
    pub query: String,
    pub page: u32,
    pub page_size: u32,
}

impl LegalSearchRequest {
    pub fn new(query: impl Into<String>, page_size: u32) -> Self {
        Self {
            query: query.into(),
            page: 1,
            page_size,
        }
    }
}

/// One decoded hit.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchHit {
    pub id: String,
    /// Absent when the engine sorted by a field instead of relevance.
    pub score: Option<f64>,
    pub fields: serde_json::Map<String, serde_json::Value>,
    /// Fragments per field, in the order the engine returned them.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub highlights: BTreeMap<String, Vec<String>>,
}

impl SearchHit {
    pub fn field(&self, name: &str) -> Option<&serde_json::Value> {
        self.fields.get(name)
    }

    pub fn field_str(&self, name: &str) -> Option<&str> {
        self.fields.get(name).and_then(|v| v.as_str())
    }

    pub fn field_f64(&self, name: &str) -> Option<f64> {
        self.fields.get(name).and_then(|v| v.as_f64())
    }
}

/// A `(label, count)` pair from a terms or range aggregation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Bucket {
    pub label: String,
    pub count: u64,
}

pub type FacetBuckets = BTreeMap<String, Vec<Bucket>>;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchResult {
    pub total: u64,
    pub elapsed_ms: u64,
    pub hits: Vec<SearchHit>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub facets: Option<FacetBuckets>,
}
