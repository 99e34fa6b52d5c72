//! In-memory engine that evaluates the query AST by scanning JSON documents.
//!
//! Meant for tests and offline demos, not for large collections: every query
//! is a full scan. Text handling is deliberately simple (lowercased
//! alphanumeric tokens, Levenshtein distance for fuzzy terms), but the
//! observable contract matches the real engine where the search layer relies
//! on it: filters never score, field sorts drop scores and put missing values
//! last, range facets report every edge (including empty ones) and terms
//! facets only report values that occur. Each free-text term of an AND
//! multi-match may be satisfied by a different field, as in the per-term
//! clauses the Elasticsearch adapter sends.

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::time::Instant;

use chrono::NaiveDate;
use serde_json::{Map, Value};
use tracing::debug;

use super::{EngineError, RawBucket, RawHit, RawHitSet, SearchEngine};
use crate::model::types::FilterValue;
use crate::search::ast::{
    BoolQuery, CompiledQuery, FacetKind, FacetSpec, HighlightField, HighlightSpec, MatchQuery,
    MultiMatchQuery, Operator, Query, RangeQuery, SortOrder, SortSpec,
};

/// Score weight of a fuzzy (non-exact) token match relative to an exact one.
const FUZZY_WEIGHT: f64 = 0.5;

#[derive(Debug, Clone)]
struct StoredDoc {
    id: String,
    source: Map<String, Value>,
}

#[derive(Debug, Clone, Default)]
pub struct MemoryEngine {
    indices: HashMap<String, Vec<StoredDoc>>,
}

impl MemoryEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `docs` under `index`. A document's `_id` key, if present, is
    /// used as its id and removed from the source; otherwise ids are 1-based
    /// positions.
    pub fn with_index(mut self, index: impl Into<String>, docs: Vec<Value>) -> Self {
        let stored = docs
            .into_iter()
            .enumerate()
            .filter_map(|(pos, doc)| match doc {
                Value::Object(mut source) => {
                    let id = match source.remove("_id") {
                        Some(Value::String(s)) => s,
                        Some(other) => other.to_string(),
                        None => (pos + 1).to_string(),
                    };
                    Some(StoredDoc { id, source })
                }
                _ => None,
            })
            .collect();
        self.indices.insert(index.into(), stored);
        self
    }

    /// Fixture format: a JSON object mapping index names to document arrays.
    pub fn from_fixture_str(raw: &str) -> Result<Self, EngineError> {
        let parsed: BTreeMap<String, Vec<Value>> = serde_json::from_str(raw)
            .map_err(|e| EngineError::Decode(format!("fixture: {e}")))?;
        Ok(parsed
            .into_iter()
            .fold(Self::new(), |engine, (index, docs)| engine.with_index(index, docs)))
    }

    pub fn from_fixture_file(path: &Path) -> Result<Self, EngineError> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            EngineError::Unavailable(format!("reading fixture {}: {e}", path.display()))
        })?;
        Self::from_fixture_str(&raw)
    }

    pub fn doc_count(&self, index: &str) -> usize {
        self.indices.get(index).map_or(0, Vec::len)
    }

    /// Evaluate a compiled query synchronously.
    pub fn run(&self, query: &CompiledQuery) -> Result<RawHitSet, EngineError> {
        let started = Instant::now();
        let docs = self.indices.get(&query.index).ok_or_else(|| {
            EngineError::Unavailable(format!("no such index [{}]", query.index))
        })?;

        let mut matched: Vec<(&StoredDoc, f64)> = docs
            .iter()
            .filter_map(|doc| eval(&query.query, &doc.source).map(|score| (doc, score)))
            .collect();

        // Bucket counts do not depend on hit order.
        if !query.is_aggregation_only() {
            if query.has_explicit_sort() {
                matched.sort_by(|(a, _), (b, _)| compare_by_sort(&query.sort, a, b));
            } else {
                matched.sort_by(|(_, a), (_, b)| b.partial_cmp(a).unwrap_or(Ordering::Equal));
            }
        }

        let aggregations = if query.aggregations.is_empty() {
            None
        } else {
            Some(
                query
                    .aggregations
                    .iter()
                    .map(|facet| (facet.name.clone(), aggregate(facet, &matched)))
                    .collect(),
            )
        };

        let total = matched.len() as u64;
        let from = usize::try_from(query.from).unwrap_or(usize::MAX);
        let size = usize::try_from(query.size).unwrap_or(usize::MAX);
        let hits = matched
            .into_iter()
            .skip(from)
            .take(size)
            .map(|(doc, score)| RawHit {
                id: doc.id.clone(),
                score: (!query.has_explicit_sort()).then_some(score),
                source: project(&doc.source, query.source_fields.as_deref()),
                highlight: query
                    .highlight
                    .as_ref()
                    .map(|spec| highlight(spec, &query.query, &doc.source))
                    .filter(|h| !h.is_empty()),
            })
            .collect();

        debug!(
            index = query.index.as_str(),
            total,
            elapsed_us = started.elapsed().as_micros() as u64,
            "memory engine query"
        );
        Ok(RawHitSet {
            total,
            elapsed_ms: started.elapsed().as_millis() as u64,
            hits,
            aggregations,
        })
    }
}

impl SearchEngine for MemoryEngine {
    async fn execute(&self, query: &CompiledQuery) -> Result<RawHitSet, EngineError> {
        self.run(query)
    }
}

// ---------------------------------------------------------------------------
// Field access
// ---------------------------------------------------------------------------

fn lookup<'a>(doc: &'a Map<String, Value>, path: &str) -> Option<&'a Value> {
    let mut parts = path.split('.');
    let mut current = doc.get(parts.next()?)?;
    for part in parts {
        current = current.as_object()?.get(part)?;
    }
    Some(current)
}

fn scalars(value: &Value) -> Vec<&Value> {
    match value {
        Value::Array(items) => items.iter().filter(|v| !v.is_array()).collect(),
        Value::Null => Vec::new(),
        other => vec![other],
    }
}

fn text_of(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Array(items) => items.iter().map(text_of).collect::<Vec<_>>().join(" "),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
        .collect()
}

fn project(source: &Map<String, Value>, fields: Option<&[String]>) -> Map<String, Value> {
    match fields {
        None => source.clone(),
        Some(fields) => source
            .iter()
            .filter(|(key, _)| {
                fields
                    .iter()
                    .any(|f| f == *key || f.split('.').next() == Some(key.as_str()))
            })
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect(),
    }
}

// ---------------------------------------------------------------------------
// Matching
// ---------------------------------------------------------------------------

/// Weight of the best match of `term` among `tokens`: 1.0 exact, less when
/// only within the allowed edit distance.
fn term_weight(tokens: &[String], term: &str, max_edits: usize) -> Option<f64> {
    if tokens.iter().any(|t| t == term) {
        return Some(1.0);
    }
    if max_edits > 0
        && tokens
            .iter()
            .any(|t| strsim::levenshtein(t, term) <= max_edits)
    {
        return Some(FUZZY_WEIGHT);
    }
    None
}

fn combine(weights: Vec<Option<f64>>, operator: Operator) -> Option<f64> {
    if weights.is_empty() {
        return None;
    }
    match operator {
        Operator::And => weights.into_iter().sum::<Option<f64>>(),
        Operator::Or => {
            let matched: Vec<f64> = weights.into_iter().flatten().collect();
            (!matched.is_empty()).then(|| matched.iter().sum())
        }
    }
}

fn eval_multi_match(mm: &MultiMatchQuery, doc: &Map<String, Value>) -> Option<f64> {
    let fields: Vec<(Vec<String>, f64)> = mm
        .fields
        .iter()
        .filter_map(|f| lookup(doc, &f.name).map(|v| (tokenize(&text_of(v)), f64::from(f.boost))))
        .collect();
    let weights = tokenize(&mm.text)
        .iter()
        .map(|term| {
            let edits = mm.fuzziness.max_edits(term);
            fields
                .iter()
                .filter_map(|(tokens, boost)| term_weight(tokens, term, edits).map(|w| w * boost))
                .fold(None, |best: Option<f64>, w| Some(best.map_or(w, |b| b.max(w))))
        })
        .collect();
    combine(weights, mm.operator)
}

fn eval_match(m: &MatchQuery, doc: &Map<String, Value>) -> Option<f64> {
    let tokens = tokenize(&text_of(lookup(doc, &m.field)?));
    let weights = tokenize(&m.text)
        .iter()
        .map(|term| term_weight(&tokens, term, m.fuzziness.max_edits(term)))
        .collect();
    combine(weights, m.operator).map(|s| s * f64::from(m.boost))
}

fn phrase_position(tokens: &[String], phrase: &[String], last_is_prefix: bool) -> Option<usize> {
    if phrase.is_empty() || phrase.len() > tokens.len() {
        return None;
    }
    let (head, last) = phrase.split_at(phrase.len() - 1);
    tokens.windows(phrase.len()).position(|window| {
        window[..head.len()] == *head
            && if last_is_prefix {
                window[head.len()].starts_with(last[0].as_str())
            } else {
                window[head.len()] == last[0]
            }
    })
}

fn eval_phrase(field: &str, text: &str, prefix: bool, doc: &Map<String, Value>) -> bool {
    let Some(value) = lookup(doc, field) else {
        return false;
    };
    phrase_position(&tokenize(&text_of(value)), &tokenize(text), prefix).is_some()
}

fn eval_prefix(field: &str, prefix: &str, doc: &Map<String, Value>) -> bool {
    let prefix = prefix.to_lowercase();
    lookup(doc, field).is_some_and(|value| {
        scalars(value).iter().any(|v| {
            let text = text_of(v).to_lowercase();
            text.starts_with(&prefix) || tokenize(&text).iter().any(|t| t.starts_with(&prefix))
        })
    })
}

fn parse_date(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s.get(..10).unwrap_or(s), "%Y-%m-%d").ok()
}

fn compare_values(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64()?.partial_cmp(&y.as_f64()?),
        (Value::String(x), Value::String(y)) => match (parse_date(x), parse_date(y)) {
            (Some(dx), Some(dy)) => Some(dx.cmp(&dy)),
            _ => Some(x.cmp(y)),
        },
        (Value::Number(x), Value::String(y)) => x.as_f64()?.partial_cmp(&y.parse::<f64>().ok()?),
        (Value::String(x), Value::Number(y)) => x.parse::<f64>().ok()?.partial_cmp(&y.as_f64()?),
        (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
        _ => None,
    }
}

fn eval_term(field: &str, value: &FilterValue, doc: &Map<String, Value>) -> bool {
    let wanted = value.to_json();
    lookup(doc, field).is_some_and(|v| {
        scalars(v)
            .into_iter()
            .any(|candidate| compare_values(candidate, &wanted) == Some(Ordering::Equal))
    })
}

fn eval_range(range: &RangeQuery, doc: &Map<String, Value>) -> bool {
    let gte = range.gte.as_ref().map(FilterValue::to_json);
    let lte = range.lte.as_ref().map(FilterValue::to_json);
    lookup(doc, &range.field).is_some_and(|v| {
        scalars(v).into_iter().any(|candidate| {
            let lower_ok = gte.as_ref().is_none_or(|bound| {
                matches!(
                    compare_values(candidate, bound),
                    Some(Ordering::Greater | Ordering::Equal)
                )
            });
            let upper_ok = lte.as_ref().is_none_or(|bound| {
                matches!(
                    compare_values(candidate, bound),
                    Some(Ordering::Less | Ordering::Equal)
                )
            });
            lower_ok && upper_ok
        })
    })
}

fn eval_bool(b: &BoolQuery, doc: &Map<String, Value>) -> Option<f64> {
    if !b.filter.iter().all(|q| eval(q, doc).is_some()) {
        return None;
    }
    let mut score = 0.0;
    for q in &b.must {
        score += eval(q, doc)?;
    }
    let should: Vec<f64> = b.should.iter().filter_map(|q| eval(q, doc)).collect();
    if b.requires_should_match() && should.is_empty() {
        return None;
    }
    Some(score + should.iter().sum::<f64>())
}

/// `Some(score)` when the document matches.
fn eval(query: &Query, doc: &Map<String, Value>) -> Option<f64> {
    match query {
        Query::MatchAll => Some(1.0),
        Query::MultiMatch(mm) => eval_multi_match(mm, doc),
        Query::Match(m) => eval_match(m, doc),
        Query::Phrase { field, text, boost } => {
            eval_phrase(field, text, false, doc).then_some(f64::from(*boost))
        }
        Query::PhrasePrefix { field, text, boost } => {
            eval_phrase(field, text, true, doc).then_some(f64::from(*boost))
        }
        Query::Prefix {
            field,
            value,
            boost,
        } => eval_prefix(field, value, doc).then_some(f64::from(*boost)),
        Query::Term { field, value } => eval_term(field, value, doc).then_some(1.0),
        Query::Range(range) => eval_range(range, doc).then_some(1.0),
        Query::Bool(b) => eval_bool(b, doc),
    }
}

// ---------------------------------------------------------------------------
// Sorting
// ---------------------------------------------------------------------------

fn sort_value<'a>(doc: &'a StoredDoc, field: &str) -> Option<&'a Value> {
    lookup(&doc.source, field).filter(|v| !v.is_null())
}

fn compare_by_sort(specs: &[SortSpec], a: &StoredDoc, b: &StoredDoc) -> Ordering {
    for spec in specs {
        let ord = match (sort_value(a, &spec.field), sort_value(b, &spec.field)) {
            (Some(x), Some(y)) => {
                let ord = compare_values(x, y).unwrap_or(Ordering::Equal);
                match spec.order {
                    SortOrder::Asc => ord,
                    SortOrder::Desc => ord.reverse(),
                }
            }
            // Missing values sort last in both directions.
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        };
        if ord != Ordering::Equal {
            return ord;
        }
    }
    Ordering::Equal
}

// ---------------------------------------------------------------------------
// Aggregations
// ---------------------------------------------------------------------------

fn bucket_key(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn aggregate(facet: &FacetSpec, matched: &[(&StoredDoc, f64)]) -> Vec<RawBucket> {
    match &facet.kind {
        FacetKind::Terms { field, size } => {
            let mut counts: BTreeMap<String, u64> = BTreeMap::new();
            for (doc, _) in matched {
                if let Some(value) = lookup(&doc.source, field) {
                    for v in scalars(value) {
                        *counts.entry(bucket_key(v)).or_default() += 1;
                    }
                }
            }
            let mut buckets: Vec<RawBucket> = counts
                .into_iter()
                .map(|(key, doc_count)| RawBucket { key, doc_count })
                .collect();
            buckets.sort_by(|a, b| b.doc_count.cmp(&a.doc_count).then_with(|| a.key.cmp(&b.key)));
            buckets.truncate(*size as usize);
            buckets
        }
        FacetKind::Ranges { field, ranges } => ranges
            .iter()
            .map(|edge| RawBucket {
                key: edge.key.clone(),
                doc_count: matched
                    .iter()
                    .filter(|(doc, _)| {
                        lookup(&doc.source, field)
                            .and_then(Value::as_f64)
                            .is_some_and(|v| edge.contains(v))
                    })
                    .count() as u64,
            })
            .collect(),
    }
}

// ---------------------------------------------------------------------------
// Highlighting
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
struct HighlightTerm {
    term: String,
    max_edits: usize,
    prefix: bool,
}

/// Terms from scoring clauses that target `field`. Filter clauses never
/// highlight.
fn highlight_terms(query: &Query, field: &str, out: &mut Vec<HighlightTerm>) {
    let exact = |text: &str, prefix_last: bool, out: &mut Vec<HighlightTerm>| {
        let tokens = tokenize(text);
        let n = tokens.len();
        out.extend(tokens.into_iter().enumerate().map(|(i, term)| HighlightTerm {
            term,
            max_edits: 0,
            prefix: prefix_last && i + 1 == n,
        }));
    };
    match query {
        Query::MultiMatch(mm) if mm.fields.iter().any(|f| f.name == field) => {
            out.extend(tokenize(&mm.text).into_iter().map(|term| HighlightTerm {
                max_edits: mm.fuzziness.max_edits(&term),
                term,
                prefix: false,
            }));
        }
        Query::Match(m) if m.field == field => {
            out.extend(tokenize(&m.text).into_iter().map(|term| HighlightTerm {
                max_edits: m.fuzziness.max_edits(&term),
                term,
                prefix: false,
            }));
        }
        Query::Phrase { field: f, text, .. } if f == field => exact(text, false, out),
        Query::PhrasePrefix { field: f, text, .. } if f == field => exact(text, true, out),
        Query::Bool(b) => {
            for q in b.must.iter().chain(&b.should) {
                highlight_terms(q, field, out);
            }
        }
        _ => {}
    }
}

fn word_matches(word: &str, terms: &[HighlightTerm]) -> bool {
    tokenize(word).iter().any(|token| {
        terms.iter().any(|t| {
            token == &t.term
                || (t.prefix && token.starts_with(t.term.as_str()))
                || (t.max_edits > 0 && strsim::levenshtein(token, &t.term) <= t.max_edits)
        })
    })
}

fn highlight_field(
    text: &str,
    terms: &[HighlightTerm],
    field: &HighlightField,
    spec: &HighlightSpec,
) -> Vec<String> {
    let words: Vec<&str> = text.split_whitespace().collect();
    let matched: Vec<bool> = words.iter().map(|w| word_matches(w, terms)).collect();
    let budget = field.fragment_size as usize;
    let mut fragments = Vec::new();
    let mut next_free = 0;

    for (i, _) in matched.iter().enumerate().filter(|(_, m)| **m) {
        if fragments.len() >= field.fragments as usize {
            break;
        }
        if i < next_free {
            continue;
        }
        let mut start = i;
        let mut end = i + 1;
        let mut len = words[i].chars().count();
        while start > next_free && len + words[start - 1].chars().count() < budget / 2 {
            start -= 1;
            len += words[start].chars().count() + 1;
        }
        while end < words.len() && len + words[end].chars().count() < budget {
            len += words[end].chars().count() + 1;
            end += 1;
        }
        let fragment = (start..end)
            .map(|j| {
                if matched[j] {
                    format!("{}{}{}", spec.pre_tag, words[j], spec.post_tag)
                } else {
                    words[j].to_string()
                }
            })
            .collect::<Vec<_>>()
            .join(" ");
        fragments.push(fragment);
        next_free = end;
    }
    fragments
}

fn highlight(
    spec: &HighlightSpec,
    query: &Query,
    doc: &Map<String, Value>,
) -> BTreeMap<String, Vec<String>> {
    let mut out = BTreeMap::new();
    for field in &spec.fields {
        let mut terms = Vec::new();
        highlight_terms(query, &field.field, &mut terms);
        if terms.is_empty() {
            continue;
        }
        let Some(value) = lookup(doc, &field.field) else {
            continue;
        };
        let fragments = highlight_field(&text_of(value), &terms, field, spec);
        if !fragments.is_empty() {
            out.insert(field.field.clone(), fragments);
        }
    }
    out
}
