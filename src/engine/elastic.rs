//! Elasticsearch adapter: AST lowering, HTTP transport and response decoding.

use std::collections::BTreeMap;
use std::time::Duration;

use reqwest::Client;
use serde::Deserialize;
use serde_json::{Map, Value, json};
use tracing::{debug, warn};

use super::{EngineError, RawBucket, RawHit, RawHitSet, SearchEngine};
use crate::config::EngineConfig;
use crate::search::ast::{
    BoolQuery, CompiledQuery, FacetKind, FacetSpec, Fuzziness, HighlightSpec, MatchQuery,
    MultiMatchQuery, Operator, Query, RangeQuery, SortSpec,
};

// ============================================================================
// Lowering
// ============================================================================

fn fuzziness_json(f: Fuzziness) -> Option<Value> {
    match f {
        Fuzziness::Exact => None,
        Fuzziness::Auto { low, high } => Some(Value::String(format!("AUTO:{low},{high}"))),
    }
}

fn boost_field(name: &str, boost: f32) -> String {
    if (boost - 1.0).abs() < f32::EPSILON {
        name.to_string()
    } else {
        format!("{name}^{boost}")
    }
}

fn multi_match_body(text: &str, mm: &MultiMatchQuery) -> Value {
    let mut body = json!({
        "query": text,
        "fields": mm.fields.iter().map(|f| boost_field(&f.name, f.boost)).collect::<Vec<_>>(),
        "operator": mm.operator,
    });
    if let Some(fuzz) = fuzziness_json(mm.fuzziness) {
        body["fuzziness"] = fuzz;
    }
    json!({ "multi_match": body })
}

/// A plain `multi_match` is `best_fields`: with `operator: and` every term
/// would have to occur in one field. Each term gets its own clause instead,
/// so terms may match in different fields and keep their fuzziness.
fn lower_multi_match(mm: &MultiMatchQuery) -> Value {
    let terms: Vec<&str> = mm.text.split_whitespace().collect();
    if mm.operator == Operator::And && terms.len() > 1 {
        let must: Vec<Value> = terms.iter().map(|term| multi_match_body(term, mm)).collect();
        return json!({ "bool": { "must": must } });
    }
    multi_match_body(&mm.text, mm)
}

fn lower_match(m: &MatchQuery) -> Value {
    let mut body = json!({
        "query": m.text,
        "operator": m.operator,
        "boost": m.boost,
    });
    if let Some(fuzz) = fuzziness_json(m.fuzziness) {
        body["fuzziness"] = fuzz;
    }
    json!({ "match": { m.field.clone(): body } })
}

fn lower_range(r: &RangeQuery) -> Value {
    let mut bounds = Map::new();
    if let Some(v) = &r.gte {
        bounds.insert("gte".into(), v.to_json());
    }
    if let Some(v) = &r.lte {
        bounds.insert("lte".into(), v.to_json());
    }
    json!({ "range": { r.field.clone(): bounds } })
}

fn lower_bool(b: &BoolQuery) -> Value {
    let mut body = Map::new();
    for (key, clauses) in [("must", &b.must), ("should", &b.should), ("filter", &b.filter)] {
        if !clauses.is_empty() {
            body.insert(key.into(), Value::Array(clauses.iter().map(lower_query).collect()));
        }
    }
    if b.requires_should_match() {
        body.insert("minimum_should_match".into(), json!(1));
    }
    json!({ "bool": body })
}

/// Lower one AST node to the query DSL.
pub fn lower_query(query: &Query) -> Value {
    match query {
        Query::MatchAll => json!({ "match_all": {} }),
        Query::MultiMatch(mm) => lower_multi_match(mm),
        Query::Match(m) => lower_match(m),
        Query::Phrase { field, text, boost } => {
            json!({ "match_phrase": { field.clone(): { "query": text, "boost": boost } } })
        }
        Query::PhrasePrefix { field, text, boost } => {
            json!({ "match_phrase_prefix": { field.clone(): { "query": text, "boost": boost } } })
        }
        Query::Prefix {
            field,
            value,
            boost,
        } => json!({ "prefix": { field.clone(): { "value": value, "boost": boost } } }),
        Query::Term { field, value } => json!({ "term": { field.clone(): value.to_json() } }),
        Query::Range(r) => lower_range(r),
        Query::Bool(b) => lower_bool(b),
    }
}

fn lower_sort(sort: &[SortSpec]) -> Value {
    Value::Array(
        sort.iter()
            .map(|s| json!({ s.field.clone(): { "order": s.order.as_str() } }))
            .collect(),
    )
}

fn lower_highlight(spec: &HighlightSpec) -> Value {
    let fields: Map<String, Value> = spec
        .fields
        .iter()
        .map(|f| {
            (
                f.field.clone(),
                json!({
                    "number_of_fragments": f.fragments,
                    "fragment_size": f.fragment_size,
                }),
            )
        })
        .collect();
    json!({
        "pre_tags": [spec.pre_tag],
        "post_tags": [spec.post_tag],
        "fields": fields,
    })
}

fn lower_facet(facet: &FacetSpec) -> Value {
    match &facet.kind {
        FacetKind::Terms { field, size } => json!({ "terms": { "field": field, "size": size } }),
        FacetKind::Ranges { field, ranges } => {
            let ranges: Vec<Value> = ranges
                .iter()
                .map(|edge| {
                    let mut r = Map::new();
                    r.insert("key".into(), json!(edge.key));
                    if let Some(from) = edge.from {
                        r.insert("from".into(), json!(from));
                    }
                    if let Some(to) = edge.to {
                        r.insert("to".into(), json!(to));
                    }
                    Value::Object(r)
                })
                .collect();
            json!({ "range": { "field": field, "ranges": ranges } })
        }
    }
}

/// Full `_search` request body for a compiled query.
pub fn to_search_body(query: &CompiledQuery) -> Value {
    let mut body = json!({
        "query": lower_query(&query.query),
        "from": query.from,
        "size": query.size,
    });
    if query.has_explicit_sort() {
        body["sort"] = lower_sort(&query.sort);
    }
    if let Some(hl) = &query.highlight {
        body["highlight"] = lower_highlight(hl);
    }
    if !query.aggregations.is_empty() {
        let aggs: Map<String, Value> = query
            .aggregations
            .iter()
            .map(|f| (f.name.clone(), lower_facet(f)))
            .collect();
        body["aggs"] = Value::Object(aggs);
    }
    if let Some(fields) = &query.source_fields {
        body["_source"] = json!(fields);
    }
    body
}

// ============================================================================
// Decoding
// ============================================================================

#[derive(Debug, Deserialize)]
struct EsResponse {
    #[serde(default)]
    took: u64,
    hits: EsHits,
    #[serde(default)]
    aggregations: Option<BTreeMap<String, EsAggregation>>,
}

#[derive(Debug, Deserialize)]
struct EsHits {
    total: Option<EsTotal>,
    #[serde(default)]
    hits: Vec<EsHit>,
}

/// `hits.total` is an object since 7.x and a bare number before.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum EsTotal {
    Object { value: u64 },
    Count(u64),
}

#[derive(Debug, Deserialize)]
struct EsHit {
    #[serde(rename = "_id")]
    id: String,
    #[serde(rename = "_score")]
    score: Option<f64>,
    #[serde(rename = "_source", default)]
    source: Map<String, Value>,
    #[serde(default)]
    highlight: Option<BTreeMap<String, Vec<String>>>,
}

#[derive(Debug, Deserialize)]
struct EsAggregation {
    #[serde(default)]
    buckets: Vec<EsBucket>,
}

#[derive(Debug, Deserialize)]
struct EsBucket {
    key: Value,
    doc_count: u64,
}

fn bucket_label(key: Value) -> String {
    match key {
        Value::String(s) => s,
        other => other.to_string(),
    }
}

/// Decode a `_search` response body.
pub fn decode_response(body: &str) -> Result<RawHitSet, EngineError> {
    let resp: EsResponse =
        serde_json::from_str(body).map_err(|e| EngineError::Decode(e.to_string()))?;
    let total = match resp.hits.total {
        Some(EsTotal::Object { value }) | Some(EsTotal::Count(value)) => value,
        None => resp.hits.hits.len() as u64,
    };
    Ok(RawHitSet {
        total,
        elapsed_ms: resp.took,
        hits: resp
            .hits
            .hits
            .into_iter()
            .map(|h| RawHit {
                id: h.id,
                score: h.score,
                source: h.source,
                highlight: h.highlight,
            })
            .collect(),
        aggregations: resp.aggregations.map(|aggs| {
            aggs.into_iter()
                .map(|(name, agg)| {
                    let buckets = agg
                        .buckets
                        .into_iter()
                        .map(|b| RawBucket {
                            key: bucket_label(b.key),
                            doc_count: b.doc_count,
                        })
                        .collect();
                    (name, buckets)
                })
                .collect()
        }),
    })
}

// ============================================================================
// Transport
// ============================================================================

/// Elasticsearch over HTTP. Cheap to share: the inner client pools
/// connections and is safe for concurrent use.
#[derive(Debug, Clone)]
pub struct ElasticEngine {
    client: Client,
    base_url: String,
    username: Option<String>,
    password: Option<String>,
}

impl ElasticEngine {
    pub fn new(config: &EngineConfig) -> Result<Self, EngineError> {
        let client = Client::builder()
            .timeout(config.timeout())
            .connect_timeout(config.timeout().min(Duration::from_secs(5)))
            .user_agent(concat!("catalog-search/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| EngineError::Unavailable(format!("building http client: {e}")))?;
        Ok(Self {
            client,
            base_url: config.url.trim_end_matches('/').to_string(),
            username: config.username.clone(),
            password: config.password.clone(),
        })
    }

    pub fn search_url(&self, index: &str) -> String {
        format!("{}/{}/_search", self.base_url, index)
    }
}

impl SearchEngine for ElasticEngine {
    async fn execute(&self, query: &CompiledQuery) -> Result<RawHitSet, EngineError> {
        let url = self.search_url(&query.index);
        let body = to_search_body(query);
        debug!(url = url.as_str(), body = %body, "elasticsearch request");

        let mut request = self.client.post(&url).json(&body);
        if let Some(user) = &self.username {
            request = request.basic_auth(user, self.password.as_deref());
        }

        let response = request
            .send()
            .await
            .map_err(|e| EngineError::Unavailable(format!("request to {url} failed: {e}")))?;
        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| EngineError::Unavailable(format!("reading response: {e}")))?;

        if !status.is_success() {
            warn!(status = status.as_u16(), index = query.index.as_str(), "elasticsearch error");
            let snippet: String = text.chars().take(300).collect();
            return Err(EngineError::Unavailable(format!(
                "elasticsearch returned {status}: {snippet}"
            )));
        }
        decode_response(&text)
    }
}
