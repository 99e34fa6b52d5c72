//! Terminal rendering of results for the CLI.

use colored::Colorize;

use crate::config::HighlightConfig;
use crate::model::types::{Bucket, FacetBuckets, SearchHit, SearchResult};
use crate::search::compiler::LEGAL_CONTENT_FIELD;
use crate::search::highlight::{SNIPPET_RADIUS, fallback_snippet, render_markers};

fn field_display(hit: &SearchHit, name: &str) -> String {
    match hit.field(name) {
        Some(serde_json::Value::String(s)) => s.clone(),
        Some(serde_json::Value::Null) | None => "-".to_string(),
        Some(other) => other.to_string(),
    }
}

fn score_display(score: Option<f64>) -> String {
    match score {
        Some(s) => format!("{s:.2}"),
        None => "N/A (sorted)".to_string(),
    }
}

pub fn format_catalog(result: &SearchResult, page: u32, page_size: u32, tags: &HighlightConfig) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "{} results ({} ms)\n",
        result.total.to_string().bold(),
        result.elapsed_ms
    ));
    if result.hits.is_empty() {
        out.push_str("No matching books.\n");
    }
    let first = u64::from(page.saturating_sub(1)) * u64::from(page_size);
    for (i, hit) in result.hits.iter().enumerate() {
        out.push_str(&format!(
            "{}. {}  rating {}\n",
            first + i as u64 + 1,
            field_display(hit, "title").bold(),
            field_display(hit, "rating")
        ));
        out.push_str(&format!(
            "   {} | {} | {} | price {} | {} pages | {}\n",
            field_display(hit, "author"),
            field_display(hit, "category"),
            field_display(hit, "language"),
            field_display(hit, "price"),
            field_display(hit, "pages"),
            field_display(hit, "publish_date"),
        ));
        for (field, fragments) in &hit.highlights {
            if let Some(fragment) = fragments.first() {
                out.push_str(&format!(
                    "   {}: {}\n",
                    field.dimmed(),
                    render_markers(fragment, &tags.pre_tag, &tags.post_tag)
                ));
            }
        }
        out.push_str(&format!("   score: {}\n", score_display(hit.score)));
    }
    if let Some(facets) = &result.facets {
        out.push_str(&format_facets(facets));
    }
    out
}

fn format_buckets(name: &str, buckets: &[Bucket]) -> String {
    let mut out = format!("{}\n", name.bold());
    if buckets.is_empty() {
        out.push_str("   (none)\n");
    }
    for b in buckets {
        out.push_str(&format!("   {}: {}\n", b.label, b.count));
    }
    out
}

pub fn format_facets(facets: &FacetBuckets) -> String {
    facets
        .iter()
        .map(|(name, buckets)| format_buckets(name, buckets))
        .collect()
}

/// Legal hits show their highlight fragments, or an excerpt around the query
/// when the engine returned none.
pub fn format_legal(result: &SearchResult, query: &str, tags: &HighlightConfig) -> String {
    let mut out = format!("{} matching documents\n", result.total.to_string().bold());
    if result.hits.is_empty() {
        out.push_str(&format!("No results for '{query}'.\n"));
    }
    for (i, hit) in result.hits.iter().enumerate() {
        let name = hit
            .field_str("filename")
            .map(str::to_string)
            .unwrap_or_else(|| hit.id.clone());
        out.push_str(&format!(
            "\n{}. {} (relevance {})\n",
            i + 1,
            name.bold(),
            score_display(hit.score)
        ));
        match hit.highlights.get(LEGAL_CONTENT_FIELD) {
            Some(fragments) if !fragments.is_empty() => {
                for fragment in fragments {
                    out.push_str(&format!(
                        "   {}\n",
                        render_markers(fragment, &tags.pre_tag, &tags.post_tag)
                    ));
                }
            }
            _ => {
                let content = hit
                    .field("attachment")
                    .and_then(|a| a.get("content"))
                    .and_then(|c| c.as_str())
                    .unwrap_or("");
                if let Some(snippet) = fallback_snippet(content, query, SNIPPET_RADIUS) {
                    out.push_str(&format!("   {snippet}\n"));
                }
            }
        }
    }
    out
}

pub fn format_suggestions(hits: &[SearchHit]) -> String {
    if hits.is_empty() {
        return "No suggestions.\n".to_string();
    }
    hits.iter()
        .map(|h| format!("   - {} ({})\n", field_display(h, "title"), field_display(h, "category")))
        .collect()
}
