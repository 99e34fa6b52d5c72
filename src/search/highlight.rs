//! Highlight directives and fragment rendering.

use crate::search::ast::{HighlightField, HighlightSpec};

pub const DEFAULT_PRE_TAG: &str = "<mark>";
pub const DEFAULT_POST_TAG: &str = "</mark>";

/// Fragment length for catalog fields.
pub const CATALOG_FRAGMENT_SIZE: u32 = 150;
/// Fragment length for long legal body text.
pub const LEGAL_FRAGMENT_SIZE: u32 = 200;

/// Characters of context kept on each side of a fallback snippet match.
pub const SNIPPET_RADIUS: usize = 100;

/// Title gets one fragment, description (body text) two.
pub fn catalog_highlight(pre_tag: &str, post_tag: &str) -> HighlightSpec {
    HighlightSpec {
        pre_tag: pre_tag.to_string(),
        post_tag: post_tag.to_string(),
        fields: vec![
            HighlightField {
                field: "title".into(),
                fragments: 1,
                fragment_size: CATALOG_FRAGMENT_SIZE,
            },
            HighlightField {
                field: "description".into(),
                fragments: 2,
                fragment_size: CATALOG_FRAGMENT_SIZE,
            },
        ],
    }
}

pub fn legal_highlight(field: &str, pre_tag: &str, post_tag: &str) -> HighlightSpec {
    HighlightSpec {
        pre_tag: pre_tag.to_string(),
        post_tag: post_tag.to_string(),
        fields: vec![HighlightField {
            field: field.to_string(),
            fragments: 3,
            fragment_size: LEGAL_FRAGMENT_SIZE,
        }],
    }
}

/// Swap engine markup for terminal-friendly brackets.
pub fn render_markers(fragment: &str, pre_tag: &str, post_tag: &str) -> String {
    fragment.replace(pre_tag, "【").replace(post_tag, "】")
}

fn fold(c: char) -> char {
    c.to_lowercase().next().unwrap_or(c)
}

/// Excerpt around the first case-insensitive occurrence of `needle`, for hits
/// the engine returned without highlight fragments. Ellipsized on cut sides.
pub fn fallback_snippet(content: &str, needle: &str, radius: usize) -> Option<String> {
    let needle: Vec<char> = needle.trim().trim_matches('"').chars().map(fold).collect();
    if needle.is_empty() {
        return None;
    }
    let chars: Vec<char> = content.chars().collect();
    let folded: Vec<char> = chars.iter().copied().map(fold).collect();
    let pos = folded
        .windows(needle.len())
        .position(|window| window == needle.as_slice())?;

    let start = pos.saturating_sub(radius);
    let end = (pos + needle.len() + radius).min(chars.len());
    let mut snippet: String = chars[start..end].iter().collect();
    if start > 0 {
        snippet.insert_str(0, "...");
    }
    if end < chars.len() {
        snippet.push_str("...");
    }
    Some(snippet)
}
