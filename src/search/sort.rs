//! Sort tokens to field + direction.

use tracing::debug;

use crate::search::ast::{SortOrder, SortSpec};

const SORT_TOKENS: &[(&str, &str, SortOrder)] = &[
    ("price_asc", "price", SortOrder::Asc),
    ("price_desc", "price", SortOrder::Desc),
    ("rating_desc", "rating", SortOrder::Desc),
    ("newest", "publish_date", SortOrder::Desc),
    ("pages_desc", "pages", SortOrder::Desc),
];

/// Tokens accepted by [`compile_sort`].
pub fn sort_tokens() -> impl Iterator<Item = &'static str> {
    SORT_TOKENS.iter().map(|(token, _, _)| *token)
}

/// Resolve a sort token. `None` keeps relevance order; so does any token not
/// in the table. Sorting by a field means the engine will not compute scores.
pub fn compile_sort(token: Option<&str>) -> Option<SortSpec> {
    let token = token.map(str::trim).filter(|t| !t.is_empty())?;
    let spec = SORT_TOKENS
        .iter()
        .find(|(name, _, _)| *name == token)
        .map(|(_, field, order)| SortSpec {
            field: (*field).to_string(),
            order: *order,
        });
    if spec.is_none() {
        debug!(sort = token, "unrecognized sort token, using relevance");
    }
    spec
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_tokens_resolve() {
        let cases = [
            ("price_asc", "price", SortOrder::Asc),
            ("price_desc", "price", SortOrder::Desc),
            ("rating_desc", "rating", SortOrder::Desc),
            ("newest", "publish_date", SortOrder::Desc),
            ("pages_desc", "pages", SortOrder::Desc),
        ];
        for (token, field, order) in cases {
            let spec = compile_sort(Some(token)).expect(token);
            assert_eq!(spec.field, field);
            assert_eq!(spec.order, order);
        }
    }

    #[test]
    fn unknown_or_empty_token_falls_back_to_relevance() {
        assert_eq!(compile_sort(Some("cheapest")), None);
        assert_eq!(compile_sort(Some("  ")), None);
        assert_eq!(compile_sort(None), None);
    }

    #[test]
    fn sort_tokens_lists_table() {
        assert_eq!(sort_tokens().count(), 5);
    }
}
