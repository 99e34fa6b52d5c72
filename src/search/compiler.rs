//! Application requests to compiled engine queries.
//!
//! Every compile entry point validates pagination first; a bad page or page
//! size fails before any query is built, so no engine call can follow.

use crate::config::SearchConfig;
use crate::model::types::{LegalSearchRequest, SearchRequest};
use crate::search::ast::{
    BoolQuery, CompiledQuery, Fuzziness, MatchQuery, MultiMatchQuery, Operator, Query,
    WeightedField,
};
use crate::search::classify::{LegalQuery, classify};
use crate::search::error::SearchError;
use crate::search::filters::compile_filters;
use crate::search::highlight::{catalog_highlight, legal_highlight};
use crate::search::sort::compile_sort;

/// Catalog fields searched by free text, with their weights.
pub const CATALOG_TEXT_FIELDS: &[(&str, f32)] = &[
    ("title", 3.0),
    ("description", 2.0),
    ("author", 2.0),
    ("category", 1.0),
];

/// Body field of an ingested legal document.
pub const LEGAL_CONTENT_FIELD: &str = "attachment.content";
/// Extracted document title and the uploaded file name.
pub const LEGAL_TITLE_FIELD: &str = "attachment.title";
pub const LEGAL_FILENAME_FIELD: &str = "filename";

pub const PHRASE_BOOST: f32 = 3.0;
pub const KEYWORD_BOOST: f32 = 2.0;
pub const FUZZY_BOOST: f32 = 1.0;
pub const TITLE_BOOST: f32 = 1.5;

/// Fields returned by suggestion queries.
pub const SUGGEST_FIELDS: &[&str] = &["title", "category", "language"];

/// Validate pagination and return the `[from, from + size)` hit window.
pub fn page_window(page: u32, page_size: u32) -> Result<(u64, u64), SearchError> {
    if page < 1 || page_size == 0 {
        return Err(SearchError::InvalidPagination { page, page_size });
    }
    let size = u64::from(page_size);
    Ok((u64::from(page - 1) * size, size))
}

#[derive(Debug, Clone)]
pub struct SearchRequestCompiler {
    catalog_index: String,
    legal_index: String,
    pre_tag: String,
    post_tag: String,
}

impl Default for SearchRequestCompiler {
    fn default() -> Self {
        Self::new(&SearchConfig::default())
    }
}

impl SearchRequestCompiler {
    pub fn new(config: &SearchConfig) -> Self {
        Self {
            catalog_index: config.indices.catalog.clone(),
            legal_index: config.indices.legal.clone(),
            pre_tag: config.highlight.pre_tag.clone(),
            post_tag: config.highlight.post_tag.clone(),
        }
    }

    pub fn catalog_index(&self) -> &str {
        &self.catalog_index
    }

    pub fn compile(&self, request: &SearchRequest) -> Result<CompiledQuery, SearchError> {
        let (from, size) = page_window(request.page, request.page_size)?;

        let text = catalog_text_query(request.free_text.as_deref());
        let filters = compile_filters(&request.filters);
        let query = if filters.is_empty() {
            text
        } else {
            Query::Bool(BoolQuery {
                must: vec![text],
                filter: filters,
                ..BoolQuery::default()
            })
        };

        Ok(CompiledQuery {
            index: self.catalog_index.clone(),
            query,
            sort: compile_sort(request.sort.as_deref()).into_iter().collect(),
            from,
            size,
            highlight: Some(catalog_highlight(&self.pre_tag, &self.post_tag)),
            aggregations: Vec::new(),
            source_fields: None,
        })
    }

    pub fn compile_legal(&self, request: &LegalSearchRequest) -> Result<CompiledQuery, SearchError> {
        let (from, size) = page_window(request.page, request.page_size)?;
        Ok(CompiledQuery {
            index: self.legal_index.clone(),
            query: legal_text_query(&classify(&request.query)),
            sort: Vec::new(),
            from,
            size,
            highlight: Some(legal_highlight(
                LEGAL_CONTENT_FIELD,
                &self.pre_tag,
                &self.post_tag,
            )),
            aggregations: Vec::new(),
            source_fields: None,
        })
    }

    /// Prefix suggestions over titles, categories and languages. Returns
    /// `None` for an empty prefix.
    pub fn compile_suggest(&self, prefix: &str, size: u32) -> Result<Option<CompiledQuery>, SearchError> {
        let (_, size) = page_window(1, size)?;
        let prefix = prefix.trim();
        if prefix.is_empty() {
            return Ok(None);
        }
        let query = Query::Bool(BoolQuery {
            should: vec![
                Query::PhrasePrefix {
                    field: "title".into(),
                    text: prefix.to_string(),
                    boost: 1.0,
                },
                Query::Prefix {
                    field: "category".into(),
                    value: prefix.to_string(),
                    boost: 1.0,
                },
                Query::Prefix {
                    field: "language".into(),
                    value: prefix.to_string(),
                    boost: 1.0,
                },
            ],
            ..BoolQuery::default()
        });
        Ok(Some(CompiledQuery {
            index: self.catalog_index.clone(),
            query,
            sort: Vec::new(),
            from: 0,
            size,
            highlight: None,
            aggregations: Vec::new(),
            source_fields: Some(SUGGEST_FIELDS.iter().map(|f| f.to_string()).collect()),
        }))
    }
}

/// Weighted multi-field match; every token must match somewhere.
pub fn catalog_text_query(free_text: Option<&str>) -> Query {
    match free_text.map(str::trim).filter(|t| !t.is_empty()) {
        None => Query::MatchAll,
        Some(text) => Query::MultiMatch(MultiMatchQuery {
            text: text.to_string(),
            fields: CATALOG_TEXT_FIELDS
                .iter()
                .map(|(name, boost)| WeightedField::new(*name, *boost))
                .collect(),
            operator: Operator::And,
            fuzziness: Fuzziness::DEFAULT_AUTO,
        }),
    }
}

/// A precise primary clause OR'd with an always-present fuzzy clause, so a
/// miss on the primary still surfaces loose matches ranked below it. Title and
/// file name matches are OR'd in at lower weight.
pub fn legal_text_query(classified: &LegalQuery) -> Query {
    let text = classified.text().trim();
    if text.is_empty() {
        return Query::MatchAll;
    }
    let primary = match classified {
        LegalQuery::ExactPhrase(_) => Query::Phrase {
            field: LEGAL_CONTENT_FIELD.into(),
            text: text.to_string(),
            boost: PHRASE_BOOST,
        },
        LegalQuery::FuzzyTerm(_) => Query::Match(MatchQuery {
            field: LEGAL_CONTENT_FIELD.into(),
            text: text.to_string(),
            operator: Operator::Or,
            fuzziness: Fuzziness::Exact,
            boost: KEYWORD_BOOST,
        }),
    };
    let loose = Query::Match(MatchQuery {
        field: LEGAL_CONTENT_FIELD.into(),
        text: text.to_string(),
        operator: Operator::Or,
        fuzziness: Fuzziness::DEFAULT_AUTO,
        boost: FUZZY_BOOST,
    });
    let keyword = |field: &str, boost: f32| {
        Query::Match(MatchQuery {
            field: field.into(),
            text: text.to_string(),
            operator: Operator::Or,
            fuzziness: Fuzziness::Exact,
            boost,
        })
    };
    Query::Bool(BoolQuery {
        should: vec![
            primary,
            loose,
            keyword(LEGAL_TITLE_FIELD, TITLE_BOOST),
            keyword(LEGAL_FILENAME_FIELD, FUZZY_BOOST),
        ],
        ..BoolQuery::default()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::types::Constraint;
    use crate::search::ast::{SortOrder, SortSpec};
    use proptest::prelude::*;

    fn compiler() -> SearchRequestCompiler {
        SearchRequestCompiler::default()
    }

    #[test]
    fn absent_text_without_filters_matches_everything() {
        let q = compiler().compile(&SearchRequest::default()).unwrap();
        assert!(q.query.is_match_all());
        assert_eq!(q.index, "tech_books");
        assert!(!q.has_explicit_sort());
    }

    #[test]
    fn whitespace_text_is_treated_as_absent() {
        let q = compiler().compile(&SearchRequest::text("   ")).unwrap();
        assert!(q.query.is_match_all());
    }

    #[test]
    fn free_text_compiles_weighted_and_match() {
        let q = compiler().compile(&SearchRequest::text("Python ML")).unwrap();
        let Query::MultiMatch(mm) = &q.query else {
            panic!("expected multi_match, got {:?}", q.query);
        };
        assert_eq!(mm.operator, Operator::And);
        assert_eq!(mm.fuzziness, Fuzziness::DEFAULT_AUTO);
        let weights: Vec<(&str, f32)> =
            mm.fields.iter().map(|f| (f.name.as_str(), f.boost)).collect();
        assert_eq!(
            weights,
            vec![("title", 3.0), ("description", 2.0), ("author", 2.0), ("category", 1.0)]
        );
    }

    #[test]
    fn filters_are_anded_as_filter_clauses() {
        let req = SearchRequest::text("Python")
            .with_filter("category", Constraint::equals("ML"))
            .with_filter("rating_min", Constraint::equals(4.0))
            .with_filter("shelf", Constraint::equals("B3"));
        let q = compiler().compile(&req).unwrap();
        let Query::Bool(b) = &q.query else {
            panic!("expected bool");
        };
        assert_eq!(b.must.len(), 1);
        assert!(matches!(b.must[0], Query::MultiMatch(_)));
        assert_eq!(b.filter.len(), 2);
        assert!(b.should.is_empty());
    }

    #[test]
    fn sort_token_is_compiled() {
        let q = compiler()
            .compile(&SearchRequest::default().with_sort("newest"))
            .unwrap();
        assert_eq!(
            q.sort,
            vec![SortSpec {
                field: "publish_date".into(),
                order: SortOrder::Desc,
            }]
        );
        let relevance = compiler()
            .compile(&SearchRequest::default().with_sort("bogus"))
            .unwrap();
        assert!(relevance.sort.is_empty());
    }

    #[test]
    fn second_page_of_five_starts_at_five() {
        let q = compiler()
            .compile(&SearchRequest::default().with_page(2, 5))
            .unwrap();
        assert_eq!((q.from, q.size), (5, 5));
    }

    #[test]
    fn zero_page_or_size_is_rejected() {
        for (page, size) in [(0, 5), (1, 0), (0, 0)] {
            let err = compiler()
                .compile(&SearchRequest::default().with_page(page, size))
                .unwrap_err();
            assert!(
                matches!(err, SearchError::InvalidPagination { page: p, page_size: s } if p == page && s == size)
            );
        }
    }

    #[test]
    fn highlight_directives_are_attached() {
        let q = compiler().compile(&SearchRequest::text("rust")).unwrap();
        let hl = q.highlight.expect("highlight");
        assert_eq!(hl.fields.len(), 2);
    }

    #[test]
    fn exact_phrase_is_boosted_over_fuzzy_fallback() {
        let q = compiler()
            .compile_legal(&LegalSearchRequest::new("\"penal code\"", 5))
            .unwrap();
        assert_eq!(q.index, "legal-documents-v2");
        let Query::Bool(b) = &q.query else {
            panic!("expected bool");
        };
        assert!(b.requires_should_match());
        match (&b.should[0], &b.should[1]) {
            (Query::Phrase { text, boost, .. }, Query::Match(loose)) => {
                assert_eq!(text, "penal code");
                assert!(*boost >= 2.0 * loose.boost && *boost <= 3.0 * loose.boost);
                assert_eq!(loose.fuzziness, Fuzziness::DEFAULT_AUTO);
            }
            other => panic!("unexpected clauses {other:?}"),
        }
        assert_eq!(q.highlight.unwrap().fields[0].fragments, 3);
    }

    #[test]
    fn fuzzy_legal_query_keeps_keyword_and_fuzzy_clauses() {
        let q = compiler()
            .compile_legal(&LegalSearchRequest::new("victim", 5))
            .unwrap();
        let Query::Bool(b) = &q.query else {
            panic!("expected bool");
        };
        assert_eq!(b.should.len(), 4);
        assert!(matches!(
            &b.should[0],
            Query::Match(MatchQuery { fuzziness: Fuzziness::Exact, operator: Operator::Or, boost, .. })
                if *boost == KEYWORD_BOOST
        ));
    }

    #[test]
    fn legal_query_also_matches_title_and_filename() {
        let q = compiler()
            .compile_legal(&LegalSearchRequest::new("\"Criminal Act\"", 5))
            .unwrap();
        let Query::Bool(b) = &q.query else {
            panic!("expected bool");
        };
        let secondary: Vec<(&str, f32)> = b.should[2..]
            .iter()
            .map(|clause| match clause {
                Query::Match(m) => (m.field.as_str(), m.boost),
                other => panic!("unexpected clause {other:?}"),
            })
            .collect();
        assert_eq!(
            secondary,
            vec![(LEGAL_TITLE_FIELD, TITLE_BOOST), (LEGAL_FILENAME_FIELD, FUZZY_BOOST)]
        );
        assert!(b.should.iter().all(|c| match c {
            Query::Phrase { boost, .. } => *boost == PHRASE_BOOST,
            Query::Match(m) => m.boost < PHRASE_BOOST,
            _ => false,
        }));
    }

    #[test]
    fn legal_pagination_is_validated() {
        let mut req = LegalSearchRequest::new("victim", 5);
        req.page = 0;
        assert!(compiler().compile_legal(&req).is_err());
    }

    #[test]
    fn suggest_restricts_source_and_skips_empty_prefix() {
        let q = compiler().compile_suggest("Pyt", 5).unwrap().unwrap();
        assert_eq!(q.size, 5);
        assert_eq!(
            q.source_fields.as_deref(),
            Some(&["title".to_string(), "category".to_string(), "language".to_string()][..])
        );
        assert!(compiler().compile_suggest("  ", 5).unwrap().is_none());
        assert!(compiler().compile_suggest("Pyt", 0).is_err());
    }

    proptest! {
        #[test]
        fn window_offset_is_page_minus_one_times_size(page in 1u32..10_000, size in 1u32..500) {
            let (from, len) = page_window(page, size).unwrap();
            prop_assert_eq!(from, u64::from(page - 1) * u64::from(size));
            prop_assert_eq!(len, u64::from(size));
        }
    }
}
