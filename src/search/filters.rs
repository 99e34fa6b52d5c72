//! Facet constraints to score-neutral predicates.

use tracing::debug;

use crate::model::types::{Constraint, FilterValue, Filters};
use crate::search::ast::{Query, RangeQuery};

/// How a recognized filter key maps onto a document field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FilterKind {
    /// `Equals` is an exact term match.
    Field,
    /// `Equals(v)` means "at least v".
    LowerBound,
    /// Values are calendar years applied to a date field.
    Year,
}

const FILTER_KEYS: &[(&str, &str, FilterKind)] = &[
    ("category", "category", FilterKind::Field),
    ("language", "language", FilterKind::Field),
    ("author", "author", FilterKind::Field),
    ("price", "price", FilterKind::Field),
    ("price_range", "price", FilterKind::Field),
    ("rating", "rating", FilterKind::Field),
    ("rating_min", "rating", FilterKind::LowerBound),
    ("pages", "pages", FilterKind::Field),
    ("publish_date", "publish_date", FilterKind::Field),
    ("publish_year", "publish_date", FilterKind::Year),
];

fn lookup(key: &str) -> Option<(&'static str, FilterKind)> {
    FILTER_KEYS
        .iter()
        .find(|(name, _, _)| *name == key)
        .map(|(_, field, kind)| (*field, *kind))
}

/// Whether `key` is a filter this compiler understands.
pub fn is_recognized(key: &str) -> bool {
    lookup(key).is_some()
}

/// Compile filters into predicates meant for a bool `filter` clause.
///
/// Unknown keys are dropped rather than rejected so older clients keep working
/// when new facets appear. A range with no bounds compiles to nothing.
pub fn compile_filters(filters: &Filters) -> Vec<Query> {
    let mut predicates = Vec::with_capacity(filters.len());
    for (key, constraint) in filters {
        let Some((field, kind)) = lookup(key) else {
            debug!(filter = key.as_str(), "dropping unrecognized filter");
            continue;
        };
        if let Some(predicate) = compile_one(field, kind, constraint) {
            predicates.push(predicate);
        }
    }
    predicates
}

fn compile_one(field: &str, kind: FilterKind, constraint: &Constraint) -> Option<Query> {
    match (kind, constraint) {
        (FilterKind::Field, Constraint::Equals(value)) => Some(Query::Term {
            field: field.to_string(),
            value: value.clone(),
        }),
        (FilterKind::LowerBound, Constraint::Equals(value)) => {
            range(field, Some(value.clone()), None)
        }
        (FilterKind::Year, Constraint::Equals(value)) => {
            range(field, year_start(value), None)
        }
        (FilterKind::Year, Constraint::Range { min, max }) => range(
            field,
            min.as_ref().and_then(year_start),
            max.as_ref().and_then(year_end),
        ),
        (_, Constraint::Range { min, max }) => range(field, min.clone(), max.clone()),
    }
}

fn range(field: &str, gte: Option<FilterValue>, lte: Option<FilterValue>) -> Option<Query> {
    if gte.is_none() && lte.is_none() {
        return None;
    }
    Some(Query::Range(RangeQuery {
        field: field.to_string(),
        gte,
        lte,
    }))
}

fn year_of(value: &FilterValue) -> Option<i64> {
    let year = value.as_f64()?;
    if year.fract() != 0.0 || !(0.0..=9999.0).contains(&year) {
        debug!(value = %value, "ignoring non-year publish_year bound");
        return None;
    }
    Some(year as i64)
}

fn year_start(value: &FilterValue) -> Option<FilterValue> {
    year_of(value).map(|y| FilterValue::Text(format!("{y:04}-01-01")))
}

fn year_end(value: &FilterValue) -> Option<FilterValue> {
    year_of(value).map(|y| FilterValue::Text(format!("{y:04}-12-31")))
}
