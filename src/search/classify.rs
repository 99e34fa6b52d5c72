//! Exact-phrase vs fuzzy classification of free text.

use serde::Serialize;

const QUOTES: [char; 2] = ['"', '\''];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum LegalQuery {
    /// Quoted input, delimiters stripped.
    ExactPhrase(String),
    FuzzyTerm(String),
}

impl LegalQuery {
    pub fn text(&self) -> &str {
        match self {
            LegalQuery::ExactPhrase(t) | LegalQuery::FuzzyTerm(t) => t,
        }
    }
}

/// Classify raw user input. Input wrapped in a matching pair of quotes is an
/// exact phrase; anything else, including a lone quote, is a fuzzy term.
pub fn classify(raw: &str) -> LegalQuery {
    let trimmed = raw.trim();
    let mut chars = trimmed.chars();
    if let (Some(first), Some(last)) = (chars.next(), chars.next_back())
        && first == last
        && QUOTES.contains(&first)
    {
        let inner = chars.as_str();
        return LegalQuery::ExactPhrase(inner.to_string());
    }
    LegalQuery::FuzzyTerm(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn quoted_input_is_exact_phrase() {
        assert_eq!(classify("\"ab\""), LegalQuery::ExactPhrase("ab".into()));
        assert_eq!(
            classify("'criminal code'"),
            LegalQuery::ExactPhrase("criminal code".into())
        );
    }

    #[test]
    fn bare_and_unbalanced_input_is_fuzzy() {
        assert_eq!(classify("ab"), LegalQuery::FuzzyTerm("ab".into()));
        assert_eq!(classify("\"a"), LegalQuery::FuzzyTerm("\"a".into()));
        assert_eq!(classify("\""), LegalQuery::FuzzyTerm("\"".into()));
        assert_eq!(classify("\"mixed'"), LegalQuery::FuzzyTerm("\"mixed'".into()));
    }

    #[test]
    fn pair_of_quotes_is_empty_phrase() {
        assert_eq!(classify("\"\""), LegalQuery::ExactPhrase(String::new()));
    }

    #[test]
    fn surrounding_whitespace_is_ignored() {
        assert_eq!(
            classify("  \"stalking offence\" "),
            LegalQuery::ExactPhrase("stalking offence".into())
        );
    }

    #[test]
    fn multibyte_phrase_is_stripped_on_char_boundaries() {
        assert_eq!(
            classify("\"스토킹범죄\""),
            LegalQuery::ExactPhrase("스토킹범죄".into())
        );
    }

    proptest! {
        #[test]
        fn wrapping_in_quotes_round_trips(inner in "[a-z ]{0,16}") {
            // Spaces inside the quotes survive; only the outer input is trimmed.
            let quoted = format!("\"{inner}\"");
            prop_assert_eq!(classify(&quoted), LegalQuery::ExactPhrase(inner.clone()));
        }

        #[test]
        fn unquoted_text_is_always_fuzzy(text in "[a-z][a-z ]{0,16}[a-z]") {
            prop_assert_eq!(classify(&text), LegalQuery::FuzzyTerm(text.clone()));
        }
    }
}
