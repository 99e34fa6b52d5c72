use thiserror::Error;

use crate::engine::EngineError;

/// Errors surfaced by the search layer. A request either produces a complete
/// result or one of these; there are no partial results.
#[derive(Debug, Error)]
pub enum SearchError {
    /// Pagination outside the valid domain. Never clamped.
    #[error("invalid pagination: page={page}, page_size={page_size} (page must be >= 1, page_size > 0)")]
    InvalidPagination { page: u32, page_size: u32 },

    /// The engine could not be reached, timed out or rejected the request.
    #[error("search engine unavailable: {0}")]
    EngineUnavailable(String),

    /// The engine answered with something we could not decode.
    #[error("undecodable engine response: {0}")]
    Decode(String),
}

impl From<EngineError> for SearchError {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::Unavailable(msg) => SearchError::EngineUnavailable(msg),
            EngineError::Decode(msg) => SearchError::Decode(msg),
        }
    }
}
