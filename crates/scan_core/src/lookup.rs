//! Card lookup collaborator contract
//!
//! The catalog itself is external (an HTTP API, a JSON file, a mock);
//! the matcher only relies on this trait. "No rows" is an empty vec,
//! never an error; errors mean the catalog could not be asked.

use crate::error::LookupError;
use crate::types::{CardRecord, MatchQuery};
use async_trait::async_trait;

/// A queryable card catalog.
#[async_trait]
pub trait CardLookup: Send + Sync {
    /// Filtered search; `None` fields are unconstrained.
    async fn search_by_details(&self, query: &MatchQuery) -> Result<Vec<CardRecord>, LookupError>;

    /// Free-text search, used by the manual fallback flow.
    async fn search_by_free_text(&self, text: &str) -> Result<Vec<CardRecord>, LookupError>;
}
