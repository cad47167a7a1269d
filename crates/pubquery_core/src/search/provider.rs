//! Search index provider contract.

use crate::search::criteria::{term_tokens, SearchCriteria, SearchCriteriaBuilder};
use crate::search::SearchResult;

/// One ranked row returned by a provider.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchHit {
    /// Published item id the row was indexed from.
    pub id: i32,
    pub score: f32,
}

/// Ranked rows plus the provider's total match count.
///
/// `total_item_count` counts every match, independent of how many rows were
/// returned.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchHits {
    pub hits: Vec<SearchHit>,
    pub total_item_count: usize,
}

impl SearchHits {
    pub fn empty() -> Self {
        Self::default()
    }
}

/// External full-text index as seen by the query facade.
///
/// Implementations must return empty hits (total 0) for empty criteria.
pub trait SearchProvider: Send + Sync {
    /// Registry name of this provider.
    fn name(&self) -> &str;

    /// Fields this provider searches when asked to search "all fields".
    fn searchable_fields(&self) -> Vec<String>;

    /// Whether `search` honors `max_results` by returning only the top N rows.
    fn supports_bounded_top_n(&self) -> bool;

    /// Starts criteria for this provider; term searches build on it.
    fn create_criteria(&self) -> SearchCriteriaBuilder {
        SearchCriteriaBuilder::new()
    }

    /// Searches every searchable field for `term`, unbounded.
    fn search_text(&self, term: &str, use_wildcards: bool) -> SearchResult<SearchHits> {
        if term_tokens(term).next().is_none() {
            return Ok(SearchHits::empty());
        }
        let criteria = self
            .create_criteria()
            .all_fields(&self.searchable_fields(), term, use_wildcards)
            .compile()?;
        self.search(&criteria, None)
    }

    /// Executes compiled criteria, returning at most `max_results` rows when
    /// bounded top-N retrieval is supported.
    fn search(
        &self,
        criteria: &SearchCriteria,
        max_results: Option<usize>,
    ) -> SearchResult<SearchHits>;
}
