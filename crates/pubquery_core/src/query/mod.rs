//! Published content query surface.
//!
//! # Responsibility
//! - Define the operation set callers use to read published content/media.
//! - Provide the facade that serves it from caches or forwards it whole.
//!
//! # Invariants
//! - Missing items are `Ok(None)` or dropped from batches, never errors.
//! - Malformed path expressions and criteria surface as `QueryError`.
//! - Search totals are the provider's global count, independent of paging.

use crate::cache::{CacheError, XPathQuery, XPathVariable};
use crate::model::id::ItemId;
use crate::model::item::PublishedItemRef;
use crate::search::{SearchCriteria, SearchError, SearchPage, SearchRegistryError};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod facade;
pub mod paging;

pub use facade::QueryFacade;
pub use paging::{execute_page, PagePlan};

/// Result type for query APIs.
pub type QueryResult<T> = Result<T, QueryError>;

/// Query-layer error.
#[derive(Debug)]
pub enum QueryError {
    Cache(CacheError),
    Search(SearchError),
    Registry(SearchRegistryError),
    /// Facade was built with neither or both of caches and delegate.
    Configuration(String),
}

impl Display for QueryError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Cache(err) => write!(f, "{err}"),
            Self::Search(err) => write!(f, "{err}"),
            Self::Registry(err) => write!(f, "{err}"),
            Self::Configuration(message) => write!(f, "invalid query facade setup: {message}"),
        }
    }
}

impl Error for QueryError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Cache(err) => Some(err),
            Self::Search(err) => Some(err),
            Self::Registry(err) => Some(err),
            Self::Configuration(_) => None,
        }
    }
}

impl From<CacheError> for QueryError {
    fn from(value: CacheError) -> Self {
        Self::Cache(value)
    }
}

impl From<SearchError> for QueryError {
    fn from(value: SearchError) -> Self {
        Self::Search(value)
    }
}

impl From<SearchRegistryError> for QueryError {
    fn from(value: SearchRegistryError) -> Self {
        Self::Registry(value)
    }
}

/// Read operations over published content and media.
///
/// Implemented by [`QueryFacade`] and by any resolver a facade can delegate to.
pub trait PublishedContentQuery: Send + Sync {
    fn content(&self, id: &ItemId) -> QueryResult<Option<PublishedItemRef>>;

    /// Resolves each id in order, dropping ids that do not resolve.
    fn content_many(&self, ids: &[ItemId]) -> QueryResult<Vec<PublishedItemRef>>;

    fn content_single_at_xpath(
        &self,
        xpath: XPathQuery<'_>,
        vars: &[XPathVariable],
    ) -> QueryResult<Option<PublishedItemRef>>;

    fn content_at_xpath(
        &self,
        xpath: XPathQuery<'_>,
        vars: &[XPathVariable],
    ) -> QueryResult<Vec<PublishedItemRef>>;

    fn content_at_root(&self) -> QueryResult<Vec<PublishedItemRef>>;

    fn media(&self, id: &ItemId) -> QueryResult<Option<PublishedItemRef>>;

    fn media_many(&self, ids: &[ItemId]) -> QueryResult<Vec<PublishedItemRef>>;

    fn media_single_at_xpath(
        &self,
        xpath: XPathQuery<'_>,
        vars: &[XPathVariable],
    ) -> QueryResult<Option<PublishedItemRef>>;

    fn media_at_xpath(
        &self,
        xpath: XPathQuery<'_>,
        vars: &[XPathVariable],
    ) -> QueryResult<Vec<PublishedItemRef>>;

    fn media_at_root(&self) -> QueryResult<Vec<PublishedItemRef>>;

    /// Searches every searchable field of `provider` (or the default one).
    ///
    /// `skip = 0, take = 0` means unpaged.
    fn search_term_paged(
        &self,
        skip: usize,
        take: usize,
        term: &str,
        use_wildcards: bool,
        provider: Option<&str>,
    ) -> QueryResult<SearchPage>;

    /// Runs precompiled criteria against `provider` (or the default one).
    fn search_criteria_paged(
        &self,
        skip: usize,
        take: usize,
        criteria: &SearchCriteria,
        provider: Option<&str>,
    ) -> QueryResult<SearchPage>;

    fn search_term(
        &self,
        term: &str,
        use_wildcards: bool,
        provider: Option<&str>,
    ) -> QueryResult<SearchPage> {
        self.search_term_paged(0, 0, term, use_wildcards, provider)
    }

    fn search_criteria(
        &self,
        criteria: &SearchCriteria,
        provider: Option<&str>,
    ) -> QueryResult<SearchPage> {
        self.search_criteria_paged(0, 0, criteria, provider)
    }
}
