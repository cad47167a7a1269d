//! Search criteria, index providers and result hydration.
//!
//! # Responsibility
//! - Build provider-agnostic "search all fields" criteria.
//! - Define the provider contract and the named provider registry.
//! - Turn ranked provider rows into published items.
//!
//! # Invariants
//! - Criteria are immutable once compiled.
//! - Empty criteria match nothing.
//! - Provider ranking order is preserved through paging and hydration.

use crate::db::DbError;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod criteria;
pub mod document;
pub mod fts;
pub mod memory;
pub mod provider;
pub mod registry;
pub mod results;

pub use criteria::{
    search_all_fields, term_tokens, Examineness, FieldGroup, SearchCriteria,
    SearchCriteriaBuilder, SearchValue,
};
pub use document::IndexDocument;
pub use fts::FtsIndex;
pub use memory::MemoryIndex;
pub use provider::{SearchHit, SearchHits, SearchProvider};
pub use registry::{
    RegisteredProvider, RegistryResult, SearchProviderRegistry, SearchRegistryError,
};
pub use results::{hydrate_hits, PublishedSearchResult, SearchPage};

/// Result type for search APIs.
pub type SearchResult<T> = Result<T, SearchError>;

/// Search-layer error for criteria building, index access and row decoding.
#[derive(Debug)]
pub enum SearchError {
    /// Criteria cannot be expressed by the target provider.
    InvalidQuery {
        query: String,
        message: String,
    },
    /// Criteria builder input is malformed.
    InvalidCriteria(String),
    /// Field name is not usable as an index field.
    InvalidField(String),
    Db(DbError),
    InvalidData(String),
}

impl Display for SearchError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidQuery { query, message } => {
                write!(f, "invalid search query `{query}`: {message}")
            }
            Self::InvalidCriteria(message) => write!(f, "invalid search criteria: {message}"),
            Self::InvalidField(field) => write!(f, "invalid search field `{field}`"),
            Self::Db(err) => write!(f, "{err}"),
            Self::InvalidData(message) => write!(f, "invalid search row: {message}"),
        }
    }
}

impl Error for SearchError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::InvalidQuery { .. } => None,
            Self::InvalidCriteria(_) => None,
            Self::InvalidField(_) => None,
            Self::InvalidData(_) => None,
        }
    }
}

impl From<DbError> for SearchError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for SearchError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}
