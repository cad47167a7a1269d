//! Published content resolution and search core.
//! Resolves items from immutable content/media snapshots and runs paged
//! searches through named index providers.

pub mod cache;
pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod query;
pub mod search;

pub use cache::{
    CacheError, CacheResult, PublishedCache, PublishedSnapshot, SnapshotCache, SnapshotError,
    XPathExpression, XPathQuery, XPathVariable,
};
pub use config::{load_config, ConfigError, CoreConfig, SearchSettings};
pub use logging::{default_log_level, init_logging, init_logging_from_config, logging_status};
pub use model::id::ItemId;
pub use model::item::{ItemKind, PublishedItem, PublishedItemRef};
pub use model::udi::{Udi, UdiParseError};
pub use query::{PublishedContentQuery, QueryError, QueryFacade, QueryResult};
pub use search::{
    search_all_fields, FtsIndex, IndexDocument, MemoryIndex, PublishedSearchResult,
    SearchCriteria, SearchCriteriaBuilder, SearchError, SearchHit, SearchHits, SearchPage,
    SearchProvider, SearchProviderRegistry, SearchRegistryError, SearchValue,
};

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::{core_version, ping};

    #[test]
    fn ping_returns_pong() {
        assert_eq!(ping(), "pong");
    }

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
