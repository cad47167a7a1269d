//! Two-mode query facade.
//!
//! # Responsibility
//! - Serve lookups and searches from the content/media caches, or
//! - forward every call unchanged to an injected resolver.
//!
//! # Invariants
//! - The mode is fixed at construction; exactly one of caches or delegate
//!   exists, and each call matches on it exactly once.
//! - Delegated calls never touch caches or search providers.
//! - Search results hydrate against the content cache only.

use crate::cache::{PublishedCache, PublishedSnapshot, XPathQuery, XPathVariable};
use crate::model::id::ItemId;
use crate::model::item::{ItemKind, PublishedItemRef};
use crate::query::paging::execute_page;
use crate::query::{PublishedContentQuery, QueryError, QueryResult};
use crate::search::criteria::{term_tokens, SearchCriteria, SearchCriteriaBuilder};
use crate::search::provider::SearchProvider;
use crate::search::registry::SearchProviderRegistry;
use crate::search::results::SearchPage;
use log::debug;
use std::sync::Arc;
use std::time::Instant;

/// Caches and search providers used in direct mode.
struct DirectQuery {
    content: Arc<dyn PublishedCache>,
    media: Arc<dyn PublishedCache>,
    search: Arc<SearchProviderRegistry>,
}

enum QueryMode {
    Direct(DirectQuery),
    Delegated(Arc<dyn PublishedContentQuery>),
}

/// Published content query facade.
pub struct QueryFacade {
    mode: QueryMode,
}

impl QueryFacade {
    /// Direct mode over explicit caches.
    ///
    /// # Errors
    /// - `Configuration` when a cache serves the wrong item kind.
    pub fn direct(
        content: Arc<dyn PublishedCache>,
        media: Arc<dyn PublishedCache>,
        search: Arc<SearchProviderRegistry>,
    ) -> QueryResult<Self> {
        ensure_kind(content.as_ref(), ItemKind::Content)?;
        ensure_kind(media.as_ref(), ItemKind::Media)?;
        Ok(Self {
            mode: QueryMode::Direct(DirectQuery {
                content,
                media,
                search,
            }),
        })
    }

    /// Direct mode over a published snapshot pair.
    pub fn from_snapshot(snapshot: &PublishedSnapshot, search: Arc<SearchProviderRegistry>) -> Self {
        Self {
            mode: QueryMode::Direct(DirectQuery {
                content: snapshot.content.clone(),
                media: snapshot.media.clone(),
                search,
            }),
        }
    }

    /// Delegated mode: every call is answered by `delegate`.
    pub fn delegated(delegate: Arc<dyn PublishedContentQuery>) -> Self {
        Self {
            mode: QueryMode::Delegated(delegate),
        }
    }

    /// Builds a facade from optional parts.
    ///
    /// A missing search registry in direct mode means "no providers".
    ///
    /// # Errors
    /// - `Configuration` when both a delegate and caches are supplied, when
    ///   neither is, or when only one cache of the pair is present.
    pub fn from_parts(
        content: Option<Arc<dyn PublishedCache>>,
        media: Option<Arc<dyn PublishedCache>>,
        search: Option<Arc<SearchProviderRegistry>>,
        delegate: Option<Arc<dyn PublishedContentQuery>>,
    ) -> QueryResult<Self> {
        match (content, media, delegate) {
            (None, None, Some(delegate)) => {
                if search.is_some() {
                    return Err(QueryError::Configuration(
                        "a delegated facade cannot also own search providers".to_string(),
                    ));
                }
                Ok(Self::delegated(delegate))
            }
            (Some(content), Some(media), None) => Self::direct(
                content,
                media,
                search.unwrap_or_else(|| Arc::new(SearchProviderRegistry::new())),
            ),
            (_, _, Some(_)) => Err(QueryError::Configuration(
                "caches and a delegate are mutually exclusive".to_string(),
            )),
            (None, None, None) => Err(QueryError::Configuration(
                "either a content/media cache pair or a delegate is required".to_string(),
            )),
            (_, _, None) => Err(QueryError::Configuration(
                "direct mode needs both a content and a media cache".to_string(),
            )),
        }
    }

    pub fn is_delegated(&self) -> bool {
        matches!(self.mode, QueryMode::Delegated(_))
    }
}

fn ensure_kind(cache: &dyn PublishedCache, expected: ItemKind) -> QueryResult<()> {
    if cache.kind() == expected {
        return Ok(());
    }
    Err(QueryError::Configuration(format!(
        "{} cache slot holds a {} cache",
        expected.as_str(),
        cache.kind().as_str()
    )))
}

impl DirectQuery {
    fn cache(&self, kind: ItemKind) -> &dyn PublishedCache {
        match kind {
            ItemKind::Content => self.content.as_ref(),
            ItemKind::Media => self.media.as_ref(),
        }
    }

    fn item(&self, kind: ItemKind, id: &ItemId) -> QueryResult<Option<PublishedItemRef>> {
        Ok(self.cache(kind).resolve(id)?)
    }

    fn items(&self, kind: ItemKind, ids: &[ItemId]) -> QueryResult<Vec<PublishedItemRef>> {
        let cache = self.cache(kind);
        let mut items = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(item) = cache.resolve(id)? {
                items.push(item);
            }
        }
        debug!(
            "event=query_many module=query status=ok kind={} requested={} resolved={}",
            kind.as_str(),
            ids.len(),
            items.len()
        );
        Ok(items)
    }

    fn single_at_xpath(
        &self,
        kind: ItemKind,
        xpath: XPathQuery<'_>,
        vars: &[XPathVariable],
    ) -> QueryResult<Option<PublishedItemRef>> {
        Ok(self.cache(kind).get_single_by_xpath(xpath, vars)?)
    }

    fn at_xpath(
        &self,
        kind: ItemKind,
        xpath: XPathQuery<'_>,
        vars: &[XPathVariable],
    ) -> QueryResult<Vec<PublishedItemRef>> {
        Ok(self.cache(kind).get_by_xpath(xpath, vars)?)
    }

    fn at_root(&self, kind: ItemKind) -> QueryResult<Vec<PublishedItemRef>> {
        Ok(self.cache(kind).get_at_root()?)
    }

    fn search_term(
        &self,
        skip: usize,
        take: usize,
        term: &str,
        use_wildcards: bool,
        provider: Option<&str>,
    ) -> QueryResult<SearchPage> {
        let entry = self.search.resolve(provider)?;
        let fields = entry.search_fields();
        let index = entry.provider().as_ref();
        // A term with nothing to match stays empty whatever the provider scopes.
        let builder = if term_tokens(term).next().is_some() {
            index.create_criteria()
        } else {
            SearchCriteriaBuilder::new()
        };
        let criteria = builder
            .all_fields(&fields[..], term, use_wildcards)
            .compile()?;
        self.run(index, &criteria, skip, take)
    }

    fn search_criteria(
        &self,
        skip: usize,
        take: usize,
        criteria: &SearchCriteria,
        provider: Option<&str>,
    ) -> QueryResult<SearchPage> {
        let entry = self.search.resolve(provider)?;
        self.run(entry.provider().as_ref(), criteria, skip, take)
    }

    fn run(
        &self,
        provider: &dyn SearchProvider,
        criteria: &SearchCriteria,
        skip: usize,
        take: usize,
    ) -> QueryResult<SearchPage> {
        let started_at = Instant::now();
        let page = execute_page(provider, criteria, skip, take, self.content.as_ref())?;
        debug!(
            "event=query_search module=query status=ok provider={} groups={} skip={} take={} total={} returned={} duration_ms={}",
            provider.name(),
            criteria.groups().len(),
            skip,
            take,
            page.total,
            page.results.len(),
            started_at.elapsed().as_millis()
        );
        Ok(page)
    }
}

impl PublishedContentQuery for QueryFacade {
    fn content(&self, id: &ItemId) -> QueryResult<Option<PublishedItemRef>> {
        match &self.mode {
            QueryMode::Delegated(delegate) => delegate.content(id),
            QueryMode::Direct(direct) => direct.item(ItemKind::Content, id),
        }
    }

    fn content_many(&self, ids: &[ItemId]) -> QueryResult<Vec<PublishedItemRef>> {
        match &self.mode {
            QueryMode::Delegated(delegate) => delegate.content_many(ids),
            QueryMode::Direct(direct) => direct.items(ItemKind::Content, ids),
        }
    }

    fn content_single_at_xpath(
        &self,
        xpath: XPathQuery<'_>,
        vars: &[XPathVariable],
    ) -> QueryResult<Option<PublishedItemRef>> {
        match &self.mode {
            QueryMode::Delegated(delegate) => delegate.content_single_at_xpath(xpath, vars),
            QueryMode::Direct(direct) => direct.single_at_xpath(ItemKind::Content, xpath, vars),
        }
    }

    fn content_at_xpath(
        &self,
        xpath: XPathQuery<'_>,
        vars: &[XPathVariable],
    ) -> QueryResult<Vec<PublishedItemRef>> {
        match &self.mode {
            QueryMode::Delegated(delegate) => delegate.content_at_xpath(xpath, vars),
            QueryMode::Direct(direct) => direct.at_xpath(ItemKind::Content, xpath, vars),
        }
    }

    fn content_at_root(&self) -> QueryResult<Vec<PublishedItemRef>> {
        match &self.mode {
            QueryMode::Delegated(delegate) => delegate.content_at_root(),
            QueryMode::Direct(direct) => direct.at_root(ItemKind::Content),
        }
    }

    fn media(&self, id: &ItemId) -> QueryResult<Option<PublishedItemRef>> {
        match &self.mode {
            QueryMode::Delegated(delegate) => delegate.media(id),
            QueryMode::Direct(direct) => direct.item(ItemKind::Media, id),
        }
    }

    fn media_many(&self, ids: &[ItemId]) -> QueryResult<Vec<PublishedItemRef>> {
        match &self.mode {
            QueryMode::Delegated(delegate) => delegate.media_many(ids),
            QueryMode::Direct(direct) => direct.items(ItemKind::Media, ids),
        }
    }

    fn media_single_at_xpath(
        &self,
        xpath: XPathQuery<'_>,
        vars: &[XPathVariable],
    ) -> QueryResult<Option<PublishedItemRef>> {
        match &self.mode {
            QueryMode::Delegated(delegate) => delegate.media_single_at_xpath(xpath, vars),
            QueryMode::Direct(direct) => direct.single_at_xpath(ItemKind::Media, xpath, vars),
        }
    }

    fn media_at_xpath(
        &self,
        xpath: XPathQuery<'_>,
        vars: &[XPathVariable],
    ) -> QueryResult<Vec<PublishedItemRef>> {
        match &self.mode {
            QueryMode::Delegated(delegate) => delegate.media_at_xpath(xpath, vars),
            QueryMode::Direct(direct) => direct.at_xpath(ItemKind::Media, xpath, vars),
        }
    }

    fn media_at_root(&self) -> QueryResult<Vec<PublishedItemRef>> {
        match &self.mode {
            QueryMode::Delegated(delegate) => delegate.media_at_root(),
            QueryMode::Direct(direct) => direct.at_root(ItemKind::Media),
        }
    }

    fn search_term_paged(
        &self,
        skip: usize,
        take: usize,
        term: &str,
        use_wildcards: bool,
        provider: Option<&str>,
    ) -> QueryResult<SearchPage> {
        match &self.mode {
            QueryMode::Delegated(delegate) => {
                delegate.search_term_paged(skip, take, term, use_wildcards, provider)
            }
            QueryMode::Direct(direct) => {
                direct.search_term(skip, take, term, use_wildcards, provider)
            }
        }
    }

    fn search_criteria_paged(
        &self,
        skip: usize,
        take: usize,
        criteria: &SearchCriteria,
        provider: Option<&str>,
    ) -> QueryResult<SearchPage> {
        match &self.mode {
            QueryMode::Delegated(delegate) => {
                delegate.search_criteria_paged(skip, take, criteria, provider)
            }
            QueryMode::Direct(direct) => direct.search_criteria(skip, take, criteria, provider),
        }
    }

    fn search_term(
        &self,
        term: &str,
        use_wildcards: bool,
        provider: Option<&str>,
    ) -> QueryResult<SearchPage> {
        match &self.mode {
            QueryMode::Delegated(delegate) => delegate.search_term(term, use_wildcards, provider),
            QueryMode::Direct(direct) => direct.search_term(0, 0, term, use_wildcards, provider),
        }
    }

    fn search_criteria(
        &self,
        criteria: &SearchCriteria,
        provider: Option<&str>,
    ) -> QueryResult<SearchPage> {
        match &self.mode {
            QueryMode::Delegated(delegate) => delegate.search_criteria(criteria, provider),
            QueryMode::Direct(direct) => direct.search_criteria(0, 0, criteria, provider),
        }
    }
}
