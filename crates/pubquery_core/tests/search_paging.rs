use pubquery_core::search::SearchResult;
use pubquery_core::{
    IndexDocument, ItemKind, MemoryIndex, PublishedContentQuery, PublishedItem,
    PublishedSnapshot, QueryError, QueryFacade, SearchCriteria, SearchCriteriaBuilder, SearchHit,
    SearchHits, SearchProvider, SearchProviderRegistry, SearchRegistryError, SearchSettings,
    SearchValue,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use uuid::Uuid;

/// Provider returning a fixed ranking and recording what it was asked for.
struct RecordingProvider {
    name: &'static str,
    fields: Vec<String>,
    ranking: Vec<i32>,
    bounded_top_n: bool,
    requests: Mutex<Vec<(usize, Option<usize>)>>,
    field_calls: AtomicUsize,
    /// Extra group every criteria from `create_criteria` starts with.
    scope: Option<&'static str>,
}

impl RecordingProvider {
    fn new(name: &'static str, ranking: Vec<i32>, bounded_top_n: bool) -> Self {
        Self {
            name,
            fields: vec!["nodeName".to_string(), "bodyText".to_string()],
            ranking,
            bounded_top_n,
            requests: Mutex::new(Vec::new()),
            field_calls: AtomicUsize::new(0),
            scope: None,
        }
    }

    fn scoped(mut self, value: &'static str) -> Self {
        self.scope = Some(value);
        self
    }

    fn without_fields(mut self) -> Self {
        self.fields.clear();
        self
    }

    /// `(criteria groups, max_results)` per call.
    fn requests(&self) -> Vec<(usize, Option<usize>)> {
        self.requests.lock().unwrap().clone()
    }
}

impl SearchProvider for RecordingProvider {
    fn name(&self) -> &str {
        self.name
    }

    fn searchable_fields(&self) -> Vec<String> {
        self.field_calls.fetch_add(1, Ordering::SeqCst);
        self.fields.clone()
    }

    fn supports_bounded_top_n(&self) -> bool {
        self.bounded_top_n
    }

    fn create_criteria(&self) -> SearchCriteriaBuilder {
        let builder = SearchCriteriaBuilder::new();
        match self.scope {
            Some(value) => builder.field("nodeName", SearchValue::explicit(value)),
            None => builder,
        }
    }

    fn search(
        &self,
        criteria: &SearchCriteria,
        max_results: Option<usize>,
    ) -> SearchResult<SearchHits> {
        self.requests
            .lock()
            .unwrap()
            .push((criteria.groups().len(), max_results));
        if criteria.is_empty() {
            return Ok(SearchHits::empty());
        }

        let returned = match (self.bounded_top_n, max_results) {
            (true, Some(limit)) => limit.min(self.ranking.len()),
            _ => self.ranking.len(),
        };
        let hits = self.ranking[..returned]
            .iter()
            .enumerate()
            .map(|(position, id)| SearchHit {
                id: *id,
                score: 100.0 - position as f32,
            })
            .collect();
        Ok(SearchHits {
            hits,
            total_item_count: self.ranking.len(),
        })
    }
}

/// Content pages 1..=10, media image 11.
fn snapshot() -> PublishedSnapshot {
    let content = (1..=10)
        .map(|id| {
            PublishedItem::new(id, Uuid::new_v4(), ItemKind::Content, "page", format!("Page {id}"))
                .with_sort_order(i64::from(id))
                .with_property("bodyText", if id % 2 == 0 { "even rust" } else { "odd rust" })
        })
        .collect();
    let media = vec![PublishedItem::new(
        11,
        Uuid::new_v4(),
        ItemKind::Media,
        "image",
        "Rust logo",
    )];
    PublishedSnapshot::build(content, media).expect("fixture snapshot should build")
}

fn facade_with(providers: &[Arc<RecordingProvider>]) -> QueryFacade {
    let mut registry = SearchProviderRegistry::new();
    for provider in providers {
        registry.register(provider.clone()).unwrap();
    }
    QueryFacade::from_snapshot(&snapshot(), Arc::new(registry))
}

fn ranking() -> Vec<i32> {
    (1..=10).collect()
}

#[test]
fn top_n_provider_is_capped_at_skip_plus_take() {
    let provider = Arc::new(RecordingProvider::new("internal", ranking(), true));
    let facade = facade_with(&[provider.clone()]);

    let page = facade.search_term_paged(2, 3, "rust", false, None).unwrap();

    assert_eq!(page.ids(), vec![3, 4, 5]);
    assert_eq!(page.total, 10);
    assert_eq!(page.results[0].rank, 2);
    assert_eq!(provider.requests(), vec![(1, Some(5))]);
}

#[test]
fn provider_without_top_n_pages_in_process() {
    let provider = Arc::new(RecordingProvider::new("internal", ranking(), false));
    let facade = facade_with(&[provider.clone()]);

    let page = facade.search_term_paged(2, 3, "rust", false, None).unwrap();

    assert_eq!(page.ids(), vec![3, 4, 5]);
    assert_eq!(page.total, 10);
    assert_eq!(provider.requests(), vec![(1, None)]);
}

#[test]
fn unpaged_search_returns_everything_with_provider_total() {
    let provider = Arc::new(RecordingProvider::new("internal", ranking(), true));
    let facade = facade_with(&[provider.clone()]);

    let page = facade.search_term("rust", true, None).unwrap();

    assert_eq!(page.ids(), ranking());
    assert_eq!(page.total, 10);
    assert_eq!(provider.requests(), vec![(1, None)]);
}

#[test]
fn page_past_the_end_is_empty_but_keeps_total() {
    let provider = Arc::new(RecordingProvider::new("internal", ranking(), true));
    let facade = facade_with(&[provider.clone()]);

    let page = facade.search_term_paged(20, 5, "rust", false, None).unwrap();
    assert!(page.is_empty());
    assert_eq!(page.total, 10);

    let page = facade.search_term_paged(3, 0, "rust", false, None).unwrap();
    assert!(page.is_empty());
    assert_eq!(page.total, 10);
    assert_eq!(provider.requests(), vec![(1, Some(25)), (1, Some(3))]);
}

#[test]
fn zero_matches_is_empty_with_zero_total() {
    let provider = Arc::new(RecordingProvider::new("internal", Vec::new(), true));
    let facade = facade_with(&[provider]);

    let page = facade.search_term("nothing", false, None).unwrap();
    assert!(page.is_empty());
    assert_eq!(page.total, 0);
}

#[test]
fn blank_term_matches_nothing() {
    let provider = Arc::new(RecordingProvider::new("internal", ranking(), true));
    let facade = facade_with(&[provider.clone()]);

    let page = facade.search_term("   ", true, None).unwrap();
    assert!(page.is_empty());
    assert_eq!(page.total, 0);
    assert_eq!(provider.requests(), vec![(0, None)]);
}

#[test]
fn unresolved_and_media_rows_are_dropped_from_content_results() {
    let provider = Arc::new(RecordingProvider::new("internal", vec![1, 99, 11, 2, 3], true));
    let facade = facade_with(&[provider]);

    let page = facade.search_term("rust", false, None).unwrap();
    assert_eq!(page.ids(), vec![1, 2, 3]);
    assert_eq!(page.total, 5);
    let ranks: Vec<usize> = page.results.iter().map(|result| result.rank).collect();
    assert_eq!(ranks, vec![0, 3, 4]);
}

#[test]
fn term_search_builds_one_group_per_token_and_discovers_fields_once() {
    let provider = Arc::new(RecordingProvider::new("internal", ranking(), true));
    let facade = facade_with(&[provider.clone()]);

    facade.search_term("hello big world", false, None).unwrap();
    facade.search_term_paged(0, 2, "hello", true, None).unwrap();

    assert_eq!(provider.requests(), vec![(3, None), (1, Some(2))]);
    assert_eq!(provider.field_calls.load(Ordering::SeqCst), 1);
}

#[test]
fn term_search_starts_from_the_provider_criteria() {
    let provider = Arc::new(RecordingProvider::new("internal", ranking(), true).scoped("site"));
    let facade = facade_with(&[provider.clone()]);

    facade.search_term("hello world", false, None).unwrap();
    facade.search_term("   ", false, None).unwrap();

    assert_eq!(provider.requests(), vec![(3, None), (0, None)]);
}

#[test]
fn punctuation_in_a_term_does_not_change_results() {
    let snapshot = snapshot();
    let index = MemoryIndex::new("internal", &["nodeName", "bodyText"]);
    index.index_all(snapshot.content.iter().map(|item| IndexDocument::from_item(item)));
    let mut registry = SearchProviderRegistry::new();
    registry.register(Arc::new(index)).unwrap();
    let facade = QueryFacade::from_snapshot(&snapshot, Arc::new(registry));

    let explicit = facade.search_term("even & rust", false, None).unwrap();
    let wildcard = facade.search_term("even & rust", true, None).unwrap();
    assert_eq!(explicit.ids(), vec![2, 4, 6, 8, 10]);
    assert_eq!(wildcard.ids(), explicit.ids());
    assert_eq!(wildcard.total, 5);
}

#[test]
fn configured_fields_are_used_when_provider_reports_none() {
    let provider = Arc::new(RecordingProvider::new("internal", ranking(), true).without_fields());
    let empty = facade_with(&[provider.clone()]);
    let err = empty.search_term("rust", false, None).unwrap_err();
    assert!(matches!(err, QueryError::Search(_)));

    let settings = SearchSettings {
        fallback_search_fields: vec!["bodyText".to_string()],
        ..SearchSettings::default()
    };
    let mut registry = SearchProviderRegistry::with_settings(&settings);
    registry.register(provider).unwrap();
    let facade = QueryFacade::from_snapshot(&snapshot(), Arc::new(registry));
    let page = facade.search_term("rust", false, None).unwrap();
    assert_eq!(page.total, 10);
}

#[test]
fn criteria_search_honors_provider_selection() {
    let internal = Arc::new(RecordingProvider::new("internal", vec![1], true));
    let external = Arc::new(RecordingProvider::new("external", vec![7, 8, 9], false));
    let facade = facade_with(&[internal.clone(), external.clone()]);
    let criteria = SearchCriteriaBuilder::new()
        .field("bodyText", SearchValue::explicit("rust"))
        .compile()
        .unwrap();

    let page = facade
        .search_criteria_paged(1, 1, &criteria, Some("external"))
        .unwrap();
    assert_eq!(page.ids(), vec![8]);
    assert_eq!(page.total, 3);

    let page = facade.search_criteria(&criteria, None).unwrap();
    assert_eq!(page.ids(), vec![1]);

    assert_eq!(external.requests(), vec![(1, None)]);
    assert_eq!(internal.requests(), vec![(1, None)]);
}

#[test]
fn unknown_or_missing_provider_is_an_error() {
    let facade = facade_with(&[]);
    let err = facade.search_term("rust", false, None).unwrap_err();
    assert!(matches!(
        err,
        QueryError::Registry(SearchRegistryError::NoDefaultProvider)
    ));

    let facade = facade_with(&[Arc::new(RecordingProvider::new("internal", ranking(), true))]);
    let err = facade
        .search_term("rust", false, Some("missing"))
        .unwrap_err();
    assert!(matches!(
        err,
        QueryError::Registry(SearchRegistryError::ProviderNotFound(_))
    ));
}

#[test]
fn memory_index_pages_through_the_facade() {
    let snapshot = snapshot();
    let index = MemoryIndex::new("internal", &["nodeName", "bodyText"]);
    index.index_all(snapshot.content.iter().map(|item| IndexDocument::from_item(item)));
    let mut registry = SearchProviderRegistry::new();
    registry.register(Arc::new(index)).unwrap();
    let facade = QueryFacade::from_snapshot(&snapshot, Arc::new(registry));

    let evens = facade.search_term("even rust", false, None).unwrap();
    assert_eq!(evens.ids(), vec![2, 4, 6, 8, 10]);
    assert_eq!(evens.total, 5);

    let page = facade.search_term_paged(1, 2, "eve", true, None).unwrap();
    assert_eq!(page.ids(), vec![4, 6]);
    assert_eq!(page.total, 5);

    let none = facade.search_term("python", false, None).unwrap();
    assert!(none.is_empty());
    assert_eq!(none.total, 0);
}
