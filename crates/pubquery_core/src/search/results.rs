//! Hydration of ranked provider rows into published items.

use crate::cache::{CacheResult, PublishedCache};
use crate::model::item::PublishedItemRef;
use crate::search::provider::SearchHit;

/// One hydrated search row.
#[derive(Debug, Clone)]
pub struct PublishedSearchResult {
    pub item: PublishedItemRef,
    pub score: f32,
    /// Zero-based position of the raw row in the provider's ranking.
    pub rank: usize,
}

/// One page of hydrated results plus the provider's global hit count.
#[derive(Debug, Clone, Default)]
pub struct SearchPage {
    pub results: Vec<PublishedSearchResult>,
    /// Total matches reported by the provider, independent of paging.
    pub total: usize,
}

impl SearchPage {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// Ids of the hydrated items, in page order.
    pub fn ids(&self) -> Vec<i32> {
        self.results.iter().map(|result| result.item.id).collect()
    }
}

/// Resolves `hits[offset..]` against `cache`, keeping at most `take` items.
///
/// Rows that no longer resolve are skipped without consuming `take`.
pub fn hydrate_hits(
    hits: &[SearchHit],
    offset: usize,
    take: Option<usize>,
    cache: &dyn PublishedCache,
) -> CacheResult<Vec<PublishedSearchResult>> {
    let limit = take.unwrap_or(usize::MAX);
    let mut results = Vec::with_capacity(hits.len().saturating_sub(offset).min(limit));
    for (rank, hit) in hits.iter().enumerate().skip(offset) {
        if results.len() >= limit {
            break;
        }
        if let Some(item) = cache.get_by_id(hit.id)? {
            results.push(PublishedSearchResult {
                item,
                score: hit.score,
                rank,
            });
        }
    }
    Ok(results)
}

#[cfg(test)]
mod tests {
    use super::hydrate_hits;
    use crate::cache::SnapshotCache;
    use crate::model::item::{ItemKind, PublishedItem};
    use crate::search::provider::SearchHit;
    use uuid::Uuid;

    fn cache() -> SnapshotCache {
        let items = (1..=4)
            .map(|id| {
                PublishedItem::new(id, Uuid::new_v4(), ItemKind::Content, "page", format!("Page {id}"))
                    .with_sort_order(i64::from(id))
            })
            .collect();
        SnapshotCache::build(ItemKind::Content, items).expect("fixture snapshot should build")
    }

    fn hits(ids: &[i32]) -> Vec<SearchHit> {
        ids.iter()
            .enumerate()
            .map(|(index, id)| SearchHit {
                id: *id,
                score: 10.0 - index as f32,
            })
            .collect()
    }

    #[test]
    fn keeps_provider_order_and_raw_rank() {
        let cache = cache();
        let results = hydrate_hits(&hits(&[3, 1, 2]), 0, None, &cache).unwrap();
        let ids: Vec<i32> = results.iter().map(|result| result.item.id).collect();
        assert_eq!(ids, vec![3, 1, 2]);
        assert_eq!(results[1].rank, 1);
        assert_eq!(results[1].score, 9.0);
    }

    #[test]
    fn unresolved_rows_are_dropped_without_consuming_take() {
        let cache = cache();
        let results = hydrate_hits(&hits(&[1, 99, 2, 3]), 0, Some(2), &cache).unwrap();
        let ids: Vec<i32> = results.iter().map(|result| result.item.id).collect();
        assert_eq!(ids, vec![1, 2]);
        assert_eq!(results[1].rank, 2);
    }

    #[test]
    fn offset_skips_raw_rows() {
        let cache = cache();
        let results = hydrate_hits(&hits(&[1, 2, 3, 4]), 2, Some(5), &cache).unwrap();
        let ids: Vec<i32> = results.iter().map(|result| result.item.id).collect();
        assert_eq!(ids, vec![3, 4]);
    }
}
