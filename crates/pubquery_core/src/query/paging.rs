//! Reconciles caller paging with provider retrieval capabilities.
//!
//! # Invariants
//! - `skip = 0, take = 0` is unpaged: every ranked row is hydrated.
//! - Top-N providers are asked for at most `skip + take` rows.
//! - Providers without top-N return everything; paging happens in process.
//! - The reported total is always the provider's global match count.

use crate::cache::PublishedCache;
use crate::query::QueryResult;
use crate::search::criteria::SearchCriteria;
use crate::search::provider::SearchProvider;
use crate::search::results::{hydrate_hits, SearchPage};

/// How one paged request is executed against a provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PagePlan {
    Unpaged,
    /// Provider caps rows at `max_results`; `skip` is applied in process.
    TopN {
        max_results: usize,
        skip: usize,
        take: usize,
    },
    /// Provider returns all rows; `skip`/`take` are applied in process.
    InProcess { skip: usize, take: usize },
}

impl PagePlan {
    pub fn new(skip: usize, take: usize, supports_bounded_top_n: bool) -> Self {
        if skip == 0 && take == 0 {
            Self::Unpaged
        } else if supports_bounded_top_n {
            Self::TopN {
                max_results: skip.saturating_add(take),
                skip,
                take,
            }
        } else {
            Self::InProcess { skip, take }
        }
    }

    /// Row cap passed to the provider.
    pub fn max_results(&self) -> Option<usize> {
        match self {
            Self::TopN { max_results, .. } => Some(*max_results),
            Self::Unpaged | Self::InProcess { .. } => None,
        }
    }

    fn window(&self) -> (usize, Option<usize>) {
        match self {
            Self::Unpaged => (0, None),
            Self::TopN { skip, take, .. } | Self::InProcess { skip, take } => (*skip, Some(*take)),
        }
    }
}

/// Runs `criteria` on `provider` and hydrates one page from `cache`.
pub fn execute_page(
    provider: &dyn SearchProvider,
    criteria: &SearchCriteria,
    skip: usize,
    take: usize,
    cache: &dyn PublishedCache,
) -> QueryResult<SearchPage> {
    let plan = PagePlan::new(skip, take, provider.supports_bounded_top_n());
    let hits = provider.search(criteria, plan.max_results())?;
    let (offset, limit) = plan.window();
    let results = hydrate_hits(&hits.hits, offset, limit, cache)?;
    Ok(SearchPage {
        results,
        total: hits.total_item_count,
    })
}

#[cfg(test)]
mod tests {
    use super::PagePlan;

    #[test]
    fn zero_skip_and_take_is_unpaged() {
        assert_eq!(PagePlan::new(0, 0, true), PagePlan::Unpaged);
        assert_eq!(PagePlan::new(0, 0, false), PagePlan::Unpaged);
        assert_eq!(PagePlan::Unpaged.max_results(), None);
    }

    #[test]
    fn top_n_requests_skip_plus_take() {
        let plan = PagePlan::new(2, 3, true);
        assert_eq!(plan.max_results(), Some(5));
        assert_eq!(
            plan,
            PagePlan::TopN {
                max_results: 5,
                skip: 2,
                take: 3
            }
        );
    }

    #[test]
    fn top_n_cap_saturates() {
        assert_eq!(PagePlan::new(usize::MAX, 1, true).max_results(), Some(usize::MAX));
    }

    #[test]
    fn providers_without_top_n_page_in_process() {
        let plan = PagePlan::new(2, 3, false);
        assert_eq!(plan, PagePlan::InProcess { skip: 2, take: 3 });
        assert_eq!(plan.max_results(), None);
    }
}
