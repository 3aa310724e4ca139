use std::cell::RefCell;
use std::collections::{HashMap, HashSet};

use cinewall_shared::{CatalogQuery, CatalogRecord, RecordId};
use tracing::{trace, warn};

use crate::catalog::CatalogSource;
use crate::grid::GridCoordinate;
use crate::record_pool::RecordPool;

/// Outcome of looking up the record that lives at a coordinate.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    Bound(CatalogRecord),
    /// The pool had nothing to hand out. Try again later.
    Unassigned,
    /// The universe was reset after the lookup was issued.
    Stale,
}

/// Write-once map from coordinate to record for the current epoch.
///
/// Bindings are never evicted by viewport culling; a coordinate keeps its
/// record until `reset`.
pub struct AssignmentCache<S> {
    pool: RecordPool<S>,
    low_watermark: usize,
    warn_threshold: usize,
    state: RefCell<CacheState>,
}

#[derive(Default)]
struct CacheState {
    epoch: u64,
    bindings: HashMap<GridCoordinate, CatalogRecord>,
    bound_ids: HashSet<RecordId>,
    warned: bool,
}

impl<S: CatalogSource> AssignmentCache<S> {
    pub fn new(pool: RecordPool<S>, low_watermark: usize, warn_threshold: usize) -> Self {
        Self {
            pool,
            low_watermark,
            warn_threshold,
            state: RefCell::new(CacheState::default()),
        }
    }

    /// Return the record bound to `coord`, binding the next pooled record if
    /// the coordinate is new. The first successful resolution wins.
    ///
    /// `epoch` is the epoch the request was issued in. A request from an
    /// earlier epoch resolves to `Stale` without touching the pool.
    pub async fn resolve(&self, coord: GridCoordinate, epoch: u64) -> Resolution {
        if self.epoch() != epoch {
            trace!(%coord, epoch, "resolution issued in a previous epoch");
            return Resolution::Stale;
        }
        if let Some(record) = self.get(coord) {
            return Resolution::Bound(record);
        }

        if self.pool.len() < self.low_watermark {
            self.pool
                .ensure_minimum(self.low_watermark, |id| self.is_bound(id))
                .await;
        }
        if self.epoch() != epoch {
            trace!(%coord, "resolution outlived its epoch");
            return Resolution::Stale;
        }

        if let Some(record) = self.get(coord) {
            return Resolution::Bound(record);
        }
        match self.pool.take() {
            Some(record) => Resolution::Bound(self.bind(coord, record)),
            None => Resolution::Unassigned,
        }
    }
}

impl<S> AssignmentCache<S> {
    pub fn get(&self, coord: GridCoordinate) -> Option<CatalogRecord> {
        self.state.borrow().bindings.get(&coord).cloned()
    }

    pub fn is_bound(&self, id: RecordId) -> bool {
        self.state.borrow().bound_ids.contains(&id)
    }

    pub fn len(&self) -> usize {
        self.state.borrow().bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn epoch(&self) -> u64 {
        self.state.borrow().epoch
    }

    pub fn pool(&self) -> &RecordPool<S> {
        &self.pool
    }

    /// Forget every binding, empty the pool and switch to `query`.
    pub fn reset(&self, query: CatalogQuery) {
        {
            let mut state = self.state.borrow_mut();
            let epoch = state.epoch + 1;
            *state = CacheState {
                epoch,
                ..CacheState::default()
            };
        }
        self.pool.reset(query);
    }

    fn bind(&self, coord: GridCoordinate, record: CatalogRecord) -> CatalogRecord {
        let mut state = self.state.borrow_mut();
        if let Some(existing) = state.bindings.get(&coord) {
            let existing = existing.clone();
            drop(state);
            self.pool.restore(record);
            return existing;
        }

        state.bound_ids.insert(record.id);
        state.bindings.insert(coord, record.clone());

        let bound = state.bindings.len();
        if bound >= self.warn_threshold && !state.warned {
            state.warned = true;
            warn!(bound, "assignment cache is growing large for this query");
        }
        record
    }
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use super::*;
    use crate::test_support::FakeCatalog;

    fn cache(catalog: &FakeCatalog) -> AssignmentCache<FakeCatalog> {
        let pool = RecordPool::new(catalog.clone(), CatalogQuery::default(), 3);
        AssignmentCache::new(pool, 20, 10_000)
    }

    fn bound_id(resolution: &Resolution) -> Option<RecordId> {
        match resolution {
            Resolution::Bound(record) => Some(record.id),
            _ => None,
        }
    }

    #[tokio::test]
    async fn resolve_is_idempotent() {
        let catalog = FakeCatalog::sequential(40, 20);
        let cache = cache(&catalog);
        let coord = GridCoordinate::new(3, -2);

        let first = cache.resolve(coord, 0).await;
        assert_eq!(bound_id(&first), Some(RecordId(1)));
        for _ in 0..5 {
            assert_eq!(cache.resolve(coord, 0).await, first);
        }
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test]
    async fn distinct_coordinates_never_share_a_record() {
        let catalog = FakeCatalog::sequential(60, 20);
        let cache = cache(&catalog);

        let mut seen = HashSet::new();
        for col in 0..10 {
            for row in 0..4 {
                let resolution = cache.resolve(GridCoordinate::new(col, row), 0).await;
                let id = bound_id(&resolution).expect("catalog has enough records");
                assert!(seen.insert(id), "record {id} bound twice");
                assert!(!cache.pool().contains(id));
            }
        }
        assert_eq!(cache.len(), 40);
    }

    #[tokio::test]
    async fn unassigned_until_a_record_arrives_then_stable() {
        let catalog = FakeCatalog::with_pages(vec![vec![1, 2], vec![3]]);
        catalog.fail_page(1);
        let cache = cache(&catalog);
        let coord = GridCoordinate::new(0, 0);

        assert_eq!(cache.resolve(coord, 0).await, Resolution::Unassigned);
        assert!(cache.get(coord).is_none());

        let bound = cache.resolve(coord, 0).await;
        assert_eq!(bound_id(&bound), Some(RecordId(3)));
        assert_eq!(cache.resolve(coord, 0).await, bound);
    }

    #[tokio::test]
    async fn refill_skips_records_bound_elsewhere() {
        let catalog = FakeCatalog::with_pages(vec![vec![1], vec![1, 2]]);
        let pool = RecordPool::new(catalog.clone(), CatalogQuery::default(), 1);
        let cache = AssignmentCache::new(pool, 20, 10_000);

        let a = cache.resolve(GridCoordinate::new(0, 0), 0).await;
        let b = cache.resolve(GridCoordinate::new(1, 0), 0).await;
        assert_eq!(bound_id(&a), Some(RecordId(1)));
        assert_eq!(bound_id(&b), Some(RecordId(2)));
        assert_eq!(cache.pool().stats().duplicates_dropped, 1);
    }

    #[tokio::test]
    async fn starved_pool_refills_once_for_a_burst_of_lookups() {
        let catalog = FakeCatalog::with_pages(vec![vec![1, 2, 3], Vec::new()]);
        let cache = cache(&catalog);
        cache.pool().ensure_minimum(3, |_| false).await;
        assert_eq!(cache.pool().len(), 3);

        catalog.hold();
        let release = {
            let catalog = catalog.clone();
            async move {
                tokio::task::yield_now().await;
                catalog.release();
            }
        };
        let (a, b, c, d, e, ()) = tokio::join!(
            cache.resolve(GridCoordinate::new(0, 0), 0),
            cache.resolve(GridCoordinate::new(1, 0), 0),
            cache.resolve(GridCoordinate::new(2, 0), 0),
            cache.resolve(GridCoordinate::new(3, 0), 0),
            cache.resolve(GridCoordinate::new(4, 0), 0),
            release,
        );

        let results = [a, b, c, d, e];
        let bound = results
            .iter()
            .filter(|r| matches!(r, Resolution::Bound(_)))
            .count();
        let unassigned = results
            .iter()
            .filter(|r| **r == Resolution::Unassigned)
            .count();
        assert_eq!(bound, 3);
        assert_eq!(unassigned, 2);
        // Page 1 primed the pool; the burst triggered exactly one more request.
        assert_eq!(catalog.requested_pages(), vec![1, 2]);
    }

    #[tokio::test]
    async fn reset_while_suspended_yields_stale_and_binds_nothing() {
        let catalog = FakeCatalog::sequential(40, 20);
        catalog.hold();
        let cache = Rc::new(cache(&catalog));
        let coord = GridCoordinate::new(5, 5);

        let lookup = {
            let cache = Rc::clone(&cache);
            async move { cache.resolve(coord, 0).await }
        };
        let interrupt = {
            let cache = Rc::clone(&cache);
            let catalog = catalog.clone();
            async move {
                tokio::task::yield_now().await;
                cache.reset(CatalogQuery::with_genre(Some(35)));
                catalog.release();
            }
        };
        let (resolution, ()) = tokio::join!(lookup, interrupt);

        assert_eq!(resolution, Resolution::Stale);
        assert!(cache.is_empty());
        assert!(cache.pool().is_empty());
        assert_eq!(cache.epoch(), 1);
        assert_eq!(cache.pool().epoch(), 1);
    }

    #[tokio::test]
    async fn reset_clears_bindings_and_switches_query() {
        let catalog = FakeCatalog::sequential(40, 20);
        let cache = cache(&catalog);
        cache.resolve(GridCoordinate::new(0, 0), 0).await;
        assert!(cache.is_bound(RecordId(1)));

        let query = CatalogQuery::with_genre(Some(27));
        cache.reset(query.clone());
        assert!(cache.is_empty());
        assert!(!cache.is_bound(RecordId(1)));
        assert!(cache.pool().is_empty());

        let again = cache.resolve(GridCoordinate::new(0, 0), cache.epoch()).await;
        assert_eq!(bound_id(&again), Some(RecordId(1)));
        assert_eq!(catalog.requested_queries().last(), Some(&query));
    }

    #[tokio::test]
    async fn lookup_issued_before_a_reset_is_stale_and_fetches_nothing() {
        let catalog = FakeCatalog::sequential(40, 20);
        let cache = cache(&catalog);
        let issued = cache.epoch();
        cache.reset(CatalogQuery::with_genre(Some(99)));

        let resolution = cache.resolve(GridCoordinate::new(2, 3), issued).await;

        assert_eq!(resolution, Resolution::Stale);
        assert!(cache.is_empty());
        assert!(cache.pool().is_empty());
        assert!(catalog.requested_pages().is_empty());
    }

    #[test]
    fn losing_a_binding_race_returns_the_record_to_the_pool() {
        let catalog = FakeCatalog::default();
        let cache = cache(&catalog);
        let coord = GridCoordinate::new(1, 1);

        let winner = cache.bind(coord, crate::test_support::record(10));
        let loser = cache.bind(coord, crate::test_support::record(11));
        assert_eq!(winner.id, RecordId(10));
        assert_eq!(loser.id, RecordId(10));
        assert!(cache.pool().contains(RecordId(11)));
        assert!(!cache.is_bound(RecordId(11)));
    }
}
