use std::cell::RefCell;
use std::collections::{HashSet, VecDeque};

use cinewall_shared::{CatalogPage, CatalogQuery, CatalogRecord, RecordId};
use tracing::{debug, trace, warn};

use crate::catalog::{CatalogError, CatalogSource};

const FIRST_PAGE: u32 = 1;

/// Counters for the current epoch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolStats {
    pub pages_requested: u64,
    pub pages_failed: u64,
    pub records_added: u64,
    pub duplicates_dropped: u64,
}

/// FIFO of fetched records that are not yet bound to a coordinate.
///
/// Pagination is serialized by a single in-flight flag: while a page is being
/// fetched, further `ensure_minimum` calls return immediately instead of
/// queueing a duplicate request. Transport failures count as empty pages and
/// still advance the cursor.
pub struct RecordPool<S> {
    source: S,
    max_pages_per_refill: usize,
    state: RefCell<PoolState>,
}

struct PoolState {
    epoch: u64,
    query: CatalogQuery,
    queue: VecDeque<CatalogRecord>,
    pooled: HashSet<RecordId>,
    next_page: u32,
    in_flight: bool,
    exhausted: bool,
    refill_generation: u64,
    stats: PoolStats,
}

impl PoolState {
    fn new(epoch: u64, query: CatalogQuery) -> Self {
        Self {
            epoch,
            query,
            queue: VecDeque::new(),
            pooled: HashSet::new(),
            next_page: FIRST_PAGE,
            in_flight: false,
            exhausted: false,
            refill_generation: 0,
            stats: PoolStats::default(),
        }
    }
}

struct FetchTicket {
    epoch: u64,
    page: u32,
    query: CatalogQuery,
}

enum FetchOutcome {
    Added,
    Failed,
    Stale,
}

impl<S: CatalogSource> RecordPool<S> {
    pub fn new(source: S, query: CatalogQuery, max_pages_per_refill: usize) -> Self {
        Self {
            source,
            max_pages_per_refill: max_pages_per_refill.max(1),
            state: RefCell::new(PoolState::new(0, query)),
        }
    }

    /// Fetch pages until `n` records are pooled, the catalog is exhausted, a
    /// fetch fails, or the per-refill page cap is hit. Returns the pool size.
    ///
    /// `is_bound` rejects records that already live at some coordinate.
    pub async fn ensure_minimum(&self, n: usize, is_bound: impl Fn(RecordId) -> bool) -> usize {
        let mut pages = 0;
        while pages < self.max_pages_per_refill && self.len() < n {
            let Some(ticket) = self.begin_fetch() else {
                break;
            };
            pages += 1;
            let result = self.source.fetch_page(&ticket.query, ticket.page).await;
            match self.finish_fetch(ticket, result, &is_bound) {
                FetchOutcome::Added => {}
                FetchOutcome::Failed | FetchOutcome::Stale => break,
            }
        }
        self.len()
    }
}

impl<S> RecordPool<S> {
    /// Remove and return the oldest pooled record.
    pub fn take(&self) -> Option<CatalogRecord> {
        let mut state = self.state.borrow_mut();
        let record = state.queue.pop_front()?;
        state.pooled.remove(&record.id);
        Some(record)
    }

    /// Return a record to the head of the queue, e.g. after losing a binding race.
    pub(crate) fn restore(&self, record: CatalogRecord) {
        let mut state = self.state.borrow_mut();
        if state.pooled.insert(record.id) {
            state.queue.push_front(record);
        }
    }

    /// Drop every pooled record and start paginating `query` from the first page.
    pub fn reset(&self, query: CatalogQuery) {
        let mut state = self.state.borrow_mut();
        let epoch = state.epoch + 1;
        *state = PoolState::new(epoch, query);
    }

    pub fn len(&self) -> usize {
        self.state.borrow().queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, id: RecordId) -> bool {
        self.state.borrow().pooled.contains(&id)
    }

    pub fn is_fetching(&self) -> bool {
        self.state.borrow().in_flight
    }

    pub fn is_exhausted(&self) -> bool {
        self.state.borrow().exhausted
    }

    pub fn next_page(&self) -> u32 {
        self.state.borrow().next_page
    }

    pub fn epoch(&self) -> u64 {
        self.state.borrow().epoch
    }

    pub fn query(&self) -> CatalogQuery {
        self.state.borrow().query.clone()
    }

    pub fn stats(&self) -> PoolStats {
        self.state.borrow().stats
    }

    /// Bumped every time a page adds at least one record.
    pub fn refill_generation(&self) -> u64 {
        self.state.borrow().refill_generation
    }

    fn begin_fetch(&self) -> Option<FetchTicket> {
        let mut state = self.state.borrow_mut();
        if state.in_flight || state.exhausted {
            return None;
        }
        state.in_flight = true;
        state.stats.pages_requested += 1;
        Some(FetchTicket {
            epoch: state.epoch,
            page: state.next_page,
            query: state.query.clone(),
        })
    }

    fn finish_fetch(
        &self,
        ticket: FetchTicket,
        result: Result<CatalogPage, CatalogError>,
        is_bound: &impl Fn(RecordId) -> bool,
    ) -> FetchOutcome {
        let mut state = self.state.borrow_mut();
        if ticket.epoch != state.epoch {
            trace!(page = ticket.page, "discarding page from a previous epoch");
            return FetchOutcome::Stale;
        }

        state.in_flight = false;
        state.next_page = ticket.page.saturating_add(1);

        let page = match result {
            Ok(page) => page,
            Err(e) => {
                state.stats.pages_failed += 1;
                warn!(page = ticket.page, error = %e, "catalog page fetch failed");
                return FetchOutcome::Failed;
            }
        };

        if !page.has_more {
            state.exhausted = true;
        }

        let mut added = 0u64;
        let mut duplicates = 0u64;
        for record in page.records {
            if state.pooled.contains(&record.id) || is_bound(record.id) {
                duplicates += 1;
                continue;
            }
            state.pooled.insert(record.id);
            state.queue.push_back(record);
            added += 1;
        }

        state.stats.records_added += added;
        state.stats.duplicates_dropped += duplicates;
        if added > 0 {
            state.refill_generation += 1;
        }
        debug!(
            page = ticket.page,
            added,
            duplicates,
            pooled = state.queue.len(),
            exhausted = state.exhausted,
            "catalog page loaded"
        );
        FetchOutcome::Added
    }
}
