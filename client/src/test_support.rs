//! Fakes for the collaborator traits.

use std::cell::{Cell, RefCell};
use std::collections::HashSet;
use std::future::Future;
use std::rc::Rc;

use cinewall_shared::{CatalogPage, CatalogQuery, CatalogRecord, RecordId};

use crate::camera::CameraTransform;
use crate::catalog::{CatalogError, CatalogSource};
use crate::engine::{DetailSink, TileRenderer};
use crate::grid::GridCoordinate;

pub fn record(id: u64) -> CatalogRecord {
    CatalogRecord {
        id: RecordId(id),
        title: format!("Movie {id}"),
        image_path: format!("/poster-{id}.jpg"),
        overview: None,
        release_date: None,
        vote_average: None,
        vote_count: None,
        genre_ids: Vec::new(),
        backdrop_path: None,
        original_language: None,
    }
}

/// Let spawned local tasks run to completion.
pub async fn settle() {
    for _ in 0..64 {
        tokio::task::yield_now().await;
    }
}

/// Scripted catalog: page `n` (1-based) returns the ids in `pages[n - 1]`.
#[derive(Clone, Default)]
pub struct FakeCatalog {
    inner: Rc<FakeCatalogInner>,
}

#[derive(Default)]
struct FakeCatalogInner {
    pages: RefCell<Vec<Vec<u64>>>,
    failing: RefCell<HashSet<u32>>,
    held: Cell<bool>,
    requests: RefCell<Vec<(CatalogQuery, u32)>>,
}

impl FakeCatalog {
    pub fn with_pages(pages: Vec<Vec<u64>>) -> Self {
        let catalog = Self::default();
        *catalog.inner.pages.borrow_mut() = pages;
        catalog
    }

    /// Catalog with `count` sequential ids spread over pages of `per_page`.
    pub fn sequential(count: u64, per_page: u64) -> Self {
        let ids: Vec<u64> = (1..=count).collect();
        Self::with_pages(
            ids.chunks(per_page.max(1) as usize)
                .map(<[u64]>::to_vec)
                .collect(),
        )
    }

    pub fn fail_page(&self, page: u32) {
        self.inner.failing.borrow_mut().insert(page);
    }

    /// Block every fetch until `release()`.
    pub fn hold(&self) {
        self.inner.held.set(true);
    }

    pub fn release(&self) {
        self.inner.held.set(false);
    }

    pub fn requested_pages(&self) -> Vec<u32> {
        self.inner.requests.borrow().iter().map(|(_, page)| *page).collect()
    }

    pub fn requested_queries(&self) -> Vec<CatalogQuery> {
        self.inner
            .requests
            .borrow()
            .iter()
            .map(|(query, _)| query.clone())
            .collect()
    }
}

impl CatalogSource for FakeCatalog {
    fn fetch_page(
        &self,
        query: &CatalogQuery,
        page: u32,
    ) -> impl Future<Output = Result<CatalogPage, CatalogError>> {
        self.inner.requests.borrow_mut().push((query.clone(), page));
        let inner = Rc::clone(&self.inner);
        async move {
            while inner.held.get() {
                tokio::task::yield_now().await;
            }
            if inner.failing.borrow().contains(&page) {
                return Err(CatalogError::Status(500));
            }
            let pages = inner.pages.borrow();
            let index = page as usize;
            let records: Vec<CatalogRecord> = index
                .checked_sub(1)
                .and_then(|i| pages.get(i))
                .map(|ids| ids.iter().copied().map(record).collect())
                .unwrap_or_default();
            Ok(CatalogPage {
                page,
                records,
                has_more: index < pages.len(),
            })
        }
    }
}

/// Renderer that records every call. Handles are sequential integers.
#[derive(Clone, Default)]
pub struct RecordingRenderer {
    pub log: Rc<RenderLog>,
}

#[derive(Default)]
pub struct RenderLog {
    pub created: RefCell<Vec<(GridCoordinate, RecordId)>>,
    pub destroyed: RefCell<Vec<(GridCoordinate, u32)>>,
    pub transforms: RefCell<Vec<CameraTransform>>,
    pub lock_targets: RefCell<Vec<Option<GridCoordinate>>>,
    next_handle: Cell<u32>,
}

impl RenderLog {
    pub fn created_count(&self) -> usize {
        self.created.borrow().len()
    }

    pub fn destroyed_coords(&self) -> Vec<GridCoordinate> {
        self.destroyed.borrow().iter().map(|(coord, _)| *coord).collect()
    }
}

impl TileRenderer for RecordingRenderer {
    type Handle = u32;

    fn on_tile_create(&mut self, coord: GridCoordinate, record: &CatalogRecord) -> u32 {
        self.log.created.borrow_mut().push((coord, record.id));
        let handle = self.log.next_handle.get();
        self.log.next_handle.set(handle + 1);
        handle
    }

    fn on_tile_destroy(&mut self, coord: GridCoordinate, handle: u32) {
        self.log.destroyed.borrow_mut().push((coord, handle));
    }

    fn on_camera_transform(&mut self, transform: CameraTransform) {
        self.log.transforms.borrow_mut().push(transform);
    }

    fn on_lock_target(&mut self, coord: Option<GridCoordinate>) {
        self.log.lock_targets.borrow_mut().push(coord);
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum DetailCall {
    Focus(Option<RecordId>),
    Locked(bool),
    Scroll(f64),
}

#[derive(Clone, Default)]
pub struct RecordingDetail {
    pub calls: Rc<RefCell<Vec<DetailCall>>>,
}

impl RecordingDetail {
    pub fn take(&self) -> Vec<DetailCall> {
        std::mem::take(&mut *self.calls.borrow_mut())
    }
}

impl DetailSink for RecordingDetail {
    fn on_focus(&mut self, record: Option<&CatalogRecord>) {
        self.calls
            .borrow_mut()
            .push(DetailCall::Focus(record.map(|r| r.id)));
    }

    fn on_lock_changed(&mut self, locked: bool) {
        self.calls.borrow_mut().push(DetailCall::Locked(locked));
    }

    fn on_scroll(&mut self, delta_y: f64) {
        self.calls.borrow_mut().push(DetailCall::Scroll(delta_y));
    }
}
