use serde::{Deserialize, Serialize};

use crate::record::{CatalogRecord, RawCatalogRecord};

/// One page of validated records as served by `GET /api/discover`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogPage {
    pub page: u32,
    pub records: Vec<CatalogRecord>,
    pub has_more: bool,
}

impl CatalogPage {
    pub fn empty(page: u32) -> Self {
        Self {
            page,
            records: Vec::new(),
            has_more: false,
        }
    }
}

/// Upstream discover response, before validation.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DiscoverResponse {
    #[serde(default)]
    pub page: u32,
    #[serde(default)]
    pub results: Vec<RawCatalogRecord>,
    #[serde(default)]
    pub total_pages: u32,
}

impl DiscoverResponse {
    /// Validate every result. Returns the page plus the number of rejected entries.
    pub fn into_page(self) -> (CatalogPage, usize) {
        let total = self.results.len();
        let records: Vec<CatalogRecord> = self
            .results
            .into_iter()
            .filter_map(|raw| CatalogRecord::try_from(raw).ok())
            .collect();
        let rejected = total - records.len();
        (
            CatalogPage {
                page: self.page,
                records,
                has_more: self.page < self.total_pages,
            },
            rejected,
        )
    }
}
