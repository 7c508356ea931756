//! In-memory page store: the simulated disk and buffer pool

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::Violation;
use crate::types::{Page, PageId};

/// Disk and buffer pool copies of every page.
///
/// A page must be provisioned on disk before it can be pinned or flushed.
/// The buffer pool copy may be ahead of the disk copy.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageStore {
    disk: BTreeMap<PageId, Page>,
    buffer_pool: BTreeMap<PageId, Page>,
}

impl PageStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store with a sentinel page on disk for every id
    pub fn provisioned<I, S>(pages: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<PageId>,
    {
        let disk = pages
            .into_iter()
            .map(|page| (page.into(), Page::sentinel()))
            .collect();
        Self {
            disk,
            buffer_pool: BTreeMap::new(),
        }
    }

    pub fn is_provisioned(&self, page: &str) -> bool {
        self.disk.contains_key(page)
    }

    /// Bring `page` into the buffer pool (copying the disk version if it is
    /// not resident) and return the buffered copy.
    pub fn pin(&mut self, page: &str) -> Result<&mut Page, Violation> {
        if !self.buffer_pool.contains_key(page) {
            let on_disk = self
                .disk
                .get(page)
                .ok_or_else(|| Violation::UnprovisionedPage(page.to_string()))?;
            self.buffer_pool.insert(page.to_string(), on_disk.clone());
        }
        self.buffer_pool
            .get_mut(page)
            .ok_or_else(|| Violation::UnprovisionedPage(page.to_string()))
    }

    /// Write the buffered copy of `page` to disk and evict it. Returns the
    /// flushed page, or `None` if it was not resident.
    pub fn flush_to_disk(&mut self, page: &str) -> Result<Option<Page>, Violation> {
        if !self.disk.contains_key(page) {
            return Err(Violation::UnprovisionedPage(page.to_string()));
        }
        let Some(buffered) = self.buffer_pool.remove(page) else {
            return Ok(None);
        };
        self.disk.insert(page.to_string(), buffered.clone());
        Ok(Some(buffered))
    }

    pub fn buffered(&self, page: &str) -> Option<&Page> {
        self.buffer_pool.get(page)
    }

    pub fn on_disk(&self, page: &str) -> Option<&Page> {
        self.disk.get(page)
    }

    pub fn buffer_pool(&self) -> &BTreeMap<PageId, Page> {
        &self.buffer_pool
    }

    pub fn disk(&self) -> &BTreeMap<PageId, Page> {
        &self.disk
    }

    /// Lose every buffered page
    pub fn clear_buffer_pool(&mut self) {
        self.buffer_pool.clear();
    }
}
