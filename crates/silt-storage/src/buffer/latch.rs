//! Page guards: unpin-on-drop handles over fetched pages.
//!
//! A guard pairs a pinned frame with the obligation to unpin it. Dropping
//! the guard releases the pin through the pool (so the replacer learns about
//! it) and forwards the dirty bit: guards that handed out mutable payload
//! access unpin dirty, read guards always unpin clean.
//!
//! Payload locking is per-access: `data()`/`data_mut()` take the frame's
//! payload lock only for the lifetime of the returned borrow. The pin, not
//! the payload lock, is what the guard holds for its whole lifetime.

use std::sync::Arc;

use parking_lot::{RwLockReadGuard, RwLockWriteGuard};
use silt_common::types::PageId;

use super::frame::BufferFrame;
use super::pool::BufferPoolManager;

/// Basic page guard: read and write access, unpin on drop.
pub struct PageGuard {
    pool: Arc<BufferPoolManager>,
    frame: Option<Arc<BufferFrame>>,
    page_id: PageId,
    modified: bool,
}

impl PageGuard {
    pub(crate) fn new(pool: Arc<BufferPoolManager>, frame: Arc<BufferFrame>, page_id: PageId) -> Self {
        Self {
            pool,
            frame: Some(frame),
            page_id,
            modified: false,
        }
    }

    fn frame(&self) -> &Arc<BufferFrame> {
        self.frame.as_ref().expect("page guard already released")
    }

    /// Returns the guarded page's id.
    #[inline]
    pub fn page_id(&self) -> PageId {
        self.page_id
    }

    /// Read access to the page payload.
    #[inline]
    pub fn data(&self) -> RwLockReadGuard<'_, Vec<u8>> {
        self.frame().data()
    }

    /// Mutable access to the page payload. Marks the page dirty.
    #[inline]
    pub fn data_mut(&mut self) -> RwLockWriteGuard<'_, Vec<u8>> {
        self.modified = true;
        self.frame().data_mut()
    }

    /// Marks the page dirty without touching the payload.
    #[inline]
    pub fn mark_dirty(&mut self) {
        self.modified = true;
    }
}

impl Drop for PageGuard {
    fn drop(&mut self) {
        if self.frame.take().is_some() {
            self.pool.unpin_page(self.page_id, self.modified);
        }
    }
}

impl std::fmt::Debug for PageGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PageGuard")
            .field("page_id", &self.page_id)
            .field("modified", &self.modified)
            .finish()
    }
}

/// Read guard: shared, read-only payload access, unpin-clean on drop.
pub struct PageReadGuard {
    pool: Arc<BufferPoolManager>,
    frame: Option<Arc<BufferFrame>>,
    page_id: PageId,
}

impl PageReadGuard {
    pub(crate) fn new(pool: Arc<BufferPoolManager>, frame: Arc<BufferFrame>, page_id: PageId) -> Self {
        Self {
            pool,
            frame: Some(frame),
            page_id,
        }
    }

    /// Returns the guarded page's id.
    #[inline]
    pub fn page_id(&self) -> PageId {
        self.page_id
    }

    /// Read access to the page payload.
    #[inline]
    pub fn data(&self) -> RwLockReadGuard<'_, Vec<u8>> {
        self.frame
            .as_ref()
            .expect("page guard already released")
            .data()
    }
}

impl Drop for PageReadGuard {
    fn drop(&mut self) {
        if self.frame.take().is_some() {
            self.pool.unpin_page(self.page_id, false);
        }
    }
}

impl std::fmt::Debug for PageReadGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PageReadGuard")
            .field("page_id", &self.page_id)
            .finish()
    }
}

/// Write guard: exclusive payload access, unpin-dirty on drop if modified.
pub struct PageWriteGuard {
    pool: Arc<BufferPoolManager>,
    frame: Option<Arc<BufferFrame>>,
    page_id: PageId,
    modified: bool,
}

impl PageWriteGuard {
    pub(crate) fn new(pool: Arc<BufferPoolManager>, frame: Arc<BufferFrame>, page_id: PageId) -> Self {
        Self {
            pool,
            frame: Some(frame),
            page_id,
            modified: false,
        }
    }

    fn frame(&self) -> &Arc<BufferFrame> {
        self.frame.as_ref().expect("page guard already released")
    }

    /// Returns the guarded page's id.
    #[inline]
    pub fn page_id(&self) -> PageId {
        self.page_id
    }

    /// Read access to the page payload.
    #[inline]
    pub fn data(&self) -> RwLockReadGuard<'_, Vec<u8>> {
        self.frame().data()
    }

    /// Mutable access to the page payload. Marks the page dirty.
    #[inline]
    pub fn data_mut(&mut self) -> RwLockWriteGuard<'_, Vec<u8>> {
        self.modified = true;
        self.frame().data_mut()
    }

    /// Marks the page dirty without touching the payload.
    #[inline]
    pub fn mark_dirty(&mut self) {
        self.modified = true;
    }

    /// Returns true if the payload was borrowed mutably.
    #[inline]
    pub fn is_modified(&self) -> bool {
        self.modified
    }
}

impl Drop for PageWriteGuard {
    fn drop(&mut self) {
        if self.frame.take().is_some() {
            self.pool.unpin_page(self.page_id, self.modified);
        }
    }
}

impl std::fmt::Debug for PageWriteGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PageWriteGuard")
            .field("page_id", &self.page_id)
            .field("modified", &self.modified)
            .finish()
    }
}
