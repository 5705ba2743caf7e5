//! The buffer pool manager.
//!
//! Owns the frame array and the page table, enforces the pin lifecycle, and
//! drives the replacer and the disk scheduler. All bookkeeping (page table,
//! free list, replacer, page-id counter) lives behind a single mutex; the
//! only work performed while holding it is scheduling disk requests and
//! waiting on their completions, which the scheduler's FIFO guarantee keeps
//! well-ordered.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use silt_common::types::PageId;

use crate::disk::{DiskDevice, DiskOp, DiskRequest, DiskScheduler, IoFuture, PageBuffer};

use super::config::BufferPoolConfig;
use super::error::{BufferError, BufferResult};
use super::eviction::LruKReplacer;
use super::frame::{BufferFrame, FrameId};
use super::latch::{PageGuard, PageReadGuard, PageWriteGuard};
use super::BufferPoolStats;

/// Mutable pool bookkeeping, guarded by one lock.
struct PoolCore {
    /// Maps resident pages to their frames. Injective; INVALID is never a key.
    page_table: HashMap<PageId, FrameId>,
    /// Frames holding no page. Preferred over eviction when acquiring.
    free_list: VecDeque<FrameId>,
    /// Eviction policy over resident, unpinned frames.
    replacer: LruKReplacer,
    /// Monotonic page-id counter; ids are never reused.
    next_page_id: u64,
}

/// The buffer pool manager.
///
/// Mediates between fixed-size pages on a [`DiskDevice`] and in-memory
/// frames. Pages are pinned while in use; unpinned pages become eviction
/// candidates under the LRU-K policy. Dirty pages are written back before
/// their frame is reused.
pub struct BufferPoolManager {
    pool_size: usize,
    page_size: usize,
    frames: Vec<Arc<BufferFrame>>,
    core: Mutex<PoolCore>,
    scheduler: DiskScheduler,
    fetch_count: AtomicU64,
    hit_count: AtomicU64,
    miss_count: AtomicU64,
    eviction_count: AtomicU64,
    flush_count: AtomicU64,
}

impl BufferPoolManager {
    /// Creates a buffer pool over the given device.
    ///
    /// Fails if the configuration is invalid or its page size does not match
    /// the device's.
    pub fn new(config: BufferPoolConfig, device: Arc<dyn DiskDevice>) -> BufferResult<Self> {
        config.validate().map_err(BufferError::config)?;
        if device.page_size() != config.page_size {
            return Err(BufferError::PageSizeMismatch {
                device: device.page_size(),
                config: config.page_size,
            });
        }

        let frames = (0..config.pool_size)
            .map(|i| Arc::new(BufferFrame::new(FrameId::new(i), config.page_size)))
            .collect();

        Ok(Self {
            pool_size: config.pool_size,
            page_size: config.page_size,
            frames,
            core: Mutex::new(PoolCore {
                page_table: HashMap::with_capacity(config.pool_size),
                free_list: (0..config.pool_size).map(FrameId::new).collect(),
                replacer: LruKReplacer::new(config.pool_size, config.replacer_k),
                next_page_id: PageId::FIRST.as_u64(),
            }),
            scheduler: DiskScheduler::new(device),
            fetch_count: AtomicU64::new(0),
            hit_count: AtomicU64::new(0),
            miss_count: AtomicU64::new(0),
            eviction_count: AtomicU64::new(0),
            flush_count: AtomicU64::new(0),
        })
    }

    /// Allocates a fresh page in a frame, pinned once, zero-filled and clean.
    ///
    /// Returns `None` when the free list is empty and no frame is evictable;
    /// the caller may unpin something and retry.
    pub fn new_page(&self) -> Option<(PageId, Arc<BufferFrame>)> {
        let mut core = self.core.lock();
        let frame_id = Self::acquire_frame(&mut core)?;
        let frame = &self.frames[frame_id.index()];

        if let Some(write_back) = self.begin_retire(&mut core, frame) {
            assert!(
                write_back.wait(),
                "write-back of evicted page from frame {frame_id:?} failed"
            );
        }

        let page_id = Self::allocate_locked(&mut core);
        frame.reset();
        frame.set_page_id(page_id);
        frame.pin();

        core.page_table.insert(page_id, frame_id);
        core.replacer.record_access(frame_id);
        core.replacer.set_evictable(frame_id, false);

        Some((page_id, Arc::clone(frame)))
    }

    /// Fetches a page, pinning its frame.
    ///
    /// A resident page is pinned in place; otherwise a frame is acquired
    /// (free list first, then eviction with write-back) and the page is read
    /// in from the device. Returns `None` when the pool is saturated.
    pub fn fetch_page(&self, page_id: PageId) -> Option<Arc<BufferFrame>> {
        self.fetch_count.fetch_add(1, Ordering::Relaxed);
        let mut core = self.core.lock();

        if let Some(&frame_id) = core.page_table.get(&page_id) {
            self.hit_count.fetch_add(1, Ordering::Relaxed);
            let frame = &self.frames[frame_id.index()];
            frame.pin();
            core.replacer.record_access(frame_id);
            core.replacer.set_evictable(frame_id, false);
            return Some(Arc::clone(frame));
        }

        self.miss_count.fetch_add(1, Ordering::Relaxed);
        let frame_id = Self::acquire_frame(&mut core)?;
        let frame = &self.frames[frame_id.index()];

        // The victim's write-back is enqueued before the read-in; FIFO
        // execution at the scheduler makes the device see them in that order.
        let write_back = self.begin_retire(&mut core, frame);
        let read_in = self.schedule_io(DiskOp::Read, page_id, frame.buffer());
        if let Some(write_back) = write_back {
            assert!(
                write_back.wait(),
                "write-back of evicted page from frame {frame_id:?} failed"
            );
        }
        assert!(read_in.wait(), "read of page {page_id} failed");

        frame.set_page_id(page_id);
        frame.set_dirty(false);
        frame.pin();

        core.page_table.insert(page_id, frame_id);
        core.replacer.record_access(frame_id);
        core.replacer.set_evictable(frame_id, false);

        Some(Arc::clone(frame))
    }

    /// Releases one pin on a page, merging in the caller's dirty bit.
    ///
    /// Returns `false` if the page is not resident or was not pinned. When
    /// the last pin is released the frame becomes evictable.
    pub fn unpin_page(&self, page_id: PageId, is_dirty: bool) -> bool {
        let mut core = self.core.lock();
        let Some(&frame_id) = core.page_table.get(&page_id) else {
            return false;
        };
        let frame = &self.frames[frame_id.index()];
        if frame.pin_count() == 0 {
            return false;
        }

        // Once dirty, a page stays dirty until written back.
        if is_dirty {
            frame.set_dirty(true);
        }
        if frame.unpin() == 0 {
            core.replacer.set_evictable(frame_id, true);
        }
        true
    }

    /// Writes a page's current contents to the device, unconditionally.
    ///
    /// Returns `false` if the id is invalid or the page is not resident.
    pub fn flush_page(&self, page_id: PageId) -> bool {
        let core = self.core.lock();
        if !page_id.is_valid() {
            return false;
        }
        let Some(&frame_id) = core.page_table.get(&page_id) else {
            return false;
        };
        let frame = &self.frames[frame_id.index()];

        let done = self.schedule_io(DiskOp::Write, page_id, frame.buffer());
        assert!(done.wait(), "flush of page {page_id} failed");
        frame.set_dirty(false);
        self.flush_count.fetch_add(1, Ordering::Relaxed);
        true
    }

    /// Flushes every resident page. Traversal order is unspecified.
    pub fn flush_all_pages(&self) {
        let core = self.core.lock();
        tracing::debug!(resident = core.page_table.len(), "flushing all pages");

        let pending: Vec<(PageId, IoFuture)> = core
            .page_table
            .iter()
            .map(|(&page_id, &frame_id)| {
                let frame = &self.frames[frame_id.index()];
                (page_id, self.schedule_io(DiskOp::Write, page_id, frame.buffer()))
            })
            .collect();

        for (page_id, done) in pending {
            assert!(done.wait(), "flush of page {page_id} failed");
            let frame_id = core.page_table[&page_id];
            self.frames[frame_id.index()].set_dirty(false);
            self.flush_count.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Drops a page from the pool, reclaiming its frame onto the free list.
    ///
    /// An absent page is a success (`true`); a pinned page cannot be deleted
    /// (`false`, no state change). A dirty page is written back first.
    pub fn delete_page(&self, page_id: PageId) -> bool {
        let mut core = self.core.lock();
        let Some(&frame_id) = core.page_table.get(&page_id) else {
            return true;
        };
        let frame = &self.frames[frame_id.index()];
        if frame.pin_count() > 0 {
            return false;
        }

        if frame.is_dirty() {
            let done = self.schedule_io(DiskOp::Write, page_id, frame.buffer());
            assert!(done.wait(), "write-back of deleted page {page_id} failed");
            frame.set_dirty(false);
            self.flush_count.fetch_add(1, Ordering::Relaxed);
        }

        core.page_table.remove(&page_id);
        core.replacer.remove(frame_id);
        core.free_list.push_back(frame_id);
        frame.reset();
        Self::deallocate_locked(&mut core, page_id);
        true
    }

    /// Mints a fresh page id from the monotonic counter.
    pub fn allocate_page(&self) -> PageId {
        let mut core = self.core.lock();
        Self::allocate_locked(&mut core)
    }

    /// Returns the number of frames in the pool.
    pub fn size(&self) -> usize {
        self.pool_size
    }

    /// Returns the page size in bytes.
    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Returns true if the page is resident.
    pub fn contains(&self, page_id: PageId) -> bool {
        self.core.lock().page_table.contains_key(&page_id)
    }

    /// Number of frames the replacer currently considers evictable.
    pub fn evictable_count(&self) -> usize {
        self.core.lock().replacer.size()
    }

    /// Returns a snapshot of pool statistics.
    pub fn stats(&self) -> BufferPoolStats {
        let mut pinned = 0;
        let mut dirty = 0;
        for frame in &self.frames {
            if frame.is_pinned() {
                pinned += 1;
            }
            if frame.is_dirty() {
                dirty += 1;
            }
        }

        BufferPoolStats {
            fetches: self.fetch_count.load(Ordering::Relaxed),
            hits: self.hit_count.load(Ordering::Relaxed),
            misses: self.miss_count.load(Ordering::Relaxed),
            evictions: self.eviction_count.load(Ordering::Relaxed),
            flushes: self.flush_count.load(Ordering::Relaxed),
            pinned_frames: pinned,
            dirty_frames: dirty,
        }
    }

    // -------------------------------------------------------------------------
    // Guard constructors
    // -------------------------------------------------------------------------

    /// Allocates a fresh page behind an unpin-on-drop guard.
    pub fn new_page_guarded(self: &Arc<Self>) -> Option<PageGuard> {
        let (page_id, frame) = self.new_page()?;
        Some(PageGuard::new(Arc::clone(self), frame, page_id))
    }

    /// Fetches a page behind an unpin-on-drop guard.
    pub fn fetch_page_guarded(self: &Arc<Self>, page_id: PageId) -> Option<PageGuard> {
        let frame = self.fetch_page(page_id)?;
        Some(PageGuard::new(Arc::clone(self), frame, page_id))
    }

    /// Fetches a page for shared, read-only payload access.
    pub fn fetch_page_read(self: &Arc<Self>, page_id: PageId) -> Option<PageReadGuard> {
        let frame = self.fetch_page(page_id)?;
        Some(PageReadGuard::new(Arc::clone(self), frame, page_id))
    }

    /// Fetches a page for exclusive, mutable payload access.
    pub fn fetch_page_write(self: &Arc<Self>, page_id: PageId) -> Option<PageWriteGuard> {
        let frame = self.fetch_page(page_id)?;
        Some(PageWriteGuard::new(Arc::clone(self), frame, page_id))
    }

    // -------------------------------------------------------------------------
    // Private helpers
    // -------------------------------------------------------------------------

    /// Picks a frame to hold a page: the free list first, else an eviction
    /// victim. `None` means the pool is saturated.
    fn acquire_frame(core: &mut PoolCore) -> Option<FrameId> {
        if let Some(frame_id) = core.free_list.pop_front() {
            return Some(frame_id);
        }
        core.replacer.evict()
    }

    /// Starts retiring whatever page the frame currently holds: drops its
    /// page-table entry and, if dirty, enqueues a write-back whose future is
    /// returned for the caller to await after any further scheduling.
    fn begin_retire(&self, core: &mut PoolCore, frame: &BufferFrame) -> Option<IoFuture> {
        let old = frame.page_id();
        if !old.is_valid() {
            return None;
        }
        assert_eq!(
            frame.pin_count(),
            0,
            "evicting pinned page {old} from frame {:?}",
            frame.frame_id()
        );
        self.eviction_count.fetch_add(1, Ordering::Relaxed);
        core.page_table.remove(&old);

        if !frame.is_dirty() {
            return None;
        }
        tracing::debug!(page_id = %old, frame = frame.frame_id().index(), "writing back dirty victim");
        let done = self.schedule_io(DiskOp::Write, old, frame.buffer());
        frame.set_dirty(false);
        self.flush_count.fetch_add(1, Ordering::Relaxed);
        Some(done)
    }

    fn schedule_io(&self, op: DiskOp, page_id: PageId, buf: PageBuffer) -> IoFuture {
        let (done, future) = DiskScheduler::create_promise();
        self.scheduler.schedule(DiskRequest {
            op,
            page_id,
            buf,
            done,
        });
        future
    }

    fn allocate_locked(core: &mut PoolCore) -> PageId {
        let id = PageId::new(core.next_page_id);
        core.next_page_id += 1;
        id
    }

    /// Releases a page id back to the allocator. Recycling ids would need a
    /// persistent free-page structure; the monotonic counter never reuses
    /// them, so this is a stub.
    fn deallocate_locked(_core: &mut PoolCore, _page_id: PageId) {}
}

impl std::fmt::Debug for BufferPoolManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BufferPoolManager")
            .field("pool_size", &self.pool_size)
            .field("page_size", &self.page_size)
            .field("resident", &self.core.lock().page_table.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::disk::MemoryDevice;

    const PAGE: usize = 512;

    fn pool(frames: usize) -> (Arc<BufferPoolManager>, Arc<MemoryDevice>) {
        let device = Arc::new(MemoryDevice::new(PAGE));
        let config = BufferPoolConfig::new(frames).with_page_size(PAGE);
        let pool = BufferPoolManager::new(config, Arc::clone(&device) as _).unwrap();
        (Arc::new(pool), device)
    }

    #[test]
    fn test_new_page_ids_are_sequential() {
        let (pool, _device) = pool(4);
        for expected in 0..4u64 {
            let (page_id, frame) = pool.new_page().unwrap();
            assert_eq!(page_id, PageId::new(expected));
            assert_eq!(frame.pin_count(), 1);
            assert!(!frame.is_dirty());
        }
    }

    #[test]
    fn test_page_size_mismatch_rejected() {
        let device = Arc::new(MemoryDevice::new(PAGE));
        let config = BufferPoolConfig::new(4).with_page_size(PAGE * 2);
        assert!(matches!(
            BufferPoolManager::new(config, device as _),
            Err(BufferError::PageSizeMismatch { .. })
        ));
    }

    #[test]
    fn test_invalid_config_rejected() {
        let device = Arc::new(MemoryDevice::new(PAGE));
        let config = BufferPoolConfig::new(0).with_page_size(PAGE);
        assert!(matches!(
            BufferPoolManager::new(config, device as _),
            Err(BufferError::Config { .. })
        ));
    }

    #[test]
    fn test_unpin_contract() {
        let (pool, _device) = pool(2);
        let (page_id, _frame) = pool.new_page().unwrap();

        assert!(pool.unpin_page(page_id, false));
        // Second unpin of an already-unpinned page fails.
        assert!(!pool.unpin_page(page_id, false));
        // Unpin of a page that was never fetched fails.
        assert!(!pool.unpin_page(PageId::new(999), false));
    }

    #[test]
    fn test_dirty_bit_merges_across_unpins() {
        let (pool, device) = pool(2);
        let (page_id, frame) = pool.new_page().unwrap();
        frame.data_mut()[0] = 0xAB;

        // Pin twice, unpin dirty then clean: the dirty bit must survive.
        assert!(pool.fetch_page(page_id).is_some());
        assert!(pool.unpin_page(page_id, true));
        assert!(pool.unpin_page(page_id, false));
        assert!(frame.is_dirty());

        // Eviction must now write the page back.
        device.clear_ops();
        let _ = pool.new_page().unwrap();
        let _ = pool.new_page().unwrap();
        assert!(device
            .ops()
            .contains(&crate::disk::DeviceOp::Write(page_id)));
    }

    #[test]
    fn test_flush_clears_dirty_and_writes_unconditionally() {
        let (pool, device) = pool(2);
        let (page_id, frame) = pool.new_page().unwrap();

        // Flushing a clean page is still an observable device write.
        device.clear_ops();
        assert!(pool.flush_page(page_id));
        assert_eq!(device.ops(), vec![crate::disk::DeviceOp::Write(page_id)]);

        frame.data_mut()[0] = 1;
        pool.unpin_page(page_id, true);
        assert!(frame.is_dirty());
        assert!(pool.flush_page(page_id));
        assert!(!frame.is_dirty());

        // Absent or invalid pages flush to false.
        assert!(!pool.flush_page(PageId::new(7)));
        assert!(!pool.flush_page(PageId::INVALID));
    }

    #[test]
    fn test_evictable_count_tracks_pins() {
        let (pool, _device) = pool(3);
        let (p0, _) = pool.new_page().unwrap();
        let (p1, _) = pool.new_page().unwrap();
        assert_eq!(pool.evictable_count(), 0);

        pool.unpin_page(p0, false);
        assert_eq!(pool.evictable_count(), 1);
        pool.unpin_page(p1, false);
        assert_eq!(pool.evictable_count(), 2);

        // Re-pinning removes the frame from the candidate set.
        pool.fetch_page(p0).unwrap();
        assert_eq!(pool.evictable_count(), 1);
    }

    #[test]
    fn test_guard_constructors_unpin_on_drop() {
        let (pool, _device) = pool(2);

        let page_id = {
            let guard = pool.new_page_guarded().unwrap();
            assert_eq!(pool.stats().pinned_frames, 1);
            guard.page_id()
        };
        assert_eq!(pool.stats().pinned_frames, 0);

        {
            let _read = pool.fetch_page_read(page_id).unwrap();
            let _basic = pool.fetch_page_guarded(page_id).unwrap();
            assert_eq!(pool.stats().pinned_frames, 1);
        }
        assert_eq!(pool.stats().pinned_frames, 0);
    }
}
