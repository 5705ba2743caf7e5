//! Buffer pool for SiltDB.
//!
//! The buffer pool manages a fixed-size pool of in-memory page frames,
//! providing efficient caching of disk pages:
//!
//! - **Page Caching**: keep frequently accessed pages in memory
//! - **Pin/Unpin**: reference counting for safe concurrent access
//! - **Dirty Tracking**: modified pages are written back before reuse
//! - **Eviction Policy**: LRU-K replacement by backward K-distance
//! - **Scheduled I/O**: all device traffic flows through the disk scheduler
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                     BufferPoolManager                        │
//! │  ┌────────────────────────┐  ┌────────────────────────────┐  │
//! │  │       Page Table       │  │         Free List          │  │
//! │  │ HashMap<PageId,FrameId>│  │     VecDeque<FrameId>      │  │
//! │  └────────────────────────┘  └────────────────────────────┘  │
//! │               │                                              │
//! │               ▼                                              │
//! │  ┌────────────────────────────────────────────────────────┐  │
//! │  │                     Frame Array                        │  │
//! │  │  ┌─────────┐ ┌─────────┐ ┌─────────┐    ┌─────────┐    │  │
//! │  │  │ Frame 0 │ │ Frame 1 │ │ Frame 2 │ .. │ Frame N │    │  │
//! │  │  │ page_id │ │ page_id │ │ page_id │    │ page_id │    │  │
//! │  │  │ data[]  │ │ data[]  │ │ data[]  │    │ data[]  │    │  │
//! │  │  │ dirty   │ │ dirty   │ │ dirty   │    │ dirty   │    │  │
//! │  │  │ pin_cnt │ │ pin_cnt │ │ pin_cnt │    │ pin_cnt │    │  │
//! │  │  └─────────┘ └─────────┘ └─────────┘    └─────────┘    │  │
//! │  └────────────────────────────────────────────────────────┘  │
//! │        │                                      │              │
//! │        ▼                                      ▼              │
//! │  ┌──────────────────┐              ┌────────────────────┐    │
//! │  │   LruKReplacer   │              │   DiskScheduler    │    │
//! │  │ (victim choice)  │              │ (FIFO I/O worker)  │    │
//! │  └──────────────────┘              └────────────────────┘    │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use silt_storage::buffer::{BufferPoolConfig, BufferPoolManager};
//! use silt_storage::disk::FileDevice;
//!
//! fn example() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = BufferPoolConfig::new(1024).with_page_size(4096);
//!     let device = Arc::new(FileDevice::open("data.db", 4096)?);
//!     let pool = Arc::new(BufferPoolManager::new(config, device)?);
//!
//!     // Allocate a page and write into it; the guard unpins on drop.
//!     let mut guard = pool.new_page_guarded().expect("pool saturated");
//!     guard.data_mut()[0] = 42;
//!     let page_id = guard.page_id();
//!     drop(guard);
//!
//!     // Fetch it back.
//!     let guard = pool.fetch_page_read(page_id).expect("pool saturated");
//!     assert_eq!(guard.data()[0], 42);
//!     Ok(())
//! }
//! ```

mod config;
mod error;
mod eviction;
mod frame;
mod latch;
mod pool;

pub use config::BufferPoolConfig;
pub use error::{BufferError, BufferResult};
pub use eviction::LruKReplacer;
pub use frame::{BufferFrame, FrameId};
pub use latch::{PageGuard, PageReadGuard, PageWriteGuard};
pub use pool::BufferPoolManager;

/// Statistics for buffer pool monitoring.
#[derive(Debug, Clone, Default)]
pub struct BufferPoolStats {
    /// Total number of page fetches.
    pub fetches: u64,
    /// Number of cache hits.
    pub hits: u64,
    /// Number of cache misses (required a disk read).
    pub misses: u64,
    /// Number of pages evicted.
    pub evictions: u64,
    /// Number of page write-backs.
    pub flushes: u64,
    /// Current number of pinned frames.
    pub pinned_frames: usize,
    /// Current number of dirty frames.
    pub dirty_frames: usize,
}

impl BufferPoolStats {
    /// Returns the cache hit ratio (0.0 to 1.0).
    pub fn hit_ratio(&self) -> f64 {
        if self.fetches == 0 {
            0.0
        } else {
            self.hits as f64 / self.fetches as f64
        }
    }
}
