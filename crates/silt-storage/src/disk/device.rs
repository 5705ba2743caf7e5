//! The storage device capability consumed by the disk scheduler.

use silt_common::types::PageId;

use super::error::IoResult;

/// Synchronous fixed-size page I/O.
///
/// A `DiskDevice` is the only thing in the system that touches persistent
/// storage. The page size is fixed at construction; every buffer handed to
/// [`read_page`](DiskDevice::read_page) or
/// [`write_page`](DiskDevice::write_page) must be exactly that size.
///
/// A single page operation is atomic from the caller's point of view:
/// `write_page` is durable on return, and partial I/O is surfaced as an
/// error, never as a short transfer.
pub trait DiskDevice: Send + Sync {
    /// Returns the fixed page size in bytes.
    fn page_size(&self) -> usize;

    /// Fills `buf` with the contents of the given page.
    ///
    /// A page that has never been written reads back as zeroes.
    fn read_page(&self, page_id: PageId, buf: &mut [u8]) -> IoResult<()>;

    /// Persists `buf` as the given page. Durable on return.
    fn write_page(&self, page_id: PageId, buf: &[u8]) -> IoResult<()>;
}
