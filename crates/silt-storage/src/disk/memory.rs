//! In-memory storage device for tests.
//!
//! Stores pages in a hash map and journals every operation so tests can
//! assert device-level ordering (for example, that a dirty victim's
//! write-back reached the device before the replacement page's read-in).

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;
use silt_common::types::PageId;

use super::device::DiskDevice;
use super::error::{IoError, IoResult};

/// One journaled device operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceOp {
    /// A page was read.
    Read(PageId),
    /// A page was written.
    Write(PageId),
}

/// A [`DiskDevice`] backed by a hash map, with an operation journal.
pub struct MemoryDevice {
    page_size: usize,
    pages: Mutex<HashMap<PageId, Vec<u8>>>,
    journal: Mutex<Vec<DeviceOp>>,
    fail_next: AtomicBool,
}

impl MemoryDevice {
    /// Creates an empty device with the given page size.
    pub fn new(page_size: usize) -> Self {
        Self {
            page_size,
            pages: Mutex::new(HashMap::new()),
            journal: Mutex::new(Vec::new()),
            fail_next: AtomicBool::new(false),
        }
    }

    /// Returns a snapshot of every operation the device has executed.
    pub fn ops(&self) -> Vec<DeviceOp> {
        self.journal.lock().clone()
    }

    /// Clears the operation journal.
    pub fn clear_ops(&self) {
        self.journal.lock().clear();
    }

    /// Makes the next operation fail with an injected fault.
    pub fn fail_next(&self) {
        self.fail_next.store(true, Ordering::Release);
    }

    /// Returns the number of pages the device currently stores.
    pub fn page_count(&self) -> usize {
        self.pages.lock().len()
    }

    fn check(&self, len: usize) -> IoResult<()> {
        if self.fail_next.swap(false, Ordering::AcqRel) {
            return Err(IoError::fault("injected"));
        }
        if len != self.page_size {
            return Err(IoError::BufferSize {
                page_size: self.page_size,
                buffer_len: len,
            });
        }
        Ok(())
    }
}

impl DiskDevice for MemoryDevice {
    fn page_size(&self) -> usize {
        self.page_size
    }

    fn read_page(&self, page_id: PageId, buf: &mut [u8]) -> IoResult<()> {
        self.check(buf.len())?;
        match self.pages.lock().get(&page_id) {
            Some(data) => buf.copy_from_slice(data),
            None => buf.fill(0),
        }
        self.journal.lock().push(DeviceOp::Read(page_id));
        Ok(())
    }

    fn write_page(&self, page_id: PageId, buf: &[u8]) -> IoResult<()> {
        self.check(buf.len())?;
        self.pages.lock().insert(page_id, buf.to_vec());
        self.journal.lock().push(DeviceOp::Write(page_id));
        Ok(())
    }
}

impl std::fmt::Debug for MemoryDevice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryDevice")
            .field("page_size", &self.page_size)
            .field("pages", &self.pages.lock().len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roundtrip_and_journal() {
        let device = MemoryDevice::new(64);

        let page = vec![7u8; 64];
        device.write_page(PageId::new(1), &page).unwrap();

        let mut out = vec![0u8; 64];
        device.read_page(PageId::new(1), &mut out).unwrap();
        assert_eq!(out, page);

        assert_eq!(
            device.ops(),
            vec![DeviceOp::Write(PageId::new(1)), DeviceOp::Read(PageId::new(1))]
        );
    }

    #[test]
    fn test_unknown_page_reads_zeroed() {
        let device = MemoryDevice::new(64);
        let mut out = vec![0xAAu8; 64];
        device.read_page(PageId::new(9), &mut out).unwrap();
        assert!(out.iter().all(|&b| b == 0));
    }

    #[test]
    fn test_injected_fault_fires_once() {
        let device = MemoryDevice::new(64);
        device.fail_next();

        let mut out = vec![0u8; 64];
        assert!(device.read_page(PageId::new(0), &mut out).is_err());
        assert!(device.read_page(PageId::new(0), &mut out).is_ok());
    }
}
