//! File-backed storage device.
//!
//! Pages live at offset `page_id * page_size` in a single database file.
//! Positioned I/O (`read_at`/`write_all_at`) allows concurrent calls without
//! a lock on the file handle.

use std::fs::{File, OpenOptions};
use std::io;
use std::os::unix::fs::FileExt;
use std::path::{Path, PathBuf};

use silt_common::types::PageId;

use super::device::DiskDevice;
use super::error::{IoError, IoResult};

/// A [`DiskDevice`] over a single database file.
pub struct FileDevice {
    file: File,
    path: PathBuf,
    page_size: usize,
}

impl FileDevice {
    /// Opens (creating if necessary) the database file at `path`.
    pub fn open(path: impl AsRef<Path>, page_size: usize) -> IoResult<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .open(&path)
            .map_err(|e| IoError::open(&path, e))?;

        Ok(Self {
            file,
            path,
            page_size,
        })
    }

    /// Returns the path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Flushes file contents and metadata to the physical device.
    pub fn sync(&self) -> IoResult<()> {
        self.file.sync_all().map_err(IoError::from)
    }

    fn check_buf(&self, len: usize) -> IoResult<()> {
        if len != self.page_size {
            return Err(IoError::BufferSize {
                page_size: self.page_size,
                buffer_len: len,
            });
        }
        Ok(())
    }

    fn offset(&self, page_id: PageId) -> u64 {
        page_id.as_u64() * self.page_size as u64
    }
}

impl DiskDevice for FileDevice {
    fn page_size(&self) -> usize {
        self.page_size
    }

    fn read_page(&self, page_id: PageId, buf: &mut [u8]) -> IoResult<()> {
        self.check_buf(buf.len())?;
        let offset = self.offset(page_id);

        // The file grows lazily; a read past EOF is a page that has never
        // been written and must come back zeroed.
        let mut filled = 0;
        while filled < buf.len() {
            match self.file.read_at(&mut buf[filled..], offset + filled as u64) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(IoError::from(e)),
            }
        }
        buf[filled..].fill(0);
        Ok(())
    }

    fn write_page(&self, page_id: PageId, buf: &[u8]) -> IoResult<()> {
        self.check_buf(buf.len())?;
        self.file
            .write_all_at(buf, self.offset(page_id))
            .map_err(IoError::from)
    }
}

impl std::fmt::Debug for FileDevice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileDevice")
            .field("path", &self.path)
            .field("page_size", &self.page_size)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    const PAGE: usize = 512;

    #[test]
    fn test_write_and_read_back() {
        let dir = tempdir().unwrap();
        let device = FileDevice::open(dir.path().join("test.db"), PAGE).unwrap();

        let mut page = vec![0u8; PAGE];
        page[0..4].copy_from_slice(&[1, 2, 3, 4]);
        device.write_page(PageId::new(3), &page).unwrap();

        let mut out = vec![0u8; PAGE];
        device.read_page(PageId::new(3), &mut out).unwrap();
        assert_eq!(out, page);
    }

    #[test]
    fn test_unwritten_page_reads_zeroed() {
        let dir = tempdir().unwrap();
        let device = FileDevice::open(dir.path().join("zero.db"), PAGE).unwrap();

        let mut out = vec![0xFFu8; PAGE];
        device.read_page(PageId::new(10), &mut out).unwrap();
        assert!(out.iter().all(|&b| b == 0));
    }

    #[test]
    fn test_pages_do_not_overlap() {
        let dir = tempdir().unwrap();
        let device = FileDevice::open(dir.path().join("multi.db"), PAGE).unwrap();

        for i in 0..4u8 {
            device
                .write_page(PageId::new(i as u64), &vec![i; PAGE])
                .unwrap();
        }
        for i in 0..4u8 {
            let mut out = vec![0u8; PAGE];
            device.read_page(PageId::new(i as u64), &mut out).unwrap();
            assert!(out.iter().all(|&b| b == i));
        }
    }

    #[test]
    fn test_buffer_size_mismatch() {
        let dir = tempdir().unwrap();
        let device = FileDevice::open(dir.path().join("mismatch.db"), PAGE).unwrap();

        let mut short = vec![0u8; PAGE / 2];
        assert!(device.read_page(PageId::new(0), &mut short).is_err());
        assert!(device.write_page(PageId::new(0), &short).is_err());
    }
}
