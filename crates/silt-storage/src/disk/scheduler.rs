//! The disk scheduler: one background worker, strict FIFO execution.
//!
//! Callers build a [`DiskRequest`] around a shared page buffer and a
//! completion promise, then hand it to [`DiskScheduler::schedule`]. The
//! worker pops requests in the order they were enqueued, performs the device
//! call, and resolves the request's one-shot with the outcome. Enqueue order
//! is execution order; the buffer pool leans on this to get write-before-read
//! when recycling a dirty frame.

use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam_channel::{bounded, unbounded, Receiver, Sender};
use parking_lot::RwLock;
use silt_common::types::PageId;

use super::device::DiskDevice;

/// Shared page payload. The scheduler locks it only for the duration of the
/// device call: shared for writes out, exclusive for reads in.
pub type PageBuffer = Arc<RwLock<Vec<u8>>>;

/// Direction of a disk request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiskOp {
    /// Fill the buffer from the device.
    Read,
    /// Persist the buffer to the device.
    Write,
}

/// A single page-I/O request.
pub struct DiskRequest {
    /// Direction of the transfer.
    pub op: DiskOp,
    /// The page on the device.
    pub page_id: PageId,
    /// The in-memory payload, page-sized.
    pub buf: PageBuffer,
    /// Resolved with `true` on success, `false` on device error.
    pub done: IoPromise,
}

/// Completion side of a one-shot I/O pair.
pub struct IoPromise {
    tx: Sender<bool>,
}

impl IoPromise {
    /// Resolves the promise. The paired [`IoFuture`] unblocks.
    pub fn complete(self, ok: bool) {
        // The receiver may already be gone; nothing to do then.
        let _ = self.tx.send(ok);
    }
}

/// Waiting side of a one-shot I/O pair.
#[must_use = "an unawaited I/O completion hides device failures"]
pub struct IoFuture {
    rx: Receiver<bool>,
}

impl IoFuture {
    /// Blocks until the paired promise resolves.
    ///
    /// A promise dropped without resolution (worker teardown) reads as
    /// failure.
    pub fn wait(self) -> bool {
        self.rx.recv().unwrap_or(false)
    }
}

/// Serialises page I/O onto a single background worker.
///
/// Dropping the scheduler submits a shutdown sentinel behind any queued
/// requests and joins the worker, so every request scheduled before the drop
/// still executes.
pub struct DiskScheduler {
    queue: Sender<Option<DiskRequest>>,
    worker: Option<JoinHandle<()>>,
}

impl DiskScheduler {
    /// Spawns the worker thread for the given device.
    pub fn new(device: Arc<dyn DiskDevice>) -> Self {
        let (queue, requests) = unbounded();
        let worker = thread::Builder::new()
            .name("silt-disk-io".to_owned())
            .spawn(move || Self::worker_loop(&*device, &requests))
            .expect("failed to spawn disk worker");

        Self {
            queue,
            worker: Some(worker),
        }
    }

    /// Mints a one-shot completion pair for a request.
    pub fn create_promise() -> (IoPromise, IoFuture) {
        let (tx, rx) = bounded(1);
        (IoPromise { tx }, IoFuture { rx })
    }

    /// Enqueues a request. Returns immediately; completion is reported
    /// through the request's promise.
    pub fn schedule(&self, request: DiskRequest) {
        self.queue
            .send(Some(request))
            .expect("disk worker exited before shutdown");
    }

    fn worker_loop(device: &dyn DiskDevice, requests: &Receiver<Option<DiskRequest>>) {
        // Drain until the shutdown sentinel. A closed channel without a
        // sentinel means the scheduler was leaked; exit quietly either way.
        while let Ok(Some(request)) = requests.recv() {
            let outcome = match request.op {
                DiskOp::Read => {
                    let mut buf = request.buf.write();
                    device.read_page(request.page_id, &mut buf)
                }
                DiskOp::Write => {
                    let buf = request.buf.read();
                    device.write_page(request.page_id, &buf)
                }
            };

            if let Err(e) = &outcome {
                tracing::error!(page_id = %request.page_id, error = %e, "disk request failed");
            }
            request.done.complete(outcome.is_ok());
        }
    }
}

impl Drop for DiskScheduler {
    fn drop(&mut self) {
        let _ = self.queue.send(None);
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

impl std::fmt::Debug for DiskScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiskScheduler")
            .field("queued", &self.queue.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::disk::memory::{DeviceOp, MemoryDevice};

    const PAGE: usize = 64;

    fn buffer(fill: u8) -> PageBuffer {
        Arc::new(RwLock::new(vec![fill; PAGE]))
    }

    fn request(op: DiskOp, page_id: u64, buf: &PageBuffer) -> (DiskRequest, IoFuture) {
        let (done, fut) = DiskScheduler::create_promise();
        (
            DiskRequest {
                op,
                page_id: PageId::new(page_id),
                buf: Arc::clone(buf),
                done,
            },
            fut,
        )
    }

    #[test]
    fn test_write_then_read_roundtrip() {
        let device = Arc::new(MemoryDevice::new(PAGE));
        let scheduler = DiskScheduler::new(Arc::clone(&device) as _);

        let out = buffer(42);
        let (req, fut) = request(DiskOp::Write, 0, &out);
        scheduler.schedule(req);
        assert!(fut.wait());

        let into = buffer(0);
        let (req, fut) = request(DiskOp::Read, 0, &into);
        scheduler.schedule(req);
        assert!(fut.wait());

        assert!(into.read().iter().all(|&b| b == 42));
    }

    #[test]
    fn test_fifo_execution_order() {
        let device = Arc::new(MemoryDevice::new(PAGE));
        let scheduler = DiskScheduler::new(Arc::clone(&device) as _);

        // Enqueue a burst without waiting, then await only the last one.
        let bufs: Vec<_> = (0..8u64).map(|i| buffer(i as u8)).collect();
        let mut last = None;
        for (i, buf) in bufs.iter().enumerate() {
            let (req, fut) = request(DiskOp::Write, i as u64, buf);
            scheduler.schedule(req);
            last = Some(fut);
        }
        assert!(last.unwrap().wait());

        let expected: Vec<_> = (0..8u64).map(|i| DeviceOp::Write(PageId::new(i))).collect();
        assert_eq!(device.ops(), expected);
    }

    #[test]
    fn test_device_error_completes_false() {
        let device = Arc::new(MemoryDevice::new(PAGE));
        device.fail_next();
        let scheduler = DiskScheduler::new(Arc::clone(&device) as _);

        let buf = buffer(0);
        let (req, fut) = request(DiskOp::Write, 0, &buf);
        scheduler.schedule(req);
        assert!(!fut.wait());
    }

    #[test]
    fn test_drop_drains_pending_requests() {
        let device = Arc::new(MemoryDevice::new(PAGE));
        let futures: Vec<_> = {
            let scheduler = DiskScheduler::new(Arc::clone(&device) as _);
            (0..4u64)
                .map(|i| {
                    let (req, fut) = request(DiskOp::Write, i, &buffer(1));
                    scheduler.schedule(req);
                    fut
                })
                .collect()
            // Scheduler dropped here with requests possibly still queued.
        };

        for fut in futures {
            assert!(fut.wait());
        }
        assert_eq!(device.ops().len(), 4);
    }
}
