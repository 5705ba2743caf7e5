//! Storage devices and the disk scheduler.
//!
//! The buffer pool never touches a device directly. Every read and write is
//! expressed as a [`DiskRequest`] and handed to the [`DiskScheduler`], which
//! executes requests in strict FIFO order on a single background worker and
//! reports completion through one-shot [`IoFuture`]s. The FIFO guarantee is
//! what makes dirty-victim eviction safe: the write-back of the old page is
//! enqueued before the read-in of the new one, so the device always sees them
//! in that order.
//!
//! Two [`DiskDevice`] implementations are provided: [`FileDevice`] for a real
//! database file and [`MemoryDevice`] as a test double that journals every
//! operation.

mod device;
mod error;
mod file;
mod memory;
mod scheduler;

pub use device::DiskDevice;
pub use error::{IoError, IoResult};
pub use file::FileDevice;
pub use memory::{DeviceOp, MemoryDevice};
pub use scheduler::{DiskOp, DiskRequest, DiskScheduler, IoFuture, IoPromise, PageBuffer};
