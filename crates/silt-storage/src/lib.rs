//! # silt-storage
//!
//! The buffer pool core of SiltDB's storage engine.
//!
//! This crate implements the in-memory page cache that mediates between
//! persistent pages on secondary storage and the clients that read or
//! mutate them:
//!
//! - A buffer pool manager owning a fixed array of page frames
//! - An LRU-K replacer choosing eviction victims by backward K-distance
//! - A disk scheduler serialising device I/O onto one background worker

#![warn(missing_docs)]
#![warn(clippy::all)]

/// Page caching, pinning, and eviction
pub mod buffer;

/// Storage devices and the I/O scheduler
pub mod disk;
