//! Type definitions for SiltDB.

mod ids;

pub use ids::PageId;
