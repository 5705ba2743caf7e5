//! # silt-common
//!
//! Common types and constants for SiltDB.
//!
//! This crate provides the foundational pieces shared by every SiltDB
//! component:
//!
//! - **Types**: core identifiers (`PageId`)
//! - **Constants**: page-size and buffer-pool defaults
//!
//! ## Example
//!
//! ```rust
//! use silt_common::types::PageId;
//!
//! let page = PageId::new(42);
//! assert!(page.is_valid());
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod constants;
pub mod types;

// Re-export commonly used items at the crate root
pub use constants::*;
pub use types::PageId;
