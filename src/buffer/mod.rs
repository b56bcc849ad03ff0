//! The page store: the pin/unpin caching layer between the index
//! engine and disk.
//!
//! # Components
//! - [`PageStore`] - The page cache with capacity growth and flushing
//! - [`Frame`] - A slot in the pool holding a page + metadata
//! - [`PageReadGuard`] / [`PageWriteGuard`] - RAII pin/unpin guards
//! - [`PageStoreStats`] - Performance statistics
//! - [`replacer`] - FIFO eviction policy

mod frame;
mod page_guard;
mod page_store;
pub mod replacer;
mod stats;

pub use frame::Frame;
pub use page_guard::{PageReadGuard, PageWriteGuard};
pub use page_store::PageStore;
pub use stats::{PageStoreStats, StatsSnapshot};
