//! treedex - a disk-backed B+ tree index over a pin/unpin page store.
//!
//! Maps unique integer keys to record locations (heap page + slot) so a
//! record manager can find a tuple without scanning its heap file.
//!
//! # Architecture
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                          treedex                             │
//! ├──────────────────────────────────────────────────────────────┤
//! │  ┌──────────────────────────────────────────────────────┐   │
//! │  │              Index Layer (index/btree/)               │   │
//! │  │   BTreeIndex: navigate → insert/split → delete        │   │
//! │  │   TreeScan: leaf-chain snapshot iteration             │   │
//! │  │   codec: node/metadata page serialization             │   │
//! │  └──────────────────────────────────────────────────────┘   │
//! │                              ↓                               │
//! │  ┌──────────────────────────────────────────────────────┐   │
//! │  │              Page Store (buffer/)                     │   │
//! │  │   PageStore + Frame + RAII pin guards                 │   │
//! │  │   FIFO eviction, dirty write-back, capacity growth    │   │
//! │  └──────────────────────────────────────────────────────┘   │
//! │                              ↓                               │
//! │  ┌──────────────────────────────────────────────────────┐   │
//! │  │              Storage Layer (storage/)                 │   │
//! │  │   DiskManager + Page + PageHeader (CRC32)             │   │
//! │  └──────────────────────────────────────────────────────┘   │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//! - [`common`] - Shared primitives (PageId, Rid, Error, config)
//! - [`storage`] - Disk I/O and page formats
//! - [`buffer`] - The pin/unpin page store
//! - [`index`] - The B+ tree index engine
//!
//! # Quick Start
//! ```no_run
//! use treedex::{BTreeIndex, KeyType, PageId, Rid};
//!
//! // Create an index, then open a handle to it
//! BTreeIndex::create("orders.idx", KeyType::Int, 64).unwrap();
//! let mut index = BTreeIndex::open("orders.idx").unwrap();
//!
//! // Map key 42 to the record at heap page 7, slot 3
//! index.insert(42, Rid::new(PageId::new(7), 3)).unwrap();
//! assert_eq!(index.find(42).unwrap(), Rid::new(PageId::new(7), 3));
//!
//! // Walk every entry in ascending key order
//! let mut scan = index.open_scan().unwrap();
//! while let Some(rid) = scan.next_entry().unwrap() {
//!     println!("{rid}");
//! }
//! scan.close();
//!
//! index.close().unwrap();
//! ```

pub mod buffer;
pub mod common;
pub mod index;
pub mod storage;

// Re-export commonly used items at crate root for convenience
pub use common::config::PAGE_SIZE;
pub use common::{Error, FrameId, PageId, Result, Rid};

pub use buffer::{Frame, PageReadGuard, PageStore, PageStoreStats, PageWriteGuard, StatsSnapshot};
pub use index::{BTreeIndex, KeyType, TreeScan};
pub use storage::page::{Page, PageHeader, PageType};
pub use storage::DiskManager;
