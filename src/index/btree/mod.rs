//! B+ tree index engine.
//!
//! # Components
//! - [`BTreeIndex`] - Tree handle: lifecycle, find, insert, delete
//! - [`TreeScan`] - Ascending full-index scan cursor
//! - [`TreeMeta`] / [`KeyType`] - Tree-wide metadata
//!
//! Internally, `node` holds the decoded node representation and its
//! structural operations, and `codec` maps nodes and metadata onto
//! fixed-size pages.
//!
//! Nodes are identified by page number and live in the page store; the
//! engine decodes a node, mutates it in memory and encodes it back
//! under a write pin. Structural growth happens bottom-up: an
//! overflowing leaf splits, its separator climbs the parent chain, and
//! a root split adds a level.

mod codec;
mod meta;
mod node;
mod scan;
mod tree;

pub use meta::{KeyType, TreeMeta};
pub use scan::TreeScan;
pub use tree::BTreeIndex;
