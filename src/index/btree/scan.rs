//! Full-index ascending scan over a leaf-chain snapshot.

use tracing::trace;

use crate::common::{PageId, Result, Rid};

use super::node::Node;
use super::tree::BTreeIndex;

/// Cursor over every entry of a tree in ascending key order.
///
/// Opening a scan walks the tree once, depth-first and left-to-right,
/// and records the leaf page numbers it meets. That snapshot is the
/// iteration order; the borrow on the handle keeps mutations out while
/// the cursor lives, so the snapshot cannot go stale.
///
/// Between [`next_entry`] calls no page is pinned; each call pins,
/// decodes and unpins at most one leaf.
///
/// [`next_entry`]: TreeScan::next_entry
pub struct TreeScan<'a> {
    index: &'a BTreeIndex,
    /// Leaf pages in traversal order, fixed at open time.
    leaves: Vec<PageId>,
    /// Next snapshot position to load.
    next_leaf: usize,
    /// Currently loaded leaf, if any.
    current: Option<Node>,
    /// Position inside the current leaf.
    pos: usize,
}

impl<'a> TreeScan<'a> {
    /// Snapshot the leaf chain of `index` and position the cursor
    /// before the first entry.
    pub(crate) fn open(index: &'a BTreeIndex) -> Result<Self> {
        let mut leaves = Vec::new();
        let mut stack = vec![index.root_page()];

        // Depth-first, children pushed right-to-left so leaves come out
        // in ascending key order.
        while let Some(page_id) = stack.pop() {
            let node = index.load_node(page_id)?;
            if node.is_leaf() {
                leaves.push(page_id);
            } else {
                stack.extend(node.children().iter().rev().copied());
            }
        }

        trace!(leaves = leaves.len(), "btree.scan_open");
        Ok(Self {
            index,
            leaves,
            next_leaf: 0,
            current: None,
            pos: 0,
        })
    }

    /// Return the next record reference, or `Ok(None)` once the
    /// snapshot is exhausted.
    pub fn next_entry(&mut self) -> Result<Option<Rid>> {
        loop {
            if let Some(node) = &self.current {
                if self.pos < node.entry_count() {
                    let rid = node.leaf_rid(self.pos);
                    self.pos += 1;
                    return Ok(Some(rid));
                }
            }

            if self.next_leaf >= self.leaves.len() {
                return Ok(None);
            }

            let page_id = self.leaves[self.next_leaf];
            self.next_leaf += 1;
            self.current = Some(self.index.load_node(page_id)?);
            self.pos = 0;
        }
    }

    /// Release the cursor. Dropping it has the same effect; no pins or
    /// other resources outlive the value.
    pub fn close(self) {}
}
