//! The B+ tree index handle: lifecycle, point lookup, insertion with
//! split propagation, and deletion.

use std::path::Path;

use tracing::{debug, trace};

use crate::buffer::PageStore;
use crate::common::config::{DEFAULT_POOL_SIZE, MAX_ORDER, MAX_TREE_DEPTH};
use crate::common::{Error, PageId, Result, Rid};
use crate::storage::DiskManager;

use super::codec;
use super::meta::{KeyType, TreeMeta, FIRST_ROOT_PAGE, META_PAGE_ID};
use super::node::Node;
use super::scan::TreeScan;

/// Handle to one open B+ tree index.
///
/// A handle owns its page store session and its cached [`TreeMeta`];
/// any number of handles to *different* trees can coexist. A single
/// handle is not meant for concurrent callers: mutations take
/// `&mut self` and must be serialized by the caller.
///
/// Every mutating call persists the metadata page and flushes dirty
/// pages before returning, so dropping a handle without [`close`] loses
/// nothing that a completed call produced.
///
/// [`close`]: BTreeIndex::close
///
/// # Example
/// ```no_run
/// use treedex::{BTreeIndex, KeyType, PageId, Rid};
///
/// BTreeIndex::create("orders.idx", KeyType::Int, 64).unwrap();
/// let mut index = BTreeIndex::open("orders.idx").unwrap();
///
/// index.insert(42, Rid::new(PageId::new(7), 3)).unwrap();
/// assert_eq!(index.find(42).unwrap(), Rid::new(PageId::new(7), 3));
///
/// index.close().unwrap();
/// ```
pub struct BTreeIndex {
    store: PageStore,
    meta: TreeMeta,
}

impl BTreeIndex {
    // ========================================================================
    // Lifecycle
    // ========================================================================

    /// Create a new index file with an empty root leaf.
    ///
    /// Writes the metadata page (page 0) and the root page (page 1),
    /// flushes, and releases the session. Open the index afterwards to
    /// use it.
    ///
    /// # Errors
    /// - `Error::InvalidOrder` if `order` is below 2 (an internal split
    ///   must leave at least one key on each side) or above `MAX_ORDER`
    /// - I/O errors if the file already exists or cannot be created
    pub fn create<P: AsRef<Path>>(path: P, key_type: KeyType, order: u16) -> Result<()> {
        if order < 2 || order > MAX_ORDER {
            return Err(Error::InvalidOrder(order));
        }

        let disk = DiskManager::create(&path)?;
        let store = PageStore::new(DEFAULT_POOL_SIZE, disk);
        store.ensure_capacity(2)?;

        let meta = TreeMeta::new(key_type, order);
        let root = Node::new_leaf(FIRST_ROOT_PAGE, None);

        {
            let mut guard = store.fetch_page_write(META_PAGE_ID)?;
            codec::encode_meta(&meta, &mut guard);
        }
        {
            let mut guard = store.fetch_page_write(FIRST_ROOT_PAGE)?;
            codec::encode_node(&root, &mut guard);
        }
        store.flush_all()?;

        debug!(path = %path.as_ref().display(), order, "btree.create");
        Ok(())
    }

    /// Open an existing index.
    ///
    /// # Errors
    /// - `Error::FileNotFound` if the file doesn't exist
    /// - `Error::CorruptPage` if the metadata page fails to decode
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let disk = DiskManager::open(&path)?;
        let store = PageStore::new(DEFAULT_POOL_SIZE, disk);

        let meta = {
            let guard = store.fetch_page_read(META_PAGE_ID)?;
            codec::decode_meta(&guard)?
        };

        debug!(
            path = %path.as_ref().display(),
            root = %meta.root_page,
            nodes = meta.node_count,
            entries = meta.entry_count,
            "btree.open"
        );
        Ok(Self { store, meta })
    }

    /// Close the index: rewrite metadata, flush everything and release
    /// the session.
    pub fn close(self) -> Result<()> {
        self.write_meta()?;
        self.store.flush_all()
    }

    /// Remove an index file from disk.
    ///
    /// # Errors
    /// `Error::FileNotFound` if the file doesn't exist.
    pub fn destroy<P: AsRef<Path>>(path: P) -> Result<()> {
        DiskManager::destroy(path)
    }

    // ========================================================================
    // Accessors (cached metadata, no I/O)
    // ========================================================================

    /// Total node pages allocated to the tree.
    #[inline]
    pub fn node_count(&self) -> u32 {
        self.meta.node_count
    }

    /// Total keys inserted (deletion does not decrement, see `delete`).
    #[inline]
    pub fn entry_count(&self) -> u64 {
        self.meta.entry_count
    }

    /// Key type of the tree.
    #[inline]
    pub fn key_type(&self) -> KeyType {
        self.meta.key_type
    }

    /// Maximum entries per node before a split.
    #[inline]
    pub fn order(&self) -> u16 {
        self.meta.order
    }

    /// Page number of the current root.
    #[inline]
    pub fn root_page(&self) -> PageId {
        self.meta.root_page
    }

    // ========================================================================
    // Point operations
    // ========================================================================

    /// Look up the record reference stored under `key`.
    ///
    /// # Errors
    /// `Error::KeyNotFound` if the key is absent.
    pub fn find(&self, key: i32) -> Result<Rid> {
        let leaf = self.locate_leaf(key)?;
        leaf.leaf_find(key).ok_or(Error::KeyNotFound(key))
    }

    /// Insert a key with its record reference.
    ///
    /// Overflowing nodes split on the way back up; a root split grows
    /// the tree by one level. Metadata is persisted and dirty pages are
    /// flushed before returning. On any I/O failure the metadata page
    /// is left untouched and the handle should be considered stale:
    /// reopen the index.
    ///
    /// # Errors
    /// `Error::KeyExists` if the key is already present (no change).
    pub fn insert(&mut self, key: i32, rid: Rid) -> Result<()> {
        let mut leaf = self.locate_leaf(key)?;
        leaf.leaf_insert(key, rid)?;

        if leaf.entry_count() <= self.meta.order as usize {
            self.write_node(&leaf)?;
        } else {
            let right_page = self.mint_page()?;
            let (separator, right) = leaf.split_leaf(right_page);
            self.write_node(&leaf)?;
            self.write_node(&right)?;
            trace!(left = %leaf.page, right = %right.page, separator, "btree.leaf_split");
            self.propagate_split(leaf.parent, separator, leaf.page, right_page)?;
        }

        self.meta.entry_count += 1;
        self.write_meta()?;
        self.store.flush_all()
    }

    /// Remove a key and its record reference from its leaf.
    ///
    /// No underflow handling: a leaf may legally stay under-full, and
    /// `entry_count` metadata is not decremented. Tree shape never
    /// changes on deletion.
    ///
    /// # Errors
    /// `Error::KeyNotFound` if the key is absent (no change).
    pub fn delete(&mut self, key: i32) -> Result<()> {
        let mut leaf = self.locate_leaf(key)?;
        leaf.leaf_remove(key)?;
        self.write_node(&leaf)?;
        self.store.flush_page(leaf.page)
    }

    /// Open an ascending scan over every entry in the tree.
    ///
    /// The leaf chain is snapshotted at open time; the cursor borrows
    /// the handle, so mutations are excluded while a scan is live.
    pub fn open_scan(&self) -> Result<TreeScan<'_>> {
        TreeScan::open(self)
    }

    // ========================================================================
    // Navigation
    // ========================================================================

    /// Descend from the root to the leaf that owns `key`.
    ///
    /// Iterative, keyed by page number: each step reloads the child
    /// from the page store. Descent longer than `MAX_TREE_DEPTH` means
    /// a parent/child cycle on disk.
    fn locate_leaf(&self, key: i32) -> Result<Node> {
        let mut page_id = self.meta.root_page;

        for _ in 0..MAX_TREE_DEPTH {
            let node = self.load_node(page_id)?;
            if node.is_leaf() {
                return Ok(node);
            }
            page_id = node.child_for(key);
        }

        Err(Error::CorruptPage {
            page: page_id,
            detail: "descent did not reach a leaf",
        })
    }

    // ========================================================================
    // Split propagation
    // ========================================================================

    /// Carry a separator from a completed child split into the parent
    /// level, splitting further as needed.
    ///
    /// Runs as an explicit loop keyed by page number rather than
    /// recursion over in-memory references; one iteration per tree
    /// level. `parent == None` terminates the loop by growing a new
    /// root.
    fn propagate_split(
        &mut self,
        mut parent: Option<PageId>,
        mut separator: i32,
        mut left: PageId,
        mut right: PageId,
    ) -> Result<()> {
        loop {
            let Some(parent_page) = parent else {
                // The split node was the root: grow the tree by one level.
                let root_page = self.mint_page()?;
                let root = Node::new_internal(root_page, None, vec![separator], vec![left, right]);
                self.write_node(&root)?;
                self.repoint_children(&root)?;
                self.meta.root_page = root_page;
                debug!(root = %root_page, separator, "btree.new_root");
                return Ok(());
            };

            let mut node = self.load_node(parent_page)?;
            node.insert_separator(separator, left, right)?;

            if node.entry_count() <= self.meta.order as usize {
                // The right sibling was written with this node as its
                // parent already; nothing to re-point.
                return self.write_node(&node);
            }

            let right_page = self.mint_page()?;
            let (promoted, right_node) = node.split_internal(right_page);
            self.write_node(&node)?;
            self.write_node(&right_node)?;
            self.repoint_children(&right_node)?;
            trace!(left = %node.page, right = %right_node.page, promoted, "btree.internal_split");

            parent = node.parent;
            separator = promoted;
            left = node.page;
            right = right_page;
        }
    }

    /// Rewrite the parent field of every child of `node`.
    ///
    /// Mandatory after a root creation or an internal split: the
    /// children listed by `node` must point back at it.
    fn repoint_children(&self, node: &Node) -> Result<()> {
        for &child_page in node.children() {
            let mut child = self.load_node(child_page)?;
            child.parent = Some(node.page);
            self.write_node(&child)?;
        }
        Ok(())
    }

    // ========================================================================
    // Page-store plumbing
    // ========================================================================

    /// Allocate a fresh node page: grow the file, then mint the number.
    fn mint_page(&mut self) -> Result<PageId> {
        self.store.ensure_capacity(self.meta.node_count + 2)?;
        Ok(self.meta.mint_page())
    }

    /// Pin, decode and unpin one node page.
    pub(crate) fn load_node(&self, page_id: PageId) -> Result<Node> {
        let guard = self.store.fetch_page_read(page_id)?;
        codec::decode_node(&guard, page_id)
    }

    /// Pin, encode and unpin one node page (marked dirty by the guard).
    fn write_node(&self, node: &Node) -> Result<()> {
        let mut guard = self.store.fetch_page_write(node.page)?;
        codec::encode_node(node, &mut guard);
        Ok(())
    }

    /// Rewrite the metadata page from the cached copy.
    fn write_meta(&self) -> Result<()> {
        let mut guard = self.store.fetch_page_write(META_PAGE_ID)?;
        codec::encode_meta(&self.meta, &mut guard);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn rid(page: u32, slot: u16) -> Rid {
        Rid::new(PageId::new(page), slot)
    }

    fn create_and_open(order: u16) -> (BTreeIndex, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.idx");
        BTreeIndex::create(&path, KeyType::Int, order).unwrap();
        (BTreeIndex::open(&path).unwrap(), dir)
    }

    #[test]
    fn test_create_rejects_bad_order() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.idx");

        assert!(matches!(
            BTreeIndex::create(&path, KeyType::Int, 0),
            Err(Error::InvalidOrder(0))
        ));
        assert!(matches!(
            BTreeIndex::create(&path, KeyType::Int, 1),
            Err(Error::InvalidOrder(1))
        ));
        assert!(matches!(
            BTreeIndex::create(&path, KeyType::Int, MAX_ORDER + 1),
            Err(Error::InvalidOrder(_))
        ));
    }

    #[test]
    fn test_fresh_tree_state() {
        let (index, _dir) = create_and_open(4);

        assert_eq!(index.node_count(), 1);
        assert_eq!(index.entry_count(), 0);
        assert_eq!(index.order(), 4);
        assert_eq!(index.key_type(), KeyType::Int);
        assert_eq!(index.root_page(), PageId::new(1));
    }

    #[test]
    fn test_find_on_empty_tree() {
        let (index, _dir) = create_and_open(4);

        assert!(matches!(index.find(1), Err(Error::KeyNotFound(1))));
    }

    #[test]
    fn test_insert_and_find_without_split() {
        let (mut index, _dir) = create_and_open(4);

        index.insert(20, rid(2, 0)).unwrap();
        index.insert(10, rid(1, 0)).unwrap();
        index.insert(30, rid(3, 0)).unwrap();

        assert_eq!(index.find(10).unwrap(), rid(1, 0));
        assert_eq!(index.find(20).unwrap(), rid(2, 0));
        assert_eq!(index.find(30).unwrap(), rid(3, 0));
        assert_eq!(index.entry_count(), 3);
        // No split at order 4
        assert_eq!(index.node_count(), 1);
    }

    #[test]
    fn test_root_leaf_split_scenario() {
        // Order 2: inserting 10, 20, 30 overflows the root leaf.
        let (mut index, _dir) = create_and_open(2);

        index.insert(10, rid(1, 0)).unwrap();
        index.insert(20, rid(2, 0)).unwrap();
        assert_eq!(index.node_count(), 1);

        index.insert(30, rid(3, 0)).unwrap();

        // Right leaf at page 2, new root at page 3
        assert_eq!(index.node_count(), 3);
        assert_eq!(index.root_page(), PageId::new(3));
        assert_eq!(index.entry_count(), 3);

        let root = index.load_node(index.root_page()).unwrap();
        assert!(!root.is_leaf());
        assert_eq!(root.keys(), &[30]);
        assert_eq!(root.children(), &[PageId::new(1), PageId::new(2)]);
        assert_eq!(root.parent, None);

        // Both leaves point back at the new root
        let left = index.load_node(PageId::new(1)).unwrap();
        let right = index.load_node(PageId::new(2)).unwrap();
        assert_eq!(left.parent, Some(PageId::new(3)));
        assert_eq!(right.parent, Some(PageId::new(3)));
        assert_eq!(left.keys(), &[10, 20]);
        assert_eq!(right.keys(), &[30]);

        // find descends through the new root
        assert_eq!(index.find(20).unwrap(), rid(2, 0));
        assert_eq!(index.find(30).unwrap(), rid(3, 0));
    }

    #[test]
    fn test_duplicate_insert_changes_nothing() {
        let (mut index, _dir) = create_and_open(2);

        index.insert(10, rid(1, 0)).unwrap();
        index.insert(20, rid(2, 0)).unwrap();

        let err = index.insert(10, rid(9, 9)).unwrap_err();
        assert!(matches!(err, Error::KeyExists(10)));

        assert_eq!(index.entry_count(), 2);
        assert_eq!(index.node_count(), 1);
        assert_eq!(index.find(10).unwrap(), rid(1, 0));
    }

    #[test]
    fn test_multi_level_splits() {
        // Order 2 with 50 keys forces repeated internal splits.
        let (mut index, _dir) = create_and_open(2);

        for i in 0..50 {
            index.insert(i, rid(i as u32, 0)).unwrap();
        }

        assert_eq!(index.entry_count(), 50);
        for i in 0..50 {
            assert_eq!(index.find(i).unwrap(), rid(i as u32, 0));
        }
        assert!(matches!(index.find(50), Err(Error::KeyNotFound(50))));
    }

    #[test]
    fn test_descending_and_interleaved_inserts() {
        let (mut index, _dir) = create_and_open(3);

        // Descending order stresses the leftmost descent path
        for i in (0..40).rev() {
            index.insert(i, rid(i as u32, 1)).unwrap();
        }
        for i in 0..40 {
            assert_eq!(index.find(i).unwrap(), rid(i as u32, 1));
        }
    }

    #[test]
    fn test_delete_then_find() {
        let (mut index, _dir) = create_and_open(2);

        for i in 0..10 {
            index.insert(i, rid(i as u32, 0)).unwrap();
        }

        index.delete(4).unwrap();
        assert!(matches!(index.find(4), Err(Error::KeyNotFound(4))));

        // Neighbors survive
        assert_eq!(index.find(3).unwrap(), rid(3, 0));
        assert_eq!(index.find(5).unwrap(), rid(5, 0));
    }

    #[test]
    fn test_delete_absent_key() {
        let (mut index, _dir) = create_and_open(2);
        index.insert(1, rid(1, 0)).unwrap();

        assert!(matches!(index.delete(99), Err(Error::KeyNotFound(99))));
        assert_eq!(index.find(1).unwrap(), rid(1, 0));
    }

    #[test]
    fn test_delete_keeps_entry_count() {
        // Documented policy: deletion leaves entry_count untouched.
        let (mut index, _dir) = create_and_open(2);

        for i in 0..5 {
            index.insert(i, rid(i as u32, 0)).unwrap();
        }
        assert_eq!(index.entry_count(), 5);
        let nodes_before = index.node_count();

        index.delete(2).unwrap();
        index.delete(3).unwrap();

        assert_eq!(index.entry_count(), 5);
        assert_eq!(index.node_count(), nodes_before);
    }

    #[test]
    fn test_metadata_survives_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.idx");

        BTreeIndex::create(&path, KeyType::Int, 2).unwrap();
        {
            let mut index = BTreeIndex::open(&path).unwrap();
            for i in 0..10 {
                index.insert(i, rid(i as u32, 0)).unwrap();
            }
            index.close().unwrap();
        }

        let index = BTreeIndex::open(&path).unwrap();
        assert_eq!(index.entry_count(), 10);
        assert!(index.node_count() > 1);
        for i in 0..10 {
            assert_eq!(index.find(i).unwrap(), rid(i as u32, 0));
        }
    }

    #[test]
    fn test_open_missing_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("missing.idx");

        assert!(matches!(
            BTreeIndex::open(&path),
            Err(Error::FileNotFound(_))
        ));
    }

    #[test]
    fn test_two_trees_coexist() {
        let dir = tempdir().unwrap();
        let path_a = dir.path().join("a.idx");
        let path_b = dir.path().join("b.idx");

        BTreeIndex::create(&path_a, KeyType::Int, 2).unwrap();
        BTreeIndex::create(&path_b, KeyType::Int, 4).unwrap();

        let mut a = BTreeIndex::open(&path_a).unwrap();
        let mut b = BTreeIndex::open(&path_b).unwrap();

        a.insert(1, rid(1, 0)).unwrap();
        b.insert(1, rid(2, 0)).unwrap();

        assert_eq!(a.find(1).unwrap(), rid(1, 0));
        assert_eq!(b.find(1).unwrap(), rid(2, 0));
        assert_eq!(a.order(), 2);
        assert_eq!(b.order(), 4);
    }
}
