//! Page codec: serializes tree nodes and tree metadata to and from
//! fixed-size pages.
//!
//! Layouts are little-endian and sit behind the standard
//! [`PageHeader`] (type byte + CRC32). Encode and decode are exact
//! inverses; anything that fails to parse reports
//! [`Error::CorruptPage`] rather than truncating silently.
//!
//! # Node page layout
//! ```text
//! Offset  Size  Field
//! ------  ----  -----
//! 0       5     PageHeader (type = BTreeLeaf | BTreeInternal)
//! 5       4     page_no (u32, self-reference)
//! 9       4     parent page (u32, u32::MAX = none)
//! 13      2     entry_count (u16)
//! 15      ...   leaf:     entry_count × (key i32, rid_page u32, rid_slot u16)
//!               internal: entry_count × key i32,
//!                         then (entry_count + 1) × child_page u32
//! ```
//!
//! # Metadata page layout (page 0)
//! ```text
//! 0       5     PageHeader (type = Meta)
//! 5       4     root_page (u32)
//! 9       4     node_count (u32)
//! 13      8     entry_count (u64)
//! 21      2     order (u16)
//! 23      1     key_type (u8)
//! ```

use crate::common::config::PAGE_SIZE;
use crate::common::{Error, PageId, Result, Rid};
use crate::storage::page::{Page, PageHeader, PageType};

use super::meta::{KeyType, TreeMeta, META_PAGE_ID};
use super::node::{Node, NodePayload};

const OFF_PAGE_NO: usize = PageHeader::SIZE;
const OFF_PARENT: usize = OFF_PAGE_NO + 4;
const OFF_ENTRY_COUNT: usize = OFF_PARENT + 4;
const OFF_ENTRIES: usize = OFF_ENTRY_COUNT + 2;

/// Bytes per leaf entry: i32 key + u32 rid page + u16 rid slot.
const LEAF_ENTRY_SIZE: usize = 10;

/// Most leaf entries a page can physically hold.
const LEAF_CAPACITY: usize = (PAGE_SIZE - OFF_ENTRIES) / LEAF_ENTRY_SIZE;

/// Most internal keys a page can physically hold
/// (4 bytes per key, 4 per child, one extra child).
const INTERNAL_CAPACITY: usize = (PAGE_SIZE - OFF_ENTRIES - 4) / 8;

const OFF_META_ROOT: usize = PageHeader::SIZE;
const OFF_META_NODE_COUNT: usize = OFF_META_ROOT + 4;
const OFF_META_ENTRY_COUNT: usize = OFF_META_NODE_COUNT + 4;
const OFF_META_ORDER: usize = OFF_META_ENTRY_COUNT + 8;
const OFF_META_KEY_TYPE: usize = OFF_META_ORDER + 2;

/// Serialize a node into a page buffer.
///
/// The page is zeroed first so identical nodes encode to identical
/// bytes; the checksum is computed last.
///
/// # Panics
/// Panics if the node holds more entries than a page can represent.
/// `create` bounds the order well below page capacity, so an overflow
/// here is an engine bug, not an I/O condition.
pub fn encode_node(node: &Node, page: &mut Page) {
    page.reset();

    let page_type = if node.is_leaf() {
        PageType::BTreeLeaf
    } else {
        PageType::BTreeInternal
    };
    page.set_header(&PageHeader::new(page_type));

    let parent = node.parent.map_or(u32::MAX, |p| p.0);
    let data = page.as_mut_slice();
    put_u32(data, OFF_PAGE_NO, node.page.0);
    put_u32(data, OFF_PARENT, parent);

    match &node.payload {
        NodePayload::Leaf { keys, rids } => {
            assert!(keys.len() <= LEAF_CAPACITY, "leaf overflows page");
            put_u16(data, OFF_ENTRY_COUNT, keys.len() as u16);
            let mut off = OFF_ENTRIES;
            for (key, rid) in keys.iter().zip(rids) {
                put_i32(data, off, *key);
                put_u32(data, off + 4, rid.page.0);
                put_u16(data, off + 8, rid.slot);
                off += LEAF_ENTRY_SIZE;
            }
        }
        NodePayload::Internal { keys, children } => {
            assert!(keys.len() <= INTERNAL_CAPACITY, "internal node overflows page");
            put_u16(data, OFF_ENTRY_COUNT, keys.len() as u16);
            let mut off = OFF_ENTRIES;
            for key in keys {
                put_i32(data, off, *key);
                off += 4;
            }
            for child in children {
                put_u32(data, off, child.0);
                off += 4;
            }
        }
    }

    page.update_checksum();
}

/// Deserialize the node stored in a page buffer.
///
/// `expected` is the page number the buffer was fetched from; the
/// stored self-reference must agree.
///
/// # Errors
/// `Error::CorruptPage` on a wrong page type, checksum mismatch,
/// entry count beyond page capacity, or self-reference mismatch.
pub fn decode_node(page: &Page, expected: PageId) -> Result<Node> {
    let corrupt = |detail: &'static str| Error::CorruptPage {
        page: expected,
        detail,
    };

    let header = page.header();
    let is_leaf = match header.page_type {
        PageType::BTreeLeaf => true,
        PageType::BTreeInternal => false,
        _ => return Err(corrupt("not a tree node page")),
    };

    if !page.verify_checksum() {
        return Err(corrupt("checksum mismatch"));
    }

    let data = page.as_slice();
    let page_no = get_u32(data, OFF_PAGE_NO);
    if page_no != expected.0 {
        return Err(corrupt("stored page number disagrees with location"));
    }

    let parent = match get_u32(data, OFF_PARENT) {
        u32::MAX => None,
        p => Some(PageId::new(p)),
    };

    let entry_count = get_u16(data, OFF_ENTRY_COUNT) as usize;

    let payload = if is_leaf {
        if entry_count > LEAF_CAPACITY {
            return Err(corrupt("entry count exceeds leaf capacity"));
        }
        let mut keys = Vec::with_capacity(entry_count);
        let mut rids = Vec::with_capacity(entry_count);
        let mut off = OFF_ENTRIES;
        for _ in 0..entry_count {
            keys.push(get_i32(data, off));
            rids.push(Rid::new(PageId::new(get_u32(data, off + 4)), get_u16(data, off + 8)));
            off += LEAF_ENTRY_SIZE;
        }
        NodePayload::Leaf { keys, rids }
    } else {
        if entry_count > INTERNAL_CAPACITY {
            return Err(corrupt("entry count exceeds internal capacity"));
        }
        if entry_count == 0 {
            return Err(corrupt("internal node without keys"));
        }
        let mut keys = Vec::with_capacity(entry_count);
        let mut children = Vec::with_capacity(entry_count + 1);
        let mut off = OFF_ENTRIES;
        for _ in 0..entry_count {
            keys.push(get_i32(data, off));
            off += 4;
        }
        for _ in 0..=entry_count {
            children.push(PageId::new(get_u32(data, off)));
            off += 4;
        }
        NodePayload::Internal { keys, children }
    };

    Ok(Node {
        page: expected,
        parent,
        payload,
    })
}

/// Serialize tree metadata into the metadata page buffer.
pub fn encode_meta(meta: &TreeMeta, page: &mut Page) {
    page.reset();
    page.set_header(&PageHeader::new(PageType::Meta));

    let data = page.as_mut_slice();
    put_u32(data, OFF_META_ROOT, meta.root_page.0);
    put_u32(data, OFF_META_NODE_COUNT, meta.node_count);
    put_u64(data, OFF_META_ENTRY_COUNT, meta.entry_count);
    put_u16(data, OFF_META_ORDER, meta.order);
    data[OFF_META_KEY_TYPE] = meta.key_type as u8;

    page.update_checksum();
}

/// Deserialize tree metadata from the metadata page buffer.
///
/// # Errors
/// `Error::CorruptPage` on a wrong page type, checksum mismatch,
/// unknown key type, zero order or out-of-range root page.
pub fn decode_meta(page: &Page) -> Result<TreeMeta> {
    let corrupt = |detail: &'static str| Error::CorruptPage {
        page: META_PAGE_ID,
        detail,
    };

    if page.header().page_type != PageType::Meta {
        return Err(corrupt("not a metadata page"));
    }
    if !page.verify_checksum() {
        return Err(corrupt("checksum mismatch"));
    }

    let data = page.as_slice();
    let root_page = get_u32(data, OFF_META_ROOT);
    let node_count = get_u32(data, OFF_META_NODE_COUNT);
    let entry_count = get_u64(data, OFF_META_ENTRY_COUNT);
    let order = get_u16(data, OFF_META_ORDER);
    let key_type =
        KeyType::from_u8(data[OFF_META_KEY_TYPE]).ok_or_else(|| corrupt("unknown key type"))?;

    if order == 0 {
        return Err(corrupt("order must be at least 1"));
    }
    if root_page == 0 || root_page > node_count {
        return Err(corrupt("root page outside allocated range"));
    }

    Ok(TreeMeta {
        root_page: PageId::new(root_page),
        node_count,
        entry_count,
        order,
        key_type,
    })
}

// ============================================================================
// Little-endian field helpers
// ============================================================================

fn put_u16(data: &mut [u8], off: usize, v: u16) {
    data[off..off + 2].copy_from_slice(&v.to_le_bytes());
}

fn put_u32(data: &mut [u8], off: usize, v: u32) {
    data[off..off + 4].copy_from_slice(&v.to_le_bytes());
}

fn put_u64(data: &mut [u8], off: usize, v: u64) {
    data[off..off + 8].copy_from_slice(&v.to_le_bytes());
}

fn put_i32(data: &mut [u8], off: usize, v: i32) {
    data[off..off + 4].copy_from_slice(&v.to_le_bytes());
}

fn get_u16(data: &[u8], off: usize) -> u16 {
    u16::from_le_bytes([data[off], data[off + 1]])
}

fn get_u32(data: &[u8], off: usize) -> u32 {
    u32::from_le_bytes([data[off], data[off + 1], data[off + 2], data[off + 3]])
}

fn get_u64(data: &[u8], off: usize) -> u64 {
    let mut arr = [0u8; 8];
    arr.copy_from_slice(&data[off..off + 8]);
    u64::from_le_bytes(arr)
}

fn get_i32(data: &[u8], off: usize) -> i32 {
    i32::from_le_bytes([data[off], data[off + 1], data[off + 2], data[off + 3]])
}
