//! FIFO eviction policy.
//!
//! Victims are selected in the order their frames first received a
//! page; pinned frames are skipped.

use std::collections::{HashSet, VecDeque};

use crate::common::FrameId;

/// A simple FIFO eviction policy.
///
/// Evicts pages in the order they entered the pool. A frame that is
/// pinned (not evictable) is passed over until its pins are released.
pub struct FifoReplacer {
    /// Queue of frame IDs in insertion order (front = oldest).
    queue: VecDeque<FrameId>,

    /// Set for O(1) membership check.
    in_queue: HashSet<FrameId>,

    /// Frames that are currently evictable (pin_count == 0).
    evictable: HashSet<FrameId>,
}

impl FifoReplacer {
    /// Create a new FIFO replacer.
    pub fn new() -> Self {
        Self {
            queue: VecDeque::new(),
            in_queue: HashSet::new(),
            evictable: HashSet::new(),
        }
    }

    /// Record that a frame was accessed.
    ///
    /// For FIFO, only adds to the queue if not already present;
    /// re-accesses do not reorder.
    pub fn record_access(&mut self, frame_id: FrameId) {
        if !self.in_queue.contains(&frame_id) {
            self.queue.push_back(frame_id);
            self.in_queue.insert(frame_id);
        }
    }

    /// Mark a frame as evictable or not (pin count 0 vs. pinned).
    pub fn set_evictable(&mut self, frame_id: FrameId, evictable: bool) {
        if evictable {
            self.evictable.insert(frame_id);
        } else {
            self.evictable.remove(&frame_id);
        }
    }

    /// Select a victim frame for eviction.
    ///
    /// Returns the oldest evictable frame, or None if all frames are
    /// pinned.
    pub fn evict(&mut self) -> Option<FrameId> {
        while let Some(frame_id) = self.queue.pop_front() {
            self.in_queue.remove(&frame_id);

            if self.evictable.remove(&frame_id) {
                return Some(frame_id);
            }
            // Frame is pinned, skip it
        }
        None
    }

    /// Number of evictable frames.
    pub fn size(&self) -> usize {
        self.evictable.len()
    }
}

impl Default for FifoReplacer {
    fn default() -> Self {
        Self::new()
    }
}
