// LRU Replacement Policy Implementation
//
// Tracks the unpinned frames of the buffer pool, ordered by how recently
// they became unpinned. Only the transition from pinned to unpinned
// counts as a use: unpinning an already-unpinned frame does not refresh
// its recency.

use linked_hash_map::LinkedHashMap;
use parking_lot::Mutex;

use crate::common::types::FrameId;

pub struct LruReplacer {
    /// Front = least recently unpinned (next victim), back = most recent.
    /// All operations serialize on this latch.
    candidates: Mutex<LinkedHashMap<FrameId, ()>>,
}

impl LruReplacer {
    pub fn new(pool_size: usize) -> Self {
        Self {
            candidates: Mutex::new(LinkedHashMap::with_capacity(pool_size)),
        }
    }

    /// Evict the least recently unpinned frame, if any.
    pub fn victim(&self) -> Option<FrameId> {
        self.candidates.lock().pop_front().map(|(frame_id, _)| frame_id)
    }

    /// The frame is in use again; it is no longer an eviction candidate.
    pub fn pin(&self, frame_id: FrameId) {
        self.candidates.lock().remove(&frame_id);
    }

    /// The frame's pin count dropped to zero; it becomes the most recent
    /// eviction candidate. No-op if it already is a candidate.
    pub fn unpin(&self, frame_id: FrameId) {
        let mut candidates = self.candidates.lock();
        if !candidates.contains_key(&frame_id) {
            candidates.insert(frame_id, ());
        }
    }

    /// Number of frames currently eligible for eviction.
    pub fn size(&self) -> usize {
        self.candidates.lock().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lru_victim_order() {
        let replacer = LruReplacer::new(7);
        replacer.unpin(1);
        replacer.unpin(2);
        replacer.unpin(3);

        replacer.pin(3);

        assert_eq!(replacer.victim(), Some(1));
        assert_eq!(replacer.victim(), Some(2));
        assert_eq!(replacer.victim(), None);
    }

    #[test]
    fn test_unpin_does_not_refresh_recency() {
        let replacer = LruReplacer::new(7);
        replacer.unpin(1);
        replacer.unpin(2);
        replacer.unpin(1);

        assert_eq!(replacer.victim(), Some(1));
        assert_eq!(replacer.victim(), Some(2));
    }

    #[test]
    fn test_pin_then_unpin_round_trip() {
        let replacer = LruReplacer::new(7);
        replacer.unpin(5);
        assert_eq!(replacer.size(), 1);

        replacer.pin(5);
        assert_eq!(replacer.size(), 0);

        replacer.unpin(5);
        replacer.pin(5);
        assert_eq!(replacer.size(), 0);
        assert_eq!(replacer.victim(), None);
    }

    #[test]
    fn test_pin_absent_frame_is_noop() {
        let replacer = LruReplacer::new(7);
        replacer.pin(42);
        assert_eq!(replacer.size(), 0);
    }

    #[test]
    fn test_concurrent_access() {
        use std::sync::Arc;
        use std::thread;

        let replacer = Arc::new(LruReplacer::new(64));
        let mut handles = Vec::new();
        for t in 0..4u32 {
            let replacer = Arc::clone(&replacer);
            handles.push(thread::spawn(move || {
                for i in 0..16 {
                    replacer.unpin(t * 16 + i);
                }
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(replacer.size(), 64);

        let mut evicted = std::collections::HashSet::new();
        while let Some(frame_id) = replacer.victim() {
            assert!(evicted.insert(frame_id));
        }
        assert_eq!(evicted.len(), 64);
    }
}
