//! LRU-K eviction policy for the buffer pool.
//!
//! The replacer tracks the last K access timestamps of every frame it knows
//! about and, on eviction, picks the evictable frame with the largest
//! *backward K-distance*: the time since the K-th most recent access. A frame
//! seen fewer than K times has infinite K-distance and is preferred; among
//! such frames the one with the earliest recorded access wins (classical
//! LRU), and exact ties fall back to the smaller frame id.
//!
//! Candidates live in an array-backed min-heap ordered victim-first. Each
//! node carries its current heap index, so toggling evictability and
//! re-sifting after an access are both O(log n).
//!
//! Timestamps are ticks of a logical clock advanced on every
//! [`record_access`](LruKReplacer::record_access); only their order matters.
//! Tick 0 is reserved as the "never seen" padding inside a K-history.

use std::collections::{HashMap, VecDeque};

use super::frame::FrameId;

struct LruKNode {
    /// Last K access ticks, newest at the front, zero-padded at the back.
    history: VecDeque<u64>,
    evictable: bool,
    /// Position in the heap while evictable.
    heap_pos: Option<usize>,
}

impl LruKNode {
    fn new(k: usize) -> Self {
        Self {
            history: VecDeque::from(vec![0; k]),
            evictable: false,
            heap_pos: None,
        }
    }

    fn touch(&mut self, tick: u64) {
        self.history.pop_back();
        self.history.push_front(tick);
    }
}

/// LRU-K replacer over a fixed set of frame slots.
pub struct LruKReplacer {
    nodes: HashMap<FrameId, LruKNode>,
    /// Evictable frames, heap-ordered victim-first.
    heap: Vec<FrameId>,
    clock: u64,
    k: usize,
    num_frames: usize,
}

impl LruKReplacer {
    /// Creates a replacer for `num_frames` slots with look-back window `k`.
    pub fn new(num_frames: usize, k: usize) -> Self {
        assert!(num_frames > 0, "replacer needs at least one frame");
        assert!(k >= 1, "LRU-K needs k >= 1");
        Self {
            nodes: HashMap::with_capacity(num_frames),
            heap: Vec::with_capacity(num_frames),
            clock: 0,
            k,
            num_frames,
        }
    }

    /// Number of evictable frames currently tracked.
    pub fn size(&self) -> usize {
        self.heap.len()
    }

    /// Registers an access to `frame_id` at the next clock tick.
    ///
    /// # Panics
    ///
    /// Panics if `frame_id` is outside the slot range.
    pub fn record_access(&mut self, frame_id: FrameId) {
        self.check_frame(frame_id);
        self.clock += 1;
        let tick = self.clock;
        let k = self.k;

        let node = self.nodes.entry(frame_id).or_insert_with(|| LruKNode::new(k));
        node.touch(tick);

        if let Some(pos) = node.heap_pos {
            self.resift(pos);
        }
    }

    /// Toggles whether `frame_id` may be chosen as a victim.
    ///
    /// Transitions adjust [`size`](Self::size); calls that do not change the
    /// flag, or that name an untracked frame, are no-ops.
    ///
    /// # Panics
    ///
    /// Panics if `frame_id` is outside the slot range.
    pub fn set_evictable(&mut self, frame_id: FrameId, evictable: bool) {
        self.check_frame(frame_id);
        let Some(node) = self.nodes.get_mut(&frame_id) else {
            return;
        };
        if node.evictable == evictable {
            return;
        }
        node.evictable = evictable;
        if evictable {
            self.heap_push(frame_id);
        } else {
            let pos = self.nodes[&frame_id]
                .heap_pos
                .expect("evictable node missing from heap");
            self.heap_remove(pos);
        }
    }

    /// Evicts the frame with the largest backward K-distance, forgetting its
    /// history entirely. Returns `None` when nothing is evictable.
    pub fn evict(&mut self) -> Option<FrameId> {
        let victim = *self.heap.first()?;
        self.heap_remove(0);
        let node = self.nodes.remove(&victim);
        debug_assert!(node.is_some_and(|n| n.evictable));
        Some(victim)
    }

    /// Drops a specific frame's history. A call for an untracked frame is a
    /// no-op.
    ///
    /// # Panics
    ///
    /// Panics if the frame is tracked but not evictable, or if `frame_id` is
    /// outside the slot range.
    pub fn remove(&mut self, frame_id: FrameId) {
        self.check_frame(frame_id);
        let Some(node) = self.nodes.get(&frame_id) else {
            return;
        };
        assert!(
            node.evictable,
            "cannot remove non-evictable frame {frame_id:?} from replacer"
        );
        let pos = node.heap_pos.expect("evictable node missing from heap");
        self.heap_remove(pos);
        self.nodes.remove(&frame_id);
    }

    fn check_frame(&self, frame_id: FrameId) {
        assert!(
            frame_id.index() < self.num_frames,
            "frame id {frame_id:?} out of range (pool of {})",
            self.num_frames
        );
    }

    /// Victim-first ordering: walk both histories from oldest to newest,
    /// skipping positions where both are the zero pad; the first difference
    /// decides (smaller tick is the better victim). Identical histories fall
    /// back to the smaller frame id.
    fn victim_before(&self, a: FrameId, b: FrameId) -> bool {
        let ha = &self.nodes[&a].history;
        let hb = &self.nodes[&b].history;
        for (&ta, &tb) in ha.iter().rev().zip(hb.iter().rev()) {
            if ta == tb {
                continue;
            }
            return ta < tb;
        }
        a.index() < b.index()
    }

    // Heap plumbing. `heap_pos` back-indices are kept exact across every
    // swap so removal and re-sift stay O(log n).

    fn less(&self, i: usize, j: usize) -> bool {
        self.victim_before(self.heap[i], self.heap[j])
    }

    fn set_pos(&mut self, i: usize) {
        let frame_id = self.heap[i];
        self.nodes
            .get_mut(&frame_id)
            .expect("heap entry without node")
            .heap_pos = Some(i);
    }

    fn swap_entries(&mut self, i: usize, j: usize) {
        self.heap.swap(i, j);
        self.set_pos(i);
        self.set_pos(j);
    }

    fn heap_push(&mut self, frame_id: FrameId) {
        self.heap.push(frame_id);
        let i = self.heap.len() - 1;
        self.set_pos(i);
        self.sift_up(i);
    }

    fn heap_remove(&mut self, pos: usize) {
        let last = self.heap.len() - 1;
        if pos != last {
            self.swap_entries(pos, last);
        }
        let removed = self.heap.pop().expect("remove from empty heap");
        if let Some(node) = self.nodes.get_mut(&removed) {
            node.heap_pos = None;
        }
        if pos < self.heap.len() {
            self.resift(pos);
        }
    }

    fn resift(&mut self, pos: usize) {
        self.sift_up(pos);
        self.sift_down(pos);
    }

    fn sift_up(&mut self, mut i: usize) {
        while i > 0 {
            let parent = (i - 1) / 2;
            if !self.less(i, parent) {
                break;
            }
            self.swap_entries(i, parent);
            i = parent;
        }
    }

    fn sift_down(&mut self, mut i: usize) {
        loop {
            let left = 2 * i + 1;
            let right = 2 * i + 2;
            let mut best = i;
            if left < self.heap.len() && self.less(left, best) {
                best = left;
            }
            if right < self.heap.len() && self.less(right, best) {
                best = right;
            }
            if best == i {
                return;
            }
            self.swap_entries(i, best);
            i = best;
        }
    }

    /// Asserts that every node's stored heap index matches its actual
    /// position and that the heap holds exactly the evictable nodes.
    #[cfg(test)]
    fn assert_consistent(&self) {
        for (i, frame_id) in self.heap.iter().enumerate() {
            assert_eq!(self.nodes[frame_id].heap_pos, Some(i));
            assert!(self.nodes[frame_id].evictable);
        }
        let evictable = self.nodes.values().filter(|n| n.evictable).count();
        assert_eq!(evictable, self.heap.len());
    }
}

impl std::fmt::Debug for LruKReplacer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LruKReplacer")
            .field("k", &self.k)
            .field("num_frames", &self.num_frames)
            .field("tracked", &self.nodes.len())
            .field("evictable", &self.heap.len())
            .finish()
    }
}
