use std::collections::{HashMap, HashSet, VecDeque};

use tracing::debug;

use crate::canvas::{PixelBuffer, chunk_bytes};

/// Default number of retained canvas states.
pub const DEFAULT_CAPACITY: usize = 20;

/// Default cap on distinct snapshot storage.
pub const DEFAULT_MEMORY_BUDGET: usize = 512 * 1024 * 1024;

// ============================================================================
// SNAPSHOT STORE - bounded, branch-discarding history of canvas states
// ============================================================================

/// One retained canvas state.
#[derive(Clone, Debug)]
pub struct HistoryEntry {
    pub label: String,
    pub snapshot: PixelBuffer,
}

/// Linear undo/redo history over full-canvas snapshots.
///
/// `entries[cursor]` is the state currently on screen. Entries after the
/// cursor form the redo branch; committing while the cursor is not at the
/// end throws that branch away before appending. The deque never holds more
/// than `capacity` entries and never becomes empty.
pub struct History {
    entries: VecDeque<HistoryEntry>,
    cursor: usize,
    capacity: usize,
    /// Optional cap on distinct chunk storage, in bytes.
    max_memory_bytes: Option<usize>,
}

impl History {
    /// Start a history holding only `initial`. A zero `capacity` is raised to 1.
    pub fn new(capacity: usize, initial: PixelBuffer) -> Self {
        let mut entries = VecDeque::with_capacity(capacity.clamp(1, 64));
        entries.push_back(HistoryEntry {
            label: "Open".to_string(),
            snapshot: initial,
        });
        Self {
            entries,
            cursor: 0,
            capacity: capacity.max(1),
            max_memory_bytes: Some(DEFAULT_MEMORY_BUDGET),
        }
    }

    /// Replace the memory budget; `None` disables memory-based eviction.
    pub fn with_memory_budget(mut self, max_bytes: Option<usize>) -> Self {
        self.set_memory_budget(max_bytes);
        self
    }

    pub fn set_memory_budget(&mut self, max_bytes: Option<usize>) {
        self.max_memory_bytes = max_bytes;
        self.prune();
    }

    /// Record `snapshot` as the newest state.
    pub fn commit(&mut self, snapshot: PixelBuffer) {
        self.commit_labeled("Edit", snapshot);
    }

    /// Record `snapshot` with a display label.
    pub fn commit_labeled(&mut self, label: impl Into<String>, snapshot: PixelBuffer) {
        let discarded = self.entries.len() - 1 - self.cursor;
        if discarded > 0 {
            self.entries.truncate(self.cursor + 1);
            debug!(discarded, "dropped redo branch");
        }

        self.entries.push_back(HistoryEntry {
            label: label.into(),
            snapshot,
        });
        self.cursor = self.entries.len() - 1;
        self.prune();
    }

    /// Step back one state. `None` when already at the oldest retained state.
    pub fn undo(&mut self) -> Option<PixelBuffer> {
        if self.cursor == 0 {
            return None;
        }
        self.cursor -= 1;
        Some(self.entries[self.cursor].snapshot.clone())
    }

    /// Step forward one state. `None` when there is nothing to redo.
    pub fn redo(&mut self) -> Option<PixelBuffer> {
        if self.cursor + 1 >= self.entries.len() {
            return None;
        }
        self.cursor += 1;
        Some(self.entries[self.cursor].snapshot.clone())
    }

    /// The state at the cursor.
    pub fn current(&self) -> PixelBuffer {
        self.entries[self.cursor].snapshot.clone()
    }

    /// Label of the state at the cursor.
    pub fn current_label(&self) -> &str {
        &self.entries[self.cursor].label
    }

    /// Drop everything and restart from `snapshot`.
    pub fn reset(&mut self, snapshot: PixelBuffer) {
        self.entries.clear();
        self.entries.push_back(HistoryEntry {
            label: "Open".to_string(),
            snapshot,
        });
        self.cursor = 0;
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Always false: a history holds at least its initial state.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn can_undo(&self) -> bool {
        self.cursor > 0
    }

    pub fn can_redo(&self) -> bool {
        self.cursor + 1 < self.entries.len()
    }

    pub fn undo_count(&self) -> usize {
        self.cursor
    }

    pub fn redo_count(&self) -> usize {
        self.entries.len() - 1 - self.cursor
    }

    /// Entry labels, oldest first.
    pub fn labels(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.label.as_str()).collect()
    }

    /// Iterate over retained snapshots, oldest first.
    pub fn snapshots(&self) -> impl Iterator<Item = &PixelBuffer> {
        self.entries.iter().map(|e| &e.snapshot)
    }

    /// Bytes of distinct chunk storage held by all entries. Chunks shared
    /// between snapshots are counted once.
    pub fn memory_usage(&self) -> usize {
        let mut seen = HashSet::new();
        self.entries
            .iter()
            .flat_map(|e| e.snapshot.chunk_ids())
            .filter(|id| seen.insert(*id))
            .count()
            * chunk_bytes()
    }

    /// Evict from the oldest end until the count and memory limits hold.
    /// The memory limit never evicts the entry at the cursor.
    fn prune(&mut self) {
        while self.entries.len() > self.capacity {
            self.evict_oldest();
        }

        let Some(max_bytes) = self.max_memory_bytes else {
            return;
        };

        // Reference counts of each chunk across entries; usage is the
        // number of distinct chunks.
        let mut refs: HashMap<usize, usize> = HashMap::new();
        for entry in &self.entries {
            let ids: HashSet<usize> = entry.snapshot.chunk_ids().collect();
            for id in ids {
                *refs.entry(id).or_insert(0) += 1;
            }
        }
        let mut usage = refs.len() * chunk_bytes();

        while self.cursor > 0 && usage > max_bytes {
            let Some(front) = self.entries.front() else {
                break;
            };
            let ids: HashSet<usize> = front.snapshot.chunk_ids().collect();
            for id in ids {
                if let Some(count) = refs.get_mut(&id) {
                    *count -= 1;
                    if *count == 0 {
                        refs.remove(&id);
                        usage -= chunk_bytes();
                    }
                }
            }
            self.evict_oldest();
        }
    }

    fn evict_oldest(&mut self) {
        if let Some(evicted) = self.entries.pop_front() {
            self.cursor = self.cursor.saturating_sub(1);
            debug!(label = %evicted.label, retained = self.entries.len(), "evicted oldest snapshot");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    /// A 1×1 buffer whose single pixel encodes `tag`.
    fn tagged(tag: u8) -> PixelBuffer {
        PixelBuffer::new_filled(1, 1, Rgba([tag, 0, 0, 255])).unwrap()
    }

    fn tags(history: &History) -> Vec<u8> {
        history.snapshots().map(|s| s.get_pixel(0, 0)[0]).collect()
    }

    #[test]
    fn undo_walks_back_through_commits() {
        let mut h = History::new(10, tagged(0));
        for i in 1..=5 {
            h.commit(tagged(i));
        }
        for k in 1..=5u8 {
            assert_eq!(h.undo(), Some(tagged(5 - k)));
        }
        assert_eq!(h.undo(), None);
        assert_eq!(h.cursor(), 0);
        assert_eq!(h.len(), 6);
    }

    #[test]
    fn redo_at_newest_is_empty() {
        let mut h = History::new(3, tagged(0));
        h.commit(tagged(1));
        assert_eq!(h.redo(), None);
        assert_eq!(h.cursor(), 1);
    }

    #[test]
    fn commit_after_undo_discards_redo_branch() {
        let mut h = History::new(10, tagged(0));
        h.commit(tagged(1));
        h.commit(tagged(2));
        h.undo();
        h.undo();
        h.commit(tagged(9));
        assert_eq!(tags(&h), vec![0, 9]);
        assert_eq!(h.redo(), None);
        assert!(!h.can_redo());
    }

    #[test]
    fn capacity_evicts_oldest_in_order() {
        let mut h = History::new(3, tagged(0));
        for i in 1..=4 {
            h.commit(tagged(i));
            assert!(h.len() <= 3);
        }
        assert_eq!(tags(&h), vec![2, 3, 4]);
        assert_eq!(h.cursor(), 2);
    }

    #[test]
    fn capacity_three_scenario() {
        // Initial A, then B, C, D.
        let (a, b, c, d, e) = (1, 2, 3, 4, 5);
        let mut h = History::new(3, tagged(a));
        h.commit(tagged(b));
        h.commit(tagged(c));
        h.commit(tagged(d));
        assert_eq!(tags(&h), vec![b, c, d]);
        assert_eq!(h.current(), tagged(d));

        assert_eq!(h.undo(), Some(tagged(c)));
        assert_eq!(h.undo(), Some(tagged(b)));
        assert_eq!(h.undo(), None);
        assert_eq!(h.current(), tagged(b));

        assert_eq!(h.redo(), Some(tagged(c)));
        // Truncate after C, append E: B, C, E (within capacity, nothing evicted).
        h.commit(tagged(e));
        assert_eq!(tags(&h), vec![b, c, e]);
        assert_eq!(h.cursor(), 2);
        assert_eq!(h.redo(), None);
    }

    #[test]
    fn current_after_commit_round_trips() {
        let mut h = History::new(2, tagged(0));
        h.commit(tagged(42));
        assert_eq!(h.current(), tagged(42));
        assert_eq!(h.undo_count(), 1);
        assert_eq!(h.redo_count(), 0);
    }

    #[test]
    fn zero_capacity_keeps_one_entry() {
        let mut h = History::new(0, tagged(0));
        h.commit(tagged(1));
        assert_eq!(h.len(), 1);
        assert_eq!(h.current(), tagged(1));
        assert_eq!(h.undo(), None);
    }

    #[test]
    fn memory_budget_evicts_but_keeps_current() {
        let mut h = History::new(10, tagged(0)).with_memory_budget(Some(chunk_bytes()));
        h.commit(tagged(1));
        h.commit(tagged(2));
        assert_eq!(tags(&h), vec![2]);
        assert_eq!(h.current(), tagged(2));
    }

    #[test]
    fn lowering_budget_after_undo_keeps_displayed_state() {
        let mut h = History::new(10, tagged(0));
        h.commit(tagged(1));
        h.commit(tagged(2));
        h.undo();
        h.undo();
        assert_eq!(h.current(), tagged(0));

        h.set_memory_budget(Some(chunk_bytes()));
        assert_eq!(h.cursor(), 0);
        assert_eq!(h.current(), tagged(0));
        assert_eq!(h.redo(), Some(tagged(1)));
    }

    #[test]
    fn budget_eviction_stops_at_cursor() {
        let mut h = History::new(10, tagged(0));
        for i in 1..=4 {
            h.commit(tagged(i));
        }
        h.undo();
        h.undo();
        // Displayed state is tag 2; only tags 0 and 1 may go.
        h.set_memory_budget(Some(chunk_bytes()));
        assert_eq!(tags(&h), vec![2, 3, 4]);
        assert_eq!(h.cursor(), 0);
        assert_eq!(h.current(), tagged(2));
    }

    #[test]
    fn shared_chunks_are_counted_once() {
        let base = PixelBuffer::new_filled(64, 64, Rgba([9, 9, 9, 255])).unwrap();
        let mut h = History::new(5, base.clone());
        h.commit(base.clone());
        h.commit(base);
        assert_eq!(h.memory_usage(), chunk_bytes());
    }

    #[test]
    fn labels_follow_commits() {
        let mut h = History::new(4, tagged(0));
        h.commit_labeled("Pen Stroke", tagged(1));
        h.commit_labeled("Invert Colors", tagged(2));
        assert_eq!(h.labels(), vec!["Open", "Pen Stroke", "Invert Colors"]);
        h.undo();
        assert_eq!(h.current_label(), "Pen Stroke");
    }
}
