//! Min-heap of cursor indices keyed by each cursor's current element.

use smallvec::SmallVec;

use super::cursor::SortedCursor;

/// Array-backed binary min-heap over positions in a cursor slice.
///
/// The heap stores indices only; ordering is read from the cursors on every
/// comparison, so after advancing the root cursor the caller restores the
/// heap with [`sift_down_root`](Self::sift_down_root) or
/// [`pop_root`](Self::pop_root). Every cursor in the heap is non-exhausted.
#[derive(Debug, Clone, Default)]
pub(crate) struct CursorHeap {
    slots: SmallVec<[usize; 8]>,
}

impl CursorHeap {
    /// Builds a heap over every non-exhausted cursor in O(N).
    pub(crate) fn build<T: Ord, C: SortedCursor<T>>(cursors: &[C]) -> Self {
        let mut heap = Self {
            slots: cursors
                .iter()
                .enumerate()
                .filter(|(_, cursor)| cursor.current().is_some())
                .map(|(index, _)| index)
                .collect(),
        };
        for slot in (0..heap.slots.len() / 2).rev() {
            heap.sift_down(cursors, slot);
        }
        heap
    }

    #[inline]
    pub(crate) fn len(&self) -> usize {
        self.slots.len()
    }

    /// Index of the cursor holding the smallest element.
    #[inline]
    pub(crate) fn peek(&self) -> Option<usize> {
        self.slots.first().copied()
    }

    /// Restores the heap after the root cursor advanced to a larger element.
    #[inline]
    pub(crate) fn sift_down_root<T: Ord, C: SortedCursor<T>>(&mut self, cursors: &[C]) {
        self.sift_down(cursors, 0);
    }

    /// Drops the root cursor, which became exhausted.
    pub(crate) fn pop_root<T: Ord, C: SortedCursor<T>>(&mut self, cursors: &[C]) {
        if self.slots.is_empty() {
            return;
        }
        self.slots.swap_remove(0);
        self.sift_down(cursors, 0);
    }

    fn less<T: Ord, C: SortedCursor<T>>(&self, cursors: &[C], left: usize, right: usize) -> bool {
        cursors[self.slots[left]].current() < cursors[self.slots[right]].current()
    }

    fn sift_down<T: Ord, C: SortedCursor<T>>(&mut self, cursors: &[C], mut slot: usize) {
        let length = self.slots.len();
        loop {
            let left = 2 * slot + 1;
            if left >= length {
                return;
            }
            let right = left + 1;
            let smallest = if right < length && self.less(cursors, right, left) {
                right
            } else {
                left
            };
            if !self.less(cursors, smallest, slot) {
                return;
            }
            self.slots.swap(slot, smallest);
            slot = smallest;
        }
    }
}
