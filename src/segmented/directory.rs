//! The ordered list of segment references behind one array.

use std::ops::Range;

use super::{ReferenceCounter, Segment};
use crate::element::Element;
use crate::error::{CollectionError, Result};

/// A shared reference to a segment.
pub(crate) type SegmentRef<T> = ReferenceCounter<Segment<T>>;

/// One directory entry: a whole segment, or a window into one.
///
/// Windows come from range clones, which share the partially covered
/// segments at either end instead of copying them. A window is read-only;
/// the owning array replaces it with a whole segment before writing.
pub(crate) struct SegmentView<T> {
    segment: SegmentRef<T>,
    window: Option<(usize, usize)>,
}

impl<T> Clone for SegmentView<T> {
    fn clone(&self) -> Self {
        Self {
            segment: ReferenceCounter::clone(&self.segment),
            window: self.window,
        }
    }
}

impl<T> From<Segment<T>> for SegmentView<T> {
    fn from(segment: Segment<T>) -> Self {
        Self {
            segment: ReferenceCounter::new(segment),
            window: None,
        }
    }
}

impl<T: Element> SegmentView<T> {
    /// The visible elements.
    #[inline]
    pub(crate) fn as_slice(&self) -> &[T] {
        match self.window {
            None => self.segment.as_slice(),
            Some((start, end)) => &self.segment.as_slice()[start..end],
        }
    }

    #[inline]
    pub(crate) fn len(&self) -> usize {
        self.window
            .map_or_else(|| self.segment.len(), |(start, end)| end - start)
    }

    #[inline]
    pub(crate) fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Usable slots of the underlying segment.
    #[inline]
    pub(crate) fn capacity(&self) -> usize {
        self.segment.capacity()
    }

    /// Slots that could be appended in place; none for a window.
    #[inline]
    pub(crate) fn remaining(&self) -> usize {
        if self.window.is_some() {
            0
        } else {
            self.segment.remaining()
        }
    }

    /// Returns `true` for a whole segment with every slot live.
    #[inline]
    pub(crate) fn is_full(&self) -> bool {
        self.window.is_none() && self.segment.is_full()
    }

    #[inline]
    pub(crate) const fn is_window(&self) -> bool {
        self.window.is_some()
    }

    /// Returns `true` if another view references the same segment.
    #[inline]
    pub(crate) fn is_shared(&self) -> bool {
        ReferenceCounter::strong_count(&self.segment) > 1
    }

    /// A view of the visible elements `[low, high)` sharing this segment.
    pub(crate) fn narrow(&self, low: usize, high: usize) -> Self {
        debug_assert!(low < high && high <= self.len());
        if low == 0 && high == self.len() {
            return self.clone();
        }
        let base = self.window.map_or(0, |(start, _)| start);
        Self {
            segment: ReferenceCounter::clone(&self.segment),
            window: Some((base + low, base + high)),
        }
    }

    /// Turns a window over a segment nothing else references into a whole
    /// segment. `shift` moves the window's range to the front of the slots.
    ///
    /// Returns `false`, leaving the view untouched, if the segment is shared.
    pub(crate) fn reclaim<F>(&mut self, shift: F) -> bool
    where
        F: FnOnce(&mut [T], Range<usize>),
    {
        let Some((start, end)) = self.window else {
            return true;
        };
        let Some(segment) = ReferenceCounter::get_mut(&mut self.segment) else {
            return false;
        };
        if start > 0 {
            shift(segment.slots_mut(), start..end);
        }
        segment.set_len(end - start);
        self.window = None;
        true
    }

    /// The underlying segment reference, for release.
    #[inline]
    pub(crate) fn into_segment(self) -> SegmentRef<T> {
        self.segment
    }
}

/// An ordered sequence of segment views plus the logical offset at which
/// each one starts.
///
/// A directory has a fixed capacity chosen by the
/// [`Environment`](crate::environment::Environment) that allocated it. The
/// owning array asks the environment for a larger directory before it would
/// exceed that capacity, so directory growth is observable through the
/// environment like segment allocation is.
///
/// # Invariants
///
/// - `starts.len() == segments.len()`
/// - `starts[0] == 0` and `starts[i + 1] == starts[i] + segments[i].len()`
pub struct Directory<T> {
    segments: Vec<SegmentView<T>>,
    starts: Vec<usize>,
}

impl<T> Directory<T> {
    /// A directory with no room; the first push requires a larger one.
    pub(crate) const fn empty() -> Self {
        Self {
            segments: Vec::new(),
            starts: Vec::new(),
        }
    }
}

impl<T: Element> Directory<T> {
    /// Allocates an empty directory with room for `capacity` segments.
    ///
    /// # Errors
    ///
    /// Returns [`CollectionError::AllocationFailed`] if the host allocator
    /// cannot reserve the space.
    pub fn try_with_capacity(capacity: usize) -> Result<Self> {
        let failed = |_| CollectionError::AllocationFailed {
            requested: capacity,
        };
        let mut segments = Vec::new();
        segments.try_reserve_exact(capacity).map_err(failed)?;
        let mut starts = Vec::new();
        starts.try_reserve_exact(capacity).map_err(failed)?;
        Ok(Self { segments, starts })
    }

    /// Number of segment references the directory can hold without growing.
    #[inline]
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.segments.capacity().min(self.starts.capacity())
    }

    /// Number of segments referenced.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    /// Returns `true` if no segment is referenced.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    #[inline]
    pub(crate) fn segments(&self) -> &[SegmentView<T>] {
        &self.segments
    }

    #[inline]
    pub(crate) fn segment(&self, position: usize) -> &SegmentView<T> {
        &self.segments[position]
    }

    #[inline]
    pub(crate) fn view_mut(&mut self, position: usize) -> &mut SegmentView<T> {
        &mut self.segments[position]
    }

    /// Mutable access to a whole segment only this directory references.
    #[inline]
    pub(crate) fn exclusive_mut(&mut self, position: usize) -> Option<&mut Segment<T>> {
        let view = &mut self.segments[position];
        if view.window.is_some() {
            return None;
        }
        ReferenceCounter::get_mut(&mut view.segment)
    }

    /// Returns `true` if the entry is a whole segment nothing else
    /// references, so it may be written in place.
    #[inline]
    pub(crate) fn is_exclusive(&self, position: usize) -> bool {
        let view = &self.segments[position];
        view.window.is_none() && !view.is_shared()
    }

    #[inline]
    pub(crate) fn start(&self, position: usize) -> usize {
        self.starts[position]
    }

    /// Finds the segment holding logical `index` and the offset inside it.
    ///
    /// `index` must be less than the total length.
    pub(crate) fn locate(&self, index: usize) -> (usize, usize) {
        let position = self.starts.partition_point(|&start| start <= index) - 1;
        (position, index - self.starts[position])
    }

    /// Finds the segment boundary or interior position for an insertion at
    /// logical `index`, where `index == total length` means after the last
    /// segment.
    ///
    /// Returns `(segments.len(), 0)` for the end position.
    pub(crate) fn locate_position(&self, index: usize, total_length: usize) -> (usize, usize) {
        if index == total_length {
            (self.segments.len(), 0)
        } else {
            self.locate(index)
        }
    }

    pub(crate) fn push(&mut self, segment: SegmentView<T>) {
        debug_assert!(self.segments.len() < self.capacity());
        let start = self
            .segments
            .last()
            .map_or(0, |last| self.starts[self.starts.len() - 1] + last.len());
        self.segments.push(segment);
        self.starts.push(start);
    }

    /// Inserts segments at `position` and recomputes the offsets after it.
    pub(crate) fn splice_in<I>(&mut self, position: usize, segments: I)
    where
        I: IntoIterator<Item = SegmentView<T>>,
    {
        let before = self.segments.len();
        self.segments.splice(position..position, segments);
        let inserted = self.segments.len() - before;
        debug_assert!(self.segments.len() <= self.capacity());
        self.starts
            .splice(position..position, std::iter::repeat_n(0, inserted));
        self.reindex(position);
    }

    /// Removes the segments in `range` and recomputes the offsets after it.
    pub(crate) fn drain(&mut self, range: Range<usize>) -> Vec<SegmentView<T>> {
        let start = range.start;
        self.starts.drain(range.clone());
        let removed = self.segments.drain(range).collect();
        self.reindex(start);
        removed
    }

    /// Moves every reference out of the directory, keeping its capacity.
    pub(crate) fn take_all(&mut self) -> Vec<SegmentView<T>> {
        self.starts.clear();
        self.segments.drain(..).collect()
    }

    /// Moves every reference into `target`, which must be empty and large
    /// enough.
    pub(crate) fn move_into(&mut self, target: &mut Self) {
        debug_assert!(target.is_empty());
        debug_assert!(target.capacity() >= self.len());
        target.segments.append(&mut self.segments);
        target.starts.append(&mut self.starts);
    }

    /// Copies every reference into `target`, which must be empty and large
    /// enough. The segments become shared.
    pub(crate) fn share_into(&self, target: &mut Self) {
        debug_assert!(target.is_empty());
        debug_assert!(target.capacity() >= self.len());
        target.segments.extend(self.segments.iter().cloned());
        target.starts.extend_from_slice(&self.starts);
    }

    /// Recomputes the start offsets of every segment from `position` on.
    pub(crate) fn reindex(&mut self, position: usize) {
        let mut start = if position == 0 {
            0
        } else {
            self.starts[position - 1] + self.segments[position - 1].len()
        };
        for index in position..self.segments.len() {
            self.starts[index] = start;
            start += self.segments[index].len();
        }
    }

    /// Total number of elements across all segments.
    pub(crate) fn total_length(&self) -> usize {
        self.segments
            .last()
            .map_or(0, |last| self.starts[self.starts.len() - 1] + last.len())
    }
}

impl<T: Element> std::fmt::Debug for Directory<T> {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("Directory")
            .field("capacity", &self.capacity())
            .field("starts", &self.starts)
            .finish_non_exhaustive()
    }
}
