//! Fixed-capacity leaf buffers.

use std::fmt;

use crate::element::Element;
use crate::error::{CollectionError, Result};

/// A fixed-capacity contiguous buffer with a logical length.
///
/// A segment is created by an [`Environment`](crate::environment::Environment)
/// and may be referenced by several arrays at once. Only an array holding the
/// sole reference may mutate it.
///
/// Slots past the logical length keep whatever value they held last; they
/// are never observable through the public API.
///
/// An array may limit a segment to fewer slots than its buffer holds, for
/// example when a pooling environment hands out a larger recycled buffer.
/// [`capacity`](Self::capacity) reports that limit.
pub struct Segment<T> {
    slots: Box<[T]>,
    length: usize,
    limit: usize,
}

impl<T: Element> Segment<T> {
    /// Allocates a zero-filled segment with exactly `capacity` slots.
    ///
    /// # Errors
    ///
    /// Returns [`CollectionError::AllocationFailed`] if the host allocator
    /// cannot provide the buffer.
    pub fn try_new(capacity: usize) -> Result<Self> {
        let mut slots = Vec::new();
        slots
            .try_reserve_exact(capacity)
            .map_err(|_| CollectionError::AllocationFailed {
                requested: capacity,
            })?;
        slots.resize(capacity, T::ZERO);
        Ok(Self {
            slots: slots.into_boxed_slice(),
            length: 0,
            limit: capacity,
        })
    }

    /// Number of usable slots.
    #[inline]
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.limit
    }

    /// Number of slots in the underlying buffer, regardless of any limit.
    #[inline]
    #[must_use]
    pub fn buffer_capacity(&self) -> usize {
        self.slots.len()
    }

    /// Number of live elements.
    #[inline]
    #[must_use]
    pub const fn len(&self) -> usize {
        self.length
    }

    /// Returns `true` if the segment holds no live elements.
    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.length == 0
    }

    /// Returns `true` if every slot is live.
    #[inline]
    #[must_use]
    pub const fn is_full(&self) -> bool {
        self.length == self.limit
    }

    /// Number of slots still available after the live elements.
    #[inline]
    #[must_use]
    pub const fn remaining(&self) -> usize {
        self.limit - self.length
    }

    /// The live elements.
    #[inline]
    #[must_use]
    pub fn as_slice(&self) -> &[T] {
        &self.slots[..self.length]
    }

    /// Forgets every live element and any limit so the buffer can be reused.
    #[inline]
    pub fn clear(&mut self) {
        self.length = 0;
        self.limit = self.slots.len();
    }

    /// Restricts the usable slots to `capacity`, or to the buffer if that is
    /// smaller. The live elements must fit.
    #[inline]
    pub(crate) fn limit_to(&mut self, capacity: usize) {
        debug_assert!(self.length <= capacity);
        self.limit = capacity.min(self.slots.len());
    }

    /// The live elements, mutably.
    #[inline]
    pub(crate) fn as_mut_slice(&mut self) -> &mut [T] {
        &mut self.slots[..self.length]
    }

    /// Every usable slot, live or not.
    #[inline]
    pub(crate) fn slots_mut(&mut self) -> &mut [T] {
        &mut self.slots[..self.limit]
    }

    /// Sets the live length.
    ///
    /// Slots that become live keep their previous contents; callers fill them.
    #[inline]
    pub(crate) fn set_len(&mut self, length: usize) {
        debug_assert!(length <= self.limit);
        self.length = length;
    }

    /// Appends one element. The segment must not be full.
    #[inline]
    pub(crate) fn push(&mut self, value: T) {
        debug_assert!(!self.is_full());
        self.slots[self.length] = value;
        self.length += 1;
    }

    /// Makes `count` more slots live, filling them with `value`.
    #[inline]
    pub(crate) fn extend_filled(&mut self, value: T, count: usize) {
        let end = self.length + count;
        self.slots[self.length..end].fill(value);
        self.length = end;
    }

    /// Appends as many of `values` as fit and returns how many were taken.
    #[inline]
    pub(crate) fn extend_from_slice(&mut self, values: &[T]) -> usize {
        let taken = values.len().min(self.remaining());
        let end = self.length + taken;
        self.slots[self.length..end].copy_from_slice(&values[..taken]);
        self.length = end;
        taken
    }
}

impl<T: Element> fmt::Debug for Segment<T> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("Segment")
            .field("capacity", &self.capacity())
            .field("elements", &self.as_slice())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn try_new_creates_empty_segment() {
        let segment: Segment<i64> = Segment::try_new(8).unwrap();
        assert_eq!(segment.capacity(), 8);
        assert!(segment.is_empty());
        assert_eq!(segment.remaining(), 8);
    }

    #[rstest]
    fn push_and_extend_track_length() {
        let mut segment: Segment<i32> = Segment::try_new(4).unwrap();
        segment.push(1);
        segment.extend_filled(7, 2);
        assert_eq!(segment.as_slice(), &[1, 7, 7]);
        assert!(!segment.is_full());

        let taken = segment.extend_from_slice(&[9, 10, 11]);
        assert_eq!(taken, 1);
        assert!(segment.is_full());
        assert_eq!(segment.as_slice(), &[1, 7, 7, 9]);
    }

    #[rstest]
    fn clear_keeps_capacity() {
        let mut segment: Segment<u64> = Segment::try_new(2).unwrap();
        segment.push(5);
        segment.clear();
        assert!(segment.is_empty());
        assert_eq!(segment.capacity(), 2);
    }

    #[rstest]
    fn limit_caps_usable_slots() {
        let mut segment: Segment<i64> = Segment::try_new(16).unwrap();
        segment.limit_to(4);
        let taken = segment.extend_from_slice(&[1, 2, 3, 4, 5, 6]);

        assert_eq!(taken, 4);
        assert!(segment.is_full());
        assert_eq!(segment.capacity(), 4);
        assert_eq!(segment.buffer_capacity(), 16);
        assert_eq!(segment.slots_mut().len(), 4);

        segment.clear();
        assert_eq!(segment.capacity(), 16);
    }

    #[rstest]
    fn try_new_reports_impossible_allocations() {
        let result: Result<Segment<i64>> = Segment::try_new(usize::MAX);
        assert_eq!(
            result.err(),
            Some(CollectionError::AllocationFailed {
                requested: usize::MAX
            })
        );
    }
}
