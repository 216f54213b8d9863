//! The segmented copy-on-write array.

use std::borrow::Cow;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::ops::Index;

use smallvec::SmallVec;

use super::ReferenceCounter;
use super::directory::{Directory, SegmentView};
use super::iter::Iter;
use super::segment::Segment;
use crate::config::SegmentConfig;
use crate::element::Element;
use crate::environment::{Environment, HeapEnvironment};
use crate::error::{Result, check_index, check_position, check_range};

/// Smallest directory requested from the environment.
const MIN_DIRECTORY_CAPACITY: usize = 4;

/// Freshly allocated segments waiting to be linked into the directory.
type FreshSegments<T> = SmallVec<[Segment<T>; 4]>;

/// A chunked, copy-on-write dynamic array of fixed-width integers.
///
/// Elements live in fixed-capacity [`Segment`]s referenced from a private
/// [`Directory`]. Segments are shared between clones and copied lazily on
/// the first write (divergence). All storage comes from the array's
/// [`Environment`].
///
/// # Structure
///
/// Every segment in the directory holds at least one element. Segments
/// may be partially filled anywhere in the array: inserting in the middle
/// of a full segment splits it rather than shifting every following element.
/// Positions are located by binary search over the directory's start
/// offsets.
///
/// A range clone refers to the partially covered segments at its ends
/// through read-only windows, so it copies no element. The first write to a
/// window gives the array a private segment.
///
/// # Time Complexity
///
/// | Operation        | Complexity                                  |
/// |------------------|---------------------------------------------|
/// | `get` / `set`    | O(log S), plus one segment copy if shared   |
/// | `add`            | O(1) amortized                              |
/// | `insert`         | O(S + capacity + count)                     |
/// | `remove_range`   | O(S + capacity)                             |
/// | `clone`          | O(S), no element copies                     |
/// | `iter`           | O(1) to create, O(N) to iterate             |
///
/// S is the number of segments.
///
/// # Failure Atomicity
///
/// Operations request every segment they need before they touch the
/// contents. When the environment reports
/// [`AllocationFailed`](crate::error::CollectionError::AllocationFailed),
/// the array holds the same elements as before the call.
///
/// # Examples
///
/// ```rust
/// use segvec::segmented::SegmentedArray;
///
/// let mut array = SegmentedArray::<i64>::new();
/// array.add_all(&[1, 2, 3]).unwrap();
/// array.insert(1, 10).unwrap();
/// assert_eq!(array.to_vec(), vec![1, 10, 2, 3]);
///
/// let removed = array.remove(0).unwrap();
/// assert_eq!(removed, 1);
/// assert_eq!(array.to_vec(), vec![10, 2, 3]);
/// ```
pub struct SegmentedArray<T: Element, E: Environment<T> = HeapEnvironment> {
    environment: E,
    directory: Directory<T>,
    length: usize,
    segment_capacity: usize,
}

impl<T: Element> SegmentedArray<T> {
    /// Creates an empty array backed by the host allocator with the default
    /// segment capacity.
    ///
    /// No storage is allocated until the first element is added.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::with_environment(HeapEnvironment)
    }

    /// Creates an array holding a copy of `values`.
    ///
    /// # Errors
    ///
    /// Returns `AllocationFailed` if storage cannot be allocated.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use segvec::segmented::SegmentedArray;
    ///
    /// let array = SegmentedArray::from_slice(&[3_i32, 1, 2]).unwrap();
    /// assert_eq!(array.to_vec(), vec![3, 1, 2]);
    /// ```
    pub fn from_slice(values: &[T]) -> Result<Self> {
        let mut array = Self::new();
        array.add_all(values)?;
        Ok(array)
    }
}

impl<T: Element, E: Environment<T>> SegmentedArray<T, E> {
    /// Creates an empty array that allocates through `environment` with the
    /// default segment capacity.
    #[must_use]
    pub fn with_environment(environment: E) -> Self {
        Self::with_config(SegmentConfig::default(), environment)
    }

    /// Creates an empty array with the segment capacity from `config`.
    #[must_use]
    pub fn with_config(config: SegmentConfig, environment: E) -> Self {
        Self {
            environment,
            directory: Directory::empty(),
            length: 0,
            segment_capacity: config.segment_capacity(),
        }
    }

    // =========================================================================
    // Inspection
    // =========================================================================

    /// Returns the number of elements.
    #[inline]
    #[must_use]
    pub const fn len(&self) -> usize {
        self.length
    }

    /// Returns `true` if the array holds no elements.
    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.length == 0
    }

    /// Number of slots in each segment this array allocates.
    #[inline]
    #[must_use]
    pub const fn segment_capacity(&self) -> usize {
        self.segment_capacity
    }

    /// Number of segments in the directory.
    #[inline]
    #[must_use]
    pub fn segment_count(&self) -> usize {
        self.directory.len()
    }

    /// Live lengths of the segments, front to back.
    pub fn segment_lengths(&self) -> impl Iterator<Item = usize> + '_ {
        self.directory.segments().iter().map(|segment| segment.len())
    }

    /// Number of segments currently shared with another array.
    #[must_use]
    pub fn shared_segment_count(&self) -> usize {
        self.directory
            .segments()
            .iter()
            .filter(|segment| segment.is_shared())
            .count()
    }

    /// The environment this array allocates through.
    #[inline]
    pub const fn environment(&self) -> &E {
        &self.environment
    }

    /// Returns the element at `index`.
    ///
    /// # Errors
    ///
    /// Returns `IndexOutOfBounds` if `index >= len()`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use segvec::segmented::SegmentedArray;
    ///
    /// let array = SegmentedArray::from_slice(&[5_i64, 6]).unwrap();
    /// assert_eq!(array.get(1), Ok(6));
    /// assert!(array.get(2).is_err());
    /// ```
    #[inline]
    pub fn get(&self, index: usize) -> Result<T> {
        check_index(index, self.length)?;
        let (position, offset) = self.directory.locate(index);
        Ok(self.directory.segment(position).as_slice()[offset])
    }

    /// Returns the first element, if any.
    #[inline]
    #[must_use]
    pub fn first(&self) -> Option<T> {
        self.directory
            .segments()
            .first()
            .and_then(|segment| segment.as_slice().first().copied())
    }

    /// Returns the last element, if any.
    #[inline]
    #[must_use]
    pub fn last(&self) -> Option<T> {
        self.directory
            .segments()
            .last()
            .and_then(|segment| segment.as_slice().last().copied())
    }

    /// Returns `true` if some element equals `value`.
    #[must_use]
    pub fn contains(&self, value: T) -> bool {
        self.index_of(value).is_some()
    }

    /// Returns the index of the first element equal to `value`.
    #[must_use]
    pub fn index_of(&self, value: T) -> Option<usize> {
        self.directory
            .segments()
            .iter()
            .enumerate()
            .find_map(|(position, segment)| {
                segment
                    .as_slice()
                    .iter()
                    .position(|&element| element == value)
                    .map(|offset| self.directory.start(position) + offset)
            })
    }

    /// Binary searches an ascending array for `value`.
    ///
    /// Returns `Ok(index)` of a matching element, or `Err(index)` of the
    /// position where `value` would have to be inserted to keep the order.
    /// The result is meaningless if the array is not sorted.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use segvec::segmented::SegmentedArray;
    ///
    /// let array = SegmentedArray::from_slice(&[1_i32, 3, 5]).unwrap();
    /// assert_eq!(array.binary_search(3), Ok(1));
    /// assert_eq!(array.binary_search(4), Err(2));
    /// ```
    pub fn binary_search(&self, value: T) -> std::result::Result<usize, usize> {
        let segments = self.directory.segments();
        let position = segments.partition_point(|segment| {
            segment
                .as_slice()
                .last()
                .is_some_and(|&last| last < value)
        });
        if position == segments.len() {
            return Err(self.length);
        }
        let start = self.directory.start(position);
        segments[position]
            .as_slice()
            .binary_search(&value)
            .map(|offset| start + offset)
            .map_err(|offset| start + offset)
    }

    /// Returns an iterator over the elements.
    #[inline]
    #[must_use]
    pub fn iter(&self) -> Iter<'_, T> {
        Iter::new(self.directory.segments(), 0, self.length)
    }

    /// Returns an iterator starting at `index`.
    ///
    /// # Errors
    ///
    /// Returns `IndexOutOfBounds` if `index > len()`.
    pub fn iter_from(&self, index: usize) -> Result<Iter<'_, T>> {
        check_position(index, self.length)?;
        if index == self.length {
            return Ok(Iter::new(&[], 0, 0));
        }
        let (position, offset) = self.directory.locate(index);
        Ok(Iter::new(
            &self.directory.segments()[position..],
            offset,
            self.length - index,
        ))
    }

    /// Returns a sorted-sequence cursor positioned on the first element.
    ///
    /// The cursor is only meaningful as a merge source if the array is
    /// strictly ascending.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use segvec::merge::SortedMerge;
    /// use segvec::segmented::SegmentedArray;
    ///
    /// let left = SegmentedArray::from_slice(&[1_i64, 3, 5]).unwrap();
    /// let right = SegmentedArray::from_slice(&[2_i64, 3, 4]).unwrap();
    /// let union: Vec<i64> = SortedMerge::union([left.cursor(), right.cursor()]).collect();
    /// assert_eq!(union, vec![1, 2, 3, 4, 5]);
    /// ```
    #[cfg(feature = "merge")]
    #[must_use]
    pub fn cursor(&self) -> crate::merge::IterCursor<Iter<'_, T>> {
        crate::merge::IterCursor::new(self.iter())
    }

    /// Returns the live contents of each segment, front to back.
    pub fn chunks(&self) -> impl Iterator<Item = &[T]> + '_ {
        self.directory.segments().iter().map(|segment| segment.as_slice())
    }

    /// Copies the whole array into a `Vec`.
    #[must_use]
    pub fn to_vec(&self) -> Vec<T> {
        let mut values = Vec::with_capacity(self.length);
        for chunk in self.chunks() {
            values.extend_from_slice(chunk);
        }
        values
    }

    /// Copies `[from, to)` into a `Vec`.
    ///
    /// # Errors
    ///
    /// Returns `RangeOutOfBounds` if the range is reversed or reaches past
    /// the end.
    pub fn to_vec_range(&self, from: usize, to: usize) -> Result<Vec<T>> {
        check_range(from, to, self.length)?;
        let mut values = vec![T::ZERO; to - from];
        self.copy_to_slice(from, &mut values)?;
        Ok(values)
    }

    /// Copies `destination.len()` elements starting at `from` into
    /// `destination`.
    ///
    /// # Errors
    ///
    /// Returns `RangeOutOfBounds` if the source range reaches past the end.
    pub fn copy_to_slice(&self, from: usize, destination: &mut [T]) -> Result<()> {
        let to = from.saturating_add(destination.len());
        check_range(from, to, self.length)?;
        if destination.is_empty() {
            return Ok(());
        }
        let (mut position, mut offset) = self.directory.locate(from);
        let mut written = 0;
        while written < destination.len() {
            let source = &self.directory.segment(position).as_slice()[offset..];
            let count = source.len().min(destination.len() - written);
            destination[written..written + count].copy_from_slice(&source[..count]);
            written += count;
            position += 1;
            offset = 0;
        }
        Ok(())
    }

    /// Checks the structural invariants and panics if one is broken.
    ///
    /// # Panics
    ///
    /// Panics if a segment is empty or over capacity, if a start offset is
    /// stale, or if the segment lengths do not add up to `len()`.
    pub fn verify(&self) {
        let mut expected_start = 0;
        for (position, segment) in self.directory.segments().iter().enumerate() {
            assert!(!segment.is_empty(), "segment {position} is empty");
            assert!(
                segment.len() <= segment.capacity() && segment.len() <= self.segment_capacity,
                "segment {position} exceeds its capacity"
            );
            assert_eq!(
                self.directory.start(position),
                expected_start,
                "segment {position} has a stale start offset"
            );
            expected_start += segment.len();
        }
        assert_eq!(expected_start, self.length, "segment lengths disagree with len()");
        assert_eq!(
            self.directory.total_length(),
            self.length,
            "directory total disagrees with len()"
        );
    }

    // =========================================================================
    // Element Writes
    // =========================================================================

    /// Replaces the element at `index` and returns the previous value.
    ///
    /// If the owning segment is shared with another array, that segment is
    /// copied first; the other arrays keep the original.
    ///
    /// # Errors
    ///
    /// Returns `IndexOutOfBounds` if `index >= len()`, or `AllocationFailed`
    /// if a shared segment cannot be copied.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use segvec::segmented::SegmentedArray;
    ///
    /// let mut array = SegmentedArray::from_slice(&[1_i64, 2]).unwrap();
    /// let snapshot = array.clone();
    /// assert_eq!(array.set(0, 7), Ok(1));
    /// assert_eq!(array.to_vec(), vec![7, 2]);
    /// assert_eq!(snapshot.to_vec(), vec![1, 2]);
    /// ```
    pub fn set(&mut self, index: usize, value: T) -> Result<T> {
        check_index(index, self.length)?;
        let (position, offset) = self.directory.locate(index);
        let segment = self.segment_mut(position)?;
        Ok(std::mem::replace(
            &mut segment.as_mut_slice()[offset],
            value,
        ))
    }

    /// Replaces every element in `[from, to)` with `function(element)`.
    ///
    /// Shared segments in the range are copied before the first one is
    /// modified.
    ///
    /// # Errors
    ///
    /// Returns `RangeOutOfBounds` for an invalid range, or `AllocationFailed`
    /// if a shared segment cannot be copied; no element is modified then.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use segvec::segmented::SegmentedArray;
    ///
    /// let mut array = SegmentedArray::from_slice(&[1_i32, 2, 3, 4]).unwrap();
    /// array.apply(1, 3, |value| value * 10).unwrap();
    /// assert_eq!(array.to_vec(), vec![1, 20, 30, 4]);
    /// ```
    pub fn apply<F>(&mut self, from: usize, to: usize, mut function: F) -> Result<()>
    where
        F: FnMut(T) -> T,
    {
        check_range(from, to, self.length)?;
        if from == to {
            return Ok(());
        }
        let (first, _) = self.directory.locate(from);
        let (last, _) = self.directory.locate(to - 1);
        self.make_exclusive(first, last + 1)?;
        for position in first..=last {
            let start = self.directory.start(position);
            let segment = self.exclusive(position);
            let low = from.saturating_sub(start);
            let high = (to - start).min(segment.len());
            for element in &mut segment.as_mut_slice()[low..high] {
                *element = function(*element);
            }
        }
        Ok(())
    }

    /// Swaps the elements at `left` and `right`.
    ///
    /// Together with [`get`](Self::get) this is the index-parameterized
    /// access an external sort routine needs.
    ///
    /// # Errors
    ///
    /// Returns `IndexOutOfBounds` if either index is out of range, or
    /// `AllocationFailed` if a shared segment cannot be copied.
    pub fn swap(&mut self, left: usize, right: usize) -> Result<()> {
        let left_value = self.get(left)?;
        let right_value = self.get(right)?;
        if left == right {
            return Ok(());
        }
        let (left_position, _) = self.directory.locate(left);
        let (right_position, _) = self.directory.locate(right);
        let (low, high) = if left_position <= right_position {
            (left_position, right_position)
        } else {
            (right_position, left_position)
        };
        self.make_exclusive(low, low + 1)?;
        self.make_exclusive(high, high + 1)?;
        self.set(left, right_value)?;
        self.set(right, left_value)?;
        Ok(())
    }

    // =========================================================================
    // Appending
    // =========================================================================

    /// Appends one element.
    ///
    /// A segment is allocated only when the last segment is full or shared.
    ///
    /// # Errors
    ///
    /// Returns `AllocationFailed` if a new segment is needed and cannot be
    /// allocated.
    pub fn add(&mut self, value: T) -> Result<()> {
        let count = self.directory.len();
        if count > 0 {
            self.reclaim_window(count - 1);
        }
        if count > 0
            && let Some(last) = self.directory.exclusive_mut(count - 1)
            && !last.is_full()
        {
            last.push(value);
            self.length += 1;
            return Ok(());
        }
        self.reserve_directory(1)?;
        let mut segment = self.new_segment()?;
        segment.push(value);
        self.directory.push(SegmentView::from(segment));
        self.length += 1;
        Ok(())
    }

    /// Appends every element of `values`.
    ///
    /// # Errors
    ///
    /// Returns `AllocationFailed` if storage cannot be allocated; nothing is
    /// appended then.
    pub fn add_all(&mut self, values: &[T]) -> Result<()> {
        if values.is_empty() {
            return Ok(());
        }
        let count = self.directory.len();
        if count > 0 {
            self.reclaim_window(count - 1);
        }
        let tail_room = if count > 0 && self.directory.is_exclusive(count - 1) {
            self.directory.segment(count - 1).remaining()
        } else {
            0
        };
        let needed = values
            .len()
            .saturating_sub(tail_room)
            .div_ceil(self.segment_capacity);
        self.reserve_directory(needed)?;
        let fresh = self.allocate_many(needed)?;

        let mut rest = values;
        if tail_room > 0 {
            let taken = self.exclusive(count - 1).extend_from_slice(rest);
            rest = &rest[taken..];
        }
        for mut segment in fresh {
            let taken = segment.extend_from_slice(rest);
            rest = &rest[taken..];
            self.directory.push(SegmentView::from(segment));
        }
        debug_assert!(rest.is_empty());
        self.length += values.len();
        Ok(())
    }

    /// Appends every element of `iter`, one segment's worth at a time.
    ///
    /// # Errors
    ///
    /// Returns `AllocationFailed` if storage cannot be allocated. Elements
    /// appended by earlier chunks stay in the array.
    pub fn try_extend<I: IntoIterator<Item = T>>(&mut self, iter: I) -> Result<()> {
        let mut buffer: Vec<T> = Vec::with_capacity(self.segment_capacity);
        for value in iter {
            buffer.push(value);
            if buffer.len() == self.segment_capacity {
                self.add_all(&buffer)?;
                buffer.clear();
            }
        }
        self.add_all(&buffer)
    }

    /// An empty array with the same environment and segment capacity.
    #[must_use]
    pub fn empty_like(&self) -> Self {
        Self {
            environment: self.environment.clone(),
            directory: Directory::empty(),
            length: 0,
            segment_capacity: self.segment_capacity,
        }
    }

    // =========================================================================
    // Insertion
    // =========================================================================

    /// Inserts `value` at `index`, shifting later elements back.
    ///
    /// # Errors
    ///
    /// Returns `IndexOutOfBounds` if `index > len()`, or `AllocationFailed`.
    #[inline]
    pub fn insert(&mut self, index: usize, value: T) -> Result<()> {
        self.insert_multiple(index, value, 1)
    }

    /// Inserts `count` copies of `value` at `index`.
    ///
    /// # Errors
    ///
    /// Returns `IndexOutOfBounds` if `index > len()`, or `AllocationFailed`.
    pub fn insert_multiple(&mut self, index: usize, value: T, count: usize) -> Result<()> {
        self.open_gap(index, count, value)
    }

    /// Reserves `count` slots at `index`. Their values are unspecified.
    ///
    /// At a segment boundary no existing element moves; inside a segment at
    /// most that segment's trailing elements move.
    ///
    /// # Errors
    ///
    /// Returns `IndexOutOfBounds` if `index > len()`, or `AllocationFailed`.
    pub fn expand(&mut self, index: usize, count: usize) -> Result<()> {
        self.open_gap(index, count, T::ZERO)
    }

    /// Inserts a copy of `values` at `index`.
    ///
    /// # Errors
    ///
    /// Returns `IndexOutOfBounds` if `index > len()`, or `AllocationFailed`.
    pub fn insert_slice(&mut self, index: usize, values: &[T]) -> Result<()> {
        self.open_gap(index, values.len(), T::ZERO)?;
        self.overwrite(index, values);
        Ok(())
    }

    /// Inserts every element of `source` at `index`.
    ///
    /// Full segments of `source` with the same capacity as this array's are
    /// shared rather than copied; only its partially filled segments are
    /// copied, split into as many segments of this array's capacity as they
    /// need. Inside a segment of this array, the trailing elements of that
    /// segment are split off first.
    ///
    /// # Errors
    ///
    /// Returns `IndexOutOfBounds` if `index > len()`, or `AllocationFailed`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use segvec::segmented::SegmentedArray;
    ///
    /// let mut array = SegmentedArray::from_slice(&[1_i64, 4]).unwrap();
    /// let middle = SegmentedArray::from_slice(&[2_i64, 3]).unwrap();
    /// array.insert_all(1, &middle).unwrap();
    /// assert_eq!(array.to_vec(), vec![1, 2, 3, 4]);
    /// ```
    pub fn insert_all<F>(&mut self, index: usize, source: &SegmentedArray<T, F>) -> Result<()>
    where
        F: Environment<T>,
    {
        check_position(index, self.length)?;
        if source.is_empty() {
            return Ok(());
        }
        let (mut position, offset) = self.directory.locate_position(index, self.length);
        if offset > 0 {
            self.split(position, offset)?;
            position += 1;
        }

        let capacity = self.segment_capacity;
        let shareable =
            move |segment: &SegmentView<T>| segment.is_full() && segment.capacity() == capacity;
        let (shared, copied) = source
            .directory
            .segments()
            .iter()
            .fold((0, 0), |(shared, copied), segment| {
                if shareable(segment) {
                    (shared + 1, copied)
                } else {
                    (shared, copied + segment.len().div_ceil(capacity))
                }
            });
        self.reserve_directory(shared + copied)?;
        let mut fresh = self.allocate_many(copied)?.into_iter();

        let mut spliced = Vec::with_capacity(shared + copied);
        for segment in source.directory.segments() {
            if shareable(segment) {
                spliced.push(segment.clone());
                continue;
            }
            for chunk in segment.as_slice().chunks(capacity) {
                if let Some(mut target) = fresh.next() {
                    self.environment
                        .copy(chunk, &mut target.slots_mut()[..chunk.len()]);
                    target.set_len(chunk.len());
                    spliced.push(SegmentView::from(target));
                }
            }
        }
        tracing::trace!(shared, copied, "spliced segments from another array");
        self.directory.splice_in(position, spliced);
        self.length += source.length;
        Ok(())
    }

    // =========================================================================
    // Removal
    // =========================================================================

    /// Removes and returns the element at `index`.
    ///
    /// # Errors
    ///
    /// Returns `IndexOutOfBounds` if `index >= len()`, or `AllocationFailed`
    /// if a shared segment has to be copied.
    pub fn remove(&mut self, index: usize) -> Result<T> {
        let value = self.get(index)?;
        self.remove_range(index, index + 1)?;
        Ok(value)
    }

    /// Removes and returns the last element, if any.
    ///
    /// # Errors
    ///
    /// Returns `AllocationFailed` if the last segment is shared and cannot
    /// be copied.
    pub fn pop(&mut self) -> Result<Option<T>> {
        if self.length == 0 {
            return Ok(None);
        }
        self.remove(self.length - 1).map(Some)
    }

    /// Removes the elements in `[from, to)`.
    ///
    /// Segments entirely inside the range are released without copying.
    /// A partially covered segment is compacted; if it is shared, its
    /// surviving elements are copied into a fresh segment instead.
    ///
    /// # Errors
    ///
    /// Returns `RangeOutOfBounds` for an invalid range, or `AllocationFailed`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use segvec::segmented::SegmentedArray;
    ///
    /// let mut array: SegmentedArray<i32> = (0..10).collect();
    /// array.remove_range(2, 8).unwrap();
    /// assert_eq!(array.to_vec(), vec![0, 1, 8, 9]);
    /// ```
    pub fn remove_range(&mut self, from: usize, to: usize) -> Result<()> {
        check_range(from, to, self.length)?;
        if from == to {
            return Ok(());
        }
        let (first, first_offset) = self.directory.locate(from);
        let (last, last_offset) = self.directory.locate(to - 1);
        let last_end = last_offset + 1;

        let join = if first == last {
            self.remove_within(first, first_offset, last_end)?
        } else {
            self.remove_across(first, first_offset, last, last_end)?
        };
        self.length -= to - from;
        self.coalesce(join);
        if join > 0 {
            self.coalesce(join - 1);
        }
        Ok(())
    }

    /// Shortens the array to `length` elements. Longer lengths are ignored.
    ///
    /// # Errors
    ///
    /// Returns `AllocationFailed` if a shared segment has to be copied.
    pub fn truncate(&mut self, length: usize) -> Result<()> {
        if length >= self.length {
            return Ok(());
        }
        self.remove_range(length, self.length)
    }

    /// Removes every element, releasing every segment.
    pub fn clear(&mut self) {
        let segments = self.directory.take_all();
        self.release_all(segments);
        self.length = 0;
    }

    // =========================================================================
    // Cloning
    // =========================================================================

    /// Returns a clone that shares every segment with this array.
    ///
    /// Only the directory is allocated; no element is copied.
    ///
    /// # Errors
    ///
    /// Returns `AllocationFailed` if the directory cannot be allocated.
    pub fn try_clone(&self) -> Result<Self> {
        let mut directory = self.allocate_directory(self.directory.len())?;
        self.directory.share_into(&mut directory);
        Ok(Self {
            environment: self.environment.clone(),
            directory,
            length: self.length,
            segment_capacity: self.segment_capacity,
        })
    }

    /// Returns a new array holding `[from, to)`.
    ///
    /// Every segment the range touches is shared: the partially covered
    /// ones at either end through read-only windows. Only the directory is
    /// allocated; no element is copied until one side writes.
    ///
    /// # Errors
    ///
    /// Returns `RangeOutOfBounds` for an invalid range, or `AllocationFailed`
    /// if the directory cannot be allocated.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use segvec::segmented::SegmentedArray;
    ///
    /// let array: SegmentedArray<i64> = (0..3000).collect();
    /// let mut range = array.clone_range(1000, 2500).unwrap();
    /// assert_eq!(range.shared_segment_count(), 3);
    ///
    /// range.set(0, -1).unwrap();
    /// assert_eq!(array.get(1000), Ok(1000));
    /// ```
    pub fn clone_range(&self, from: usize, to: usize) -> Result<Self> {
        check_range(from, to, self.length)?;
        if from == 0 && to == self.length {
            return self.try_clone();
        }
        let mut clone = self.empty_like();
        if from == to {
            return Ok(clone);
        }
        let (first, first_offset) = self.directory.locate(from);
        let (last, last_offset) = self.directory.locate(to - 1);
        let last_end = last_offset + 1;
        let covered = |position: usize| {
            let low = if position == first { first_offset } else { 0 };
            let high = if position == last {
                last_end
            } else {
                self.directory.segment(position).len()
            };
            (low, high)
        };

        clone.reserve_directory(last - first + 1)?;
        for position in first..=last {
            let (low, high) = covered(position);
            clone
                .directory
                .push(self.directory.segment(position).narrow(low, high));
        }
        clone.length = to - from;
        tracing::trace!(from, to, segments = last - first + 1, "cloned range");
        Ok(clone)
    }

    /// Returns `[from, to)` as an array.
    ///
    /// The full range borrows this very array; any other range is a new
    /// array sharing the covered segments (see
    /// [`clone_range`](Self::clone_range)).
    ///
    /// # Errors
    ///
    /// Returns `RangeOutOfBounds` for an invalid range, or `AllocationFailed`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use std::borrow::Cow;
    /// use segvec::segmented::SegmentedArray;
    ///
    /// let array: SegmentedArray<i64> = (0..100).collect();
    /// let whole = array.sub_list(0, array.len()).unwrap();
    /// assert!(matches!(whole, Cow::Borrowed(borrowed) if std::ptr::eq(borrowed, &array)));
    ///
    /// let part = array.sub_list(10, 20).unwrap();
    /// assert_eq!(part.to_vec(), (10..20).collect::<Vec<_>>());
    /// ```
    pub fn sub_list(&self, from: usize, to: usize) -> Result<Cow<'_, Self>> {
        check_range(from, to, self.length)?;
        if from == 0 && to == self.length {
            Ok(Cow::Borrowed(self))
        } else {
            self.clone_range(from, to).map(Cow::Owned)
        }
    }

    // =========================================================================
    // Internal Helpers
    // =========================================================================

    /// A fresh segment limited to this array's capacity, whatever buffer
    /// the environment hands out.
    fn new_segment(&self) -> Result<Segment<T>> {
        let mut segment = self.environment.allocate(self.segment_capacity)?;
        segment.limit_to(self.segment_capacity);
        Ok(segment)
    }

    /// Allocates `count` segments, or none of them.
    fn allocate_many(&self, count: usize) -> Result<FreshSegments<T>> {
        let mut fresh = FreshSegments::with_capacity(count);
        for _ in 0..count {
            match self.new_segment() {
                Ok(segment) => fresh.push(segment),
                Err(error) => {
                    for segment in fresh {
                        self.environment.free(segment);
                    }
                    return Err(error);
                }
            }
        }
        Ok(fresh)
    }

    fn allocate_directory(&self, segments: usize) -> Result<Directory<T>> {
        if segments == 0 {
            return Ok(Directory::empty());
        }
        self.environment
            .allocate_segments(segments.max(MIN_DIRECTORY_CAPACITY))
    }

    /// Makes room for `additional` more segment references.
    fn reserve_directory(&mut self, additional: usize) -> Result<()> {
        let needed = self.directory.len() + additional;
        if needed <= self.directory.capacity() {
            return Ok(());
        }
        let capacity = needed.max(self.directory.capacity() * 2);
        let mut grown = self.allocate_directory(capacity)?;
        self.directory.move_into(&mut grown);
        let previous = std::mem::replace(&mut self.directory, grown);
        tracing::trace!(
            from = previous.capacity(),
            to = self.directory.capacity(),
            "grew segment directory"
        );
        self.free_directory(previous);
        Ok(())
    }

    fn free_directory(&self, directory: Directory<T>) {
        if directory.capacity() > 0 {
            self.environment.free_segments(directory);
        }
    }

    /// Drops one reference, returning the segment to the environment if it
    /// was the last.
    fn release(&self, segment: SegmentView<T>) {
        if let Ok(segment) = ReferenceCounter::try_unwrap(segment.into_segment()) {
            self.environment.free(segment);
        }
    }

    fn release_all(&self, segments: Vec<SegmentView<T>>) {
        for segment in segments {
            self.release(segment);
        }
    }

    /// Mutable access to a segment already known to be exclusive.
    fn exclusive(&mut self, position: usize) -> &mut Segment<T> {
        self.directory
            .exclusive_mut(position)
            .expect("segment must be exclusive before it is written")
    }

    /// Mutable access to a segment, copying it first if it is shared.
    fn segment_mut(&mut self, position: usize) -> Result<&mut Segment<T>> {
        self.make_exclusive(position, position + 1)?;
        Ok(self.exclusive(position))
    }

    /// Turns a window at `position` into a whole segment in place when no
    /// other array references the segment behind it.
    fn reclaim_window(&mut self, position: usize) {
        let environment = &self.environment;
        let view = self.directory.view_mut(position);
        if view.is_window()
            && view.reclaim(|slots, range| environment.copy_within(slots, range, 0))
        {
            tracing::trace!(position, "reclaimed segment window");
        }
    }

    /// Gives this array a private copy of every shared segment in
    /// `[first, end)`. All copies are allocated before any is linked in.
    fn make_exclusive(&mut self, first: usize, end: usize) -> Result<()> {
        for position in first..end {
            self.reclaim_window(position);
        }
        let shared: SmallVec<[usize; 4]> = (first..end)
            .filter(|&position| !self.directory.is_exclusive(position))
            .collect();
        if shared.is_empty() {
            return Ok(());
        }
        let fresh = self.allocate_many(shared.len())?;
        for (position, mut copy) in shared.into_iter().zip(fresh) {
            let source = self.directory.segment(position);
            let length = source.len();
            self.environment
                .copy(source.as_slice(), &mut copy.slots_mut()[..length]);
            copy.set_len(length);
            let previous = std::mem::replace(
                self.directory.view_mut(position),
                SegmentView::from(copy),
            );
            self.release(previous);
            tracing::trace!(position, length, "diverged shared segment");
        }
        Ok(())
    }

    /// Splits the segment at `position` so that its elements from `offset`
    /// on start a new segment right after it.
    ///
    /// An exclusive segment keeps its head and copies its tail out; a shared
    /// one is replaced by two private copies.
    fn split(&mut self, position: usize, offset: usize) -> Result<()> {
        self.reclaim_window(position);
        let length = self.directory.segment(position).len();
        debug_assert!(offset > 0 && offset < length);
        self.reserve_directory(1)?;
        let exclusive = self.directory.is_exclusive(position);
        let mut fresh = self.allocate_many(if exclusive { 1 } else { 2 })?;

        let mut tail = fresh.remove(0);
        let source = self.directory.segment(position).as_slice();
        self.environment
            .copy(&source[offset..], &mut tail.slots_mut()[..length - offset]);
        tail.set_len(length - offset);

        if let Some(mut head) = fresh.pop() {
            self.environment
                .copy(&source[..offset], &mut head.slots_mut()[..offset]);
            head.set_len(offset);
            let previous = std::mem::replace(
                self.directory.view_mut(position),
                SegmentView::from(head),
            );
            self.release(previous);
        } else {
            self.exclusive(position).set_len(offset);
        }
        self.directory
            .splice_in(position + 1, [SegmentView::from(tail)]);
        tracing::trace!(position, offset, exclusive, "split segment");
        Ok(())
    }

    /// Opens `count` slots filled with `value` at logical `index`.
    fn open_gap(&mut self, index: usize, count: usize, value: T) -> Result<()> {
        check_position(index, self.length)?;
        if count == 0 {
            return Ok(());
        }
        let (position, offset) = self.directory.locate_position(index, self.length);
        if offset == 0 {
            return self.open_gap_at_boundary(position, count, value);
        }
        self.reclaim_window(position);

        let segment = self.directory.segment(position);
        let length = segment.len();
        if self.directory.is_exclusive(position) && length + count <= segment.capacity() {
            let environment = &self.environment;
            let segment = self
                .directory
                .exclusive_mut(position)
                .expect("exclusivity checked above");
            segment.set_len(length + count);
            environment.copy_within(segment.slots_mut(), offset..length, offset + count);
            segment.slots_mut()[offset..offset + count].fill(value);
            self.directory.reindex(position + 1);
            self.length += count;
            return Ok(());
        }

        self.split(position, offset)?;
        self.open_gap_at_boundary(position + 1, count, value)
    }

    /// Opens `count` slots filled with `value` in front of the segment at
    /// `position` (or after the last segment). No existing element moves:
    /// the gap fills the spare room of the preceding exclusive segment,
    /// then fresh segments.
    fn open_gap_at_boundary(&mut self, position: usize, count: usize, value: T) -> Result<()> {
        if position > 0 {
            self.reclaim_window(position - 1);
        }
        let room = if position > 0 && self.directory.is_exclusive(position - 1) {
            self.directory.segment(position - 1).remaining()
        } else {
            0
        };
        let in_previous = room.min(count);
        let mut rest = count - in_previous;
        let needed = rest.div_ceil(self.segment_capacity);
        self.reserve_directory(needed)?;
        let fresh = self.allocate_many(needed)?;

        if in_previous > 0 {
            self.exclusive(position - 1).extend_filled(value, in_previous);
        }
        let capacity = self.segment_capacity;
        let segments = fresh.into_iter().map(|mut segment| {
            let filled = rest.min(capacity);
            segment.extend_filled(value, filled);
            rest -= filled;
            SegmentView::from(segment)
        });
        self.directory.splice_in(position, segments);
        self.length += count;
        Ok(())
    }

    /// Writes `values` starting at `index` into slots that are exclusive,
    /// such as a freshly opened gap.
    fn overwrite(&mut self, index: usize, values: &[T]) {
        if values.is_empty() {
            return;
        }
        let (mut position, mut offset) = self.directory.locate(index);
        let mut rest = values;
        while !rest.is_empty() {
            let segment = self.exclusive(position);
            let count = rest.len().min(segment.len() - offset);
            segment.as_mut_slice()[offset..offset + count].copy_from_slice(&rest[..count]);
            rest = &rest[count..];
            position += 1;
            offset = 0;
        }
    }

    /// Removes `[low, high)` inside the segment at `position`. Returns the
    /// position after which neighbours may be coalesced.
    fn remove_within(&mut self, position: usize, low: usize, high: usize) -> Result<usize> {
        self.reclaim_window(position);
        let length = self.directory.segment(position).len();
        if low == 0 && high == length {
            let removed = self.directory.drain(position..position + 1);
            self.release_all(removed);
            return Ok(position);
        }
        if self.directory.is_exclusive(position) {
            let environment = &self.environment;
            let segment = self
                .directory
                .exclusive_mut(position)
                .expect("exclusivity checked above");
            if high < length {
                environment.copy_within(segment.slots_mut(), high..length, low);
            }
            segment.set_len(length - (high - low));
        } else {
            let mut compacted = self.new_segment()?;
            let source = self.directory.segment(position).as_slice();
            let slots = compacted.slots_mut();
            self.environment.copy(&source[..low], &mut slots[..low]);
            if high < length {
                self.environment
                    .copy(&source[high..], &mut slots[low..low + length - high]);
            }
            compacted.set_len(length - (high - low));
            let previous = std::mem::replace(
                self.directory.view_mut(position),
                SegmentView::from(compacted),
            );
            self.release(previous);
        }
        self.directory.reindex(position + 1);
        Ok(position + 1)
    }

    /// Removes from `first_offset` in segment `first` up to `last_end` in
    /// segment `last`, where `first < last`. Returns the join position.
    fn remove_across(
        &mut self,
        first: usize,
        first_offset: usize,
        last: usize,
        last_end: usize,
    ) -> Result<usize> {
        self.reclaim_window(first);
        self.reclaim_window(last);
        let last_length = self.directory.segment(last).len();
        let keep_first = first_offset > 0;
        let keep_last = last_end < last_length;
        let first_shared = keep_first && !self.directory.is_exclusive(first);
        let last_shared = keep_last && !self.directory.is_exclusive(last);
        let mut fresh = self.allocate_many(usize::from(first_shared) + usize::from(last_shared))?;

        if keep_first {
            if first_shared && let Some(mut head) = fresh.pop() {
                let source = self.directory.segment(first).as_slice();
                self.environment
                    .copy(&source[..first_offset], &mut head.slots_mut()[..first_offset]);
                head.set_len(first_offset);
                let previous = std::mem::replace(
                    self.directory.view_mut(first),
                    SegmentView::from(head),
                );
                self.release(previous);
            } else {
                self.exclusive(first).set_len(first_offset);
            }
        }
        if keep_last {
            let survivors = last_length - last_end;
            if last_shared && let Some(mut tail) = fresh.pop() {
                let source = self.directory.segment(last).as_slice();
                self.environment
                    .copy(&source[last_end..], &mut tail.slots_mut()[..survivors]);
                tail.set_len(survivors);
                let previous = std::mem::replace(
                    self.directory.view_mut(last),
                    SegmentView::from(tail),
                );
                self.release(previous);
            } else {
                let environment = &self.environment;
                let segment = self
                    .directory
                    .exclusive_mut(last)
                    .expect("exclusivity checked above");
                environment.copy_within(segment.slots_mut(), last_end..last_length, 0);
                segment.set_len(survivors);
            }
        }

        let drain_start = if keep_first { first + 1 } else { first };
        let drain_end = if keep_last { last } else { last + 1 };
        let removed = self.directory.drain(drain_start..drain_end);
        tracing::trace!(released = removed.len(), "dropped covered segments");
        self.release_all(removed);
        Ok(drain_start)
    }

    /// Appends the segment at `position` into its predecessor when it has
    /// shrunk to a quarter of the capacity and the predecessor is exclusive
    /// with enough room.
    fn coalesce(&mut self, position: usize) {
        if position == 0 || position >= self.directory.len() {
            return;
        }
        let length = self.directory.segment(position).len();
        if length > self.segment_capacity / 4
            || !self.directory.is_exclusive(position - 1)
            || self.directory.segment(position - 1).remaining() < length
        {
            return;
        }
        let removed = self.directory.drain(position..position + 1);
        for segment in &removed {
            let environment = &self.environment;
            let predecessor = self
                .directory
                .exclusive_mut(position - 1)
                .expect("exclusivity checked above");
            let start = predecessor.len();
            predecessor.set_len(start + length);
            environment.copy(
                segment.as_slice(),
                &mut predecessor.slots_mut()[start..start + length],
            );
        }
        self.directory.reindex(position);
        tracing::trace!(position, length, "coalesced small segment");
        self.release_all(removed);
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

impl<T: Element, E: Environment<T>> Drop for SegmentedArray<T, E> {
    fn drop(&mut self) {
        let segments = self.directory.take_all();
        self.release_all(segments);
        let directory = std::mem::replace(&mut self.directory, Directory::empty());
        self.free_directory(directory);
    }
}

impl<T: Element, E: Environment<T>> Clone for SegmentedArray<T, E> {
    /// Shares every segment with the clone.
    ///
    /// # Panics
    ///
    /// Panics if the environment cannot allocate the clone's directory; use
    /// [`try_clone`](SegmentedArray::try_clone) to handle that case.
    fn clone(&self) -> Self {
        match self.try_clone() {
            Ok(clone) => clone,
            Err(error) => panic!("failed to clone segmented array: {error}"),
        }
    }
}

impl<T: Element, E: Environment<T> + Default> Default for SegmentedArray<T, E> {
    fn default() -> Self {
        Self::with_environment(E::default())
    }
}

impl<T: Element, E: Environment<T>> Index<usize> for SegmentedArray<T, E> {
    type Output = T;

    fn index(&self, index: usize) -> &Self::Output {
        assert!(
            index < self.length,
            "index {index} out of bounds for length {}",
            self.length
        );
        let (position, offset) = self.directory.locate(index);
        &self.directory.segment(position).as_slice()[offset]
    }
}

impl<T: Element, E: Environment<T>, F: Environment<T>> PartialEq<SegmentedArray<T, F>>
    for SegmentedArray<T, E>
{
    fn eq(&self, other: &SegmentedArray<T, F>) -> bool {
        self.length == other.length && self.iter().eq(other.iter())
    }
}

impl<T: Element, E: Environment<T>> Eq for SegmentedArray<T, E> {}

impl<T: Element, E: Environment<T>> Hash for SegmentedArray<T, E> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.length.hash(state);
        for element in self {
            element.hash(state);
        }
    }
}

impl<T: Element, E: Environment<T>> fmt::Debug for SegmentedArray<T, E> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.debug_list().entries(self.iter()).finish()
    }
}

impl<T: Element + fmt::Display, E: Environment<T>> fmt::Display for SegmentedArray<T, E> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "[")?;
        let mut first = true;
        for element in self {
            if first {
                first = false;
            } else {
                write!(formatter, ", ")?;
            }
            write!(formatter, "{element}")?;
        }
        write!(formatter, "]")
    }
}

impl<'a, T: Element, E: Environment<T>> IntoIterator for &'a SegmentedArray<T, E> {
    type Item = T;
    type IntoIter = Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<T: Element, E: Environment<T>> Extend<T> for SegmentedArray<T, E> {
    /// Appends every element of `iter`.
    ///
    /// # Panics
    ///
    /// Panics if the environment cannot allocate storage; use
    /// [`try_extend`](SegmentedArray::try_extend) to handle that case.
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        if let Err(error) = self.try_extend(iter) {
            panic!("failed to extend segmented array: {error}");
        }
    }
}

impl<T: Element, E: Environment<T> + Default> FromIterator<T> for SegmentedArray<T, E> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut array = Self::default();
        array.extend(iter);
        array
    }
}

// =============================================================================
// Serde Support
// =============================================================================

#[cfg(feature = "serde")]
impl<T, E> serde::Serialize for SegmentedArray<T, E>
where
    T: Element + serde::Serialize,
    E: Environment<T>,
{
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        use serde::ser::SerializeSeq;
        let mut seq = serializer.serialize_seq(Some(self.len()))?;
        for element in self {
            seq.serialize_element(&element)?;
        }
        seq.end()
    }
}

#[cfg(feature = "serde")]
struct SegmentedArrayVisitor<T, E> {
    marker: std::marker::PhantomData<(T, E)>,
}

#[cfg(feature = "serde")]
impl<'de, T, E> serde::de::Visitor<'de> for SegmentedArrayVisitor<T, E>
where
    T: Element + serde::Deserialize<'de>,
    E: Environment<T> + Default,
{
    type Value = SegmentedArray<T, E>;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("a sequence of integers")
    }

    fn visit_seq<A>(self, mut seq: A) -> std::result::Result<Self::Value, A::Error>
    where
        A: serde::de::SeqAccess<'de>,
    {
        use serde::de::Error;
        let mut array = SegmentedArray::default();
        while let Some(element) = seq.next_element()? {
            array.add(element).map_err(A::Error::custom)?;
        }
        Ok(array)
    }
}

#[cfg(feature = "serde")]
impl<'de, T, E> serde::Deserialize<'de> for SegmentedArray<T, E>
where
    T: Element + serde::Deserialize<'de>,
    E: Environment<T> + Default,
{
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        deserializer.deserialize_seq(SegmentedArrayVisitor {
            marker: std::marker::PhantomData,
        })
    }
}

static_assertions::assert_impl_all!(SegmentedArray<i64>: Clone, Default, fmt::Debug, Eq, Hash);

#[cfg(feature = "arc")]
static_assertions::assert_impl_all!(SegmentedArray<i64>: Send, Sync);

// =============================================================================
// Tests
// =============================================================================
