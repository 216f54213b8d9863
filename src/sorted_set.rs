//! Sets of integers stored as strictly ascending segmented arrays.

use std::fmt;

use crate::element::Element;
use crate::environment::{Environment, HeapEnvironment};
use crate::error::Result;
use crate::merge::{MergePolicy, SortedMerge};
use crate::segmented::{Iter, SegmentedArray};

/// A set of integers kept as a strictly ascending [`SegmentedArray`].
///
/// Membership uses binary search. Set algebra streams a [`SortedMerge`] of
/// the operands into a new array, so combining sets costs O(M log N) for M
/// elements across N sets and never sorts.
///
/// Clones share segments with the original like any segmented array.
///
/// # Examples
///
/// ```rust
/// use segvec::sorted_set::SortedSegmentedSet;
///
/// let evens: SortedSegmentedSet<i64> = (0..10).step_by(2).collect();
/// let small: SortedSegmentedSet<i64> = (0..5).collect();
///
/// let union = evens.union(&small).unwrap();
/// assert_eq!(union.iter().collect::<Vec<_>>(), vec![0, 1, 2, 3, 4, 6, 8]);
///
/// let both = evens.intersection(&small).unwrap();
/// assert_eq!(both.iter().collect::<Vec<_>>(), vec![0, 2, 4]);
/// ```
pub struct SortedSegmentedSet<T: Element, E: Environment<T> = HeapEnvironment> {
    array: SegmentedArray<T, E>,
}

impl<T: Element> SortedSegmentedSet<T> {
    /// Creates an empty set backed by the host allocator.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self {
            array: SegmentedArray::new(),
        }
    }
}

impl<T: Element, E: Environment<T>> SortedSegmentedSet<T, E> {
    /// Creates an empty set that allocates through `environment`.
    #[must_use]
    pub fn with_environment(environment: E) -> Self {
        Self {
            array: SegmentedArray::with_environment(environment),
        }
    }

    /// Wraps an array that is already strictly ascending.
    ///
    /// The order is only checked in debug builds.
    ///
    /// # Panics
    ///
    /// In debug builds, panics if `array` is not strictly ascending.
    #[must_use]
    pub fn from_sorted(array: SegmentedArray<T, E>) -> Self {
        debug_assert!(
            array.iter().zip(array.iter().skip(1)).all(|(left, right)| left < right),
            "array is not strictly ascending"
        );
        Self { array }
    }

    /// Returns the number of elements.
    #[inline]
    #[must_use]
    pub const fn len(&self) -> usize {
        self.array.len()
    }

    /// Returns `true` if the set is empty.
    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.array.is_empty()
    }

    /// Returns `true` if `value` is in the set.
    #[must_use]
    pub fn contains(&self, value: T) -> bool {
        self.array.binary_search(value).is_ok()
    }

    /// Smallest element.
    #[must_use]
    pub fn min(&self) -> Option<T> {
        self.array.first()
    }

    /// Largest element.
    #[must_use]
    pub fn max(&self) -> Option<T> {
        self.array.last()
    }

    /// Adds `value`, returning `false` if it was already present.
    ///
    /// # Errors
    ///
    /// Returns `AllocationFailed` if the array cannot make room.
    pub fn insert(&mut self, value: T) -> Result<bool> {
        match self.array.binary_search(value) {
            Ok(_) => Ok(false),
            Err(index) => {
                self.array.insert(index, value)?;
                Ok(true)
            }
        }
    }

    /// Removes `value`, returning `false` if it was absent.
    ///
    /// # Errors
    ///
    /// Returns `AllocationFailed` if a shared segment cannot be copied.
    pub fn remove(&mut self, value: T) -> Result<bool> {
        match self.array.binary_search(value) {
            Ok(index) => {
                self.array.remove(index)?;
                Ok(true)
            }
            Err(_) => Ok(false),
        }
    }

    /// Iterates the elements in ascending order.
    #[inline]
    #[must_use]
    pub fn iter(&self) -> Iter<'_, T> {
        self.array.iter()
    }

    /// The backing array.
    #[inline]
    #[must_use]
    pub const fn as_array(&self) -> &SegmentedArray<T, E> {
        &self.array
    }

    /// Unwraps the backing array.
    #[must_use]
    pub fn into_array(self) -> SegmentedArray<T, E> {
        self.array
    }

    // =========================================================================
    // Set Algebra
    // =========================================================================

    /// Elements in `self` or `other`.
    ///
    /// # Errors
    ///
    /// Returns `AllocationFailed` if the result cannot be stored.
    pub fn union<F: Environment<T>>(&self, other: &SortedSegmentedSet<T, F>) -> Result<Self> {
        self.merged(SortedMerge::union([self.array.cursor(), other.array.cursor()]))
    }

    /// Elements in `self` or any of `others`.
    ///
    /// # Errors
    ///
    /// Returns `AllocationFailed` if the result cannot be stored.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use segvec::sorted_set::SortedSegmentedSet;
    ///
    /// let first: SortedSegmentedSet<u32> = [1, 2].into_iter().collect();
    /// let second: SortedSegmentedSet<u32> = [2, 3].into_iter().collect();
    /// let third: SortedSegmentedSet<u32> = [2, 3, 4].into_iter().collect();
    ///
    /// let union = first.union_all([&second, &third]).unwrap();
    /// assert_eq!(union.iter().collect::<Vec<_>>(), vec![1, 2, 3, 4]);
    /// ```
    pub fn union_all<'a, I>(&'a self, others: I) -> Result<Self>
    where
        I: IntoIterator<Item = &'a Self>,
    {
        let cursors = std::iter::once(self)
            .chain(others)
            .map(|set| set.array.cursor());
        self.merged(SortedMerge::union(cursors))
    }

    /// Elements in both `self` and `other`.
    ///
    /// # Errors
    ///
    /// Returns `AllocationFailed` if the result cannot be stored.
    pub fn intersection<F: Environment<T>>(
        &self,
        other: &SortedSegmentedSet<T, F>,
    ) -> Result<Self> {
        self.merged(SortedMerge::intersection([
            self.array.cursor(),
            other.array.cursor(),
        ]))
    }

    /// Elements in `self` but not in `other`.
    ///
    /// # Errors
    ///
    /// Returns `AllocationFailed` if the result cannot be stored.
    pub fn difference<F: Environment<T>>(&self, other: &SortedSegmentedSet<T, F>) -> Result<Self> {
        self.merged(SortedMerge::difference([
            self.array.cursor(),
            other.array.cursor(),
        ]))
    }

    fn merged<C, P>(&self, merge: SortedMerge<T, C, P>) -> Result<Self>
    where
        C: crate::merge::SortedCursor<T>,
        P: MergePolicy,
    {
        let mut array = self.array.empty_like();
        array.try_extend(merge)?;
        tracing::trace!(length = array.len(), "materialized set merge");
        Ok(Self { array })
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

impl<T: Element, E: Environment<T>> Clone for SortedSegmentedSet<T, E> {
    fn clone(&self) -> Self {
        Self {
            array: self.array.clone(),
        }
    }
}

impl<T: Element, E: Environment<T> + Default> Default for SortedSegmentedSet<T, E> {
    fn default() -> Self {
        Self::with_environment(E::default())
    }
}

impl<T: Element, E: Environment<T>, F: Environment<T>> PartialEq<SortedSegmentedSet<T, F>>
    for SortedSegmentedSet<T, E>
{
    fn eq(&self, other: &SortedSegmentedSet<T, F>) -> bool {
        self.array == other.array
    }
}

impl<T: Element, E: Environment<T>> Eq for SortedSegmentedSet<T, E> {}

impl<T: Element, E: Environment<T>> fmt::Debug for SortedSegmentedSet<T, E> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.debug_set().entries(self.iter()).finish()
    }
}

impl<T: Element + fmt::Display, E: Environment<T>> fmt::Display for SortedSegmentedSet<T, E> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "{{")?;
        let mut first = true;
        for element in self {
            if first {
                first = false;
            } else {
                write!(formatter, ", ")?;
            }
            write!(formatter, "{element}")?;
        }
        write!(formatter, "}}")
    }
}

impl<'a, T: Element, E: Environment<T>> IntoIterator for &'a SortedSegmentedSet<T, E> {
    type Item = T;
    type IntoIter = Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<T: Element, E: Environment<T> + Default> FromIterator<T> for SortedSegmentedSet<T, E> {
    /// Collects, sorts and deduplicates `iter`.
    ///
    /// # Panics
    ///
    /// Panics if the environment cannot allocate storage.
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut values: Vec<T> = iter.into_iter().collect();
        values.sort_unstable();
        values.dedup();
        let mut array = SegmentedArray::default();
        if let Err(error) = array.add_all(&values) {
            panic!("failed to build sorted set: {error}");
        }
        Self { array }
    }
}

static_assertions::assert_impl_all!(SortedSegmentedSet<u64>: Clone, Default, fmt::Debug, Eq);
