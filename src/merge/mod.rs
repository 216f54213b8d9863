//! N-way merging of strictly ascending sequences.
//!
//! [`SortedMerge`] walks any number of [`SortedCursor`]s in lockstep through
//! a binary min-heap of cursor indices and emits each distinct value once.
//! A [`MergePolicy`] decides which values are emitted:
//!
//! - [`Union`]: values held by at least one source
//! - [`Intersection`]: values held by every source
//! - [`Difference`]: values held by the first source only
//!
//! Merging N sources with M elements in total costs O(M log N).
//!
//! # Examples
//!
//! ```rust
//! use segvec::merge::{difference_sorted, intersection_sorted, union_sorted};
//!
//! let union: Vec<i32> = union_sorted([vec![1, 3, 5], vec![2, 3, 4]]).collect();
//! assert_eq!(union, vec![1, 2, 3, 4, 5]);
//!
//! let common: Vec<i32> = intersection_sorted([vec![1, 2, 3], vec![2, 3, 4]]).collect();
//! assert_eq!(common, vec![2, 3]);
//!
//! let only_first: Vec<i32> = difference_sorted([vec![1, 2, 3], vec![2]]).collect();
//! assert_eq!(only_first, vec![1, 3]);
//! ```

mod cursor;
mod heap;
mod policy;

pub use cursor::{IterCursor, SortedCursor};
pub use policy::{Difference, Intersection, Matched, MergePolicy, Union};

use std::iter::FusedIterator;
use std::marker::PhantomData;

use heap::CursorHeap;

/// Iterator over the merge of several strictly ascending cursors.
///
/// Every source must be strictly ascending. This is not checked in release
/// builds; debug builds panic when a cursor steps to a value that is not
/// larger than the previous one.
pub struct SortedMerge<T, C, P = Union> {
    cursors: Vec<C>,
    heap: CursorHeap,
    policy: P,
    primary_live: bool,
    marker: PhantomData<T>,
}

impl<T, C, P> SortedMerge<T, C, P>
where
    T: Ord + Copy,
    C: SortedCursor<T>,
    P: MergePolicy,
{
    /// Merges `cursors` under `policy`. The first cursor is the primary
    /// source.
    pub fn new<I>(cursors: I, policy: P) -> Self
    where
        I: IntoIterator<Item = C>,
    {
        let cursors: Vec<C> = cursors.into_iter().collect();
        let heap = CursorHeap::build(&cursors);
        let primary_live = cursors
            .first()
            .is_some_and(|cursor| cursor.current().is_some());
        Self {
            cursors,
            heap,
            policy,
            primary_live,
            marker: PhantomData,
        }
    }

    /// Number of sources in the merge, exhausted ones included.
    #[must_use]
    pub fn source_count(&self) -> usize {
        self.cursors.len()
    }

    /// Advances every cursor holding `value` and returns what was found.
    fn consume(&mut self, value: T) -> Matched {
        let mut matched = Matched {
            count: 0,
            includes_primary: false,
            sources: self.cursors.len(),
        };
        while let Some(root) = self.heap.peek()
            && self.cursors[root].current() == Some(value)
        {
            matched.count += 1;
            matched.includes_primary |= root == 0;
            let cursor = &mut self.cursors[root];
            cursor.advance();
            match cursor.current() {
                Some(next) => {
                    debug_assert!(next > value, "merge source is not strictly ascending");
                    self.heap.sift_down_root(&self.cursors);
                }
                None => {
                    if root == 0 {
                        self.primary_live = false;
                    }
                    self.heap.pop_root(&self.cursors);
                }
            }
        }
        matched
    }
}

impl<T, C> SortedMerge<T, C, Union>
where
    T: Ord + Copy,
    C: SortedCursor<T>,
{
    /// Merges `cursors` into their union.
    pub fn union<I: IntoIterator<Item = C>>(cursors: I) -> Self {
        Self::new(cursors, Union)
    }
}

impl<T, C> SortedMerge<T, C, Intersection>
where
    T: Ord + Copy,
    C: SortedCursor<T>,
{
    /// Merges `cursors` into their intersection.
    pub fn intersection<I: IntoIterator<Item = C>>(cursors: I) -> Self {
        Self::new(cursors, Intersection)
    }
}

impl<T, C> SortedMerge<T, C, Difference>
where
    T: Ord + Copy,
    C: SortedCursor<T>,
{
    /// Emits the values of the first cursor absent from all others.
    pub fn difference<I: IntoIterator<Item = C>>(cursors: I) -> Self {
        Self::new(cursors, Difference)
    }
}

impl<T, C, P> Iterator for SortedMerge<T, C, P>
where
    T: Ord + Copy,
    C: SortedCursor<T>,
    P: MergePolicy,
{
    type Item = T;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self
                .policy
                .is_finished(self.heap.len(), self.cursors.len(), self.primary_live)
            {
                return None;
            }
            let root = self.heap.peek()?;
            let value = self.cursors[root].current()?;
            let matched = self.consume(value);
            if self.policy.accepts(&matched) {
                return Some(value);
            }
        }
    }
}

impl<T, C, P> FusedIterator for SortedMerge<T, C, P>
where
    T: Ord + Copy,
    C: SortedCursor<T>,
    P: MergePolicy,
{
}

impl<T, C, P: std::fmt::Debug> std::fmt::Debug for SortedMerge<T, C, P> {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("SortedMerge")
            .field("sources", &self.cursors.len())
            .field("live", &self.heap.len())
            .field("policy", &self.policy)
            .finish()
    }
}

// =============================================================================
// Iterator Conveniences
// =============================================================================

/// Cursor type produced from an iterable source.
pub type SourceCursor<S> = IterCursor<<S as IntoIterator>::IntoIter>;

fn cursors_of<S: IntoIterator>(
    sources: impl IntoIterator<Item = S>,
) -> impl Iterator<Item = SourceCursor<S>> {
    sources.into_iter().map(IterCursor::new)
}

/// Union of strictly ascending iterables.
pub fn union_sorted<T, S>(
    sources: impl IntoIterator<Item = S>,
) -> SortedMerge<T, SourceCursor<S>, Union>
where
    T: Ord + Copy,
    S: IntoIterator<Item = T>,
{
    SortedMerge::union(cursors_of(sources))
}

/// Intersection of strictly ascending iterables.
pub fn intersection_sorted<T, S>(
    sources: impl IntoIterator<Item = S>,
) -> SortedMerge<T, SourceCursor<S>, Intersection>
where
    T: Ord + Copy,
    S: IntoIterator<Item = T>,
{
    SortedMerge::intersection(cursors_of(sources))
}

/// Values of the first strictly ascending iterable absent from the others.
pub fn difference_sorted<T, S>(
    sources: impl IntoIterator<Item = S>,
) -> SortedMerge<T, SourceCursor<S>, Difference>
where
    T: Ord + Copy,
    S: IntoIterator<Item = T>,
{
    SortedMerge::difference(cursors_of(sources))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::interleaved(vec![vec![1, 3, 5], vec![2, 3, 4]], vec![1, 2, 3, 4, 5])]
    #[case::one_empty(vec![vec![], vec![7]], vec![7])]
    #[case::three_way(vec![vec![1, 2], vec![2, 3], vec![2, 3, 4]], vec![1, 2, 3, 4])]
    #[case::no_sources(vec![], vec![])]
    fn union_cases(#[case] sources: Vec<Vec<i64>>, #[case] expected: Vec<i64>) {
        assert_eq!(union_sorted(sources).collect::<Vec<_>>(), expected);
    }

    #[rstest]
    #[case::overlap(vec![vec![1, 2, 3, 4], vec![2, 4, 6], vec![0, 2, 4]], vec![2, 4])]
    #[case::disjoint(vec![vec![1, 3], vec![2, 4]], vec![])]
    #[case::one_empty(vec![vec![1, 2], vec![]], vec![])]
    fn intersection_cases(#[case] sources: Vec<Vec<i64>>, #[case] expected: Vec<i64>) {
        assert_eq!(intersection_sorted(sources).collect::<Vec<_>>(), expected);
    }

    #[rstest]
    #[case::removes_shared(vec![vec![1, 2, 3, 4, 5], vec![2, 4], vec![5, 9]], vec![1, 3])]
    #[case::empty_primary(vec![vec![], vec![1]], vec![])]
    #[case::nothing_removed(vec![vec![1, 2], vec![]], vec![1, 2])]
    fn difference_cases(#[case] sources: Vec<Vec<i64>>, #[case] expected: Vec<i64>) {
        assert_eq!(difference_sorted(sources).collect::<Vec<_>>(), expected);
    }

    #[rstest]
    fn intersection_stops_when_a_source_runs_dry() {
        let mut merge = intersection_sorted([vec![1_u32, 2, 3], vec![1]]);
        assert_eq!(merge.next(), Some(1));
        assert_eq!(merge.next(), None);
        assert_eq!(merge.next(), None);
    }

    #[rstest]
    #[should_panic(expected = "merge source is not strictly ascending")]
    #[cfg(debug_assertions)]
    fn unsorted_source_is_caught_in_debug_builds() {
        let _: Vec<i32> = union_sorted([vec![3, 1]]).collect();
    }
}
