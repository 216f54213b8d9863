use std::cell::Cell;
use std::ops::Range;
use std::rc::Rc;

use super::{Environment, HeapEnvironment};
use crate::element::Element;
use crate::error::{CollectionError, Result};
use crate::segmented::{Directory, Segment};

/// Snapshot of the calls observed by a [`CountingEnvironment`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EnvironmentCounters {
    /// Successful segment allocations.
    pub allocate_count: usize,
    /// Segments released.
    pub free_count: usize,
    /// Successful directory allocations.
    pub directory_allocate_count: usize,
    /// Directories released.
    pub directory_free_count: usize,
    /// Calls to `copy` and `copy_within`.
    pub copy_count: usize,
    /// Elements moved by `copy` and `copy_within`.
    pub copied: usize,
}

#[derive(Debug, Default)]
struct Counters {
    allocate_count: Cell<usize>,
    free_count: Cell<usize>,
    directory_allocate_count: Cell<usize>,
    directory_free_count: Cell<usize>,
    copy_count: Cell<usize>,
    copied: Cell<usize>,
    allocation_limit: Cell<Option<usize>>,
}

fn bump(counter: &Cell<usize>, amount: usize) {
    counter.set(counter.get() + amount);
}

/// Decorator that records every call made to the wrapped environment.
///
/// The counters are the primary way to check how many segments an
/// operation allocated and how many elements it moved. Clones share the
/// counters, so a test can keep one handle while the array owns another.
///
/// An optional allocation limit makes segment allocation fail once the given
/// number of further allocations has succeeded.
#[derive(Debug, Clone)]
pub struct CountingEnvironment<E = HeapEnvironment> {
    inner: E,
    counters: Rc<Counters>,
}

impl CountingEnvironment<HeapEnvironment> {
    /// Counts calls made to a [`HeapEnvironment`].
    #[must_use]
    pub fn new() -> Self {
        Self::wrap(HeapEnvironment)
    }
}

impl Default for CountingEnvironment<HeapEnvironment> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> CountingEnvironment<E> {
    /// Counts calls made to `inner`.
    #[must_use]
    pub fn wrap(inner: E) -> Self {
        Self {
            inner,
            counters: Rc::new(Counters::default()),
        }
    }

    /// Lets only `remaining` more segment allocations succeed.
    #[must_use]
    pub fn with_allocation_limit(self, remaining: usize) -> Self {
        self.counters.allocation_limit.set(Some(remaining));
        self
    }

    /// Replaces the allocation limit; `None` removes it.
    pub fn set_allocation_limit(&self, remaining: Option<usize>) {
        self.counters.allocation_limit.set(remaining);
    }

    /// Current counter values.
    #[must_use]
    pub fn counters(&self) -> EnvironmentCounters {
        let counters = &self.counters;
        EnvironmentCounters {
            allocate_count: counters.allocate_count.get(),
            free_count: counters.free_count.get(),
            directory_allocate_count: counters.directory_allocate_count.get(),
            directory_free_count: counters.directory_free_count.get(),
            copy_count: counters.copy_count.get(),
            copied: counters.copied.get(),
        }
    }

    /// Sets every counter back to zero. The allocation limit is kept.
    pub fn reset(&self) {
        let counters = &self.counters;
        counters.allocate_count.set(0);
        counters.free_count.set(0);
        counters.directory_allocate_count.set(0);
        counters.directory_free_count.set(0);
        counters.copy_count.set(0);
        counters.copied.set(0);
    }

    /// The wrapped environment.
    pub const fn inner(&self) -> &E {
        &self.inner
    }
}

impl<T: Element, E: Environment<T>> Environment<T> for CountingEnvironment<E> {
    fn allocate(&self, size: usize) -> Result<Segment<T>> {
        let limit = &self.counters.allocation_limit;
        match limit.get() {
            Some(0) => {
                tracing::debug!(size, "allocation limit reached");
                return Err(CollectionError::AllocationFailed { requested: size });
            }
            Some(remaining) => limit.set(Some(remaining - 1)),
            None => {}
        }
        let segment = self.inner.allocate(size)?;
        bump(&self.counters.allocate_count, 1);
        Ok(segment)
    }

    fn free(&self, segment: Segment<T>) {
        bump(&self.counters.free_count, 1);
        self.inner.free(segment);
    }

    fn allocate_segments(&self, size: usize) -> Result<Directory<T>> {
        let directory = self.inner.allocate_segments(size)?;
        bump(&self.counters.directory_allocate_count, 1);
        Ok(directory)
    }

    fn free_segments(&self, directory: Directory<T>) {
        bump(&self.counters.directory_free_count, 1);
        self.inner.free_segments(directory);
    }

    fn copy(&self, source: &[T], destination: &mut [T]) {
        bump(&self.counters.copy_count, 1);
        bump(&self.counters.copied, source.len());
        self.inner.copy(source, destination);
    }

    fn copy_within(&self, buffer: &mut [T], source: Range<usize>, destination: usize) {
        bump(&self.counters.copy_count, 1);
        bump(&self.counters.copied, source.len());
        self.inner.copy_within(buffer, source, destination);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn counts_allocations_and_frees() {
        let environment = CountingEnvironment::new();
        let segment: Segment<i64> = environment.allocate(4).unwrap();
        environment.free(segment);
        let directory: Directory<i64> = environment.allocate_segments(2).unwrap();
        environment.free_segments(directory);

        let counters = environment.counters();
        assert_eq!(counters.allocate_count, 1);
        assert_eq!(counters.free_count, 1);
        assert_eq!(counters.directory_allocate_count, 1);
        assert_eq!(counters.directory_free_count, 1);
    }

    #[rstest]
    fn counts_copied_elements() {
        let environment = CountingEnvironment::new();
        let mut destination = [0_i32; 4];
        environment.copy(&[1, 2, 3], &mut destination[..3]);
        environment.copy_within(&mut destination, 0..2, 2);

        assert_eq!(destination, [1, 2, 1, 2]);
        let counters = environment.counters();
        assert_eq!(counters.copy_count, 2);
        assert_eq!(counters.copied, 5);
    }

    #[rstest]
    fn allocation_limit_fails_after_budget() {
        let environment = CountingEnvironment::new().with_allocation_limit(1);
        let first: Result<Segment<i64>> = environment.allocate(4);
        assert!(first.is_ok());
        let second: Result<Segment<i64>> = environment.allocate(4);
        assert_eq!(
            second.err(),
            Some(CollectionError::AllocationFailed { requested: 4 })
        );
        assert_eq!(environment.counters().allocate_count, 1);

        environment.set_allocation_limit(None);
        let third: Result<Segment<i64>> = environment.allocate(4);
        assert!(third.is_ok());
    }

    #[rstest]
    fn clones_share_counters_and_reset_clears_them() {
        let environment = CountingEnvironment::new();
        let clone = environment.clone();
        let _segment: Segment<u32> = clone.allocate(2).unwrap();
        assert_eq!(environment.counters().allocate_count, 1);

        environment.reset();
        assert_eq!(clone.counters(), EnvironmentCounters::default());
    }
}
