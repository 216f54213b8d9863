//! Pluggable segment allocation.
//!
//! A [`SegmentedArray`](crate::segmented::SegmentedArray) never allocates
//! segment or directory storage on its own; it asks its [`Environment`].
//! This makes allocation policy and element movement observable and
//! replaceable:
//!
//! - [`HeapEnvironment`]: allocates straight from the host allocator
//! - [`PoolingEnvironment`]: recycles freed segments through a bounded pool
//! - [`CountingEnvironment`]: wraps another environment and counts every
//!   allocation, release and copied element
//!
//! # Examples
//!
//! ```rust
//! use segvec::environment::CountingEnvironment;
//! use segvec::segmented::SegmentedArray;
//!
//! let environment = CountingEnvironment::new();
//! let mut array: SegmentedArray<i64, _> = SegmentedArray::with_environment(environment.clone());
//! array.add_all(&[1, 2, 3]).unwrap();
//!
//! let copy = array.clone();
//! array.set(0, 10).unwrap();
//!
//! // The shared segment was copied exactly once.
//! assert_eq!(environment.counters().copied, 3);
//! assert_eq!(copy.get(0), Ok(1));
//! ```

mod counting;
mod heap;
mod pooling;

pub use counting::CountingEnvironment;
pub use counting::EnvironmentCounters;
pub use heap::HeapEnvironment;
pub use pooling::PoolingEnvironment;

use std::ops::Range;

use crate::element::Element;
use crate::error::Result;
use crate::segmented::{Directory, Segment};

/// Provider of segment storage and bulk element movement.
///
/// Environments are cheap handles: cloning one must yield a handle to the
/// same underlying state (pool, counters), because every clone of an array
/// clones its environment.
///
/// # Contract
///
/// - [`allocate`](Environment::allocate) returns an empty segment with
///   capacity of at least `size`. Failure is reported as
///   [`CollectionError::AllocationFailed`](crate::error::CollectionError) and
///   aborts the calling operation.
/// - [`free`](Environment::free) receives segments no array references any
///   more. It may keep them for reuse.
/// - [`allocate_segments`](Environment::allocate_segments) and
///   [`free_segments`](Environment::free_segments) manage directories, which
///   are a separate allocation unit from segments.
/// - [`copy`](Environment::copy) and [`copy_within`](Environment::copy_within)
///   move elements that already live in a segment. Writing fresh values never
///   goes through them.
pub trait Environment<T: Element>: Clone {
    /// Returns an empty segment with room for at least `size` elements.
    ///
    /// # Errors
    ///
    /// Returns `AllocationFailed` if no storage can be provided.
    fn allocate(&self, size: usize) -> Result<Segment<T>>;

    /// Releases a segment that is no longer referenced.
    fn free(&self, segment: Segment<T>);

    /// Returns an empty directory with room for at least `size` segment
    /// references.
    ///
    /// # Errors
    ///
    /// Returns `AllocationFailed` if no storage can be provided.
    fn allocate_segments(&self, size: usize) -> Result<Directory<T>>;

    /// Releases a directory. It holds no segment references any more.
    fn free_segments(&self, directory: Directory<T>);

    /// Copies `source` into `destination`. Both have the same length.
    #[inline]
    fn copy(&self, source: &[T], destination: &mut [T]) {
        destination.copy_from_slice(source);
    }

    /// Moves `buffer[source]` to start at `destination` inside the same
    /// buffer. The ranges may overlap.
    #[inline]
    fn copy_within(&self, buffer: &mut [T], source: Range<usize>, destination: usize) {
        buffer.copy_within(source, destination);
    }
}
