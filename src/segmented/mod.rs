//! Chunked copy-on-write integer arrays.
//!
//! This module provides [`SegmentedArray`], a dynamic array stored as a
//! directory of fixed-capacity [`Segment`]s:
//!
//! - Cloning copies the directory's reference list only; the segments are
//!   shared between the clones until one of them writes.
//! - The first write to a shared segment copies that one segment
//!   (divergence). Other arrays keep seeing the original.
//! - Inserting or removing in the middle moves at most one segment's worth
//!   of elements, never the rest of the array.
//!
//! # Examples
//!
//! ```rust
//! use segvec::segmented::SegmentedArray;
//!
//! let mut array: SegmentedArray<i64> = (0..10_000).collect();
//! let snapshot = array.clone();
//!
//! array.insert(5_000, -1).unwrap();
//! array.set(0, 42).unwrap();
//!
//! assert_eq!(array.len(), 10_001);
//! assert_eq!(array.get(5_000), Ok(-1));
//! assert_eq!(snapshot.get(0), Ok(0));       // Original unchanged
//! assert_eq!(snapshot.len(), 10_000);
//! ```

// =============================================================================
// Reference Counter Type Alias
// =============================================================================

/// Reference-counted pointer used to share segments.
///
/// When the `arc` feature is enabled, this is `std::sync::Arc`, which lets
/// clones of an array be read from several threads.
///
/// When the `arc` feature is disabled (default), this is `std::rc::Rc`.
#[cfg(feature = "arc")]
pub(crate) type ReferenceCounter<T> = std::sync::Arc<T>;

#[cfg(not(feature = "arc"))]
pub(crate) type ReferenceCounter<T> = std::rc::Rc<T>;

mod array;
mod directory;
mod iter;
mod segment;

pub use array::SegmentedArray;
pub use directory::Directory;
pub use iter::Iter;
pub use segment::Segment;

// =============================================================================
// Tests
// =============================================================================
