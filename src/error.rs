//! Error types shared by the segmented collections.
//!
//! Every fallible operation in this crate reports one of the variants of
//! [`CollectionError`] synchronously to its caller. Nothing is retried and
//! nothing is clamped: an out-of-range index is always an error, and a failed
//! allocation leaves the collection in the state it had before the call.

use thiserror::Error;

/// Errors raised by [`SegmentedArray`](crate::segmented::SegmentedArray) and
/// the environments that back it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CollectionError {
    /// A single index was outside `[0, length)` (or `[0, length]` for
    /// positional inserts).
    #[error("index {index} out of bounds for length {length}")]
    IndexOutOfBounds {
        /// The offending index.
        index: usize,
        /// The collection length at the time of the call.
        length: usize,
    },

    /// A `[from, to)` range was reversed or reached past the end.
    #[error("range {from}..{to} out of bounds for length {length}")]
    RangeOutOfBounds {
        /// Inclusive start of the range.
        from: usize,
        /// Exclusive end of the range.
        to: usize,
        /// The collection length at the time of the call.
        length: usize,
    },

    /// The environment could not provide a segment or a directory.
    #[error("failed to allocate storage for {requested} slots")]
    AllocationFailed {
        /// Number of slots that were requested.
        requested: usize,
    },
}

/// Errors raised when building a [`SegmentConfig`](crate::config::SegmentConfig).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// Segment capacity must be at least one slot.
    #[error("segment capacity must be non-zero")]
    ZeroCapacity,

    /// Segment capacity must be a power of two.
    #[error("segment capacity {0} is not a power of two")]
    CapacityNotPowerOfTwo(usize),
}

/// Result type for collection operations.
pub type Result<T> = std::result::Result<T, CollectionError>;

/// Checks that `index < length`.
#[inline]
pub(crate) const fn check_index(index: usize, length: usize) -> Result<()> {
    if index < length {
        Ok(())
    } else {
        Err(CollectionError::IndexOutOfBounds { index, length })
    }
}

/// Checks that `index <= length`, the valid positions for an insertion.
#[inline]
pub(crate) const fn check_position(index: usize, length: usize) -> Result<()> {
    if index <= length {
        Ok(())
    } else {
        Err(CollectionError::IndexOutOfBounds { index, length })
    }
}

/// Checks that `from <= to <= length`.
#[inline]
pub(crate) const fn check_range(from: usize, to: usize, length: usize) -> Result<()> {
    if from <= to && to <= length {
        Ok(())
    } else {
        Err(CollectionError::RangeOutOfBounds { from, to, length })
    }
}
