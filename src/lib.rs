//! # segvec
//!
//! Chunked copy-on-write arrays of fixed-width integers, plus an N-way
//! sorted merge engine.
//!
//! ## Overview
//!
//! - **Segmented arrays**: [`SegmentedArray`](segmented::SegmentedArray)
//!   stores its elements in fixed-capacity segments. Clones share segments
//!   and a write copies only the one segment it touches. Inserting or
//!   removing in the middle moves at most one segment's worth of elements.
//! - **Environments**: every segment and directory comes from an
//!   [`Environment`](environment::Environment). The crate ships a plain
//!   heap environment, a pooling environment and a counting decorator.
//! - **Sorted merge**: [`SortedMerge`](merge::SortedMerge) merges any number
//!   of strictly ascending sources through a min-heap, computing unions,
//!   intersections or differences.
//! - **Sorted sets**: [`SortedSegmentedSet`](sorted_set::SortedSegmentedSet)
//!   keeps a segmented array strictly ascending and uses the merge engine
//!   for set algebra.
//!
//! ## Feature Flags
//!
//! - `merge`: Sorted merge engine (default)
//! - `sorted-set`: Sorted sets over segmented arrays (default, requires `merge`)
//! - `serde`: Serialization of arrays and configuration
//! - `arc`: Share segments through `Arc` instead of `Rc`
//! - `full`: Enable all features except `arc`
//!
//! ## Example
//!
//! ```rust
//! use segvec::prelude::*;
//!
//! let mut array: SegmentedArray<i64> = (0..5).collect();
//! let snapshot = array.clone();
//! array.insert(2, 100).unwrap();
//!
//! assert_eq!(array.to_vec(), vec![0, 1, 100, 2, 3, 4]);
//! assert_eq!(snapshot.to_vec(), vec![0, 1, 2, 3, 4]);
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

/// Prelude module for convenient imports.
///
/// Re-exports commonly used types and traits.
///
/// # Usage
///
/// ```rust
/// use segvec::prelude::*;
/// ```
pub mod prelude {
    pub use crate::config::SegmentConfig;
    pub use crate::element::Element;
    pub use crate::environment::{
        CountingEnvironment, Environment, HeapEnvironment, PoolingEnvironment,
    };
    pub use crate::error::{CollectionError, ConfigError};
    pub use crate::segmented::SegmentedArray;

    #[cfg(feature = "merge")]
    pub use crate::merge::{
        Difference, Intersection, IterCursor, MergePolicy, SortedCursor, SortedMerge, Union,
    };

    #[cfg(feature = "sorted-set")]
    pub use crate::sorted_set::SortedSegmentedSet;
}

pub mod config;
pub mod element;
pub mod environment;
pub mod error;
pub mod segmented;

#[cfg(feature = "merge")]
pub mod merge;

#[cfg(feature = "sorted-set")]
pub mod sorted_set;
