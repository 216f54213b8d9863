use super::Environment;
use crate::element::Element;
use crate::error::Result;
use crate::segmented::{Directory, Segment};

/// Environment backed directly by the host allocator.
///
/// Freed segments and directories are dropped immediately.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HeapEnvironment;

impl<T: Element> Environment<T> for HeapEnvironment {
    fn allocate(&self, size: usize) -> Result<Segment<T>> {
        Segment::try_new(size).inspect_err(|error| {
            tracing::debug!(size, %error, "segment allocation failed");
        })
    }

    #[inline]
    fn free(&self, segment: Segment<T>) {
        drop(segment);
    }

    fn allocate_segments(&self, size: usize) -> Result<Directory<T>> {
        Directory::try_with_capacity(size).inspect_err(|error| {
            tracing::debug!(size, %error, "directory allocation failed");
        })
    }

    #[inline]
    fn free_segments(&self, directory: Directory<T>) {
        debug_assert!(directory.is_empty());
        drop(directory);
    }
}
