use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use super::Environment;
use crate::config::SegmentConfig;
use crate::element::Element;
use crate::error::Result;
use crate::segmented::{Directory, Segment};

/// Environment that keeps freed segments for reuse.
///
/// Only segments whose buffer holds exactly the configured segment capacity
/// are pooled, and at most [`SegmentConfig::pool_depth`] of them. Anything else
/// is returned to the host allocator. Directories are never pooled.
///
/// Clones share one pool. The pool is single-threaded state; the
/// environment is neither `Send` nor `Sync`.
///
/// # Examples
///
/// ```rust
/// use segvec::config::SegmentConfig;
/// use segvec::environment::PoolingEnvironment;
/// use segvec::segmented::SegmentedArray;
///
/// let config = SegmentConfig::new(4).unwrap().with_pool_depth(2);
/// let environment = PoolingEnvironment::new(config);
///
/// let mut array = SegmentedArray::<i64, _>::with_config(config, environment.clone());
/// array.add_all(&[1, 2, 3, 4, 5, 6, 7, 8, 9]).unwrap();
/// drop(array);
///
/// // Three segments were released, two fit in the pool.
/// assert_eq!(environment.pooled(), 2);
/// ```
pub struct PoolingEnvironment<T> {
    config: SegmentConfig,
    pool: Rc<RefCell<Vec<Segment<T>>>>,
}

impl<T: Element> PoolingEnvironment<T> {
    /// Creates an empty pool for segments of `config.segment_capacity()`.
    #[must_use]
    pub fn new(config: SegmentConfig) -> Self {
        Self {
            config,
            pool: Rc::new(RefCell::new(Vec::with_capacity(config.pool_depth()))),
        }
    }

    /// Number of segments waiting in the pool.
    #[must_use]
    pub fn pooled(&self) -> usize {
        self.pool.borrow().len()
    }

    /// Drops every pooled segment.
    pub fn drain(&self) {
        self.pool.borrow_mut().clear();
    }

    /// The configuration the pool was built with.
    #[must_use]
    pub const fn config(&self) -> SegmentConfig {
        self.config
    }

    fn recycles(&self, capacity: usize) -> bool {
        capacity == self.config.segment_capacity()
    }
}

impl<T: Element> Default for PoolingEnvironment<T> {
    fn default() -> Self {
        Self::new(SegmentConfig::default())
    }
}

impl<T> Clone for PoolingEnvironment<T> {
    fn clone(&self) -> Self {
        Self {
            config: self.config,
            pool: Rc::clone(&self.pool),
        }
    }
}

impl<T: Element> Environment<T> for PoolingEnvironment<T> {
    fn allocate(&self, size: usize) -> Result<Segment<T>> {
        if size <= self.config.segment_capacity()
            && let Some(segment) = self.pool.borrow_mut().pop()
        {
            tracing::trace!(size, "reusing pooled segment");
            return Ok(segment);
        }
        let capacity = if size <= self.config.segment_capacity() {
            self.config.segment_capacity()
        } else {
            size
        };
        Segment::try_new(capacity).inspect_err(|error| {
            tracing::debug!(size, %error, "segment allocation failed");
        })
    }

    fn free(&self, mut segment: Segment<T>) {
        if !self.recycles(segment.buffer_capacity()) {
            return;
        }
        let mut pool = self.pool.borrow_mut();
        if pool.len() < self.config.pool_depth() {
            segment.clear();
            pool.push(segment);
            tracing::trace!(pooled = pool.len(), "segment returned to pool");
        }
    }

    fn allocate_segments(&self, size: usize) -> Result<Directory<T>> {
        Directory::try_with_capacity(size)
    }

    fn free_segments(&self, directory: Directory<T>) {
        debug_assert!(directory.is_empty());
        drop(directory);
    }
}

impl<T: Element> fmt::Debug for PoolingEnvironment<T> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("PoolingEnvironment")
            .field("config", &self.config)
            .field("pooled", &self.pooled())
            .finish()
    }
}

static_assertions::assert_not_impl_any!(PoolingEnvironment<i64>: Send, Sync);
