//! Segment sizing and pooling configuration.

use crate::error::ConfigError;

/// Default number of slots per segment.
pub const DEFAULT_SEGMENT_CAPACITY: usize = 1024;

/// Default number of freed segments a [`PoolingEnvironment`] keeps around.
///
/// [`PoolingEnvironment`]: crate::environment::PoolingEnvironment
pub const DEFAULT_POOL_DEPTH: usize = 32;

/// Sizing parameters shared by a segmented array and its environment.
///
/// # Examples
///
/// ```rust
/// use segvec::config::SegmentConfig;
///
/// let config = SegmentConfig::new(64).unwrap().with_pool_depth(4);
/// assert_eq!(config.segment_capacity(), 64);
/// assert_eq!(config.pool_depth(), 4);
///
/// assert!(SegmentConfig::new(48).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(try_from = "RawSegmentConfig"))]
pub struct SegmentConfig {
    segment_capacity: usize,
    pool_depth: usize,
}

impl SegmentConfig {
    /// Creates a configuration with the given segment capacity and the
    /// default pool depth.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if `segment_capacity` is zero or not a power
    /// of two.
    pub const fn new(segment_capacity: usize) -> Result<Self, ConfigError> {
        if segment_capacity == 0 {
            return Err(ConfigError::ZeroCapacity);
        }
        if !segment_capacity.is_power_of_two() {
            return Err(ConfigError::CapacityNotPowerOfTwo(segment_capacity));
        }
        Ok(Self {
            segment_capacity,
            pool_depth: DEFAULT_POOL_DEPTH,
        })
    }

    /// Returns a copy with a different pool depth.
    #[must_use]
    pub const fn with_pool_depth(mut self, pool_depth: usize) -> Self {
        self.pool_depth = pool_depth;
        self
    }

    /// Number of slots in every segment.
    #[inline]
    pub const fn segment_capacity(&self) -> usize {
        self.segment_capacity
    }

    /// Maximum number of freed segments kept for reuse.
    #[inline]
    pub const fn pool_depth(&self) -> usize {
        self.pool_depth
    }
}

impl Default for SegmentConfig {
    fn default() -> Self {
        Self {
            segment_capacity: DEFAULT_SEGMENT_CAPACITY,
            pool_depth: DEFAULT_POOL_DEPTH,
        }
    }
}

#[cfg(feature = "serde")]
#[derive(serde::Deserialize)]
struct RawSegmentConfig {
    segment_capacity: usize,
    #[serde(default = "default_pool_depth")]
    pool_depth: usize,
}

#[cfg(feature = "serde")]
const fn default_pool_depth() -> usize {
    DEFAULT_POOL_DEPTH
}

#[cfg(feature = "serde")]
impl TryFrom<RawSegmentConfig> for SegmentConfig {
    type Error = ConfigError;

    fn try_from(raw: RawSegmentConfig) -> Result<Self, Self::Error> {
        Ok(Self::new(raw.segment_capacity)?.with_pool_depth(raw.pool_depth))
    }
}
