//! Fixed-width integer payloads.
//!
//! The collections in this crate store primitive integers only. Rather than
//! keeping one copy of every algorithm per integer width, they are generic
//! over [`Element`], which is implemented for the 32-bit and 64-bit signed and
//! unsigned integers.

use std::fmt::Debug;
use std::hash::Hash;

/// A fixed-width integer that can be stored in a segment.
///
/// The trait is sealed: the storage layer relies on elements being plain
/// `Copy` integers with a total order and a zero default.
pub trait Element: Copy + Ord + Hash + Default + Debug + sealed::Sealed + 'static {
    /// Width of the integer in bits.
    const BITS: u32;

    /// The additive identity, used to fill reserved slots.
    const ZERO: Self;
}

mod sealed {
    pub trait Sealed {}
}

macro_rules! impl_element {
    ($($element:ty),* $(,)?) => {
        $(
            impl sealed::Sealed for $element {}

            impl Element for $element {
                const BITS: u32 = <$element>::BITS;
                const ZERO: Self = 0;
            }
        )*
    };
}

impl_element!(i32, i64, u32, u64);
