/// What the merge found for one distinct value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Matched {
    /// Number of sources holding the value.
    pub count: usize,
    /// Whether the primary source (the first one) holds the value.
    pub includes_primary: bool,
    /// Total number of sources in the merge.
    pub sources: usize,
}

/// Decides which values a [`SortedMerge`](super::SortedMerge) emits.
pub trait MergePolicy {
    /// Returns `true` if the value described by `matched` is emitted.
    fn accepts(&self, matched: &Matched) -> bool;

    /// Returns `true` if no further value can be emitted.
    ///
    /// `live` sources still hold elements out of `sources`; `primary_live`
    /// tells whether the primary source is among them.
    fn is_finished(&self, _live: usize, _sources: usize, _primary_live: bool) -> bool {
        false
    }
}

/// Emits every value held by at least one source.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Union;

impl MergePolicy for Union {
    #[inline]
    fn accepts(&self, matched: &Matched) -> bool {
        matched.count > 0
    }
}

/// Emits the values held by every source.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Intersection;

impl MergePolicy for Intersection {
    #[inline]
    fn accepts(&self, matched: &Matched) -> bool {
        matched.count == matched.sources
    }

    #[inline]
    fn is_finished(&self, live: usize, sources: usize, _primary_live: bool) -> bool {
        live < sources
    }
}

/// Emits the values of the primary source that no other source holds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Difference;

impl MergePolicy for Difference {
    #[inline]
    fn accepts(&self, matched: &Matched) -> bool {
        matched.includes_primary && matched.count == 1
    }

    #[inline]
    fn is_finished(&self, _live: usize, _sources: usize, primary_live: bool) -> bool {
        !primary_live
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    const fn matched(count: usize, includes_primary: bool) -> Matched {
        Matched {
            count,
            includes_primary,
            sources: 3,
        }
    }

    #[rstest]
    #[case::single(matched(1, false), true, false, false)]
    #[case::primary_only(matched(1, true), true, false, true)]
    #[case::everyone(matched(3, true), true, true, false)]
    #[case::two_of_three(matched(2, true), true, false, false)]
    fn policies_accept(
        #[case] matched: Matched,
        #[case] union: bool,
        #[case] intersection: bool,
        #[case] difference: bool,
    ) {
        assert_eq!(Union.accepts(&matched), union);
        assert_eq!(Intersection.accepts(&matched), intersection);
        assert_eq!(Difference.accepts(&matched), difference);
    }

    #[rstest]
    fn early_termination() {
        assert!(!Union.is_finished(0, 3, false));
        assert!(Intersection.is_finished(2, 3, true));
        assert!(!Intersection.is_finished(3, 3, true));
        assert!(Difference.is_finished(2, 3, false));
        assert!(!Difference.is_finished(1, 3, true));
    }
}
