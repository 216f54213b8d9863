#![cfg(feature = "sorted-set")]
//! Unit tests for SortedSegmentedSet, instantiated for every element width.

use rstest::rstest;
use segvec::sorted_set::SortedSegmentedSet;

macro_rules! sorted_set_tests {
    ($($element:ident),* $(,)?) => {
        $(
            paste::paste! {
                mod [<sorted_set_ $element>] {
                    use super::*;

                    fn set(values: &[$element]) -> SortedSegmentedSet<$element> {
                        values.iter().copied().collect()
                    }

                    #[rstest]
                    fn test_insert_and_contains() {
                        let mut set = SortedSegmentedSet::<$element>::new();
                        for value in [5, 1, 9, 1, 3] {
                            set.insert(value).unwrap();
                        }
                        assert_eq!(set.iter().collect::<Vec<_>>(), vec![1, 3, 5, 9]);
                        assert!(set.contains(9));
                        assert!(!set.contains(2));
                    }

                    #[rstest]
                    fn test_union() {
                        let union = set(&[1, 3, 5]).union(&set(&[2, 3, 4])).unwrap();
                        assert_eq!(union.iter().collect::<Vec<_>>(), vec![1, 2, 3, 4, 5]);
                    }

                    #[rstest]
                    fn test_union_all() {
                        let first = set(&[1, 2]);
                        let union = first.union_all([&set(&[2, 3]), &set(&[2, 3, 4])]).unwrap();
                        assert_eq!(union.iter().collect::<Vec<_>>(), vec![1, 2, 3, 4]);
                    }

                    #[rstest]
                    fn test_intersection_and_difference() {
                        let left = set(&[1, 2, 3, 4]);
                        let right = set(&[3, 4, 5]);
                        assert_eq!(left.intersection(&right).unwrap(), set(&[3, 4]));
                        assert_eq!(left.difference(&right).unwrap(), set(&[1, 2]));
                        assert_eq!(right.difference(&left).unwrap(), set(&[5]));
                    }

                    #[rstest]
                    fn test_remove() {
                        let mut set = set(&[1, 2, 3]);
                        assert_eq!(set.remove(2), Ok(true));
                        assert_eq!(set.remove(7), Ok(false));
                        assert_eq!(set.len(), 2);
                    }
                }
            }
        )*
    };
}

sorted_set_tests!(i32, i64, u32, u64);

#[rstest]
fn test_large_sets_span_many_segments() {
    let evens: SortedSegmentedSet<i64> = (0..100_000).step_by(2).collect();
    let threes: SortedSegmentedSet<i64> = (0..100_000).step_by(3).collect();

    let both = evens.intersection(&threes).unwrap();
    assert_eq!(both.len(), (0..100_000).step_by(6).count());
    assert!(both.iter().all(|value| value % 6 == 0));
    both.as_array().verify();

    let either = evens.union(&threes).unwrap();
    assert_eq!(either.len(), evens.len() + threes.len() - both.len());
}

#[rstest]
fn test_sets_share_segments_with_clones() {
    let set: SortedSegmentedSet<u64> = (0..5000).collect();
    let mut clone = set.clone();
    clone.insert(10_000).unwrap();

    assert_eq!(set.len(), 5000);
    assert_eq!(clone.len(), 5001);
    assert!(!set.contains(10_000));
    assert_eq!(set.as_array().shared_segment_count(), 5);
}

#[rstest]
fn test_into_array_keeps_order() {
    let set: SortedSegmentedSet<i32> = [3, -1, 2].into_iter().collect();
    assert_eq!(set.into_array().to_vec(), vec![-1, 2, 3]);
}
