//! Unit tests for SegmentedArray.
//!
//! Costs are observed through CountingEnvironment: `allocate_count` is the
//! number of segments requested and `copied` the number of elements that
//! already lived in a segment and had to move.

use std::borrow::Cow;

use rstest::{fixture, rstest};
use segvec::config::{DEFAULT_SEGMENT_CAPACITY, SegmentConfig};
use segvec::environment::{CountingEnvironment, PoolingEnvironment};
use segvec::error::CollectionError;
use segvec::segmented::SegmentedArray;

type CountedArray = SegmentedArray<i64, CountingEnvironment>;

fn counted(length: i64) -> CountedArray {
    let mut array = SegmentedArray::with_environment(CountingEnvironment::new());
    let values: Vec<i64> = (0..length).collect();
    array.add_all(&values).unwrap();
    array.environment().reset();
    array
}

#[fixture]
fn hundred_thousand() -> CountedArray {
    counted(100_000)
}

// =============================================================================
// Construction and access
// =============================================================================

#[rstest]
fn test_new_array_is_empty() {
    let array: SegmentedArray<i32> = SegmentedArray::new();
    assert!(array.is_empty());
    assert_eq!(array.len(), 0);
    assert_eq!(array.segment_count(), 0);
    assert_eq!(array.segment_capacity(), DEFAULT_SEGMENT_CAPACITY);
    assert_eq!(array.first(), None);
    assert_eq!(array.get(0), Err(CollectionError::IndexOutOfBounds { index: 0, length: 0 }));
}

#[rstest]
fn test_collect_fills_segments_densely() {
    let array: SegmentedArray<u32> = (0..2500).collect();
    assert_eq!(array.segment_lengths().collect::<Vec<_>>(), vec![1024, 1024, 452]);
    assert_eq!(array.first(), Some(0));
    assert_eq!(array.last(), Some(2499));
    assert_eq!(array[1024], 1024);
    array.verify();
}

#[rstest]
fn test_iter_runs_from_both_ends() {
    let array: SegmentedArray<i64> = (0..2100).collect();
    let reversed: Vec<i64> = array.iter().rev().collect();
    assert_eq!(reversed, (0..2100).rev().collect::<Vec<_>>());

    let mut iter = array.iter_from(1020).unwrap();
    assert_eq!(iter.next(), Some(1020));
    assert_eq!(iter.next_back(), Some(2099));
    assert_eq!(iter.len(), 1078);
    let middle: Vec<i64> = iter.by_ref().take(5).collect();
    assert_eq!(middle, vec![1021, 1022, 1023, 1024, 1025]);
    assert_eq!(iter.rev().next(), Some(2098));
}

#[rstest]
fn test_iter_from_crosses_segments() {
    let array: SegmentedArray<i64> = (0..3000).collect();
    let tail: Vec<i64> = array.iter_from(2040).unwrap().take(10).collect();
    assert_eq!(tail, (2040..2050).collect::<Vec<_>>());
    assert_eq!(array.iter_from(3000).unwrap().count(), 0);
    assert!(array.iter_from(3001).is_err());
}

#[rstest]
fn test_to_vec_range_and_copy_to_slice() {
    let array: SegmentedArray<i32> = (0..2048).collect();
    assert_eq!(array.to_vec_range(1020, 1030).unwrap(), (1020..1030).collect::<Vec<_>>());

    let mut destination = [0_i32; 4];
    array.copy_to_slice(2044, &mut destination).unwrap();
    assert_eq!(destination, [2044, 2045, 2046, 2047]);
    assert_eq!(
        array.copy_to_slice(2045, &mut destination),
        Err(CollectionError::RangeOutOfBounds { from: 2045, to: 2049, length: 2048 })
    );
}

#[rstest]
fn test_search_helpers() {
    let array: SegmentedArray<i64> = (0..5000).map(|value| value * 2).collect();
    assert!(array.contains(4000));
    assert!(!array.contains(4001));
    assert_eq!(array.index_of(2048), Some(1024));
    assert_eq!(array.binary_search(2048), Ok(1024));
    assert_eq!(array.binary_search(2049), Err(1025));
    assert_eq!(array.binary_search(-1), Err(0));
    assert_eq!(array.binary_search(20_000), Err(5000));
}

// =============================================================================
// Copy-on-write
// =============================================================================

#[rstest]
fn test_clone_shares_every_segment() {
    let array = counted(3000);
    let clone = array.clone();

    assert_eq!(clone, array);
    assert_eq!(array.shared_segment_count(), 3);
    let counters = array.environment().counters();
    assert_eq!(counters.allocate_count, 0);
    assert_eq!(counters.copied, 0);
}

#[rstest]
fn test_first_write_diverges_one_segment() {
    let original = counted(3000);
    let mut clone = original.clone();

    assert_eq!(clone.set(1500, -1), Ok(1500));

    let counters = original.environment().counters();
    assert_eq!(counters.allocate_count, 1);
    assert_eq!(counters.copied, 1024);
    assert_eq!(original.get(1500), Ok(1500));
    assert_eq!(clone.get(1500), Ok(-1));
    assert_eq!(clone.shared_segment_count(), 2);

    original.environment().reset();
    clone.set(1501, -2).unwrap();
    assert_eq!(original.environment().counters().allocate_count, 0);
}

#[rstest]
fn test_clone_of_clone_equals_clone() {
    let array: SegmentedArray<i64> = (0..1500).collect();
    let once = array.clone();
    let twice = array.clone().clone();
    assert_eq!(twice, once);
}

#[rstest]
fn test_apply_diverges_only_touched_segments() {
    let original = counted(4096);
    let mut clone = original.clone();

    clone.apply(1100, 1200, |value| -value).unwrap();

    let counters = original.environment().counters();
    assert_eq!(counters.allocate_count, 1);
    assert_eq!(clone.get(1150), Ok(-1150));
    assert_eq!(clone.get(1200), Ok(1200));
    assert_eq!(original.get(1150), Ok(1150));
}

#[rstest]
fn test_sub_list_of_full_range_is_the_same_instance() {
    let array: SegmentedArray<i64> = (0..5000).collect();
    let whole = array.sub_list(0, array.len()).unwrap();
    assert!(matches!(whole, Cow::Borrowed(borrowed) if std::ptr::eq(borrowed, &array)));
}

#[rstest]
fn test_sub_list_shares_every_touched_segment() {
    let array = counted(5000);
    let part = array.sub_list(1000, 4100).unwrap();

    assert_eq!(part.to_vec(), (1000..4100).collect::<Vec<_>>());
    assert_eq!(part.segment_lengths().collect::<Vec<_>>(), vec![24, 1024, 1024, 1024, 4]);
    assert_eq!(part.shared_segment_count(), 5);
    let counters = array.environment().counters();
    assert_eq!(counters.allocate_count, 0);
    assert_eq!(counters.copied, 0);
    part.verify();
}

#[rstest]
fn test_writes_through_range_clone_diverge_lazily() {
    let array = counted(5000);
    let mut part = array.clone_range(1000, 4100).unwrap();

    part.set(part.len() - 1, -1).unwrap();
    part.add(-2).unwrap();
    part.remove(0).unwrap();

    let counters = array.environment().counters();
    assert_eq!(counters.allocate_count, 2);
    assert_eq!(counters.copied, 4 + 23);
    assert_eq!(part.get(0), Ok(1001));
    assert_eq!(part.last(), Some(-2));
    assert_eq!(array.to_vec(), (0..5000).collect::<Vec<_>>());
    part.verify();
    array.verify();
}

// =============================================================================
// Insertion cost model
// =============================================================================

#[rstest]
fn test_insert_copies_only_the_tail_of_its_segment(mut hundred_thousand: CountedArray) {
    hundred_thousand.insert(6000, -1).unwrap();

    let counters = hundred_thousand.environment().counters();
    assert_eq!(counters.allocate_count, 1);
    assert_eq!(counters.copied, 6 * 1024 - 6000);
    assert_eq!(hundred_thousand.len(), 100_001);
    assert_eq!(hundred_thousand.get(5999), Ok(5999));
    assert_eq!(hundred_thousand.get(6000), Ok(-1));
    assert_eq!(hundred_thousand.get(6001), Ok(6000));
    assert_eq!(hundred_thousand.last(), Some(99_999));
    hundred_thousand.verify();
}

#[rstest]
#[case::one_segment(1024)]
#[case::three_segments(3072)]
fn test_inserting_whole_segments_at_boundary_copies_nothing(#[case] count: usize) {
    let mut array = counted(4096);
    array.insert_multiple(2048, 7, count).unwrap();

    let counters = array.environment().counters();
    assert_eq!(counters.copied, 0);
    assert_eq!(counters.allocate_count, count / 1024);
    assert_eq!(array.len(), 4096 + count);
    assert_eq!(array.get(2047), Ok(2047));
    assert_eq!(array.get(2048), Ok(7));
    assert_eq!(array.get(2048 + count), Ok(2048));
    array.verify();
}

#[rstest]
fn test_insert_slice_at_boundary_copies_nothing() {
    let mut array = counted(2048);
    let values: Vec<i64> = (0..1024).map(|value| -value).collect();
    array.insert_slice(1024, &values).unwrap();

    assert_eq!(array.environment().counters().copied, 0);
    assert_eq!(array.to_vec_range(1024, 2048).unwrap(), values);
    assert_eq!(array.get(2048), Ok(1024));
}

#[rstest]
fn test_expand_reserves_slots() {
    let mut array: SegmentedArray<u64> = (0..10).collect();
    array.expand(5, 3).unwrap();
    assert_eq!(array.len(), 13);
    assert_eq!(array.get(4), Ok(4));
    assert_eq!(array.get(8), Ok(5));
    assert!(array.expand(14, 1).is_err());
}

#[rstest]
fn test_insert_all_shares_full_segments() {
    let source: SegmentedArray<i64> = (1000..3500).collect();
    let mut target = counted(100);

    target.insert_all(50, &source).unwrap();

    let counters = target.environment().counters();
    assert_eq!(counters.allocate_count, 2);
    assert_eq!(counters.copied, 50 + 452);
    assert_eq!(target.shared_segment_count(), 2);

    let mut expected: Vec<i64> = (0..50).collect();
    expected.extend(1000..3500);
    expected.extend(50..100);
    assert_eq!(target.to_vec(), expected);
    target.verify();
}

// =============================================================================
// Removal
// =============================================================================

#[rstest]
fn test_remove_range_releases_covered_segments_without_copying() {
    let mut array = counted(4096);
    array.remove_range(1024, 3072).unwrap();

    let counters = array.environment().counters();
    assert_eq!(counters.free_count, 2);
    assert_eq!(counters.copied, 0);
    assert_eq!(array.len(), 2048);
    assert_eq!(array.get(1024), Ok(3072));
    array.verify();
}

#[rstest]
fn test_remove_from_shared_segment_leaves_clone_intact() {
    let mut array = counted(2048);
    let clone = array.clone();

    assert_eq!(array.remove(10), Ok(10));
    assert_eq!(array.get(10), Ok(11));
    assert_eq!(clone.get(10), Ok(10));
    assert_eq!(array.environment().counters().allocate_count, 1);
    array.verify();
}

#[rstest]
fn test_pop_truncate_and_clear() {
    let mut array: SegmentedArray<i32> = (0..3000).collect();
    assert_eq!(array.pop(), Ok(Some(2999)));
    array.truncate(1500).unwrap();
    assert_eq!(array.len(), 1500);
    assert_eq!(array.last(), Some(1499));
    array.verify();

    array.clear();
    assert!(array.is_empty());
    assert_eq!(array.segment_count(), 0);
    assert_eq!(array.pop(), Ok(None));
}

#[rstest]
fn test_swap_across_segments() {
    let mut array: SegmentedArray<i64> = (0..2048).collect();
    let snapshot = array.clone();
    array.swap(3, 2000).unwrap();
    assert_eq!(array.get(3), Ok(2000));
    assert_eq!(array.get(2000), Ok(3));
    assert_eq!(snapshot.get(3), Ok(3));
}

// =============================================================================
// Errors
// =============================================================================

#[rstest]
fn test_out_of_range_arguments_are_errors() {
    let mut array: SegmentedArray<i64> = (0..10).collect();

    assert_eq!(array.get(10), Err(CollectionError::IndexOutOfBounds { index: 10, length: 10 }));
    assert_eq!(array.set(10, 0), Err(CollectionError::IndexOutOfBounds { index: 10, length: 10 }));
    assert_eq!(array.insert(11, 0), Err(CollectionError::IndexOutOfBounds { index: 11, length: 10 }));
    assert_eq!(
        array.remove_range(5, 4),
        Err(CollectionError::RangeOutOfBounds { from: 5, to: 4, length: 10 })
    );
    assert_eq!(
        array.clone_range(0, 11).err(),
        Some(CollectionError::RangeOutOfBounds { from: 0, to: 11, length: 10 })
    );
    assert_eq!(array.to_vec(), (0..10).collect::<Vec<_>>());
}

#[rstest]
fn test_failed_allocation_leaves_array_unchanged() {
    let mut array = counted(5000);
    let clone = array.clone();
    let before = array.to_vec();
    array.environment().set_allocation_limit(Some(0));

    assert!(matches!(array.set(0, -1), Err(CollectionError::AllocationFailed { .. })));
    assert!(array.insert(100, -1).is_err());
    assert!(array.remove_range(10, 20).is_err());
    assert!(array.apply(0, 5000, |value| value + 1).is_err());
    assert!(array.add_all(&[1; 3000]).is_err());
    assert!(array.insert_all(2048, &clone).is_err());

    assert_eq!(array.to_vec(), before);
    array.verify();
    assert_eq!(clone.to_vec(), before);
}

#[rstest]
fn test_partial_allocation_failure_releases_what_was_taken() {
    let mut array = counted(1000);
    array.environment().set_allocation_limit(Some(2));

    assert!(array.add_all(&[0; 4096]).is_err());
    let counters = array.environment().counters();
    assert_eq!(counters.allocate_count, 2);
    assert_eq!(counters.free_count, 2);
    assert_eq!(array.len(), 1000);
}

// =============================================================================
// Environments
// =============================================================================

#[rstest]
fn test_pooled_buffers_larger_than_array_capacity_are_limited() {
    let environment = PoolingEnvironment::new(SegmentConfig::default());
    let mut array =
        SegmentedArray::<i64, _>::with_config(SegmentConfig::new(8).unwrap(), environment.clone());
    let values: Vec<i64> = (0..20).collect();
    array.add_all(&values).unwrap();

    assert_eq!(array.segment_lengths().collect::<Vec<_>>(), vec![8, 8, 4]);
    assert_eq!(array.last(), Some(19));
    array.verify();

    drop(array);
    assert_eq!(environment.pooled(), 3);
    let mut reused =
        SegmentedArray::<i64, _>::with_config(SegmentConfig::new(4).unwrap(), environment);
    reused.add_all(&values).unwrap();
    assert_eq!(reused.segment_count(), 5);
    assert_eq!(reused.to_vec(), values);
    reused.verify();
}

#[rstest]
fn test_insert_all_from_larger_capacity_array() {
    let mut small = SegmentedArray::<i64, _>::with_config(
        SegmentConfig::new(4).unwrap(),
        CountingEnvironment::new(),
    );
    small.add_all(&[1, 2, 3]).unwrap();
    small.environment().reset();
    let large: SegmentedArray<i64> = (0..10).collect();

    small.insert_all(1, &large).unwrap();

    let mut expected = vec![1];
    expected.extend(0..10);
    expected.extend([2, 3]);
    assert_eq!(small.to_vec(), expected);
    assert_eq!(small.segment_lengths().collect::<Vec<_>>(), vec![1, 4, 4, 2, 2]);
    let counters = small.environment().counters();
    assert_eq!(counters.allocate_count, 4);
    assert_eq!(counters.copied, 2 + 10);
    small.verify();
}

#[rstest]
fn test_pooling_environment_recycles_segments() {
    let config = SegmentConfig::new(4).unwrap().with_pool_depth(2);
    let environment = PoolingEnvironment::new(config);

    let mut first = SegmentedArray::<i64, _>::with_config(config, environment.clone());
    first.add_all(&[1; 12]).unwrap();
    drop(first);
    assert_eq!(environment.pooled(), 2);

    let mut second = SegmentedArray::<i64, _>::with_config(config, environment.clone());
    second.add_all(&[2; 5]).unwrap();
    assert_eq!(environment.pooled(), 0);
    assert_eq!(second.to_vec(), vec![2; 5]);
}

#[rstest]
fn test_drop_releases_everything() {
    let environment = CountingEnvironment::new();
    {
        let mut array: SegmentedArray<i32, _> = SegmentedArray::with_environment(environment.clone());
        array.add_all(&[3; 5000]).unwrap();
        let mut clone = array.clone();
        clone.set(4999, 0).unwrap();
        array.remove_range(100, 3000).unwrap();
    }
    let counters = environment.counters();
    assert_eq!(counters.free_count, counters.allocate_count);
    assert_eq!(counters.directory_free_count, counters.directory_allocate_count);
}

#[rstest]
fn test_arrays_compare_across_environments() {
    let heap: SegmentedArray<i64> = (0..100).collect();
    let counted = counted(100);
    assert!(heap == counted);
}
