/*!
 * Tests for the tier table
 */

use elan_data::{EafError, Segment, Segmentations};

fn ids(segments: &[&Segment]) -> Vec<String> {
    segments.iter().map(|s| s.id.clone()).collect()
}

/// Table with three tiers:
/// A: a1 [0, 1000]   a2 [1000, 2000]
/// B: a3 [500, 1500]
/// C: a4 [0, 3000]
fn sample_table() -> Segmentations {
    vec![
        Segment::new("a1", "A", 0, 1000, "one"),
        Segment::new("a2", "A", 1000, 2000, "two"),
        Segment::new("a3", "B", 500, 1500, "three"),
        Segment::new("a4", "C", 0, 3000, "four"),
    ]
    .into_iter()
    .collect()
}

/// Test that overlaps include partial overlaps on other tiers only
#[test]
fn test_overlaps_withPartialOverlap_shouldExcludeOwnTier() {
    let table = sample_table();

    let overlapping = table.overlaps("a3", None, false).unwrap();

    // a4 starts before and ends after a3, so it only shows up as a suprasegment
    assert_eq!(ids(&overlapping), vec!["a1", "a2"]);
}

/// Test that touching segments do not overlap
#[test]
fn test_overlaps_withTouchingBounds_shouldNotMatch() {
    let table: Segmentations = vec![
        Segment::new("a1", "A", 0, 1000, ""),
        Segment::new("a2", "B", 1000, 2000, ""),
    ]
    .into_iter()
    .collect();

    assert!(table.overlaps("a1", None, true).unwrap().is_empty());
    assert!(table.overlaps("a2", None, true).unwrap().is_empty());
}

/// Test the tier restriction of overlaps
#[test]
fn test_overlaps_withTierFilter_shouldOnlySearchListedTiers() {
    let table = sample_table();

    let only_c = table.overlaps("a3", Some(&["C".to_string()]), true).unwrap();
    assert_eq!(ids(&only_c), vec!["a4"]);

    let empty_filter = table.overlaps("a3", Some(&[]), true).unwrap();
    assert_eq!(ids(&empty_filter), vec!["a1", "a2", "a4"]);
}

/// Test that a segment with identical bounds on another tier overlaps
#[test]
fn test_overlaps_withIdenticalBounds_shouldMatch() {
    let table: Segmentations = vec![
        Segment::new("a1", "A", 100, 200, ""),
        Segment::new("a2", "B", 100, 200, ""),
    ]
    .into_iter()
    .collect();

    assert_eq!(ids(&table.overlaps("a1", None, false).unwrap()), vec!["a2"]);
}

/// Test tier names in order of first appearance
#[test]
fn test_tierNames_shouldBeDistinctInOrder() {
    let mut table = sample_table();
    table.add_segment("A", 5000, 6000, "again").unwrap();
    assert_eq!(table.tier_names(), vec!["A", "B", "C"]);
}

/// Test that IDs not in ELAN form do not affect new IDs
#[test]
fn test_nextId_withForeignIds_shouldIgnoreThem() {
    let table: Segmentations = vec![Segment::new("ann7", "A", 0, 1, ""), Segment::new("a3", "A", 1, 2, "")]
        .into_iter()
        .collect();

    assert_eq!(table.last_used_id(), 3);
    assert_eq!(table.next_id(), "a4");
}

/// Test removing and renaming tiers
#[test]
fn test_removeTier_shouldReturnRemovedCount() {
    let mut table = sample_table();
    table.rename_tier("A", "Speaker");

    assert_eq!(table.tier_segments("Speaker").count(), 2);
    assert_eq!(table.remove_tier("Speaker"), 2);
    assert_eq!(table.remove_tier("Speaker"), 0);
    assert_eq!(table.len(), 2);
}

/// Test sorting by start, end and tier
#[test]
fn test_sorted_shouldOrderByTime() {
    let table = sample_table();
    let sorted = table.sorted();
    assert_eq!(ids(&sorted), vec!["a1", "a4", "a3", "a2"]);
}

/// Test that splitting an unknown segment fails
#[test]
fn test_splitSegment_withUnknownId_shouldFail() {
    let mut table = sample_table();
    assert!(matches!(
        table.split_segment("a42", &[10]),
        Err(EafError::SegmentNotFound(id)) if id == "a42"
    ));
}

/// Test that splitting with no points changes nothing
#[test]
fn test_splitSegment_withNoPoints_shouldBeNoop() {
    let mut table = sample_table();
    assert!(table.split_segment("a1", &[]).unwrap().is_empty());
    assert_eq!(table, sample_table());
}

/// Test that duplicate split points collapse into one
#[test]
fn test_splitSegment_withDuplicatePoints_shouldSplitOnce() {
    let mut table = sample_table();
    let new_ids = table.split_segment("a1", &[500, 500]).unwrap();

    assert_eq!(new_ids, vec!["a5", "a6"]);
    let pieces: Vec<(u64, u64)> = new_ids
        .iter()
        .map(|id| table.get_segment(id).map(|s| (s.start, s.end)).unwrap())
        .collect();
    assert_eq!(pieces, vec![(0, 500), (500, 1000)]);
}

/// Test merging segments with a gap between them
#[test]
fn test_mergeSegments_withGap_shouldCoverWholeSpan() {
    let mut table: Segmentations = vec![
        Segment::new("a1", "A", 4000, 5000, "world"),
        Segment::new("a2", "A", 0, 1000, "hello"),
    ]
    .into_iter()
    .collect();

    let merged_id = table
        .merge_segments("A", &["a1".to_string(), "a2".to_string()])
        .unwrap()
        .unwrap();

    assert_eq!(table.len(), 1);
    let merged = table.get_segment(&merged_id).unwrap();
    assert_eq!(merged.text, "hello world");
    assert_eq!((merged.start, merged.end), (0, 5000));
    assert_eq!(merged.duration(), 5000);
}

/// Test the segment display line
#[test]
fn test_segment_display_shouldShowIdTierAndBounds() {
    let segment = Segment::new("a1", "A", 10, 20, "hi");
    assert_eq!(segment.to_string(), "a1 A 10-20: hi");
}
