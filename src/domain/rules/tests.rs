// Unit tests for business rules

use crate::domain::model::*;
use crate::domain::rules::*;

const FRAME: f64 = 1.0 / 24.0;

fn screenshots(n: usize) -> Vec<AssetRequest> {
    (0..n)
        .map(|i| AssetRequest::screenshot(format!("shot_{}.png", i)))
        .collect()
}

fn durations(plan: &TimelinePlan) -> Vec<f64> {
    plan.entries.iter().map(|e| e.allocated_duration).collect()
}

#[test]
fn test_plan_sums_to_total_for_many_shapes() {
    let allocator = TimelineAllocator::default();
    for total in [3.5, 7.0, 12.25, 30.0, 61.7, 240.0] {
        for n in 1..8 {
            let plan = allocator.plan(total, "Lesson", &screenshots(n)).unwrap();
            assert!(
                (plan.total_duration() - total).abs() <= FRAME,
                "total {} with {} candidates summed to {}",
                total,
                n,
                plan.total_duration()
            );
            assert_eq!(plan.entries[0].role, EntryRole::Title);
            assert_eq!(plan.entries[0].allocated_duration, 3.0);
        }
    }
}

#[test]
fn test_plan_intro_to_apis_two_screenshots() {
    let allocator = TimelineAllocator::default();
    let plan = allocator.plan(30.0, "Intro to APIs", &screenshots(2)).unwrap();

    assert_eq!(durations(&plan), vec![3.0, 13.5, 13.5]);
    assert_eq!(plan.entries[0].request.kind, AssetKind::Slide);
    assert_eq!(plan.entries[0].request.prompt_or_source, "Intro to APIs");
    assert_eq!(plan.entries[1].request.kind, AssetKind::Screenshot);
    assert_eq!(plan.entries[2].request.prompt_or_source, "shot_1.png");
    assert_eq!(plan.dropped, 0);
}

#[test]
fn test_plan_empty_candidates_single_fallback() {
    let allocator = TimelineAllocator::default();

    let plan = allocator.plan(10.0, "Topic", &[]).unwrap();
    assert_eq!(plan.len(), 2);
    assert_eq!(plan.fallback_count(), 1);
    assert_eq!(plan.entries[1].allocated_duration, 7.0);
    assert_eq!(plan.entries[1].request.prompt_or_source, "Topic");

    let short = allocator.plan(2.5, "Topic", &[]).unwrap();
    assert_eq!(short.len(), 1);
    assert_eq!(short.entries[0].role, EntryRole::Fallback);
    assert_eq!(short.entries[0].allocated_duration, 2.5);
}

#[test]
fn test_plan_title_skipped_at_or_below_opening() {
    let allocator = TimelineAllocator::default();
    let plan = allocator.plan(3.0, "Topic", &screenshots(2)).unwrap();
    assert!(plan.entries.iter().all(|e| e.role != EntryRole::Title));
    assert!((plan.total_duration() - 3.0).abs() < 1e-9);
}

#[test]
fn test_plan_drops_trailing_candidates_when_starved() {
    let allocator = TimelineAllocator::default();
    // 7s after the title, min segment 2s: ten candidates cannot all fit
    let plan = allocator.plan(10.0, "Topic", &screenshots(10)).unwrap();
    assert_eq!(plan.len(), 1 + 4);
    assert_eq!(plan.dropped, 6);
    assert_eq!(durations(&plan)[1..4], [2.0, 2.0, 2.0]);
    // last one takes the leftover second
    assert!((plan.entries[4].allocated_duration - 1.0).abs() < 1e-9);
    assert!((plan.total_duration() - 10.0).abs() < 1e-9);
}

#[test]
fn test_plan_last_absorbs_overflow_beyond_max() {
    let allocator = TimelineAllocator::default();
    // 100s after the title, but max segment 20s and only two candidates
    let plan = allocator.plan(103.0, "Topic", &screenshots(2)).unwrap();
    assert_eq!(durations(&plan)[..2], [3.0, 20.0]);
    assert!((plan.entries[2].allocated_duration - 80.0).abs() < 1e-9);
}

#[test]
fn test_plan_non_last_entries_within_bounds() {
    let allocator = TimelineAllocator::default();
    let bounds = allocator.bounds();
    for total in [9.0, 31.0, 77.7, 400.0] {
        let plan = allocator.plan(total, "Topic", &screenshots(5)).unwrap();
        let (_, head) = plan.entries.split_last().unwrap();
        for entry in head.iter().filter(|e| e.role == EntryRole::Candidate) {
            assert!(entry.allocated_duration >= bounds.min_segment - 1e-9);
            assert!(entry.allocated_duration <= bounds.max_segment + 1e-9);
        }
    }
}

#[test]
fn test_plan_hint_duration_matches_allocation() {
    let allocator = TimelineAllocator::default();
    let plan = allocator.plan(20.0, "Topic", &screenshots(3)).unwrap();
    for entry in &plan.entries {
        assert_eq!(entry.request.hint_duration, entry.allocated_duration);
    }
}

#[test]
fn test_plan_rejects_invalid_total() {
    let allocator = TimelineAllocator::default();
    assert!(allocator.plan(0.0, "Topic", &[]).is_err());
    assert!(allocator.plan(-4.0, "Topic", &[]).is_err());
    assert!(allocator.plan(f64::NAN, "Topic", &[]).is_err());
}

#[test]
fn test_allocator_rejects_inverted_bounds() {
    let bounds = TimelineBounds {
        opening: 3.0,
        min_segment: 10.0,
        max_segment: 5.0,
    };
    assert!(TimelineAllocator::new(bounds).is_err());
}

#[test]
fn test_output_validator_tolerance() {
    let ok = OutputValidator::validate_duration(30.02, 30.0, FRAME);
    assert!(ok.overall_valid);

    let off = OutputValidator::validate_duration(30.5, 30.0, FRAME);
    assert!(!off.overall_valid);
    assert!((off.difference - 0.5).abs() < 1e-9);
}
