//! Pixel Bucket Tests
//!
//! Tests for:
//! - Arrival-order independence below capacity
//! - Depth-ordered overflow folds and coverage past capacity
//! - Capacity bound and clear
//! - Sorted insertion without merges
//! - Nearest-pair and tail merge behavior at capacity
//! - Reference scenarios (three layers into four slots, three into two)

use strata::{
    FragmentRecord, InsertOutcome, MergePolicy, MergeSite, PixelBucket, PremultipliedColor,
};

const EPSILON: f32 = 1e-5;

fn approx(a: f32, b: f32) -> bool {
    (a - b).abs() < EPSILON
}

fn record(depth: f32, r: f32, g: f32, b: f32, a: f32) -> FragmentRecord {
    FragmentRecord::new(depth, PremultipliedColor::from_straight(r, g, b, a))
}

fn bits(color: PremultipliedColor) -> [u32; 4] {
    color.0.to_array().map(f32::to_bits)
}

/// Every ordering of `items`, generated with Heap's algorithm.
fn permutations<T: Clone>(items: &[T]) -> Vec<Vec<T>> {
    fn heap<T: Clone>(k: usize, items: &mut Vec<T>, out: &mut Vec<Vec<T>>) {
        if k <= 1 {
            out.push(items.clone());
            return;
        }
        heap(k - 1, items, out);
        for i in 0..k - 1 {
            if k % 2 == 0 {
                items.swap(i, k - 1);
            } else {
                items.swap(0, k - 1);
            }
            heap(k - 1, items, out);
        }
    }

    let mut work = items.to_vec();
    let mut out = Vec::new();
    heap(work.len(), &mut work, &mut out);
    out
}

// ============================================================================
// Order Independence
// ============================================================================

#[test]
fn permutations_resolve_bit_identical() {
    let fragments = [
        record(0.15, 1.0, 0.0, 0.0, 0.4),
        record(0.35, 0.0, 1.0, 0.0, 0.6),
        record(0.6, 0.0, 0.0, 1.0, 0.3),
        record(0.85, 1.0, 1.0, 0.0, 0.7),
    ];
    let background = PremultipliedColor::new(0.1, 0.2, 0.3, 1.0);

    let orders = permutations(&fragments);
    assert_eq!(orders.len(), 24);

    let mut expected = None;
    for order in orders {
        let mut bucket = PixelBucket::new(4).unwrap();
        for r in order {
            assert_eq!(bucket.insert(r, MergePolicy::NearestPair), InsertOutcome::Stored);
        }
        let resolved = bits(bucket.composite(background));
        match expected {
            None => expected = Some(resolved),
            Some(e) => assert_eq!(e, resolved, "resolve depends on arrival order"),
        }
    }
}

#[test]
fn equal_depth_fragments_are_order_independent() {
    let a = record(0.5, 1.0, 0.0, 0.0, 0.5);
    let b = record(0.5, 0.0, 0.0, 1.0, 0.5);

    let mut ab = PixelBucket::new(2).unwrap();
    ab.insert(a, MergePolicy::NearestPair);
    ab.insert(b, MergePolicy::NearestPair);

    let mut ba = PixelBucket::new(2).unwrap();
    ba.insert(b, MergePolicy::NearestPair);
    ba.insert(a, MergePolicy::NearestPair);

    assert_eq!(ab.entries(), ba.entries());
    assert_eq!(
        bits(ab.composite(PremultipliedColor::BLACK)),
        bits(ba.composite(PremultipliedColor::BLACK))
    );
}

#[test]
fn overflow_folds_are_depth_ordered_in_every_arrival_order() {
    let red = record(0.1, 1.0, 0.0, 0.0, 0.5);
    let green = record(0.9, 0.0, 1.0, 0.0, 0.5);
    let blue = record(0.97, 0.0, 0.0, 1.0, 0.5);
    let exact = red
        .color
        .over(green.color.over(blue.color.over(PremultipliedColor::TRANSPARENT)));

    for order in permutations(&[red, green, blue]) {
        let mut bucket = PixelBucket::new(1).unwrap();
        for r in &order {
            bucket.insert(*r, MergePolicy::NearestPair);
        }
        assert_eq!(bucket.entries(), &[red]);
        assert_eq!(
            bits(bucket.composite(PremultipliedColor::TRANSPARENT)),
            bits(exact),
            "order {:?} composited out of depth order",
            order.iter().map(|r| r.depth).collect::<Vec<_>>()
        );
    }
}

#[test]
fn permutations_past_capacity_preserve_alpha() {
    let fragments = [
        record(0.1, 1.0, 0.0, 0.0, 0.5),
        record(0.3, 0.0, 1.0, 0.0, 0.25),
        record(0.35, 0.0, 0.0, 1.0, 0.75),
        record(0.6, 1.0, 1.0, 0.0, 0.5),
        record(0.95, 0.0, 1.0, 1.0, 0.25),
    ];
    let exact_alpha = 1.0 - 0.5 * 0.75 * 0.25 * 0.5 * 0.75;

    for policy in [MergePolicy::NearestPair, MergePolicy::Tail] {
        for order in permutations(&fragments) {
            let mut bucket = PixelBucket::new(2).unwrap();
            for r in order {
                bucket.insert(r, policy);
            }
            assert_eq!(bucket.count(), 2);
            assert!(bucket.overflow_color().is_valid());

            let resolved = bucket.composite(PremultipliedColor::TRANSPARENT);
            assert!(resolved.is_valid());
            assert!(
                approx(resolved.alpha(), exact_alpha),
                "{policy:?}: alpha {} != {exact_alpha}",
                resolved.alpha()
            );
        }
    }
}

// ============================================================================
// Capacity
// ============================================================================

#[test]
fn count_never_exceeds_capacity() {
    let mut bucket = PixelBucket::new(3).unwrap();
    for i in 0..20 {
        let depth = ((i * 7) % 20) as f32 / 20.0;
        let shade = (i % 3) as f32 * 0.5;
        bucket.insert(
            record(depth, shade, 1.0 - shade, 1.0, 0.2 + shade * 0.5),
            MergePolicy::NearestPair,
        );
        assert!(bucket.count() <= bucket.capacity());
        assert!(bucket.entries().iter().all(|e| e.color.is_valid()));
        assert!(bucket.overflow_color().is_valid());
    }
    assert_eq!(bucket.count(), 3);

    bucket.clear();
    assert_eq!(bucket.count(), 0);
    assert!(bucket.is_empty());
    assert_eq!(bucket.overflow_color(), PremultipliedColor::TRANSPARENT);
}

#[test]
fn increasing_inserts_below_capacity_match_input() {
    let input: Vec<FragmentRecord> = (0..5)
        .map(|i| record(0.1 + i as f32 * 0.15, 0.5, 0.5, 0.5, 0.5))
        .collect();

    let mut bucket = PixelBucket::new(8).unwrap();
    for r in &input {
        assert_eq!(bucket.insert(*r, MergePolicy::NearestPair), InsertOutcome::Stored);
    }

    assert_eq!(bucket.entries(), input.as_slice());
    assert_eq!(bucket.overflow_color(), PremultipliedColor::TRANSPARENT);
}

// ============================================================================
// Merge Behavior
// ============================================================================

#[test]
fn full_bucket_merges_smallest_gap_pair() {
    let mut bucket = PixelBucket::new(3).unwrap();
    let near = record(0.5, 1.0, 0.0, 0.0, 0.5);
    let far = record(0.52, 0.0, 0.0, 1.0, 0.5);
    bucket.insert(record(0.1, 0.0, 1.0, 0.0, 0.5), MergePolicy::NearestPair);
    bucket.insert(near, MergePolicy::NearestPair);
    bucket.insert(far, MergePolicy::NearestPair);

    let outcome = bucket.insert(record(0.9, 1.0, 1.0, 1.0, 0.5), MergePolicy::NearestPair);

    assert_eq!(outcome, InsertOutcome::Merged(MergeSite::Adjacent(1)));
    assert_eq!(bucket.count(), 3);

    let depths: Vec<f32> = bucket.entries().iter().map(|e| e.depth).collect();
    assert_eq!(depths, vec![0.1, 0.5, 0.9]);
    assert_eq!(bucket.entries()[1].color, near.color.over(far.color));
}

#[test]
fn far_entry_near_overflow_folds_into_overflow() {
    let mut bucket = PixelBucket::new(2).unwrap();
    bucket.insert(record(0.1, 1.0, 0.0, 0.0, 0.5), MergePolicy::NearestPair);
    bucket.insert(record(0.5, 0.0, 1.0, 0.0, 0.5), MergePolicy::NearestPair);

    let last = record(0.995, 0.0, 0.0, 1.0, 0.5);
    let outcome = bucket.insert(last, MergePolicy::NearestPair);

    assert_eq!(outcome, InsertOutcome::Merged(MergeSite::Overflow));
    assert_eq!(bucket.count(), 2);
    assert_eq!(bucket.overflow_color(), last.color);
}

#[test]
fn tail_policy_always_uses_overflow() {
    let mut bucket = PixelBucket::new(2).unwrap();
    bucket.insert(record(0.5, 1.0, 0.0, 0.0, 0.5), MergePolicy::Tail);
    bucket.insert(record(0.51, 0.0, 1.0, 0.0, 0.5), MergePolicy::Tail);

    let outcome = bucket.insert(record(0.1, 0.0, 0.0, 1.0, 0.5), MergePolicy::Tail);

    assert_eq!(outcome, InsertOutcome::Merged(MergeSite::Overflow));
    let depths: Vec<f32> = bucket.entries().iter().map(|e| e.depth).collect();
    assert_eq!(depths, vec![0.1, 0.5]);
    assert_ne!(bucket.overflow_color(), PremultipliedColor::TRANSPARENT);
}

#[test]
fn merged_alpha_is_preserved() {
    // Merging never loses coverage: total alpha equals the unmerged blend.
    let fragments = [
        record(0.2, 1.0, 0.0, 0.0, 0.5),
        record(0.3, 0.0, 1.0, 0.0, 0.5),
        record(0.4, 0.0, 0.0, 1.0, 0.5),
        record(0.7, 1.0, 1.0, 1.0, 0.5),
    ];

    let mut full = PixelBucket::new(4).unwrap();
    let mut small = PixelBucket::new(2).unwrap();
    for r in fragments {
        full.insert(r, MergePolicy::NearestPair);
        small.insert(r, MergePolicy::NearestPair);
    }

    let exact = full.composite(PremultipliedColor::TRANSPARENT);
    let merged = small.composite(PremultipliedColor::TRANSPARENT);
    assert!(approx(exact.alpha(), 0.9375));
    assert!(approx(merged.alpha(), exact.alpha()));
}

// ============================================================================
// Reference Scenarios
// ============================================================================

#[test]
fn scenario_three_layers_into_four_slots() {
    let near = record(0.2, 1.0, 0.0, 0.0, 0.5);
    let mid = record(0.5, 0.0, 1.0, 0.0, 0.5);
    let far = record(0.8, 0.0, 0.0, 1.0, 0.5);

    let mut bucket = PixelBucket::new(4).unwrap();
    for r in [far, near, mid] {
        assert_eq!(bucket.insert(r, MergePolicy::NearestPair), InsertOutcome::Stored);
    }
    assert_eq!(bucket.count(), 3);

    let resolved = bucket.composite(PremultipliedColor::TRANSPARENT);
    assert!(approx(resolved.alpha(), 0.875));

    let expected = near
        .color
        .over(mid.color.over(far.color.over(PremultipliedColor::TRANSPARENT)));
    assert_eq!(resolved, expected);
    assert!(approx(resolved.0.x, 0.5));
    assert!(approx(resolved.0.y, 0.25));
    assert!(approx(resolved.0.z, 0.125));
}

#[test]
fn scenario_three_layers_into_two_slots() {
    let a = record(0.1, 1.0, 0.0, 0.0, 0.5);
    let b = record(0.2, 0.0, 1.0, 0.0, 0.5);
    let c = record(0.3, 0.0, 0.0, 1.0, 0.5);

    let mut bucket = PixelBucket::new(2).unwrap();
    bucket.insert(a, MergePolicy::NearestPair);
    bucket.insert(b, MergePolicy::NearestPair);
    let outcome = bucket.insert(c, MergePolicy::NearestPair);

    assert_eq!(outcome, InsertOutcome::Merged(MergeSite::Adjacent(0)));
    assert_eq!(bucket.count(), 2);
    assert_eq!(bucket.entries()[0], a.merged_with(&b));
    assert_eq!(bucket.entries()[1], c);
}
