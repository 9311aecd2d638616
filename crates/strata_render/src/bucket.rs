//! Pixel Bucket
//!
//! Fixed-capacity, depth-sorted fragment list of a single pixel plus the
//! overflow accumulator that receives fragments blended out of explicit
//! storage.
//!
//! # Merge insertion
//!
//! ```text
//!   near ─────────────────────────────────────────────► far
//!   [e0] [e1] [e2] ... [e(cap-1)] [incoming]  ‖ overflow @ 1.0
//!          └─ smallest adjacent gap ─┘  → front.over(back)
//! ```
//!
//! Inserting into a full bucket considers `capacity + 1` sorted entries and
//! the overflow slot, and blends exactly one adjacent pair so that
//! `count == capacity` again.
//!
//! The overflow slot remembers the nearest depth folded into it. A tail that
//! lies in front of that depth is composited over the slot, a farther one
//! under it. Two folded layers always end up in depth order whatever their
//! arrival; a tail falling between layers already folded goes under the
//! whole slot, and the resolved color then depends on arrival order.

use smallvec::SmallVec;
use strata_core::{Result, StrataError};

use crate::fragment::{FragmentRecord, PremultipliedColor};
use crate::settings::MergePolicy;

/// Conceptual depth of the overflow slot.
pub const OVERFLOW_DEPTH: f32 = 1.0;

/// Depth gaps closer than this are treated as equal; the nearer pair wins.
pub const MERGE_GAP_EPSILON: f32 = 1e-6;

/// Merge candidates kept on the stack: `capacity + 1` for buckets of up to
/// 16 layers. Larger buckets spill the scratch list to the heap.
const INLINE_CANDIDATES: usize = 17;

/// Result of a single insertion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    /// The fragment occupies a free slot.
    Stored,
    /// The bucket was full and one merge restored the capacity bound.
    Merged(MergeSite),
}

/// Which pair a merge blended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeSite {
    /// Entries `i` and `i + 1` of the `capacity + 1` sorted candidates.
    Adjacent(usize),
    /// The farthest candidate was folded into the overflow color.
    Overflow,
}

#[derive(Debug, Clone)]
pub struct PixelBucket {
    layers: Box<[FragmentRecord]>,
    count: usize,
    overflow: PremultipliedColor,
    /// Nearest depth folded into `overflow`.
    overflow_depth: f32,
}

impl PixelBucket {
    pub fn new(capacity: usize) -> Result<Self> {
        let mut layers = Vec::new();
        layers
            .try_reserve_exact(capacity)
            .map_err(|_| StrataError::AllocationFailed {
                what: "pixel bucket",
                requested: capacity,
            })?;
        layers.resize(capacity, FragmentRecord::default());

        Ok(Self {
            layers: layers.into_boxed_slice(),
            count: 0,
            overflow: PremultipliedColor::TRANSPARENT,
            overflow_depth: OVERFLOW_DEPTH,
        })
    }

    #[inline]
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.layers.len()
    }

    #[inline]
    #[must_use]
    pub fn count(&self) -> usize {
        self.count
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.count == 0 && self.overflow == PremultipliedColor::TRANSPARENT
    }

    /// Stored entries, nearest first.
    #[inline]
    #[must_use]
    pub fn entries(&self) -> &[FragmentRecord] {
        &self.layers[..self.count]
    }

    #[inline]
    #[must_use]
    pub fn overflow_color(&self) -> PremultipliedColor {
        self.overflow
    }

    /// Nearest depth folded into the overflow slot, `1.0` while it is empty.
    #[inline]
    #[must_use]
    pub fn overflow_depth(&self) -> f32 {
        self.overflow_depth
    }

    pub fn clear(&mut self) {
        self.count = 0;
        self.overflow = PremultipliedColor::TRANSPARENT;
        self.overflow_depth = OVERFLOW_DEPTH;
    }

    /// Inserts `record` keeping the entries sorted, merging once if full.
    pub fn insert(&mut self, record: FragmentRecord, policy: MergePolicy) -> InsertOutcome {
        let pos = self.entries().partition_point(|e| e.sort_cmp(&record).is_le());

        if self.count < self.capacity() {
            self.layers.copy_within(pos..self.count, pos + 1);
            self.layers[pos] = record;
            self.count += 1;
            return InsertOutcome::Stored;
        }

        let mut candidates: SmallVec<[FragmentRecord; INLINE_CANDIDATES]> = SmallVec::with_capacity(self.count + 1);
        candidates.extend_from_slice(&self.layers[..pos]);
        candidates.push(record);
        candidates.extend_from_slice(&self.layers[pos..self.count]);

        let site = select_merge_site(&candidates, policy);
        match site {
            MergeSite::Adjacent(i) => {
                let merged = candidates[i].merged_with(&candidates[i + 1]);
                candidates[i] = merged;
                candidates.remove(i + 1);
            }
            MergeSite::Overflow => {
                if let Some(last) = candidates.pop() {
                    self.fold_into_overflow(&last);
                }
            }
        }

        self.layers.copy_from_slice(&candidates);
        InsertOutcome::Merged(site)
    }

    fn fold_into_overflow(&mut self, tail: &FragmentRecord) {
        if tail.depth <= self.overflow_depth {
            self.overflow = tail.color.over(self.overflow);
            self.overflow_depth = tail.depth;
        } else {
            self.overflow = self.overflow.over(tail.color);
        }
    }

    /// Composites the bucket back-to-front over `background`: overflow first,
    /// then stored entries from farthest to nearest.
    #[must_use]
    pub fn composite(&self, background: PremultipliedColor) -> PremultipliedColor {
        self.entries()
            .iter()
            .rev()
            .fold(self.overflow.over(background), |acc, entry| entry.color.over(acc))
    }
}

/// Picks the pair to blend among sorted `candidates` (one more than capacity).
#[must_use]
pub fn select_merge_site(candidates: &[FragmentRecord], policy: MergePolicy) -> MergeSite {
    match policy {
        MergePolicy::Tail => MergeSite::Overflow,
        MergePolicy::NearestPair => {
            let Some(last) = candidates.last() else {
                return MergeSite::Overflow;
            };

            let mut best_site = MergeSite::Overflow;
            let mut best_gap = OVERFLOW_DEPTH - last.depth;
            let mut best_index = candidates.len() - 1;

            for (i, pair) in candidates.windows(2).enumerate() {
                let gap = pair[1].depth - pair[0].depth;
                // Strictly smaller beyond epsilon, or a tie with a farther
                // current best: the nearer pair takes precedence.
                if gap + MERGE_GAP_EPSILON < best_gap
                    || ((gap - best_gap).abs() <= MERGE_GAP_EPSILON && i < best_index)
                {
                    best_gap = gap;
                    best_index = i;
                    best_site = MergeSite::Adjacent(i);
                }
            }

            best_site
        }
    }
}
