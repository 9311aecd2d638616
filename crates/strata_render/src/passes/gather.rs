//! Gather Pass
//!
//! The gather stage receives rasterized transparent fragments, in any order
//! and from any number of threads, and merge-inserts each one into its
//! pixel's storage.
//!
//! # Data flow
//! ```text
//! Fragment ─► bounds / scene depth test ─► normalize depth ─► lock(pixel)
//!          ─► sorted insert ─► merge if over capacity ─► unlock(pixel)
//! ```
//!
//! A [`GatherStage`] is obtained from
//! [`OitRenderer::gather_begin`](crate::OitRenderer::gather_begin) and
//! borrows the renderer until [`GatherStage::end`], which is how the
//! clear → gather → resolve ordering is enforced.

use std::sync::atomic::{AtomicU64, Ordering};

use rayon::prelude::*;

use crate::bucket::InsertOutcome;
use crate::depth_range::FrameState;
use crate::fragment::{Fragment, FragmentRecord};
use crate::settings::MergePolicy;
use crate::sorted::{IndexedRecord, SortedFragmentList};
use crate::store::FragmentBucketStore;
use crate::targets::DepthBuffer;

/// Where the renderer is within the current frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum FramePhase {
    /// Storage is empty (freshly allocated or cleared).
    Cleared,
    /// A gather window has been closed; storage is ready to resolve.
    Gathered,
}

/// Per-frame gather counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GatherStats {
    pub submitted: u64,
    /// Fragments that landed in a free slot (or in the sorted list).
    pub stored: u64,
    /// Insertions that triggered a merge.
    pub merged: u64,
    /// Fragments rejected by the bounds or scene depth test.
    pub discarded: u64,
}

/// What happened to a single submitted fragment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FragmentOutcome {
    Discarded,
    Stored,
    Merged,
}

#[derive(Default)]
struct GatherCounters {
    submitted: AtomicU64,
    stored: AtomicU64,
    merged: AtomicU64,
    discarded: AtomicU64,
}

impl GatherCounters {
    fn snapshot(&self) -> GatherStats {
        GatherStats {
            submitted: self.submitted.load(Ordering::Relaxed),
            stored: self.stored.load(Ordering::Relaxed),
            merged: self.merged.load(Ordering::Relaxed),
            discarded: self.discarded.load(Ordering::Relaxed),
        }
    }
}

pub(crate) enum GatherTarget<'a> {
    Bucket {
        store: &'a FragmentBucketStore,
        policy: MergePolicy,
    },
    SortedList(&'a SortedFragmentList),
}

impl GatherTarget<'_> {
    #[inline]
    fn index(&self, x: u32, y: u32) -> Option<usize> {
        match self {
            Self::Bucket { store, .. } => store.index(x, y),
            Self::SortedList(list) => list.index(x, y),
        }
    }
}

/// Handle to the gather shading stage for one frame.
///
/// `GatherStage` is `Sync`: share it by reference across worker threads and
/// call [`submit`](Self::submit) or [`draw`](Self::draw) concurrently.
pub struct GatherStage<'a> {
    target: GatherTarget<'a>,
    frame: FrameState,
    scene_depth: Option<&'a DepthBuffer>,
    counters: GatherCounters,
    phase: &'a mut FramePhase,
    stats_out: &'a mut GatherStats,
}

impl<'a> GatherStage<'a> {
    pub(crate) fn new(
        target: GatherTarget<'a>,
        frame: FrameState,
        scene_depth: Option<&'a DepthBuffer>,
        phase: &'a mut FramePhase,
        stats_out: &'a mut GatherStats,
    ) -> Self {
        Self {
            target,
            frame,
            scene_depth,
            counters: GatherCounters::default(),
            phase,
            stats_out,
        }
    }

    /// Depth range fragments are normalized against.
    #[inline]
    #[must_use]
    pub fn frame_state(&self) -> FrameState {
        self.frame
    }

    /// Tests and normalizes one fragment. `None` means discarded.
    #[inline]
    fn prepare(&self, fragment: &Fragment) -> Option<(usize, FragmentRecord)> {
        self.counters.submitted.fetch_add(1, Ordering::Relaxed);

        let accepted = self
            .target
            .index(fragment.x, fragment.y)
            .filter(|&index| {
                fragment.depth.is_finite()
                    && self
                        .scene_depth
                        .is_none_or(|depth| depth.passes(index, fragment.depth))
            });

        let Some(index) = accepted else {
            self.counters.discarded.fetch_add(1, Ordering::Relaxed);
            return None;
        };

        let record = FragmentRecord::new(self.frame.normalize(fragment.depth), fragment.color);
        Some((index, record))
    }

    /// Gathers a single fragment.
    pub fn submit(&self, fragment: Fragment) -> FragmentOutcome {
        let Some((index, record)) = self.prepare(&fragment) else {
            return FragmentOutcome::Discarded;
        };

        match &self.target {
            GatherTarget::Bucket { store, policy } => {
                match store.insert(index, record, *policy) {
                    InsertOutcome::Stored => {
                        self.counters.stored.fetch_add(1, Ordering::Relaxed);
                        FragmentOutcome::Stored
                    }
                    InsertOutcome::Merged(_) => {
                        self.counters.merged.fetch_add(1, Ordering::Relaxed);
                        FragmentOutcome::Merged
                    }
                }
            }
            GatherTarget::SortedList(list) => {
                list.push_batch(vec![IndexedRecord {
                    pixel: index,
                    record,
                }]);
                self.counters.stored.fetch_add(1, Ordering::Relaxed);
                FragmentOutcome::Stored
            }
        }
    }

    /// Gathers a batch of fragments in parallel, as one draw call would.
    pub fn draw(&self, fragments: &[Fragment]) {
        match &self.target {
            GatherTarget::Bucket { .. } => {
                fragments.par_iter().for_each(|fragment| {
                    self.submit(*fragment);
                });
            }
            GatherTarget::SortedList(list) => {
                let batch: Vec<IndexedRecord> = fragments
                    .par_iter()
                    .filter_map(|fragment| self.prepare(fragment))
                    .map(|(pixel, record)| IndexedRecord { pixel, record })
                    .collect();
                self.counters
                    .stored
                    .fetch_add(batch.len() as u64, Ordering::Relaxed);
                list.push_batch(batch);
            }
        }
    }

    /// Counters accumulated so far.
    #[must_use]
    pub fn stats(&self) -> GatherStats {
        self.counters.snapshot()
    }

    /// Closes the gather window and returns the frame's counters.
    pub fn end(self) -> GatherStats {
        self.stats()
    }
}

impl Drop for GatherStage<'_> {
    fn drop(&mut self) {
        let stats = self.counters.snapshot();
        log::trace!(
            "GatherPass: {} submitted, {} stored, {} merged, {} discarded",
            stats.submitted,
            stats.stored,
            stats.merged,
            stats.discarded
        );
        *self.stats_out = stats;
        *self.phase = FramePhase::Gathered;
    }
}
