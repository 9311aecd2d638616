//! Sorted Fragment List
//!
//! Deterministic collect-then-sort alternative to the bucket store. Gather
//! appends whole batches under one coarse lock; the resolve pass sorts every
//! fragment by `(pixel, depth)` and composites each pixel's complete list.
//! Memory is unbounded but the result is the exact back-to-front blend,
//! which makes this the reference the bucket technique is measured against.

use parking_lot::Mutex;
use rayon::prelude::*;
use strata_core::{Result, StrataError};

use crate::fragment::{FragmentRecord, PremultipliedColor};

#[derive(Debug, Clone, Copy)]
pub(crate) struct IndexedRecord {
    pub pixel: usize,
    pub record: FragmentRecord,
}

pub struct SortedFragmentList {
    width: u32,
    height: u32,
    batches: Mutex<Vec<Vec<IndexedRecord>>>,
    sorted: Vec<IndexedRecord>,
    /// `offsets[p]..offsets[p + 1]` is pixel `p`'s run in `sorted`.
    offsets: Vec<usize>,
}

impl SortedFragmentList {
    pub fn new(width: u32, height: u32) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(StrataError::InvalidResolution { width, height });
        }
        let offset_count = (width as usize)
            .checked_mul(height as usize)
            .and_then(|pixels| pixels.checked_add(1))
            .ok_or(StrataError::AllocationFailed {
                what: "sorted fragment list",
                requested: usize::MAX,
            })?;

        let mut offsets = Vec::new();
        offsets
            .try_reserve_exact(offset_count)
            .map_err(|_| StrataError::AllocationFailed {
                what: "sorted fragment list",
                requested: offset_count,
            })?;
        offsets.resize(offset_count, 0);

        Ok(Self {
            width,
            height,
            batches: Mutex::new(Vec::new()),
            sorted: Vec::new(),
            offsets,
        })
    }

    #[inline]
    #[must_use]
    pub fn resolution(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    #[inline]
    #[must_use]
    pub fn pixel_count(&self) -> usize {
        self.offsets.len() - 1
    }

    #[inline]
    #[must_use]
    pub fn index(&self, x: u32, y: u32) -> Option<usize> {
        (x < self.width && y < self.height).then(|| y as usize * self.width as usize + x as usize)
    }

    pub(crate) fn push_batch(&self, batch: Vec<IndexedRecord>) {
        if !batch.is_empty() {
            self.batches.lock().push(batch);
        }
    }

    pub fn clear(&mut self) {
        self.batches.get_mut().clear();
        self.sorted.clear();
        self.offsets.fill(0);
    }

    /// Number of fragments gathered this frame.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sorted.len() + self.batches.lock().iter().map(Vec::len).sum::<usize>()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Folds pending batches into the sorted array and rebuilds pixel offsets.
    pub(crate) fn sort(&mut self) {
        let pending = std::mem::take(self.batches.get_mut());
        if pending.is_empty() {
            return;
        }
        for batch in pending {
            self.sorted.extend(batch);
        }

        self.sorted.par_sort_unstable_by(|a, b| {
            a.pixel
                .cmp(&b.pixel)
                .then_with(|| a.record.sort_cmp(&b.record))
        });

        self.offsets.fill(0);
        for entry in &self.sorted {
            self.offsets[entry.pixel + 1] += 1;
        }
        for i in 1..self.offsets.len() {
            self.offsets[i] += self.offsets[i - 1];
        }
    }

    /// Sorted records of one pixel, nearest first. Valid after sorting.
    pub fn pixel_records(&self, pixel: usize) -> impl DoubleEndedIterator<Item = &FragmentRecord> {
        self.sorted[self.offsets[pixel]..self.offsets[pixel + 1]]
            .iter()
            .map(|entry| &entry.record)
    }

    /// Exact back-to-front blend of every fragment of `pixel` over `background`.
    #[must_use]
    pub fn composite(&self, pixel: usize, background: PremultipliedColor) -> PremultipliedColor {
        self.pixel_records(pixel)
            .rev()
            .fold(background, |acc, record| record.color.over(acc))
    }
}

impl std::fmt::Debug for SortedFragmentList {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SortedFragmentList")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("sorted", &self.sorted.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_empty_resolution() {
        assert!(matches!(
            SortedFragmentList::new(0, 4),
            Err(StrataError::InvalidResolution { width: 0, height: 4 })
        ));
    }

    #[test]
    fn test_oversized_resolution_fails_allocation() {
        assert!(matches!(
            SortedFragmentList::new(u32::MAX, u32::MAX),
            Err(StrataError::AllocationFailed { what: "sorted fragment list", .. })
        ));
    }

    #[test]
    fn test_offsets_cover_every_pixel() {
        let list = SortedFragmentList::new(3, 2).unwrap();
        assert_eq!(list.pixel_count(), 6);
        assert_eq!(list.index(2, 1), Some(5));
        assert_eq!(list.index(3, 0), None);
        assert!(list.is_empty());
    }
}
