//! Fragment Bucket Store
//!
//! Owns one [`PixelBucket`] per pixel, each behind its own lock. The lock is
//! the only synchronization device of the gather phase: exactly one insertion
//! may mutate a given pixel at a time while different pixels proceed
//! independently.
//!
//! Clearing and resolving take `&mut self`, so neither can overlap a gather.

use parking_lot::{Mutex, MutexGuard};
use rayon::prelude::*;
use strata_core::{Result, StrataError};

use crate::bucket::{InsertOutcome, PixelBucket};
use crate::fragment::FragmentRecord;
use crate::settings::{MergePolicy, validate_layers};

pub struct FragmentBucketStore {
    width: u32,
    height: u32,
    capacity: usize,
    buckets: Vec<Mutex<PixelBucket>>,
}

impl FragmentBucketStore {
    /// Allocates `width × height × capacity` fragment entries, all empty.
    pub fn new(width: u32, height: u32, capacity: usize) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(StrataError::InvalidResolution { width, height });
        }
        validate_layers(capacity)?;

        let pixel_count = (width as usize)
            .checked_mul(height as usize)
            .ok_or(StrataError::AllocationFailed {
                what: "bucket store",
                requested: usize::MAX,
            })?;
        let entry_count =
            pixel_count
                .checked_mul(capacity)
                .ok_or(StrataError::AllocationFailed {
                    what: "bucket store",
                    requested: usize::MAX,
                })?;

        let mut buckets = Vec::new();
        buckets
            .try_reserve_exact(pixel_count)
            .map_err(|_| StrataError::AllocationFailed {
                what: "bucket store",
                requested: entry_count,
            })?;
        for _ in 0..pixel_count {
            buckets.push(Mutex::new(PixelBucket::new(capacity)?));
        }

        log::debug!(
            "Allocated bucket store {width}x{height} x {capacity} layers ({entry_count} entries)"
        );

        Ok(Self {
            width,
            height,
            capacity,
            buckets,
        })
    }

    #[inline]
    #[must_use]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[inline]
    #[must_use]
    pub fn height(&self) -> u32 {
        self.height
    }

    #[inline]
    #[must_use]
    pub fn resolution(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Layers per pixel.
    #[inline]
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    #[inline]
    #[must_use]
    pub fn pixel_count(&self) -> usize {
        self.buckets.len()
    }

    /// Total number of fragment slots (`width × height × capacity`).
    #[must_use]
    pub fn storage_len(&self) -> usize {
        self.buckets.iter().map(|b| b.lock().capacity()).sum()
    }

    #[inline]
    #[must_use]
    pub fn index(&self, x: u32, y: u32) -> Option<usize> {
        (x < self.width && y < self.height).then(|| y as usize * self.width as usize + x as usize)
    }

    /// Merge-inserts one record into the bucket at `index` inside that pixel's
    /// critical section.
    #[inline]
    pub fn insert(&self, index: usize, record: FragmentRecord, policy: MergePolicy) -> InsertOutcome {
        let mut bucket = self.buckets[index].lock();
        bucket.insert(record, policy)
    }

    /// Locks and returns the bucket of pixel `(x, y)`.
    #[must_use]
    pub fn bucket(&self, x: u32, y: u32) -> Option<MutexGuard<'_, PixelBucket>> {
        self.index(x, y).map(|i| self.buckets[i].lock())
    }

    /// Lock-free access for passes holding exclusive ownership.
    pub(crate) fn buckets_mut(&mut self) -> &mut [Mutex<PixelBucket>] {
        &mut self.buckets
    }

    /// Resets every bucket to empty.
    pub fn clear(&mut self) {
        self.buckets
            .par_iter_mut()
            .for_each(|bucket| bucket.get_mut().clear());
    }

    /// Number of fragments currently held in explicit storage.
    #[must_use]
    pub fn stored_fragments(&self) -> usize {
        self.buckets.iter().map(|b| b.lock().count()).sum()
    }
}

impl std::fmt::Debug for FragmentBucketStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FragmentBucketStore")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("capacity", &self.capacity)
            .finish_non_exhaustive()
    }
}
