//! Resolve Pass
//!
//! Composites each pixel's depth-sorted fragments back-to-front over the
//! opaque scene color and writes the result to the output target.
//!
//! # Data flow
//! ```text
//! scene color ─► overflow ─► entry[n-1] ─► ... ─► entry[0] ─► output
//!                (farthest)                       (nearest)
//! ```

use rayon::prelude::*;
use strata_core::{Result, StrataError};

use crate::targets::ColorBuffer;
use crate::technique::TechniqueStorage;

pub struct ResolvePass;

impl ResolvePass {
    pub fn run(
        storage: &mut TechniqueStorage,
        scene: &ColorBuffer,
        output: &mut ColorBuffer,
    ) -> Result<()> {
        let expected = storage.resolution();
        for actual in [scene.resolution(), output.resolution()] {
            if actual != expected {
                return Err(StrataError::TargetSizeMismatch { expected, actual });
            }
        }

        match storage {
            TechniqueStorage::Bucket(store) => {
                output
                    .pixels_mut()
                    .par_iter_mut()
                    .zip(store.buckets_mut().par_iter_mut())
                    .zip(scene.pixels().par_iter())
                    .for_each(|((out, bucket), background)| {
                        *out = bucket.get_mut().composite(*background);
                    });
            }
            TechniqueStorage::SortedList(list) => {
                list.sort();
                let list = &*list;
                output
                    .pixels_mut()
                    .par_iter_mut()
                    .zip(scene.pixels().par_iter())
                    .enumerate()
                    .for_each(|(pixel, (out, background))| {
                        *out = list.composite(pixel, *background);
                    });
            }
        }

        log::trace!("ResolvePass: composited {}x{}", expected.0, expected.1);
        Ok(())
    }
}
