//! Technique Storage
//!
//! Per-technique fragment storage as a tagged variant. The renderer owns one
//! of these and hands it to the passes by reference; there is no shared
//! trait object between the techniques.

use strata_core::Result;

use crate::settings::OitTechnique;
use crate::sorted::SortedFragmentList;
use crate::store::FragmentBucketStore;

#[derive(Debug)]
pub enum TechniqueStorage {
    Bucket(FragmentBucketStore),
    SortedList(SortedFragmentList),
}

impl TechniqueStorage {
    /// Allocates storage for `technique` at the given resolution.
    pub fn allocate(
        technique: OitTechnique,
        width: u32,
        height: u32,
        num_layers: usize,
    ) -> Result<Self> {
        Ok(match technique {
            OitTechnique::Bucket => {
                Self::Bucket(FragmentBucketStore::new(width, height, num_layers)?)
            }
            OitTechnique::SortedList => Self::SortedList(SortedFragmentList::new(width, height)?),
        })
    }

    #[must_use]
    pub fn technique(&self) -> OitTechnique {
        match self {
            Self::Bucket(_) => OitTechnique::Bucket,
            Self::SortedList(_) => OitTechnique::SortedList,
        }
    }

    #[must_use]
    pub fn resolution(&self) -> (u32, u32) {
        match self {
            Self::Bucket(store) => store.resolution(),
            Self::SortedList(list) => list.resolution(),
        }
    }

    #[must_use]
    pub fn as_bucket_store(&self) -> Option<&FragmentBucketStore> {
        match self {
            Self::Bucket(store) => Some(store),
            Self::SortedList(_) => None,
        }
    }

    #[must_use]
    pub fn as_sorted_list(&self) -> Option<&SortedFragmentList> {
        match self {
            Self::SortedList(list) => Some(list),
            Self::Bucket(_) => None,
        }
    }
}
