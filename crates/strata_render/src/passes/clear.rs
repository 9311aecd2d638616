//! Clear Pass
//!
//! Resets every pixel's bucket (`count = 0`, transparent overflow) before
//! the first gather write of a frame.

use crate::technique::TechniqueStorage;

pub struct ClearPass;

impl ClearPass {
    pub fn run(storage: &mut TechniqueStorage) {
        match storage {
            TechniqueStorage::Bucket(store) => store.clear(),
            TechniqueStorage::SortedList(list) => list.clear(),
        }
        log::trace!("ClearPass: reset {:?} storage", storage.technique());
    }
}
