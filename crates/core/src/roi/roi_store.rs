use std::sync::{PoisonError, RwLock};

use crate::shared::region::Region;

/// Current region of interest, shared between the control surface and the
/// pipeline.
///
/// The region is stored and returned as one `Copy` value under a lock, so a
/// reader never sees a mix of old and new coordinates.
#[derive(Debug, Default)]
pub struct RoiStore {
    region: RwLock<Option<Region>>,
}

impl RoiStore {
    pub fn new(initial: Option<Region>) -> Self {
        Self {
            region: RwLock::new(initial),
        }
    }

    pub fn set(&self, region: Region) {
        *self.region.write().unwrap_or_else(PoisonError::into_inner) = Some(region);
    }

    pub fn clear(&self) {
        *self.region.write().unwrap_or_else(PoisonError::into_inner) = None;
    }

    /// Snapshot of the region at the time of the call.
    pub fn get(&self) -> Option<Region> {
        *self.region.read().unwrap_or_else(PoisonError::into_inner)
    }
}
