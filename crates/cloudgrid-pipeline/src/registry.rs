//! [`GridRegistry`] – the live collection of crop-and-downsample regions.
//!
//! Mutated by an asynchronous command stream (add / update / clear) and read
//! as an insertion-ordered snapshot at the start of every cloud's pipeline
//! run.  The registry is plain owned state: both event sources feed it
//! through the single node task, so no lock is involved.
//!
//! # The update-then-append quirk
//!
//! The upstream ROS nodelet (`jsk_pcl_ros` `VoxelGridDownsampleManager`)
//! overwrites a matching existing entry on the add path and then
//! unconditionally appends the incoming region as well, so an update leaves
//! two entries with the same id.  That behavior is preserved by default for
//! compatibility.  Constructing the registry with `dedup_on_update = true`
//! switches to true replace semantics.

use cloudgrid_types::{GridError, GridRegion};
use tracing::{info, warn};

/// What a successfully applied command did to the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistryChange {
    /// The region was stored under a previously unused id.
    Added,
    /// An existing entry with the same id was overwritten (and, in compat
    /// mode, a duplicate entry appended).
    Updated,
    /// The clear-all sentinel discarded every stored region.
    Cleared,
}

/// In-memory, insertion-ordered collection of [`GridRegion`]s.
#[derive(Debug, Default)]
pub struct GridRegistry {
    regions: Vec<GridRegion>,
    /// When true, updating an existing id replaces it instead of also
    /// appending a duplicate entry.
    dedup_on_update: bool,
}

impl GridRegistry {
    /// Create an empty registry with the upstream-compatible update behavior.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty registry, choosing the update behavior explicitly.
    pub fn with_dedup(dedup_on_update: bool) -> Self {
        Self {
            regions: Vec::new(),
            dedup_on_update,
        }
    }

    /// Apply one region command.
    ///
    /// * id == [`CLEAR_ALL_ID`][cloudgrid_types::CLEAR_ALL_ID] – discard all
    ///   stored regions.
    /// * known id – overwrite the stored entry's fields; in compat mode the
    ///   incoming region is appended as well.
    /// * new id – append.
    ///
    /// # Errors
    ///
    /// Returns [`GridError::InvalidRegionConfig`] for a non-positive or
    /// non-finite resolution.  The registry is left unchanged.
    pub fn add_or_update(&mut self, region: GridRegion) -> Result<RegistryChange, GridError> {
        if region.is_clear_all() {
            info!(count = self.regions.len(), "clearing all regions");
            self.regions.clear();
            return Ok(RegistryChange::Cleared);
        }

        if let Err(e) = region.validate() {
            warn!(id = region.id, error = %e, "rejecting region command");
            return Err(e);
        }

        let mut updated = false;
        for stored in &mut self.regions {
            if stored.id == region.id {
                info!(id = region.id, "updating region");
                *stored = region.clone();
                updated = true;
            }
        }

        if updated && self.dedup_on_update {
            return Ok(RegistryChange::Updated);
        }

        info!(id = region.id, frame = %region.frame_id, "adding region");
        self.regions.push(region);
        Ok(if updated {
            RegistryChange::Updated
        } else {
            RegistryChange::Added
        })
    }

    /// Insertion-ordered copy of the live regions for read-only iteration.
    ///
    /// A cloud's whole pipeline run works off one snapshot; mutations made
    /// while that cloud is in flight become visible only to the next cloud.
    pub fn snapshot(&self) -> Vec<GridRegion> {
        self.regions.clone()
    }

    /// Number of stored entries (duplicates included in compat mode).
    pub fn len(&self) -> usize {
        self.regions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }
}
