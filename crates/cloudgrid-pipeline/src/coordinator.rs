//! [`PipelineCoordinator`] – per-cloud orchestration.
//!
//! On each input cloud: take one registry snapshot, run every region through
//! the [`process_region`] stage in snapshot order, concatenate the
//! successful contributions, and publish the merged result on the
//! [`CloudTopic::Merged`] debug lane before clustering.
//!
//! Region failures (missing transform, bad config) are warnings, never
//! pipeline faults: the offending region is skipped for this cloud and the
//! remaining regions still contribute.

use cloudgrid_geometry::transform::FrameTransformer;
use cloudgrid_types::PointCloud;
use tracing::{debug, warn};

use crate::bus::{CloudBus, CloudTopic};
use crate::processor::process_region;
use crate::registry::GridRegistry;

/// Orchestrates one pipeline run per input cloud.
///
/// Owns the transform source and a bus handle; the registry stays with the
/// node task and is borrowed read-only for the duration of one run.
pub struct PipelineCoordinator<T: FrameTransformer> {
    transformer: T,
    bus: CloudBus,
}

impl<T: FrameTransformer> PipelineCoordinator<T> {
    pub fn new(transformer: T, bus: CloudBus) -> Self {
        Self { transformer, bus }
    }

    /// Run `cloud` through every live region and return the merged result.
    ///
    /// The merged cloud is expressed in the input cloud's own frame and
    /// carries its metadata.  Per-region outputs are concatenated in
    /// snapshot order, each region's point order preserved.
    ///
    /// The merged cloud is also published on the `Merged` debug topic —
    /// always, even when empty.  A missing debug subscriber is not an error.
    pub fn process_cloud(&self, registry: &GridRegistry, cloud: &PointCloud) -> PointCloud {
        let snapshot = registry.snapshot();
        let mut merged_points = Vec::new();

        for region in &snapshot {
            match process_region(&self.transformer, cloud, region) {
                Ok(contribution) => {
                    debug!(
                        id = region.id,
                        points = contribution.len(),
                        "region contributed"
                    );
                    merged_points.extend(contribution.points);
                }
                Err(e) => {
                    warn!(id = region.id, error = %e, "skipping region for this cloud");
                }
            }
        }

        let merged = cloud.derive(merged_points);
        debug!(
            regions = snapshot.len(),
            points = merged.len(),
            frame = %merged.frame_id,
            "merged cloud"
        );

        if let Err(e) = self.bus.publish_to(CloudTopic::Merged, merged.clone()) {
            debug!(error = %e, "no merged-cloud subscriber");
        }
        merged
    }
}
