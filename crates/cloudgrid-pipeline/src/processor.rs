//! The per-region processing stage.
//!
//! Maps one input cloud through one region's spatial filter and resolution:
//! transform into the region frame, crop x → y → z, voxel-downsample at the
//! region's resolution, transform back into the input cloud's frame.
//!
//! The stage is a pure function of its inputs plus the transform source, so
//! it composes and unit-tests independently of the cloud stream.

use cloudgrid_geometry::filter::{Axis, crop, voxel_downsample};
use cloudgrid_geometry::transform::FrameTransformer;
use cloudgrid_types::{GridError, GridRegion, PointCloud};
use tracing::debug;

/// Produce the downsampled subset of `cloud` that falls inside `region`,
/// expressed back in `cloud`'s own frame.
///
/// A region whose bounds admit zero points yields an empty cloud, not an
/// error.  The result carries the input cloud's metadata.
///
/// # Errors
///
/// * [`GridError::InvalidRegionConfig`] – non-positive or non-finite
///   resolution; checked here so a bad value never reaches the downsampler.
/// * [`GridError::TransformUnavailable`] – either leg of the frame
///   round trip failed.  The caller skips this region for this cloud.
pub fn process_region<T: FrameTransformer>(
    transformer: &T,
    cloud: &PointCloud,
    region: &GridRegion,
) -> Result<PointCloud, GridError> {
    region.validate()?;

    let in_region_frame = transformer.transform_cloud(cloud, &region.frame_id)?;

    let (min_x, max_x) = region.bounds(region.center.x, region.extent.x);
    let (min_y, max_y) = region.bounds(region.center.y, region.extent.y);
    let (min_z, max_z) = region.bounds(region.center.z, region.extent.z);
    debug!(id = region.id, min_x, max_x, min_y, max_y, min_z, max_z, "region crop bounds");

    // Filter order: x -> y -> z -> downsample.
    let after_x = crop(&in_region_frame, Axis::X, min_x, max_x);
    let after_y = crop(&after_x, Axis::Y, min_y, max_y);
    let after_z = crop(&after_y, Axis::Z, min_z, max_z);

    let reduced = voxel_downsample(&after_z, region.resolution);

    let restored = transformer.transform_cloud(&reduced, &cloud.frame_id)?;
    debug!(id = region.id, points = restored.len(), "region contribution");
    Ok(restored)
}
