//! Passthrough crop and voxel-grid downsampling.
//!
//! Both primitives are pure functions over [`PointCloud`] values: the input
//! is never mutated and the output carries the input's frame and metadata.
//!
//! # Example
//!
//! ```rust
//! use cloudgrid_geometry::filter::{Axis, crop, voxel_downsample};
//! use cloudgrid_types::{Point3, PointCloud};
//!
//! let cloud = PointCloud::new("map", vec![
//!     Point3::new(0.1, 0.0, 0.0),
//!     Point3::new(0.2, 0.0, 0.0),
//!     Point3::new(5.0, 0.0, 0.0),
//! ]);
//!
//! let cropped = crop(&cloud, Axis::X, -1.0, 1.0);
//! assert_eq!(cropped.len(), 2);
//!
//! let reduced = voxel_downsample(&cropped, 1.0);
//! assert_eq!(reduced.len(), 1);
//! ```

use std::collections::HashMap;

use cloudgrid_types::{Point3, PointCloud};

/// A coordinate axis selector for the passthrough crop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    /// The point's coordinate along this axis.
    pub fn component(self, p: Point3) -> f32 {
        match self {
            Axis::X => p.x,
            Axis::Y => p.y,
            Axis::Z => p.z,
        }
    }
}

/// Passthrough filter: keep points whose coordinate on `axis` lies within
/// `[min, max]` (inclusive on both ends).
///
/// Point order is preserved.  The result carries the input cloud's frame and
/// metadata.
pub fn crop(cloud: &PointCloud, axis: Axis, min: f32, max: f32) -> PointCloud {
    let points = cloud
        .points
        .iter()
        .copied()
        .filter(|p| {
            let v = axis.component(*p);
            v >= min && v <= max
        })
        .collect();
    cloud.derive(points)
}

/// Voxel-grid reduction: at most one representative point per occupied cubic
/// cell of edge `leaf`.
///
/// The representative is the centroid of all points that fell into the cell.
/// Output order follows first occupation of each voxel, so downsampling a
/// sorted cloud stays deterministic.
///
/// `leaf` must be positive; the pipeline validates region resolutions before
/// calling.
pub fn voxel_downsample(cloud: &PointCloud, leaf: f32) -> PointCloud {
    debug_assert!(leaf > 0.0, "voxel leaf size must be positive");
    if cloud.is_empty() {
        return cloud.derive(Vec::new());
    }

    // Accumulate per-voxel sums in first-occupation order.
    let mut index: HashMap<(i64, i64, i64), usize> = HashMap::new();
    let mut cells: Vec<(f64, f64, f64, u32)> = Vec::new();

    for p in &cloud.points {
        let key = (
            (p.x / leaf).floor() as i64,
            (p.y / leaf).floor() as i64,
            (p.z / leaf).floor() as i64,
        );
        let slot = *index.entry(key).or_insert_with(|| {
            cells.push((0.0, 0.0, 0.0, 0));
            cells.len() - 1
        });
        let cell = &mut cells[slot];
        cell.0 += f64::from(p.x);
        cell.1 += f64::from(p.y);
        cell.2 += f64::from(p.z);
        cell.3 += 1;
    }

    let points = cells
        .iter()
        .map(|(sx, sy, sz, n)| {
            let n = f64::from(*n);
            Point3::new((sx / n) as f32, (sy / n) as f32, (sz / n) as f32)
        })
        .collect();
    cloud.derive(points)
}
