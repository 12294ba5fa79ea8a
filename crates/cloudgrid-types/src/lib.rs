use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Sentinel region id that commands "discard every stored region".
///
/// A [`GridRegion`] carrying this id is never stored; it is interpreted as a
/// clear-all command by the registry.
pub const CLEAR_ALL_ID: i32 = -1;

/// A point in 3-D space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Point3 {
    /// Create a new point.
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    /// The origin.
    pub fn zero() -> Self {
        Self::new(0.0, 0.0, 0.0)
    }
}

/// An ordered 3-D point cloud message.
///
/// Carries the coordinate frame its points are expressed in plus per-message
/// metadata (`id`, `stamp`) that must propagate unchanged to every cloud
/// derived from it (cropped, downsampled, merged, clustered).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PointCloud {
    pub id: Uuid,
    pub stamp: DateTime<Utc>,
    /// Coordinate frame the points are expressed in (e.g. `"base_link"`).
    pub frame_id: String,
    pub points: Vec<Point3>,
}

impl PointCloud {
    /// Create a fresh cloud with a new id and the current time stamp.
    pub fn new(frame_id: impl Into<String>, points: Vec<Point3>) -> Self {
        Self {
            id: Uuid::new_v4(),
            stamp: Utc::now(),
            frame_id: frame_id.into(),
            points,
        }
    }

    /// Create an empty cloud in the given frame.
    pub fn empty(frame_id: impl Into<String>) -> Self {
        Self::new(frame_id, Vec::new())
    }

    /// Derive a cloud with new points, keeping this cloud's frame and
    /// metadata.
    pub fn derive(&self, points: Vec<Point3>) -> Self {
        Self {
            id: self.id,
            stamp: self.stamp,
            frame_id: self.frame_id.clone(),
            points,
        }
    }

    /// Derive a cloud with new points expressed in a different frame,
    /// keeping this cloud's metadata.
    pub fn derive_in_frame(&self, frame_id: impl Into<String>, points: Vec<Point3>) -> Self {
        Self {
            id: self.id,
            stamp: self.stamp,
            frame_id: frame_id.into(),
            points,
        }
    }

    /// Number of points in the cloud.
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// True when the cloud holds no points (a valid state, not an error).
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// A named axis-aligned crop-and-downsample region ("grid").
///
/// The region covers `center ± extent / 2` per axis, expressed in
/// `frame_id`.  Incoming clouds are cropped to those bounds and reduced to
/// one point per cubic voxel of edge `resolution`.
///
/// Regions are immutable value snapshots; the registry owns them for their
/// lifetime and replaces rather than mutates them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridRegion {
    /// Unique among live regions.  [`CLEAR_ALL_ID`] is reserved as the
    /// clear-all command and never stored.
    pub id: i32,
    /// Frame the center and extent are expressed in.
    pub frame_id: String,
    /// Region center.
    pub center: Point3,
    /// Full width along each axis.
    pub extent: Point3,
    /// Edge length of the downsampling voxel.  Must be positive.
    pub resolution: f32,
}

impl GridRegion {
    /// Create a region.
    pub fn new(
        id: i32,
        frame_id: impl Into<String>,
        center: Point3,
        extent: Point3,
        resolution: f32,
    ) -> Self {
        Self {
            id,
            frame_id: frame_id.into(),
            center,
            extent,
            resolution,
        }
    }

    /// True when this region is the clear-all command rather than a real
    /// region.
    pub fn is_clear_all(&self) -> bool {
        self.id == CLEAR_ALL_ID
    }

    /// Inclusive `(min, max)` crop bounds along one axis, derived from
    /// `center ± extent / 2`.
    pub fn bounds(&self, axis_center: f32, axis_extent: f32) -> (f32, f32) {
        (
            axis_center - axis_extent / 2.0,
            axis_center + axis_extent / 2.0,
        )
    }

    /// Validate the region's numeric configuration.
    ///
    /// # Errors
    ///
    /// Returns [`GridError::InvalidRegionConfig`] when `resolution` is not a
    /// positive finite number.  A zero or negative voxel edge must never
    /// reach the downsampler.
    pub fn validate(&self) -> Result<(), GridError> {
        if !self.resolution.is_finite() || self.resolution <= 0.0 {
            return Err(GridError::InvalidRegionConfig {
                id: self.id,
                details: format!("resolution must be positive, got {}", self.resolution),
            });
        }
        Ok(())
    }
}

/// Error taxonomy for the region downsampling pipeline.
///
/// None of these are fatal to the process: a transform failure skips one
/// region for one cloud, a bad region command is rejected with the registry
/// left untouched, and channel errors are reported and dropped.
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum GridError {
    #[error("no transform from '{from}' to '{to}'")]
    TransformUnavailable { from: String, to: String },

    #[error("invalid region config (id {id}): {details}")]
    InvalidRegionConfig { id: i32, details: String },

    #[error("channel error: {0}")]
    Channel(String),
}
