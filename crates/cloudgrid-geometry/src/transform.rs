//! Transform Frame (TF) engine.
//!
//! Maintains a directed graph of named reference frames and the 3-D
//! rigid-body transforms (translation + quaternion rotation) that relate
//! them.  Given any two frame names the engine composes a chain of
//! transforms via BFS and applies the result to whole point clouds.
//!
//! The pipeline never talks to the graph directly; it goes through the
//! [`FrameTransformer`] trait so tests (and alternative transform sources)
//! can slot in behind the same seam.
//!
//! # Example
//!
//! ```rust
//! use cloudgrid_geometry::transform::{TfTree, Transform3D, Vec3, Quaternion, FrameTransformer};
//! use cloudgrid_types::{Point3, PointCloud};
//!
//! let mut tf = TfTree::new();
//! tf.set_transform("map", "laser",
//!     Transform3D::new(Vec3::new(1.0, 0.0, 0.0), Quaternion::identity()));
//!
//! let cloud = PointCloud::new("laser", vec![Point3::new(0.5, 0.0, 0.0)]);
//! let in_map = tf.transform_cloud(&cloud, "map").unwrap();
//! assert_eq!(in_map.frame_id, "map");
//! assert!((in_map.points[0].x - 1.5).abs() < 1e-5);
//! ```

use std::collections::{HashMap, HashSet, VecDeque};
use std::ops::{Add, Mul, Neg};

use cloudgrid_types::{GridError, Point3, PointCloud};
use tracing::debug;

// ────────────────────────────────────────────────────────────────────────────
// Primitive types
// ────────────────────────────────────────────────────────────────────────────

/// Translation component of a rigid-body transform.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vec3 {
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    pub fn zero() -> Self {
        Self::new(0.0, 0.0, 0.0)
    }

    fn cross(self, rhs: Self) -> Self {
        Self::new(
            self.y * rhs.z - self.z * rhs.y,
            self.z * rhs.x - self.x * rhs.z,
            self.x * rhs.y - self.y * rhs.x,
        )
    }

    fn scaled(self, s: f32) -> Self {
        Self::new(self.x * s, self.y * s, self.z * s)
    }
}

impl Add for Vec3 {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        Self::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl Neg for Vec3 {
    type Output = Self;
    fn neg(self) -> Self {
        Self::new(-self.x, -self.y, -self.z)
    }
}

/// Rotation component, stored as a scalar-first unit quaternion.  Callers
/// must supply normalised values; nothing here re-normalises.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Quaternion {
    pub w: f32,
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Quaternion {
    pub fn new(w: f32, x: f32, y: f32, z: f32) -> Self {
        Self { w, x, y, z }
    }

    pub fn identity() -> Self {
        Self::new(1.0, 0.0, 0.0, 0.0)
    }

    /// Inverse rotation (valid because |q| = 1).
    pub fn conjugate(self) -> Self {
        Self::new(self.w, -self.x, -self.y, -self.z)
    }

    fn vector_part(self) -> Vec3 {
        Vec3::new(self.x, self.y, self.z)
    }

    /// Rotate `v`, expanded to avoid building pure quaternions:
    /// `v' = v + 2w(u × v) + 2u × (u × v)` where `u` is the vector part.
    pub fn rotate(self, v: Vec3) -> Vec3 {
        let u = self.vector_part();
        let uv = u.cross(v);
        v + (uv.scaled(self.w) + u.cross(uv)).scaled(2.0)
    }
}

impl Mul for Quaternion {
    type Output = Self;
    /// Hamilton product; `a * b` rotates by `b` first, then `a`.
    fn mul(self, rhs: Self) -> Self {
        Self::new(
            self.w * rhs.w - self.x * rhs.x - self.y * rhs.y - self.z * rhs.z,
            self.w * rhs.x + self.x * rhs.w + self.y * rhs.z - self.z * rhs.y,
            self.w * rhs.y - self.x * rhs.z + self.y * rhs.w + self.z * rhs.x,
            self.w * rhs.z + self.x * rhs.y - self.y * rhs.x + self.z * rhs.w,
        )
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Transform3D
// ────────────────────────────────────────────────────────────────────────────

/// Pose of one frame relative to another.
///
/// With `self` describing frame B in frame A, [`Transform3D::apply`] takes a
/// point expressed in B to its coordinates in A (rotate, then translate).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform3D {
    pub translation: Vec3,
    pub rotation: Quaternion,
}

impl Transform3D {
    pub fn new(translation: Vec3, rotation: Quaternion) -> Self {
        Self {
            translation,
            rotation,
        }
    }

    pub fn identity() -> Self {
        Self::new(Vec3::zero(), Quaternion::identity())
    }

    /// Chain two transforms: with `self` = T_A_B and `other` = T_B_C the
    /// result is T_A_C.
    pub fn compose(self, other: Self) -> Self {
        Self::new(
            self.translation + self.rotation.rotate(other.translation),
            self.rotation * other.rotation,
        )
    }

    /// Swap the direction of the mapping: B → A becomes A → B.
    pub fn inverse(self) -> Self {
        let rotation = self.rotation.conjugate();
        Self::new(rotation.rotate(-self.translation), rotation)
    }

    /// Map a single point through this transform.
    pub fn apply(self, p: Point3) -> Point3 {
        let out = self.rotation.rotate(Vec3::new(p.x, p.y, p.z)) + self.translation;
        Point3::new(out.x, out.y, out.z)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// FrameTransformer
// ────────────────────────────────────────────────────────────────────────────

/// The narrow seam to the coordinate-transform service.
///
/// # Contract
///
/// * Returns the cloud re-expressed in `target_frame`, with `frame_id`
///   rewritten and all other metadata preserved.
/// * When the cloud is already in `target_frame` the result is an unchanged
///   copy.
/// * Fails with [`GridError::TransformUnavailable`] when the two frames
///   cannot be related; the caller decides how to degrade.
pub trait FrameTransformer {
    /// Re-express `cloud` in `target_frame`.
    fn transform_cloud(&self, cloud: &PointCloud, target_frame: &str)
    -> Result<PointCloud, GridError>;
}

// ────────────────────────────────────────────────────────────────────────────
// TfTree
// ────────────────────────────────────────────────────────────────────────────

/// A directed graph of named reference frames and the [`Transform3D`]s that
/// relate them.
///
/// Frames are identified by arbitrary string names (e.g. `"map"`,
/// `"base_link"`, `"laser"`).  Edges are directional, but registering
/// `"A" → "B"` also registers the inverse edge `"B" → "A"` so that the
/// reverse leg of a crop-and-downsample round trip always resolves.
///
/// [`TfTree::lookup`] performs BFS to find the shortest path from source to
/// target and returns the composed transform.
#[derive(Debug, Default)]
pub struct TfTree {
    /// `edges[from][to] = Transform3D`
    edges: HashMap<String, HashMap<String, Transform3D>>,
}

impl TfTree {
    /// Create an empty frame graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register or update the transform from `parent_frame` to
    /// `child_frame`, together with its inverse edge.
    pub fn set_transform(
        &mut self,
        parent_frame: &str,
        child_frame: &str,
        transform: Transform3D,
    ) {
        self.edges
            .entry(parent_frame.to_string())
            .or_default()
            .insert(child_frame.to_string(), transform);
        self.edges
            .entry(child_frame.to_string())
            .or_default()
            .insert(parent_frame.to_string(), transform.inverse());
    }

    /// Compute the composed [`Transform3D`] that maps points in
    /// `source_frame` into `target_frame`.
    ///
    /// Returns `None` if no path exists between the two frames.
    pub fn lookup(&self, source_frame: &str, target_frame: &str) -> Option<Transform3D> {
        if source_frame == target_frame {
            return Some(Transform3D::identity());
        }

        // BFS from the target side; each queue entry carries the transform
        // chained from target_frame out to that frame, so the first hit on
        // source_frame is the mapping of source-frame points into the
        // target frame.
        let mut visited: HashSet<String> = HashSet::from([target_frame.to_string()]);
        let mut queue: VecDeque<(String, Transform3D)> =
            VecDeque::from([(target_frame.to_string(), Transform3D::identity())]);

        while let Some((frame, acc)) = queue.pop_front() {
            let Some(neighbours) = self.edges.get(&frame) else {
                continue;
            };
            for (neighbour, edge) in neighbours {
                if !visited.insert(neighbour.clone()) {
                    continue;
                }
                let chained = acc.compose(*edge);
                if neighbour == source_frame {
                    return Some(chained);
                }
                queue.push_back((neighbour.clone(), chained));
            }
        }

        None
    }
}

impl FrameTransformer for TfTree {
    fn transform_cloud(
        &self,
        cloud: &PointCloud,
        target_frame: &str,
    ) -> Result<PointCloud, GridError> {
        if cloud.frame_id == target_frame {
            return Ok(cloud.clone());
        }
        let tf = self.lookup(&cloud.frame_id, target_frame).ok_or_else(|| {
            debug!(from = %cloud.frame_id, to = target_frame, "no path in frame graph");
            GridError::TransformUnavailable {
                from: cloud.frame_id.clone(),
                to: target_frame.to_string(),
            }
        })?;
        let points = cloud.points.iter().map(|p| tf.apply(*p)).collect();
        Ok(cloud.derive_in_frame(target_frame, points))
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::FRAC_1_SQRT_2;

    fn assert_near(actual: f32, expected: f32) {
        assert!(
            (actual - expected).abs() < 1e-4,
            "expected ~{expected}, got {actual}"
        );
    }

    /// Quarter turn about +Z.
    fn yaw90() -> Quaternion {
        Quaternion::new(FRAC_1_SQRT_2, 0.0, 0.0, FRAC_1_SQRT_2)
    }

    fn shift(x: f32, y: f32, z: f32) -> Transform3D {
        Transform3D::new(Vec3::new(x, y, z), Quaternion::identity())
    }

    // ── rotation and composition ────────────────────────────────────────────

    #[test]
    fn identity_rotation_leaves_vector_alone() {
        let v = Quaternion::identity().rotate(Vec3::new(-2.0, 0.5, 7.0));
        assert_near(v.x, -2.0);
        assert_near(v.y, 0.5);
        assert_near(v.z, 7.0);
    }

    #[test]
    fn quarter_turn_about_z_sends_x_to_y() {
        let v = yaw90().rotate(Vec3::new(1.0, 0.0, 0.0));
        assert_near(v.x, 0.0);
        assert_near(v.y, 1.0);
        assert_near(v.z, 0.0);
    }

    #[test]
    fn compose_adds_pure_translations() {
        let chained = shift(1.0, 0.0, 0.0).compose(shift(2.0, 0.0, 0.0));
        assert_near(chained.translation.x, 3.0);
    }

    #[test]
    fn inverse_round_trips_a_point() {
        let tf = Transform3D::new(Vec3::new(1.0, -2.0, 0.5), yaw90());
        let p = Point3::new(3.0, 4.0, 5.0);
        let back = tf.inverse().apply(tf.apply(p));
        assert_near(back.x, p.x);
        assert_near(back.y, p.y);
        assert_near(back.z, p.z);
    }

    #[test]
    fn apply_offsets_by_translation() {
        let p = shift(1.0, 2.0, 3.0).apply(Point3::zero());
        assert_near(p.x, 1.0);
        assert_near(p.y, 2.0);
        assert_near(p.z, 3.0);
    }

    // ── frame graph ─────────────────────────────────────────────────────────

    #[test]
    fn lookup_same_frame_is_identity() {
        let tf = TfTree::new();
        assert_eq!(tf.lookup("map", "map"), Some(Transform3D::identity()));
    }

    #[test]
    fn lookup_disconnected_frames_fails() {
        let mut tf = TfTree::new();
        tf.set_transform("map", "base_link", shift(1.0, 0.0, 0.0));
        assert!(tf.lookup("map", "ghost_frame").is_none());
    }

    #[test]
    fn set_transform_registers_both_directions() {
        let mut tf = TfTree::new();
        // base_link sits 1 m forward of the map origin.
        tf.set_transform("map", "base_link", shift(1.0, 0.0, 0.0));

        let to_map = tf.lookup("base_link", "map").unwrap();
        assert_near(to_map.apply(Point3::zero()).x, 1.0);

        let to_base = tf.lookup("map", "base_link").unwrap();
        assert_near(to_base.apply(Point3::new(1.0, 0.0, 0.0)).x, 0.0);
    }

    #[test]
    fn lookup_chains_across_intermediate_frame() {
        let mut tf = TfTree::new();
        tf.set_transform("map", "base_link", shift(1.0, 0.0, 0.0));
        tf.set_transform("base_link", "laser", shift(0.5, 0.0, 0.0));

        let laser_to_map = tf.lookup("laser", "map").unwrap();
        assert_near(laser_to_map.apply(Point3::zero()).x, 1.5);
    }

    // ── cloud transform seam ────────────────────────────────────────────────

    #[test]
    fn transform_cloud_same_frame_is_copy() {
        let tf = TfTree::new();
        let cloud = PointCloud::new("laser", vec![Point3::new(1.0, 2.0, 3.0)]);
        let out = tf.transform_cloud(&cloud, "laser").unwrap();
        assert_eq!(out.points, cloud.points);
        assert_eq!(out.id, cloud.id);
    }

    #[test]
    fn transform_cloud_rewrites_frame_and_points() {
        let mut tf = TfTree::new();
        tf.set_transform("map", "laser", shift(2.0, 0.0, 0.0));
        let cloud = PointCloud::new("laser", vec![Point3::zero()]);
        let out = tf.transform_cloud(&cloud, "map").unwrap();
        assert_eq!(out.frame_id, "map");
        assert_eq!(out.stamp, cloud.stamp);
        assert_near(out.points[0].x, 2.0);
    }

    #[test]
    fn transform_cloud_unknown_frame_fails() {
        let tf = TfTree::new();
        let cloud = PointCloud::new("laser", vec![Point3::zero()]);
        let err = tf.transform_cloud(&cloud, "map").unwrap_err();
        assert!(matches!(err, GridError::TransformUnavailable { .. }));
    }

    #[test]
    fn transform_cloud_round_trip_restores_points() {
        let mut tf = TfTree::new();
        tf.set_transform("map", "laser", Transform3D::new(Vec3::new(1.0, -1.0, 0.0), yaw90()));

        let cloud = PointCloud::new("laser", vec![Point3::new(0.3, 0.7, -0.2)]);
        let there = tf.transform_cloud(&cloud, "map").unwrap();
        let back = tf.transform_cloud(&there, "laser").unwrap();
        assert_near(back.points[0].x, 0.3);
        assert_near(back.points[0].y, 0.7);
        assert_near(back.points[0].z, -0.2);
    }
}
