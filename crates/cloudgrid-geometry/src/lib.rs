//! `cloudgrid-geometry` – Frames & Filters
//!
//! Pure geometric building blocks for the region downsampling pipeline.
//!
//! # Modules
//!
//! - [`transform`] – rigid-body 3-D transforms, a directed frame graph
//!   ([`transform::TfTree`]) and the [`transform::FrameTransformer`] seam
//!   used to move whole clouds between frames.
//! - [`filter`] – inclusive per-axis passthrough crop and centroid
//!   voxel-grid downsampling.

pub mod filter;
pub mod transform;

pub use filter::{Axis, crop, voxel_downsample};
pub use transform::{FrameTransformer, Quaternion, TfTree, Transform3D, Vec3};
