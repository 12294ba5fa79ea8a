//! `cloudgrid-pipeline` – The Region Processing Pipeline
//!
//! Takes each incoming point cloud through the live set of crop-and-
//! downsample regions and re-emits the merged result as paced, bounded-size
//! clusters.
//!
//! # Modules
//!
//! - [`bus`] – topic-routed broadcast bus carrying the merged-cloud debug
//!   stream and the clustered output stream.
//! - [`registry`] – the live collection of [`GridRegion`]s, mutated by
//!   add/update/clear commands.
//! - [`processor`] – the per-region stage: transform → crop ×3 →
//!   voxel downsample → transform back.
//! - [`coordinator`] – per-cloud orchestration across all regions.
//! - [`clusterer`] – output shaping: fixed-size slicing and paced emission.
//!
//! [`GridRegion`]: cloudgrid_types::GridRegion

pub mod bus;
pub mod clusterer;
pub mod coordinator;
pub mod processor;
pub mod registry;

pub use bus::{CloudBus, CloudTopic, TopicReceiver};
pub use clusterer::CloudClusterer;
pub use coordinator::PipelineCoordinator;
pub use processor::process_region;
pub use registry::{GridRegistry, RegistryChange};
