//! [`DownsampleNode`] – the serialized event loop.
//!
//! Owns the registry, coordinator and clusterer, and drains two channels:
//! region commands and input clouds.  Commands are drained with priority;
//! one cloud is fully processed (snapshot → per-region merge → paced
//! cluster emission) before the next is accepted.  Clouds arriving during a
//! long emission queue in the bounded cloud channel, so a run always
//! observes exactly one registry snapshot and mutations land on the *next*
//! cloud, never the in-flight one.

use cloudgrid_geometry::transform::FrameTransformer;
use cloudgrid_pipeline::{CloudBus, CloudClusterer, GridRegistry, PipelineCoordinator};
use cloudgrid_types::{GridRegion, PointCloud};
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::config::NodeConfig;

/// Queue depth for each input channel.  Cloud producers back-pressure when
/// the node is mid-emission.
const CHANNEL_CAPACITY: usize = 16;

/// Sending halves of the node's input channels, handed to the cloud and
/// region-command sources.
#[derive(Clone)]
pub struct NodeHandle {
    pub commands: mpsc::Sender<GridRegion>,
    pub clouds: mpsc::Sender<PointCloud>,
}

/// The region downsampling node: registry + pipeline + output shaping
/// behind two input channels.
pub struct DownsampleNode<T: FrameTransformer> {
    registry: GridRegistry,
    coordinator: PipelineCoordinator<T>,
    clusterer: CloudClusterer,
    command_rx: mpsc::Receiver<GridRegion>,
    cloud_rx: mpsc::Receiver<PointCloud>,
}

impl<T: FrameTransformer> DownsampleNode<T> {
    /// Build a node from startup configuration, a transform source and the
    /// output bus.  Returns the node plus the input-channel handle.
    pub fn new(config: &NodeConfig, transformer: T, bus: CloudBus) -> (Self, NodeHandle) {
        let (command_tx, command_rx) = mpsc::channel(CHANNEL_CAPACITY);
        let (cloud_tx, cloud_rx) = mpsc::channel(CHANNEL_CAPACITY);
        let node = Self {
            registry: GridRegistry::with_dedup(config.dedup_on_update),
            coordinator: PipelineCoordinator::new(transformer, bus.clone()),
            clusterer: CloudClusterer::new(
                config.max_points,
                config.rate,
                config.trailing_empty_cluster,
                bus,
            ),
            command_rx,
            cloud_rx,
        };
        (
            node,
            NodeHandle {
                commands: command_tx,
                clouds: cloud_tx,
            },
        )
    }

    /// Run the node until both input channels close.
    ///
    /// The `biased` select gives region commands priority, so pending
    /// mutations are applied before the next cloud's snapshot is taken.
    /// The paced emission awaits inside this loop, which is the
    /// serialization point: no new cloud is started while clusters of the
    /// previous one are still going out.
    pub async fn run(mut self) {
        info!("downsample node running");
        let mut commands_open = true;
        loop {
            tokio::select! {
                biased;

                cmd = self.command_rx.recv(), if commands_open => match cmd {
                    Some(region) => {
                        if let Err(e) = self.registry.add_or_update(region) {
                            warn!(error = %e, "region command rejected");
                        }
                    }
                    None => commands_open = false,
                },

                cloud = self.cloud_rx.recv() => match cloud {
                    Some(cloud) => {
                        let merged = self.coordinator.process_cloud(&self.registry, &cloud);
                        self.clusterer.emit(&merged).await;
                    }
                    None => break,
                },
            }
        }
        info!("downsample node stopped");
    }
}
