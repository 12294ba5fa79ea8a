//! `cloudgrid` – streaming point-cloud region downsampler.
//!
//! Boots the node: structured logging first, then configuration, then the
//! serialized processing loop.  Cloud and region-command sources attach
//! through the [`node::NodeHandle`] channels; processed output leaves on the
//! [`CloudBus`] `Merged` (debug) and `Clusters` topics.

mod config;
mod node;
mod telemetry;

use std::path::Path;

use cloudgrid_geometry::transform::TfTree;
use cloudgrid_pipeline::CloudBus;
use tracing::info;

use crate::config::NodeConfig;
use crate::node::DownsampleNode;

#[tokio::main]
async fn main() {
    let _guard = telemetry::init_tracing("cloudgrid");

    let cfg = match NodeConfig::load_from(Path::new("cloudgrid.toml")) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("[cloudgrid] configuration error: {e}");
            std::process::exit(1);
        }
    };
    info!(
        max_points = cfg.max_points,
        rate = cfg.rate,
        "starting downsample node"
    );

    let bus = CloudBus::default();
    let (node, handle) = DownsampleNode::new(&cfg, TfTree::new(), bus);

    // The handle is where cloud and region-command sources plug in; it must
    // outlive the loop or the node sees closed channels and stops.
    let _sources = handle;

    node.run().await;
}
