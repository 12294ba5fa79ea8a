//! [`CloudClusterer`] – output shaping and paced emission.
//!
//! Splits a merged cloud into contiguous windows of at most `max_points`
//! points, tags each with its zero-based index appended to the frame id
//! (`"<frame> <i>"`), and publishes them in order on the
//! [`CloudTopic::Clusters`] lane with a `1 / rate` pause after every
//! emission, the last included.
//!
//! # The trailing-empty-cluster quirk
//!
//! The upstream ROS nodelet computes the cluster count as
//! `n / max_points + 1` with integer division.  Whenever `n` is an exact
//! multiple of `max_points` — including `n == 0` — that over-counts by one
//! and emits a trailing empty cluster.  The behavior is preserved by
//! default and pinned by tests; construct with
//! `trailing_empty_cluster = false` for the corrected `ceil(n / max_points)`
//! count.

use std::time::Duration;

use cloudgrid_types::PointCloud;
use tokio::time::sleep;
use tracing::{debug, info};

use crate::bus::{CloudBus, CloudTopic};

/// Fixed-size slicing and paced re-publication of merged clouds.
///
/// `max_points` and `rate` are read once at startup and fixed thereafter.
pub struct CloudClusterer {
    max_points: usize,
    rate: f64,
    trailing_empty_cluster: bool,
    bus: CloudBus,
}

impl CloudClusterer {
    /// Create a clusterer.
    ///
    /// `max_points` is the cluster size bound (must be ≥ 1); `rate` is the
    /// emission rate in clusters per second (must be positive).
    pub fn new(max_points: usize, rate: f64, trailing_empty_cluster: bool, bus: CloudBus) -> Self {
        assert!(max_points >= 1, "max_points must be at least 1");
        assert!(rate > 0.0, "rate must be positive");
        Self {
            max_points,
            rate,
            trailing_empty_cluster,
            bus,
        }
    }

    /// Number of clusters a cloud of `n` points produces.
    pub fn cluster_count(&self, n: usize) -> usize {
        if self.trailing_empty_cluster {
            // Upstream behavior: integer division plus one, which yields an
            // extra empty cluster when n is an exact multiple of max_points.
            n / self.max_points + 1
        } else {
            n.div_ceil(self.max_points)
        }
    }

    /// Slice `merged` into its ordered cluster sequence without emitting.
    ///
    /// Cluster `i` holds points `[i * max_points, min((i+1) * max_points, n))`
    /// and carries the merged cloud's metadata with the frame rewritten to
    /// `"<frame> <i>"`.
    pub fn clusters(&self, merged: &PointCloud) -> Vec<PointCloud> {
        let n = merged.len();
        let count = self.cluster_count(n);
        (0..count)
            .map(|i| {
                let start = i * self.max_points;
                let end = ((i + 1) * self.max_points).min(n);
                let slice = if start < end {
                    merged.points[start..end].to_vec()
                } else {
                    Vec::new()
                };
                merged.derive_in_frame(format!("{} {}", merged.frame_id, i), slice)
            })
            .collect()
    }

    /// Publish all clusters of `merged` in index order, pausing `1 / rate`
    /// after each emission (including the last).
    ///
    /// Returns the number of clusters emitted.  Missing subscribers on the
    /// cluster topic are downgraded to a debug log, so emission never fails.
    pub async fn emit(&self, merged: &PointCloud) -> usize {
        let clusters = self.clusters(merged);
        info!(
            points = merged.len(),
            clusters = clusters.len(),
            "encoding merged cloud into clusters"
        );

        let pause = Duration::from_secs_f64(1.0 / self.rate);
        for cluster in clusters.iter() {
            debug!(frame = %cluster.frame_id, points = cluster.len(), "emitting cluster");
            if let Err(e) = self.bus.publish_to(CloudTopic::Clusters, cluster.clone()) {
                debug!(error = %e, "no cluster subscriber");
            }
            sleep(pause).await;
        }
        clusters.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cloudgrid_types::Point3;
    use tokio::time::Instant;

    fn cloud_of(n: usize) -> PointCloud {
        let points = (0..n).map(|i| Point3::new(i as f32, 0.0, 0.0)).collect();
        PointCloud::new("F", points)
    }

    fn clusterer(max_points: usize, trailing: bool) -> (CloudClusterer, CloudBus) {
        let bus = CloudBus::default();
        (
            CloudClusterer::new(max_points, 1.0, trailing, bus.clone()),
            bus,
        )
    }

    // ── slicing ─────────────────────────────────────────────────────────────

    #[test]
    fn five_points_max_two_gives_sizes_2_2_1() {
        let (clusterer, _bus) = clusterer(2, true);
        let clusters = clusterer.clusters(&cloud_of(5));
        let sizes: Vec<usize> = clusters.iter().map(|c| c.len()).collect();
        assert_eq!(sizes, vec![2, 2, 1]);
        let frames: Vec<&str> = clusters.iter().map(|c| c.frame_id.as_str()).collect();
        assert_eq!(frames, vec!["F 0", "F 1", "F 2"]);
    }

    #[test]
    fn concatenated_clusters_reproduce_merged_cloud() {
        let (clusterer, _bus) = clusterer(3, true);
        let merged = cloud_of(10);
        let clusters = clusterer.clusters(&merged);
        let rejoined: Vec<Point3> = clusters.iter().flat_map(|c| c.points.clone()).collect();
        assert_eq!(rejoined, merged.points);
    }

    #[test]
    fn exact_multiple_yields_trailing_empty_cluster() {
        // Pinned upstream behavior: n == max_points produces 2 clusters,
        // one full and one empty.
        let (clusterer, _bus) = clusterer(300, true);
        let clusters = clusterer.clusters(&cloud_of(300));
        assert_eq!(clusters.len(), 2);
        assert_eq!(clusters[0].len(), 300);
        assert_eq!(clusters[1].len(), 0);
        assert_eq!(clusters[1].frame_id, "F 1");
    }

    #[test]
    fn empty_cloud_yields_one_empty_cluster() {
        let (clusterer, _bus) = clusterer(300, true);
        let clusters = clusterer.clusters(&cloud_of(0));
        assert_eq!(clusters.len(), 1);
        assert!(clusters[0].is_empty());
        assert_eq!(clusters[0].frame_id, "F 0");
    }

    #[test]
    fn corrected_mode_drops_trailing_empty_cluster() {
        let (clusterer, _bus) = clusterer(300, false);
        assert_eq!(clusterer.clusters(&cloud_of(300)).len(), 1);
        assert_eq!(clusterer.clusters(&cloud_of(0)).len(), 0);
        assert_eq!(clusterer.clusters(&cloud_of(301)).len(), 2);
    }

    #[test]
    fn clusters_inherit_metadata() {
        let (clusterer, _bus) = clusterer(2, true);
        let merged = cloud_of(3);
        for cluster in clusterer.clusters(&merged) {
            assert_eq!(cluster.id, merged.id);
            assert_eq!(cluster.stamp, merged.stamp);
        }
    }

    // ── paced emission ──────────────────────────────────────────────────────

    #[tokio::test(start_paused = true)]
    async fn emits_in_order_with_pacing() {
        let bus = CloudBus::default();
        let clusterer = CloudClusterer::new(2, 10.0, true, bus.clone());
        let mut rx = bus.subscribe_to(CloudTopic::Clusters);

        let start = Instant::now();
        let emitted = clusterer.emit(&cloud_of(5)).await;
        assert_eq!(emitted, 3);

        // One 100 ms pause after each of the three emissions, last included.
        assert_eq!(start.elapsed(), Duration::from_millis(300));

        for expected in ["F 0", "F 1", "F 2"] {
            let cluster = rx.recv().await.unwrap();
            assert_eq!(cluster.frame_id, expected);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn empty_merged_cloud_still_emits_one_cluster() {
        let bus = CloudBus::default();
        let clusterer = CloudClusterer::new(300, 1.0, true, bus.clone());
        let mut rx = bus.subscribe_to(CloudTopic::Clusters);

        let emitted = clusterer.emit(&cloud_of(0)).await;
        assert_eq!(emitted, 1);
        assert!(rx.recv().await.unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn emit_without_subscribers_still_counts_clusters() {
        let bus = CloudBus::default();
        let clusterer = CloudClusterer::new(2, 1.0, true, bus);
        let emitted = clusterer.emit(&cloud_of(3)).await;
        assert_eq!(emitted, 2);
    }
}
