//! Topic-based broadcast bus for processed clouds.
//!
//! Uses [`tokio::sync::broadcast`] channels under the hood so that every
//! subscriber receives every cloud without any single subscriber blocking
//! the others.
//!
//! # Topics
//!
//! | Topic | Traffic |
//! |---|---|
//! | [`CloudTopic::Merged`] | One full merged cloud per input cloud, pre-clustering (debug stream) |
//! | [`CloudTopic::Clusters`] | Bounded-size cluster messages, paced at the configured rate |

use cloudgrid_types::{GridError, PointCloud};
use tokio::sync::broadcast;
use tracing::warn;

/// Default channel capacity (number of buffered clouds before old ones are
/// dropped for slow subscribers).
const DEFAULT_CAPACITY: usize = 64;

/// The two output lanes of the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CloudTopic {
    /// The full merged cloud, published before clustering (even when empty).
    Merged,
    /// Fixed-size cluster slices, frame-tagged with their index.
    Clusters,
}

/// Shared cloud bus.  Clone it cheaply – all clones share the same
/// underlying broadcast channels.
#[derive(Clone, Debug)]
pub struct CloudBus {
    merged: broadcast::Sender<PointCloud>,
    clusters: broadcast::Sender<PointCloud>,
}

impl CloudBus {
    /// Create a new bus with the given channel capacity.
    ///
    /// The `capacity` is applied to every topic channel independently.
    pub fn new(capacity: usize) -> Self {
        let (merged, _) = broadcast::channel(capacity);
        let (clusters, _) = broadcast::channel(capacity);
        Self { merged, clusters }
    }

    /// Publish `cloud` to the given [`CloudTopic`] channel.
    ///
    /// Returns the number of active receivers that were handed the cloud.
    /// Fails with [`GridError::Channel`] when no subscribers are currently
    /// listening on the topic; the pipeline downgrades that to a debug log
    /// rather than treating it as a fault.
    pub fn publish_to(&self, topic: CloudTopic, cloud: PointCloud) -> Result<usize, GridError> {
        let sender = self.topic_sender(topic);
        match sender.send(cloud) {
            Ok(n) => Ok(n),
            Err(broadcast::error::SendError(_)) => Err(GridError::Channel(format!(
                "no subscribers for topic {topic:?}"
            ))),
        }
    }

    /// Subscribe to a specific [`CloudTopic`] channel.
    pub fn subscribe_to(&self, topic: CloudTopic) -> TopicReceiver {
        TopicReceiver {
            topic,
            receiver: self.topic_sender(topic).subscribe(),
        }
    }

    fn topic_sender(&self, topic: CloudTopic) -> &broadcast::Sender<PointCloud> {
        match topic {
            CloudTopic::Merged => &self.merged,
            CloudTopic::Clusters => &self.clusters,
        }
    }
}

impl Default for CloudBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

/// An async receiver bound to a single [`CloudTopic`] channel.
///
/// Obtained via [`CloudBus::subscribe_to`].
pub struct TopicReceiver {
    topic: CloudTopic,
    receiver: broadcast::Receiver<PointCloud>,
}

impl TopicReceiver {
    /// Wait for the next cloud on this topic.
    ///
    /// Returns `None` when the bus has shut down.  A lagged subscriber logs
    /// the drop count and keeps receiving from the oldest retained cloud.
    pub async fn recv(&mut self) -> Option<PointCloud> {
        loop {
            match self.receiver.recv().await {
                Ok(cloud) => return Some(cloud),
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    warn!(topic = ?self.topic, lagged_by = n, "cloud subscriber lagged");
                    continue;
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    /// The [`CloudTopic`] this receiver is bound to.
    pub fn topic(&self) -> CloudTopic {
        self.topic
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cloudgrid_types::Point3;

    fn make_cloud(frame: &str) -> PointCloud {
        PointCloud::new(frame, vec![Point3::new(1.0, 2.0, 3.0)])
    }

    #[tokio::test]
    async fn publish_and_receive() -> Result<(), Box<dyn std::error::Error>> {
        let bus = CloudBus::default();
        let mut rx = bus.subscribe_to(CloudTopic::Merged);

        let cloud = make_cloud("laser");
        bus.publish_to(CloudTopic::Merged, cloud.clone())?;

        let received = rx.recv().await.ok_or("no cloud received")?;
        assert_eq!(received.id, cloud.id);
        assert_eq!(received.frame_id, cloud.frame_id);
        Ok(())
    }

    #[tokio::test]
    async fn topics_are_isolated() -> Result<(), Box<dyn std::error::Error>> {
        let bus = CloudBus::default();
        let mut merged_rx = bus.subscribe_to(CloudTopic::Merged);
        let _clusters_rx = bus.subscribe_to(CloudTopic::Clusters);

        bus.publish_to(CloudTopic::Clusters, make_cloud("laser 0"))?;

        let result = tokio::time::timeout(
            std::time::Duration::from_millis(50),
            merged_rx.recv(),
        )
        .await;
        assert!(result.is_err(), "Merged subscriber must not see a cluster");
        Ok(())
    }

    #[tokio::test]
    async fn multiple_subscribers_receive_same_cloud() -> Result<(), Box<dyn std::error::Error>> {
        let bus = CloudBus::default();
        let mut rx1 = bus.subscribe_to(CloudTopic::Clusters);
        let mut rx2 = bus.subscribe_to(CloudTopic::Clusters);

        let cloud = make_cloud("laser 1");
        bus.publish_to(CloudTopic::Clusters, cloud.clone())?;

        assert_eq!(rx1.recv().await.unwrap().id, cloud.id);
        assert_eq!(rx2.recv().await.unwrap().id, cloud.id);
        Ok(())
    }

    #[test]
    fn publish_no_subscribers_returns_error() {
        let bus = CloudBus::default();
        let result = bus.publish_to(CloudTopic::Merged, make_cloud("laser"));
        assert!(matches!(result, Err(GridError::Channel(_))));
    }
}
