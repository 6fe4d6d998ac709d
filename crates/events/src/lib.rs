//! Snapshot topics: a single publisher replacing a full list, any number of
//! subscribers each observing the latest complete snapshot.

use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;
use tokio_stream::Stream;

/// A full, immutable snapshot of a list of records.
pub type Snapshot<T> = Arc<Vec<T>>;

/// Publisher side of a snapshot stream.
///
/// Every published value replaces the previous one wholesale, so a subscriber
/// never observes a partially applied change. Subscribers that fall behind
/// skip intermediate snapshots and see only the most recent one.
pub struct SnapshotTopic<T> {
    sender: watch::Sender<Snapshot<T>>,
}

impl<T> SnapshotTopic<T>
where
    T: Send + Sync + 'static,
{
    /// Create a topic whose first snapshot is `initial`.
    pub fn new(initial: Vec<T>) -> Self {
        let (sender, _) = watch::channel(Arc::new(initial));
        Self { sender }
    }

    /// Replace the current snapshot and wake every subscriber.
    pub fn publish(&self, snapshot: Vec<T>) {
        let len = snapshot.len();
        self.sender.send_replace(Arc::new(snapshot));
        tracing::trace!(
            target: "bookstore-events",
            len,
            subscribers = self.sender.receiver_count(),
            "snapshot published"
        );
    }

    /// The most recently published snapshot.
    pub fn current(&self) -> Snapshot<T> {
        self.sender.borrow().clone()
    }

    /// Subscribe to the topic. The returned stream yields the current
    /// snapshot first, then every later one.
    pub fn subscribe(&self) -> Snapshots<T> {
        Snapshots {
            inner: WatchStream::new(self.sender.subscribe()),
        }
    }

    /// Number of live subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl<T> Default for SnapshotTopic<T>
where
    T: Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

/// Infinite stream of snapshots; ends only when the topic is dropped.
pub struct Snapshots<T> {
    inner: WatchStream<Snapshot<T>>,
}

impl<T> Stream for Snapshots<T>
where
    T: Send + Sync + 'static,
{
    type Item = Snapshot<T>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.get_mut().inner).poll_next(cx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_stream::StreamExt;

    #[tokio::test]
    async fn subscriber_sees_current_snapshot_first() {
        let topic = SnapshotTopic::new(vec![1, 2]);
        let mut stream = topic.subscribe();

        let first = stream.next().await.unwrap();
        assert_eq!(*first, vec![1, 2]);
    }

    #[tokio::test]
    async fn late_subscriber_gets_latest_only() {
        let topic = SnapshotTopic::new(vec![1]);
        topic.publish(vec![1, 2]);
        topic.publish(vec![1, 2, 3]);

        let mut stream = topic.subscribe();
        assert_eq!(*stream.next().await.unwrap(), vec![1, 2, 3]);
        assert_eq!(topic.subscriber_count(), 1);
    }

    #[tokio::test]
    async fn publish_wakes_subscriber() {
        let topic = Arc::new(SnapshotTopic::<u8>::default());
        let mut stream = topic.subscribe();
        assert!(stream.next().await.unwrap().is_empty());

        let publisher = topic.clone();
        tokio::spawn(async move { publisher.publish(vec![7]) });

        assert_eq!(*stream.next().await.unwrap(), vec![7]);
        assert_eq!(*topic.current(), vec![7]);
    }

    #[tokio::test]
    async fn stream_ends_when_topic_dropped() {
        let topic = SnapshotTopic::new(vec!["a"]);
        let mut stream = topic.subscribe();
        let _ = stream.next().await;

        drop(topic);
        assert!(stream.next().await.is_none());
    }
}
