//! In-memory inbound channel
//!
//! Fast, non-persistent channel for development and testing.
//! All queued messages are lost when the process exits.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use dashmap::DashMap;
use parking_lot::{Mutex, RwLock};
use relayq_types::{ChannelStats, Message, MessageId};
use tokio::sync::Notify;
use tracing::{debug, error, info};

use crate::traits::{Consumer, ConsumerChannel, Delivery};

/// Shared channel state
///
/// Both the channel handle and every outstanding delivery hold an `Arc` to
/// this; deliveries need it to resolve their acknowledgment.
struct ChannelInner {
    /// Messages waiting to be dispatched
    pending: Mutex<VecDeque<Message>>,
    /// Messages handed to a consumer but not yet acknowledged
    unacked: DashMap<MessageId, Message>,
    /// Registered consumers, dispatched round-robin
    consumers: RwLock<Vec<Arc<dyn Consumer>>>,
    /// Round-robin cursor over `consumers`
    cursor: AtomicUsize,
    /// Whether a dispatch loop is (supposed to be) running
    consuming: AtomicBool,
    /// Bumped on every start; a loop exits once its epoch is stale
    epoch: AtomicU64,
    /// Wakes the dispatch loop on publish, registration, and stop
    wakeup: Notify,
}

impl ChannelInner {
    fn next_consumer(&self) -> Option<Arc<dyn Consumer>> {
        let consumers = self.consumers.read();
        if consumers.is_empty() {
            return None;
        }
        let idx = self.cursor.fetch_add(1, Ordering::Relaxed) % consumers.len();
        Some(Arc::clone(&consumers[idx]))
    }
}

/// In-memory channel implementation
#[derive(Clone)]
pub struct MemoryChannel {
    inner: Arc<ChannelInner>,
}

impl MemoryChannel {
    /// Create a new in-memory channel
    pub fn new() -> Self {
        info!("Initializing in-memory channel");
        Self {
            inner: Arc::new(ChannelInner {
                pending: Mutex::new(VecDeque::new()),
                unacked: DashMap::new(),
                consumers: RwLock::new(Vec::new()),
                cursor: AtomicUsize::new(0),
                consuming: AtomicBool::new(false),
                epoch: AtomicU64::new(0),
                wakeup: Notify::new(),
            }),
        }
    }

    /// Queue a message for dispatch (the producer side of the channel)
    pub fn publish(&self, message: Message) -> MessageId {
        let id = message.id.clone();
        self.inner.pending.lock().push_back(message);
        self.inner.wakeup.notify_one();

        debug!(message_id = %id, "Message queued");
        id
    }

    /// Get channel statistics
    pub fn stats(&self) -> ChannelStats {
        ChannelStats {
            queued: self.inner.pending.lock().len(),
            unacked: self.inner.unacked.len(),
            consumers: self.inner.consumers.read().len(),
            consuming: self.inner.consuming.load(Ordering::SeqCst),
        }
    }

    /// The dispatch loop: pops pending messages and hands them to consumers
    /// one at a time. A slow consumer therefore stalls intake, which is how
    /// the relay's admission gate backpressures the whole channel.
    async fn dispatch_loop(inner: Arc<ChannelInner>, epoch: u64) {
        debug!(epoch, "Dispatch loop started");

        loop {
            if !inner.consuming.load(Ordering::SeqCst) || inner.epoch.load(Ordering::SeqCst) != epoch {
                break;
            }

            let message = inner.pending.lock().pop_front();
            let Some(message) = message else {
                inner.wakeup.notified().await;
                continue;
            };

            let Some(consumer) = inner.next_consumer() else {
                // Nobody to deliver to yet; requeue and wait for a registration.
                inner.pending.lock().push_front(message);
                inner.wakeup.notified().await;
                continue;
            };

            let id = message.id.clone();
            let payload = message.payload.clone();
            inner.unacked.insert(id.clone(), message);

            let delivery = Box::new(MemoryDelivery {
                id: id.clone(),
                payload,
                inner: Arc::clone(&inner),
            });

            debug!(message_id = %id, "Dispatching message");
            if let Err(err) = consumer.consume(delivery).await {
                // Fatal per the consumer contract: halt intake and leave
                // recovery to whoever supervises the process.
                error!(error = %err, "Consumer failed; halting consumption");
                inner.consuming.store(false, Ordering::SeqCst);
                break;
            }
        }

        debug!(epoch, "Dispatch loop stopped");
    }
}

impl Default for MemoryChannel {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ConsumerChannel for MemoryChannel {
    async fn start_consuming(&self) -> bool {
        if self
            .inner
            .consuming
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return false;
        }

        let epoch = self.inner.epoch.fetch_add(1, Ordering::SeqCst) + 1;
        tokio::spawn(MemoryChannel::dispatch_loop(Arc::clone(&self.inner), epoch));

        info!("Channel consuming");
        true
    }

    async fn stop_consuming(&self) -> bool {
        if self
            .inner
            .consuming
            .compare_exchange(true, false, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return false;
        }

        self.inner.wakeup.notify_one();
        info!("Channel stopped");
        true
    }

    fn add_consumer(&self, consumer: Arc<dyn Consumer>) {
        self.inner.consumers.write().push(consumer);
        self.inner.wakeup.notify_one();
        debug!("Consumer registered");
    }

    async fn return_all_unacked(&self) -> usize {
        // Collect the ids first; removing while iterating a DashMap can
        // deadlock on a shard.
        let ids: Vec<MessageId> = self.inner.unacked.iter().map(|e| e.key().clone()).collect();

        let mut returned = 0;
        {
            let mut pending = self.inner.pending.lock();
            for id in ids {
                if let Some((_, message)) = self.inner.unacked.remove(&id) {
                    // Back of the queue; the relay guarantees no ordering.
                    pending.push_back(message);
                    returned += 1;
                }
            }
        }

        if returned > 0 {
            self.inner.wakeup.notify_one();
            info!(returned, "Returned unacked messages to the queue");
        }
        returned
    }
}

/// Delivery handle for a message dispatched by a [`MemoryChannel`]
struct MemoryDelivery {
    id: MessageId,
    payload: Bytes,
    inner: Arc<ChannelInner>,
}

#[async_trait]
impl Delivery for MemoryDelivery {
    fn payload(&self) -> &Bytes {
        &self.payload
    }

    async fn ack(&self) {
        // Removal doubles as the idempotency check: only the first ack finds
        // the entry.
        if self.inner.unacked.remove(&self.id).is_some() {
            debug!(message_id = %self.id, "Message acknowledged");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use relayq_types::{Error, Result};
    use std::time::Duration;

    /// Consumer that records payloads and acks immediately
    struct RecordingConsumer {
        seen: Mutex<Vec<Bytes>>,
    }

    impl RecordingConsumer {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                seen: Mutex::new(Vec::new()),
            })
        }

        fn seen(&self) -> Vec<Bytes> {
            self.seen.lock().clone()
        }
    }

    #[async_trait]
    impl Consumer for RecordingConsumer {
        async fn consume(&self, delivery: Box<dyn Delivery>) -> Result<()> {
            self.seen.lock().push(delivery.payload().clone());
            delivery.ack().await;
            Ok(())
        }
    }

    /// Consumer that never acknowledges
    struct SilentConsumer;

    #[async_trait]
    impl Consumer for SilentConsumer {
        async fn consume(&self, _delivery: Box<dyn Delivery>) -> Result<()> {
            Ok(())
        }
    }

    /// Consumer that acks the same delivery twice
    struct DoubleAckConsumer;

    #[async_trait]
    impl Consumer for DoubleAckConsumer {
        async fn consume(&self, delivery: Box<dyn Delivery>) -> Result<()> {
            delivery.ack().await;
            delivery.ack().await;
            Ok(())
        }
    }

    /// Consumer that fails on the first delivery
    struct FailingConsumer;

    #[async_trait]
    impl Consumer for FailingConsumer {
        async fn consume(&self, _delivery: Box<dyn Delivery>) -> Result<()> {
            Err(Error::GateClosed)
        }
    }

    async fn wait_until(mut condition: impl FnMut() -> bool) {
        tokio::time::timeout(Duration::from_secs(5), async {
            while !condition() {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("condition not met in time");
    }

    #[tokio::test]
    async fn test_publish_queues_message() {
        let channel = MemoryChannel::new();
        channel.publish(Message::new("hello"));

        let stats = channel.stats();
        assert_eq!(stats.queued, 1);
        assert_eq!(stats.unacked, 0);
        assert!(!stats.consuming);
    }

    #[tokio::test(start_paused = true)]
    async fn test_dispatches_to_consumer_and_acks() {
        let channel = MemoryChannel::new();
        let consumer = RecordingConsumer::new();
        channel.add_consumer(consumer.clone());

        channel.publish(Message::new("one"));
        channel.publish(Message::new("two"));
        assert!(channel.start_consuming().await);

        wait_until(|| consumer.seen().len() == 2).await;

        let stats = channel.stats();
        assert_eq!(stats.queued, 0);
        assert_eq!(stats.unacked, 0);
        assert_eq!(consumer.seen()[0], Bytes::from("one"));
        assert_eq!(consumer.seen()[1], Bytes::from("two"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_dispatches_messages_published_after_start() {
        let channel = MemoryChannel::new();
        let consumer = RecordingConsumer::new();
        channel.add_consumer(consumer.clone());
        assert!(channel.start_consuming().await);

        channel.publish(Message::new("late"));
        wait_until(|| consumer.seen().len() == 1).await;
    }

    #[tokio::test]
    async fn test_start_twice_returns_false() {
        let channel = MemoryChannel::new();
        assert!(channel.start_consuming().await);
        assert!(!channel.start_consuming().await);
    }

    #[tokio::test]
    async fn test_stop_without_start_returns_false() {
        let channel = MemoryChannel::new();
        assert!(!channel.stop_consuming().await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_halts_intake() {
        let channel = MemoryChannel::new();
        let consumer = RecordingConsumer::new();
        channel.add_consumer(consumer.clone());

        assert!(channel.start_consuming().await);
        assert!(channel.stop_consuming().await);
        assert!(!channel.stop_consuming().await);

        channel.publish(Message::new("after stop"));
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert!(consumer.seen().is_empty());
        assert_eq!(channel.stats().queued, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_restart_resumes_dispatch() {
        let channel = MemoryChannel::new();
        let consumer = RecordingConsumer::new();
        channel.add_consumer(consumer.clone());

        assert!(channel.start_consuming().await);
        assert!(channel.stop_consuming().await);
        assert!(channel.start_consuming().await);

        channel.publish(Message::new("again"));
        wait_until(|| consumer.seen().len() == 1).await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_return_all_unacked_requeues() {
        let channel = MemoryChannel::new();
        channel.add_consumer(Arc::new(SilentConsumer));

        channel.publish(Message::new("a"));
        channel.publish(Message::new("b"));
        assert!(channel.start_consuming().await);

        wait_until(|| channel.stats().unacked == 2).await;
        assert!(channel.stop_consuming().await);

        let returned = channel.return_all_unacked().await;
        assert_eq!(returned, 2);

        let stats = channel.stats();
        assert_eq!(stats.queued, 2);
        assert_eq!(stats.unacked, 0);
    }

    #[tokio::test]
    async fn test_return_all_unacked_when_empty() {
        let channel = MemoryChannel::new();
        assert_eq!(channel.return_all_unacked().await, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_double_ack_is_harmless() {
        let channel = MemoryChannel::new();
        channel.add_consumer(Arc::new(DoubleAckConsumer));

        channel.publish(Message::new("x"));
        assert!(channel.start_consuming().await);

        wait_until(|| channel.stats().unacked == 0 && channel.stats().queued == 0).await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_consumer_error_halts_consumption() {
        let channel = MemoryChannel::new();
        channel.add_consumer(Arc::new(FailingConsumer));

        channel.publish(Message::new("boom"));
        channel.publish(Message::new("never delivered"));
        assert!(channel.start_consuming().await);

        wait_until(|| !channel.stats().consuming).await;

        // The second message must still be queued, untouched.
        assert_eq!(channel.stats().queued, 1);
    }
}
