//! Relay filters
//!
//! A filter decides, per delivery, whether the payload propagates to
//! the sinks. The verdict never affects acknowledgement; a rejected
//! message is still acked and simply goes nowhere.

use std::sync::atomic::{AtomicU64, Ordering};

use relayq_channel::Delivery;
use tracing::debug;

/// Predicate applied to each delivery before fan-out
///
/// Filters are shared by every concurrent relay task, so implementations
/// must tolerate overlapping calls.
pub trait RelayFilter: Send + Sync {
    /// Return `true` to propagate the delivery to the sinks
    fn filter(&self, delivery: &dyn Delivery) -> bool;
}

/// Filter that accepts everything and counts what it has seen
#[derive(Debug, Default)]
pub struct IncludeAll {
    relayed: AtomicU64,
}

impl IncludeAll {
    /// Create a filter with the counter at zero
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of deliveries accepted so far
    pub fn relayed(&self) -> u64 {
        self.relayed.load(Ordering::Relaxed)
    }
}

impl RelayFilter for IncludeAll {
    fn filter(&self, _delivery: &dyn Delivery) -> bool {
        // The count is purely diagnostic, so relaxed ordering is enough.
        let count = self.relayed.fetch_add(1, Ordering::Relaxed) + 1;
        debug!(count, "Relayed message");
        true
    }
}

/// Filter that negates the verdict of the filter it wraps
pub struct InvertFilter {
    subfilter: Box<dyn RelayFilter>,
}

impl InvertFilter {
    /// Wrap `subfilter`, inverting every verdict it produces
    pub fn new(subfilter: impl RelayFilter + 'static) -> Self {
        Self {
            subfilter: Box::new(subfilter),
        }
    }
}

impl RelayFilter for InvertFilter {
    fn filter(&self, delivery: &dyn Delivery) -> bool {
        !self.subfilter.filter(delivery)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bytes::Bytes;
    use std::sync::Arc;

    struct NullDelivery {
        payload: Bytes,
    }

    impl NullDelivery {
        fn new() -> Self {
            Self {
                payload: Bytes::from_static(b"payload"),
            }
        }
    }

    #[async_trait]
    impl Delivery for NullDelivery {
        fn payload(&self) -> &Bytes {
            &self.payload
        }

        async fn ack(&self) {}
    }

    struct StaticFilter {
        verdict: bool,
    }

    impl RelayFilter for StaticFilter {
        fn filter(&self, _delivery: &dyn Delivery) -> bool {
            self.verdict
        }
    }

    #[test]
    fn test_include_all_accepts_and_counts() {
        let filter = IncludeAll::new();
        assert_eq!(filter.relayed(), 0);

        for expected in 1..=5 {
            assert!(filter.filter(&NullDelivery::new()));
            assert_eq!(filter.relayed(), expected);
        }
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_include_all_counts_concurrent_calls_exactly() {
        let filter = Arc::new(IncludeAll::new());

        let mut handles = Vec::new();
        for _ in 0..8 {
            let filter = Arc::clone(&filter);
            handles.push(tokio::spawn(async move {
                for _ in 0..500 {
                    filter.filter(&NullDelivery::new());
                }
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(filter.relayed(), 8 * 500);
    }

    #[test]
    fn test_invert_negates_verdict() {
        let accept = InvertFilter::new(StaticFilter { verdict: false });
        assert!(accept.filter(&NullDelivery::new()));

        let reject = InvertFilter::new(StaticFilter { verdict: true });
        assert!(!reject.filter(&NullDelivery::new()));
    }

    #[test]
    fn test_inverted_include_all_rejects_everything() {
        let filter = InvertFilter::new(IncludeAll::new());
        for _ in 0..3 {
            assert!(!filter.filter(&NullDelivery::new()));
        }
    }
}
