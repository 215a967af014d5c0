//! Relay orchestrator
//!
//! Wires an inbound channel to a set of sinks through a filter, with an
//! admission gate capping how many messages are relayed concurrently.
//! The relay owns no message state of its own; it registers a consumer
//! with the channel and controls when the channel feeds it.

use std::sync::Arc;

use relayq_channel::{ConsumerChannel, Sink};
use relayq_types::RelayStats;
use tracing::info;

use crate::consumer::{RelayConsumer, RelayShared};
use crate::filter::RelayFilter;
use crate::gate::AdmissionGate;

/// Bounded-concurrency message relay
pub struct Relay {
    channel: Arc<dyn ConsumerChannel>,
    shared: Arc<RelayShared>,
}

impl Relay {
    /// Create a relay and register its consumer with the channel
    ///
    /// Registration happens here, not on [`start`](Relay::start): the
    /// channel knows its consumer from the moment the relay exists and
    /// only needs to be told when to begin dispatching.
    ///
    /// # Panics
    ///
    /// Panics if `concurrency` is zero.
    pub fn new(
        channel: Arc<dyn ConsumerChannel>,
        sinks: Vec<Arc<dyn Sink>>,
        filter: Arc<dyn RelayFilter>,
        concurrency: usize,
    ) -> Self {
        let shared = Arc::new(RelayShared {
            sinks,
            filter,
            gate: AdmissionGate::new(concurrency),
        });

        let consumer = RelayConsumer {
            channel: Arc::downgrade(&channel),
            shared: Arc::clone(&shared),
        };
        channel.add_consumer(Arc::new(consumer));

        info!(
            concurrency,
            sinks = shared.sinks.len(),
            "Relay created and consumer registered"
        );
        Self { channel, shared }
    }

    /// Ask the channel to begin feeding the relay
    ///
    /// Returns `true` if this call actually started consumption, `false`
    /// if the channel was already consuming.
    pub async fn start(&self) -> bool {
        self.channel.start_consuming().await
    }

    /// Ask the channel to stop feeding the relay
    ///
    /// Returns `true` if this call actually stopped consumption. Relay
    /// tasks already in flight are not cancelled; they finish on their
    /// own and release their gate slots as they do.
    pub async fn stop(&self) -> bool {
        self.channel.stop_consuming().await
    }

    /// Snapshot of the relay's concurrency state
    pub fn stats(&self) -> RelayStats {
        RelayStats {
            capacity: self.shared.gate.capacity(),
            in_flight: self.shared.gate.in_flight(),
            sinks: self.shared.sinks.len(),
        }
    }
}
