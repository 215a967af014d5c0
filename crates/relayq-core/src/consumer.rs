//! Consumer adapter
//!
//! The callback the relay registers with its inbound channel. Each
//! delivery claims a gate slot, then runs as its own relay task:
//! filter, fan out to every sink, ack. The slot is claimed on the
//! channel's dispatch path, so a full gate is what slows intake down.

use std::sync::{Arc, Weak};

use async_trait::async_trait;
use relayq_channel::{Consumer, ConsumerChannel, Delivery, Sink};
use relayq_types::{Error, Result};
use tracing::{error, warn};

use crate::filter::RelayFilter;
use crate::gate::AdmissionGate;

/// State shared between the relay orchestrator and its consumer adapter
pub(crate) struct RelayShared {
    /// Ordered sink list, fixed at construction
    pub(crate) sinks: Vec<Arc<dyn Sink>>,
    /// Propagation predicate applied to every delivery
    pub(crate) filter: Arc<dyn RelayFilter>,
    /// Caps concurrent relay tasks
    pub(crate) gate: AdmissionGate,
}

/// Per-delivery entry point registered with the inbound channel
pub(crate) struct RelayConsumer {
    /// Non-owning handle back to the channel, used only for the
    /// compensating bulk requeue when admission fails
    pub(crate) channel: Weak<dyn ConsumerChannel>,
    pub(crate) shared: Arc<RelayShared>,
}

#[async_trait]
impl Consumer for RelayConsumer {
    async fn consume(&self, delivery: Box<dyn Delivery>) -> Result<()> {
        let permit = match self.shared.gate.admit().await {
            Ok(permit) => permit,
            Err(err) => return self.abort(err).await,
        };

        let shared = Arc::clone(&self.shared);
        tokio::spawn(async move {
            // Dropping the permit frees the slot on every exit path.
            let _permit = permit;

            if shared.filter.filter(delivery.as_ref()) {
                for sink in &shared.sinks {
                    let sink = Arc::clone(sink);
                    let payload = delivery.payload().clone();
                    tokio::spawn(async move {
                        if let Err(err) = sink.publish(payload).await {
                            warn!(sink = sink.name(), error = %err, "Sink publish failed");
                        }
                    });
                }
            }

            // Unconditional, and deliberately not ordered after the
            // fan-out: a sink may still be publishing when this lands.
            delivery.ack().await;
        });

        Ok(())
    }
}

impl RelayConsumer {
    /// Fatal failure before a relay task was spawned
    ///
    /// Puts every unacked message back on the queue so another consumer
    /// can pick them up, then surfaces the error to the dispatcher.
    async fn abort(&self, err: Error) -> Result<()> {
        error!(error = %err, "Admission failed, aborting consumption");
        match self.channel.upgrade() {
            Some(channel) => {
                let returned = channel.return_all_unacked().await;
                warn!(returned, "Returned unacked messages to the queue");
            }
            None => error!("Channel already dropped, unacked messages lost"),
        }
        Err(err)
    }
}
