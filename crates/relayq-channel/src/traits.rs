//! Channel capability traits
//!
//! Defines the contracts between the relay core and its collaborators: the
//! inbound channel that delivers messages, the delivery handle itself, the
//! consumer callback the channel dispatches into, and the downstream sinks.

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use relayq_types::Result;

/// Inbound channel contract - the queue the relay consumes from
///
/// Implementations own the messages; the relay only ever sees `Delivery`
/// handles. `start_consuming`/`stop_consuming` return `true` when the call
/// changed the channel's state and `false` when it was already in the
/// requested state.
#[async_trait]
pub trait ConsumerChannel: Send + Sync {
    /// Begin dispatching queued messages to registered consumers
    async fn start_consuming(&self) -> bool;

    /// Halt message intake; messages already handed out are unaffected
    async fn stop_consuming(&self) -> bool;

    /// Register a consumer to receive deliveries
    fn add_consumer(&self, consumer: Arc<dyn Consumer>);

    /// Requeue every currently unacknowledged message; returns how many
    async fn return_all_unacked(&self) -> usize;
}

/// A single message handed out by an inbound channel
///
/// The handle is moved into the processing unit and dropped when processing
/// ends; it is never retained beyond that. `ack` must be idempotent so the
/// unconditional-ack policy of the relay is always safe.
#[async_trait]
pub trait Delivery: Send + Sync {
    /// The message payload; cloning the returned `Bytes` is refcounted
    fn payload(&self) -> &Bytes;

    /// Acknowledge the message on its channel
    async fn ack(&self);
}

/// Consumer callback dispatched by an inbound channel
///
/// An `Err` return is a fatal signal: the channel must treat it as
/// unrecoverable and halt consumption. Recoverable conditions are handled
/// inside the consumer and never surface here.
#[async_trait]
pub trait Consumer: Send + Sync {
    async fn consume(&self, delivery: Box<dyn Delivery>) -> Result<()>;
}

/// Downstream sink contract
///
/// Publishing is best-effort: the relay observes the result only to log it.
/// Implementations that need retries or durability provide them internally.
#[async_trait]
pub trait Sink: Send + Sync {
    /// Human-readable name for logging and stats
    fn name(&self) -> &str;

    /// Publish one payload downstream
    async fn publish(&self, payload: Bytes) -> Result<()>;
}
