//! RelayQ Channel - Channel and sink contracts for the message relay
//!
//! This crate defines the capability traits the relay core consumes and
//! provides reference implementations:
//! - In-memory channel and sink (default, for development/testing)
//!
//! Future:
//! - AMQP
//! - Redis streams

pub mod traits;

#[cfg(feature = "memory")]
pub mod memory;

#[cfg(feature = "memory")]
pub mod sinks;

// Re-exports
pub use traits::{Consumer, ConsumerChannel, Delivery, Sink};

#[cfg(feature = "memory")]
pub use memory::MemoryChannel;

#[cfg(feature = "memory")]
pub use sinks::MemorySink;
