//! RelayQ Core - Core relay logic for the message relay
//!
//! This crate contains the relay implementation including:
//! - Relay: Main orchestrator
//! - Filters: propagation predicates applied before fan-out
//! - AdmissionGate: bounded concurrency control

mod consumer;
pub mod filter;
pub mod gate;
pub mod relay;

// Re-exports
pub use filter::{IncludeAll, InvertFilter, RelayFilter};
pub use gate::AdmissionGate;
pub use relay::Relay;
