//! RelayQ Types - Core domain types for the message relay
//!
//! This crate contains all shared types used across RelayQ components.

pub mod error;
pub mod message;
pub mod stats;

// Re-export commonly used types
pub use error::{Error, Result};
pub use message::{Message, MessageId};
pub use stats::{ChannelStats, RelayStats};
