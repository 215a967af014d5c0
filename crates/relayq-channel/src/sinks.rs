//! In-memory sink
//!
//! Capture sink for development and testing: remembers every payload it is
//! given so tests and the dev server can inspect what was relayed.

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;
use relayq_types::Result;
use tracing::debug;

use crate::traits::Sink;

/// Sink that records published payloads in memory
pub struct MemorySink {
    name: String,
    published: Mutex<Vec<Bytes>>,
}

impl MemorySink {
    /// Create a new named capture sink
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            published: Mutex::new(Vec::new()),
        }
    }

    /// All payloads published so far, in arrival order
    pub fn published(&self) -> Vec<Bytes> {
        self.published.lock().clone()
    }

    /// Number of payloads published so far
    pub fn published_count(&self) -> usize {
        self.published.lock().len()
    }
}

#[async_trait]
impl Sink for MemorySink {
    fn name(&self) -> &str {
        &self.name
    }

    async fn publish(&self, payload: Bytes) -> Result<()> {
        self.published.lock().push(payload);
        debug!(sink = %self.name, "Payload captured");
        Ok(())
    }
}
