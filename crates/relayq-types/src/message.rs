//! Message types for RelayQ
//!
//! Defines the core Message record held by an inbound channel.

use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Unique identifier for a message
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub struct MessageId(pub Uuid);

impl MessageId {
    /// Create a new random MessageId
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for MessageId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for MessageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A message held by an inbound channel
///
/// The relay core never sees this type directly; it works against the
/// `Delivery` capability and only ever reads the payload bytes. `Message`
/// is the record a channel keeps while the message is pending or unacked.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Message {
    /// Unique message identifier
    pub id: MessageId,

    /// Message payload (raw bytes)
    #[serde(with = "bytes_serde")]
    #[schema(value_type = String)]
    pub payload: Bytes,

    /// When the message was created
    pub created_at: DateTime<Utc>,
}

impl Message {
    /// Create a new message with the given payload
    pub fn new(payload: impl Into<Bytes>) -> Self {
        Self {
            id: MessageId::new(),
            payload: payload.into(),
            created_at: Utc::now(),
        }
    }

    /// Get the payload as a string (if valid UTF-8)
    pub fn payload_as_str(&self) -> Option<&str> {
        std::str::from_utf8(&self.payload).ok()
    }
}

/// Custom serialization for Bytes (as UTF-8 string or base64)
mod bytes_serde {
    use bytes::Bytes;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S>(bytes: &Bytes, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        // For JSON, we serialize as string if it's valid UTF-8, otherwise base64
        if let Ok(s) = std::str::from_utf8(bytes) {
            s.serialize(serializer)
        } else {
            use base64::Engine;
            let encoded = base64::engine::general_purpose::STANDARD.encode(bytes);
            encoded.serialize(serializer)
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Bytes, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Ok(Bytes::from(s))
    }
}
