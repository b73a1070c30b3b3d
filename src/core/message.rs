use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};

/// A single queued payload together with the time the server accepted it.
///
/// Messages are immutable once built. The payload is kept as raw bytes and
/// rendered as text only when it is written back out to a consumer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Message {
    #[serde(rename = "Received")]
    pub received: DateTime<Utc>,
    #[serde(rename = "payload", serialize_with = "payload_as_text")]
    pub payload: Bytes,
}

impl Message {
    /// Stamps `payload` with the current server time.
    pub fn new(payload: impl Into<Bytes>) -> Self {
        Self::with_received(payload, Utc::now())
    }

    pub fn with_received(payload: impl Into<Bytes>, received: DateTime<Utc>) -> Self {
        Self {
            received,
            payload: payload.into(),
        }
    }

    /// Payload as UTF-8, with invalid sequences replaced.
    pub fn payload_text(&self) -> String {
        String::from_utf8_lossy(&self.payload).into_owned()
    }
}

fn payload_as_text<S: Serializer>(payload: &Bytes, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&String::from_utf8_lossy(payload))
}
