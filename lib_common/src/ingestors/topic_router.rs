//! # Topic Router
//!
//! Pure dispatch policy of the bridge: which topic maps to which field and how
//! a raw payload is coerced. No I/O happens here.

use crate::core::StatusRecord;

use super::error::BridgeError;

/// The only payload that means "open" on the status topic.
pub const TRUTHY_TOKEN: &str = "true";

/// A single coerced field update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusUpdate {
    /// New open/closed flag.
    Open(bool),
    /// New last-change timestamp.
    LastChange(i64),
}

impl StatusUpdate {
    /// Writes the update into the record.
    pub fn apply(self, record: &StatusRecord) {
        match self {
            StatusUpdate::Open(open) => record.set_open(open),
            StatusUpdate::LastChange(epoch) => record.set_last_change(epoch),
        }
    }
}

/// Maps the two configured topics to status updates.
#[derive(Debug, Clone)]
pub struct TopicRouter {
    status_topic: String,
    lastchange_topic: String,
}

impl TopicRouter {
    /// Creates a router for the given status and last-change topics.
    pub fn new(status_topic: impl Into<String>, lastchange_topic: impl Into<String>) -> Self {
        Self {
            status_topic: status_topic.into(),
            lastchange_topic: lastchange_topic.into(),
        }
    }

    /// Topics to subscribe to, status first.
    pub fn topics(&self) -> [&str; 2] {
        [&self.status_topic, &self.lastchange_topic]
    }

    /// Coerces a message into an update.
    ///
    /// Status payloads compare against [`TRUTHY_TOKEN`] byte for byte; anything
    /// else, including empty or non-UTF-8 payloads, means closed. Last-change
    /// payloads must be a decimal integer, surrounding whitespace allowed.
    pub fn route(&self, topic: &str, payload: &[u8]) -> Result<StatusUpdate, BridgeError> {
        if topic == self.status_topic {
            return Ok(StatusUpdate::Open(payload == TRUTHY_TOKEN.as_bytes()));
        }
        if topic == self.lastchange_topic {
            return parse_epoch(payload)
                .map(StatusUpdate::LastChange)
                .map_err(|reason| BridgeError::MalformedPayload {
                    topic: topic.to_string(),
                    payload: String::from_utf8_lossy(payload).into_owned(),
                    reason,
                });
        }
        Err(BridgeError::UnrecognizedTopic(topic.to_string()))
    }
}

fn parse_epoch(payload: &[u8]) -> Result<i64, String> {
    let text = std::str::from_utf8(payload).map_err(|e| e.to_string())?;
    text.trim().parse::<i64>().map_err(|e| e.to_string())
}
