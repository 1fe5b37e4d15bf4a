use std::time::Duration;

use thiserror::Error;

/// Failure conditions of the message bridge. None of them is fatal to the
/// bridge itself; they are logged and the bridge carries on.
#[derive(Debug, Error)]
pub enum BridgeError {
    /// The broker connection dropped without us asking for it.
    #[error("connection to MQTT broker lost: {0}")]
    ConnectionLost(String),

    /// A payload could not be coerced to the type its topic carries.
    #[error("malformed payload {payload:?} on topic {topic}: {reason}")]
    MalformedPayload {
        /// Topic the message arrived on.
        topic: String,
        /// Lossy text rendering of the payload.
        payload: String,
        /// Why coercion failed.
        reason: String,
    },

    /// A message arrived on a topic the bridge does not handle.
    #[error("message on unrecognized topic {0}")]
    UnrecognizedTopic(String),

    /// A subscription request could not be queued.
    #[error("failed to subscribe to topic {topic}: {reason}")]
    Subscribe {
        /// Topic that was being subscribed.
        topic: String,
        /// Client error text.
        reason: String,
    },

    /// The bridge task did not finish within the stop deadline and was aborted.
    #[error("MQTT bridge did not stop within {0:?}")]
    StopTimeout(Duration),

    /// The bridge task panicked or was cancelled.
    #[error("MQTT bridge task failed: {0}")]
    TaskFailed(String),
}
