//! # Ingestors Module
//!
//! Inbound message sources of the status bridge. Right now that is the MQTT
//! bridge, which is the sole writer of the shared status record.
//!
//! ## Contained Modules:
//! - **`mqtt_bridge`**: connection lifecycle, resubscription and reconnection,
//!   plus the `BrokerSession` seam the lifecycle runs over.
//! - **`topic_router`**: the pure topic → field dispatch and payload coercion.
//! - **`error`**: the bridge's error taxonomy.

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, unused_qualifications)]

/// Bridge error taxonomy.
pub mod error;
/// The MQTT bridge and its session abstraction.
pub mod mqtt_bridge;
/// Topic dispatch and payload coercion.
pub mod topic_router;

// --- Public API Re-exports ---
pub use error::BridgeError;
pub use mqtt_bridge::{
    BridgeConfig, BridgeHandle, BridgeState, BrokerEvent, BrokerSession, MessageBridge,
    RumqttSession, KEEP_ALIVE, STOP_TIMEOUT,
};
pub use topic_router::{StatusUpdate, TopicRouter, TRUTHY_TOKEN};
