//! # lib_common
//!
//! Shared building blocks of the space status bridge. The library keeps one
//! in-memory SpaceAPI status record, feeds it from an MQTT broker and exposes
//! a read-only facade for the HTTP layer.
//!
//! - **`core`**: the `StatusRecord`, the `StatusReader` facade and the static
//!   `SpaceProfile` the record is seeded from.
//! - **`ingestors`**: the `MessageBridge`, which owns the broker connection and
//!   is the only writer of the record.

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, unused_qualifications)]

/// Status record, reader facade and static profile.
#[cfg(feature = "core")]
pub mod core;
/// Inbound message sources that mutate the status record.
#[cfg(feature = "ingestors")]
pub mod ingestors;

// --- Public API Re-exports ---
#[cfg(feature = "core")]
pub use crate::core::{SpaceApiDocument, SpaceProfile, StatusReader, StatusRecord};
#[cfg(feature = "ingestors")]
pub use crate::ingestors::{BridgeConfig, BridgeError, BridgeHandle, BridgeState, MessageBridge};
