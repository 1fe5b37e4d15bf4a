//! # Core Status Module
//!
//! This module holds the single piece of shared mutable state in the system:
//! the SpaceAPI status record. Everything else either writes to it (the MQTT
//! bridge in `ingestors`) or reads from it (the HTTP layer through
//! `StatusReader`).
//!
//! ## Core Components:
//!
//! - **`profile`**: the static descriptive metadata of the space (identity,
//!   location, contacts, feeds, icons). Populated once at startup.
//!
//! - **`status_record`**: the live record. `open` and `lastchange` are kept in
//!   one atomic each, so the single writer never blocks readers and readers
//!   never observe a torn field.
//!
//! - **`status_reader`**: the read-only projection used by request handlers.

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, unused_qualifications)]

/// Static SpaceAPI metadata of the space.
pub mod profile;
/// The shared, atomically updated status record.
pub mod status_record;
/// Read-only facade used by HTTP handlers.
pub mod status_reader;

// --- Public API Re-exports ---
pub use profile::{Feed, Location, ProfileError, SpaceProfile, StateIcon};
pub use status_reader::StatusReader;
pub use status_record::{SpaceApiDocument, StateDocument, StatusRecord};
