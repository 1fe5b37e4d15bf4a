//! # Status Record
//!
//! The live SpaceAPI record. The MQTT bridge is its only writer; any number of
//! HTTP handlers read it concurrently.
//!
//! `open` and `lastchange` arrive on independent topics, so each one lives in
//! its own atomic. A write is a single store and a read is a single load: no
//! lock is ever held, readers never wait on the writer, and no field can be
//! observed half-written. There is no cross-field consistency between the two.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};

use serde::{Deserialize, Serialize};

use super::profile::{Feed, Location, SpaceProfile, StateIcon};

/// The `state` sub-record of the SpaceAPI document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateDocument {
    /// Whether the space is open.
    pub open: bool,
    /// Seconds since epoch of the last state change, as reported upstream.
    pub lastchange: i64,
    /// Icon URLs for both states.
    pub icon: StateIcon,
}

/// A point-in-time copy of the full SpaceAPI document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpaceApiDocument {
    /// SpaceAPI schema version.
    pub api: String,
    /// Name of the space.
    pub space: String,
    /// Logo URL.
    pub logo: String,
    /// Homepage URL.
    pub url: String,
    /// Address and coordinates.
    pub location: Location,
    /// Live state.
    pub state: StateDocument,
    /// Contact channels.
    pub contact: BTreeMap<String, String>,
    /// Contact kinds used for issue reports.
    pub issue_report_channels: Vec<String>,
    /// Feeds.
    pub feeds: BTreeMap<String, Feed>,
}

/// # Status Record
///
/// Static profile plus the two live fields. Construct it once in `main`, wrap
/// it in an `Arc` and hand clones to the bridge and to the reader.
#[derive(Debug)]
pub struct StatusRecord {
    profile: SpaceProfile,
    open: AtomicBool,
    last_change: AtomicI64,
}

impl StatusRecord {
    /// Creates a record that starts out open with `lastchange` 0.
    pub fn new(profile: SpaceProfile) -> Self {
        Self {
            profile,
            open: AtomicBool::new(true),
            last_change: AtomicI64::new(0),
        }
    }

    /// Stores the open/closed flag.
    pub fn set_open(&self, open: bool) {
        self.open.store(open, Ordering::Release);
    }

    /// Stores the last-change timestamp.
    pub fn set_last_change(&self, epoch_seconds: i64) {
        self.last_change.store(epoch_seconds, Ordering::Release);
    }

    /// Current open/closed flag.
    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::Acquire)
    }

    /// Current last-change timestamp.
    pub fn last_change(&self) -> i64 {
        self.last_change.load(Ordering::Acquire)
    }

    /// The static profile the record was seeded with.
    pub fn profile(&self) -> &SpaceProfile {
        &self.profile
    }

    /// Builds the full document from the profile and one load of each live field.
    pub fn snapshot(&self) -> SpaceApiDocument {
        let profile = &self.profile;
        SpaceApiDocument {
            api: profile.api.clone(),
            space: profile.space.clone(),
            logo: profile.logo.clone(),
            url: profile.url.clone(),
            location: profile.location.clone(),
            state: StateDocument {
                open: self.is_open(),
                lastchange: self.last_change(),
                icon: profile.icon.clone(),
            },
            contact: profile.contact.clone(),
            issue_report_channels: profile.issue_report_channels.clone(),
            feeds: profile.feeds.clone(),
        }
    }
}

impl Default for StatusRecord {
    fn default() -> Self {
        Self::new(SpaceProfile::default())
    }
}
