//! # Space Profile
//!
//! The static half of the SpaceAPI document: who the space is, where it is and
//! how to reach it. A profile is built once at startup, either from the
//! built-in Netz39 data or from a JSON file, and never changes afterwards.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// SpaceAPI schema version served in the `api` field.
pub const SPACEAPI_VERSION: &str = "0.13";

/// Errors raised while loading a profile from disk.
#[derive(Debug, Error)]
pub enum ProfileError {
    /// The profile file could not be read.
    #[error("failed to read profile {path}: {source}")]
    Io {
        /// Path that was being read.
        path: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The profile file is not a valid profile document.
    #[error("failed to parse profile {path}: {source}")]
    Parse {
        /// Path that was being parsed.
        path: String,
        /// Underlying JSON error.
        #[source]
        source: serde_json::Error,
    },
}

/// Postal address and coordinates of the space.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    /// Postal address.
    pub address: String,
    /// Latitude in degrees.
    pub lat: f64,
    /// Longitude in degrees.
    pub lon: f64,
}

/// URLs of the icons that represent the open and closed state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateIcon {
    /// Icon shown while the space is open.
    pub open: String,
    /// Icon shown while the space is closed.
    pub closed: String,
}

/// A feed entry, e.g. `blog -> {type: rss, url: ...}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Feed {
    /// Feed format (`rss`, `ical`, ...).
    #[serde(rename = "type")]
    pub kind: String,
    /// Feed URL.
    pub url: String,
}

fn default_api() -> String {
    SPACEAPI_VERSION.to_string()
}

/// # Space Profile
///
/// Descriptive metadata of the space. Contacts and feeds are kept in sorted
/// maps so the rendered document is stable between requests.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpaceProfile {
    /// SpaceAPI schema version.
    #[serde(default = "default_api")]
    pub api: String,
    /// Name of the space.
    pub space: String,
    /// Logo URL.
    pub logo: String,
    /// Homepage URL.
    pub url: String,
    /// Address and coordinates.
    pub location: Location,
    /// Open/closed icon URLs.
    pub icon: StateIcon,
    /// Contact channels keyed by kind (`email`, `twitter`, ...).
    #[serde(default)]
    pub contact: BTreeMap<String, String>,
    /// Contact kinds that should be used to report issues, in insertion order.
    #[serde(default)]
    pub issue_report_channels: Vec<String>,
    /// Feeds keyed by name.
    #[serde(default)]
    pub feeds: BTreeMap<String, Feed>,
}

impl SpaceProfile {
    /// Creates a profile with no contacts and no feeds.
    pub fn new(
        space: impl Into<String>,
        logo: impl Into<String>,
        url: impl Into<String>,
        location: Location,
        icon: StateIcon,
    ) -> Self {
        Self {
            api: default_api(),
            space: space.into(),
            logo: logo.into(),
            url: url.into(),
            location,
            icon,
            contact: BTreeMap::new(),
            issue_report_channels: Vec::new(),
            feeds: BTreeMap::new(),
        }
    }

    /// Adds a contact channel. When `is_issue_channel` is set the channel kind is
    /// also listed under `issue_report_channels`.
    pub fn with_contact(
        mut self,
        kind: impl Into<String>,
        value: impl Into<String>,
        is_issue_channel: bool,
    ) -> Self {
        let kind = kind.into();
        if is_issue_channel && !self.issue_report_channels.contains(&kind) {
            self.issue_report_channels.push(kind.clone());
        }
        self.contact.insert(kind, value.into());
        self
    }

    /// Adds a feed.
    pub fn with_feed(
        mut self,
        name: impl Into<String>,
        kind: impl Into<String>,
        url: impl Into<String>,
    ) -> Self {
        self.feeds.insert(
            name.into(),
            Feed {
                kind: kind.into(),
                url: url.into(),
            },
        );
        self
    }

    /// Loads a profile from a JSON file.
    pub fn from_json_file(path: &Path) -> Result<Self, ProfileError> {
        let display = path.display().to_string();
        let raw = fs::read_to_string(path).map_err(|source| ProfileError::Io {
            path: display.clone(),
            source,
        })?;
        serde_json::from_str(&raw).map_err(|source| ProfileError::Parse {
            path: display,
            source,
        })
    }

    /// The built-in profile of Netz39 e.V., Magdeburg.
    pub fn netz39() -> Self {
        Self::new(
            "Netz39",
            "https://wiki.netz39.de/_media/resources:public_relations:logo:netz39_logo_2013-07-11.png",
            "https://www.netz39.de/",
            Location {
                address: "Leibnizstr. 32, 39104 Magdeburg, Germany".to_string(),
                lat: 52.119561,
                lon: 11.629398,
            },
            StateIcon {
                open: "https://www.netz39.de/open.png".to_string(),
                closed: "https://www.netz39.de/closed.png".to_string(),
            },
        )
        .with_contact("email", "kontakt@netz39.de", true)
        .with_contact("twitter", "@netz39", true)
        .with_contact("ml", "list@netz39.de", true)
        .with_contact("jabber", "lounge@conference.jabber.n39.eu", false)
        .with_contact("discord", "https://discord.netz39.de/", false)
        .with_contact("github", "https://github.com/Netz39", false)
        .with_contact("mastodon", "https://machteburch.social/@netz39", false)
        .with_contact("youtube", "https://www.youtube.com/@Netz39De", false)
        .with_contact("instagram", "https://www.instagram.com/netz_39/", false)
        .with_feed("blog", "rss", "https://www.netz39.de/feed.xml")
        .with_feed(
            "calendar",
            "ical",
            "https://www.netz39.de/feed/eo-events/events.ics",
        )
    }
}

impl Default for SpaceProfile {
    fn default() -> Self {
        Self::netz39()
    }
}
