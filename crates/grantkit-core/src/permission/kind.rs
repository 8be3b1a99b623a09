//! Permission kinds

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::GrantError;

/// A category of protected platform resource.
///
/// Used as the registry key. The built-in variants cover the resources a
/// mobile host usually asks for; `Custom` lets a host register handlers for
/// kinds this crate does not know about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PermissionKind {
    Camera,
    /// Photo library (supports limited selection)
    Photos,
    Microphone,
    /// Address book (supports limited access)
    Contacts,
    Calendar,
    Reminders,
    /// When-in-use location (approximate location reports as limited)
    Location,
    /// Background location
    LocationAlways,
    Notifications,
    Health,
    Motion,
    Bluetooth,
    MediaLibrary,
    SpeechRecognition,
    /// App tracking transparency
    Tracking,
    Siri,
    /// Host-defined kind; never serialized
    #[serde(skip)]
    Custom(&'static str),
}

impl PermissionKind {
    /// Return all built-in kinds
    pub fn all() -> &'static [PermissionKind] {
        &[
            PermissionKind::Camera,
            PermissionKind::Photos,
            PermissionKind::Microphone,
            PermissionKind::Contacts,
            PermissionKind::Calendar,
            PermissionKind::Reminders,
            PermissionKind::Location,
            PermissionKind::LocationAlways,
            PermissionKind::Notifications,
            PermissionKind::Health,
            PermissionKind::Motion,
            PermissionKind::Bluetooth,
            PermissionKind::MediaLibrary,
            PermissionKind::SpeechRecognition,
            PermissionKind::Tracking,
            PermissionKind::Siri,
        ]
    }

    /// Whether the platform can answer with a partial grant for this kind
    pub fn supports_limited(&self) -> bool {
        matches!(
            self,
            PermissionKind::Photos | PermissionKind::Contacts | PermissionKind::Location
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PermissionKind::Camera => "camera",
            PermissionKind::Photos => "photos",
            PermissionKind::Microphone => "microphone",
            PermissionKind::Contacts => "contacts",
            PermissionKind::Calendar => "calendar",
            PermissionKind::Reminders => "reminders",
            PermissionKind::Location => "location",
            PermissionKind::LocationAlways => "location_always",
            PermissionKind::Notifications => "notifications",
            PermissionKind::Health => "health",
            PermissionKind::Motion => "motion",
            PermissionKind::Bluetooth => "bluetooth",
            PermissionKind::MediaLibrary => "media_library",
            PermissionKind::SpeechRecognition => "speech_recognition",
            PermissionKind::Tracking => "tracking",
            PermissionKind::Siri => "siri",
            PermissionKind::Custom(name) => *name,
        }
    }
}

impl fmt::Display for PermissionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PermissionKind {
    type Err = GrantError;

    /// Parses built-in kind names only; custom kinds are never produced.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace(['-', ' '], "_");
        PermissionKind::all()
            .iter()
            .copied()
            .find(|kind| kind.as_str() == normalized)
            .ok_or_else(|| {
                GrantError::invalid_input_field(
                    format!("unknown permission kind: {:?}", s),
                    "kind",
                )
            })
    }
}

/// Accepts the same names as [`FromStr`]; custom kinds cannot be read back.
impl<'de> Deserialize<'de> for PermissionKind {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let name = String::deserialize(deserializer)?;
        name.parse().map_err(serde::de::Error::custom)
    }
}
