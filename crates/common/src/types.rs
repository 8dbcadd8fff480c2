//! Identifier types shared by the reporter crates.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Monitoring backend application id.
///
/// One backend session exists per application id for the process lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ApplicationId(pub u32);

impl fmt::Display for ApplicationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for ApplicationId {
    fn from(id: u32) -> Self {
        Self(id)
    }
}

/// Conference identifier used in every report and lifecycle event.
///
/// Built once from an optional prefix and the conference name; immutable
/// afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConferenceId(String);

impl ConferenceId {
    /// Derive the conference id as `prefix/name`.
    ///
    /// A trailing `/` on the prefix is not doubled. A missing or empty
    /// prefix yields the bare name.
    #[must_use]
    pub fn new(prefix: Option<&str>, name: &str) -> Self {
        match prefix {
            Some(prefix) if !prefix.is_empty() => {
                if prefix.ends_with('/') {
                    Self(format!("{prefix}{name}"))
                } else {
                    Self(format!("{prefix}/{name}"))
                }
            }
            _ => Self(name.to_string()),
        }
    }

    /// Borrow the id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ConferenceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ConferenceId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conference_id_with_prefix() {
        let id = ConferenceId::new(Some("conf"), "room1");
        assert_eq!(id.as_str(), "conf/room1");
    }

    #[test]
    fn test_conference_id_prefix_trailing_slash_not_doubled() {
        let id = ConferenceId::new(Some("conf/"), "room1");
        assert_eq!(id.as_str(), "conf/room1");
    }

    #[test]
    fn test_conference_id_without_prefix() {
        assert_eq!(ConferenceId::new(None, "room1").as_str(), "room1");
        assert_eq!(ConferenceId::new(Some(""), "room1").as_str(), "room1");
    }

    #[test]
    fn test_conference_id_nested_prefix() {
        let id = ConferenceId::new(Some("meet.example.com/tenant"), "standup");
        assert_eq!(id.to_string(), "meet.example.com/tenant/standup");
    }

    #[test]
    fn test_application_id_display() {
        assert_eq!(ApplicationId(42).to_string(), "42");
        assert_eq!(ApplicationId::from(7), ApplicationId(7));
    }
}
