//! Device identifier for tracked devices

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Error type for invalid device IDs
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DeviceIdError {
    #[error("device id cannot be empty")]
    Empty,

    #[error("device id cannot contain whitespace")]
    Whitespace,
}

/// Identifier of a tracked device (e.g., "device_tracker.phone")
///
/// The optional `domain.` prefix is kept verbatim; [`DeviceId::object_id`]
/// strips it for display purposes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DeviceId(String);

impl DeviceId {
    /// Create a new device id
    pub fn new(id: impl Into<String>) -> Result<Self, DeviceIdError> {
        let id = id.into();
        if id.is_empty() {
            return Err(DeviceIdError::Empty);
        }
        if id.chars().any(char::is_whitespace) {
            return Err(DeviceIdError::Whitespace);
        }
        Ok(Self(id))
    }

    /// Get the full id as a string
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Part after the first '.', or the whole id when there is no domain
    pub fn object_id(&self) -> &str {
        self.0.split_once('.').map(|(_, rest)| rest).unwrap_or(&self.0)
    }
}

impl FromStr for DeviceId {
    type Err = DeviceIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for DeviceId {
    type Error = DeviceIdError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<DeviceId> for String {
    fn from(id: DeviceId) -> Self {
        id.0
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for DeviceId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_object_id_strips_domain() {
        let id: DeviceId = "device_tracker.test1".parse().unwrap();
        assert_eq!(id.object_id(), "test1");
        assert_eq!(id.as_str(), "device_tracker.test1");
    }

    #[test]
    fn test_object_id_without_domain() {
        let id = DeviceId::new("phone").unwrap();
        assert_eq!(id.object_id(), "phone");
    }

    #[test]
    fn test_invalid_ids() {
        assert_eq!(DeviceId::new(""), Err(DeviceIdError::Empty));
        assert_eq!(DeviceId::new("a b"), Err(DeviceIdError::Whitespace));
    }

    #[test]
    fn test_serde_as_string() {
        let id = DeviceId::new("device_tracker.test2").unwrap();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"device_tracker.test2\"");
        let back: DeviceId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
        assert!(serde_json::from_str::<DeviceId>("\"\"").is_err());
    }
}
