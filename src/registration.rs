//! Persisted bridge registrations.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

/// The record stored by the host once a bridge has been paired.
///
/// At most one registration exists per normalized bridge id and per host; a
/// re-link replaces the old record instead of adding a second one.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct BridgeRegistration {
    pub host: String,
    /// Normalized 12 character bridge id.
    pub bridge_id: String,
    /// Credential obtained through the link-button ceremony.
    pub username: String,
}

impl BridgeRegistration {
    pub fn new(host: &str, bridge_id: &str, username: &str) -> Self {
        BridgeRegistration {
            host: host.to_string(),
            bridge_id: bridge_id.to_string(),
            username: username.to_string(),
        }
    }

    /// Whether `other` must be dropped once this registration is stored.
    ///
    /// # Example
    ///
    /// ```
    /// use hue_bridge_rs::BridgeRegistration;
    ///
    /// let fresh = BridgeRegistration::new("10.0.0.2", "00178823af15", "new");
    /// let moved = BridgeRegistration::new("10.0.0.9", "00178823af15", "old");
    /// let other = BridgeRegistration::new("10.0.0.3", "001788aabbcc", "x");
    /// assert!(fresh.supersedes(&moved));
    /// assert!(!fresh.supersedes(&other));
    /// ```
    pub fn supersedes(&self, other: &Self) -> bool {
        self != other && (self.bridge_id == other.bridge_id || self.host == other.host)
    }
}

/// Hosts that already have a registration.
pub fn configured_hosts(registrations: &[BridgeRegistration]) -> HashSet<String> {
    registrations.iter().map(|r| r.host.clone()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_supersedes_same_host() {
        let fresh = BridgeRegistration::new("10.0.0.2", "00178823af15", "new");
        let stale = BridgeRegistration::new("10.0.0.2", "00178823af15", "old");
        assert!(fresh.supersedes(&stale));
        assert!(!fresh.supersedes(&fresh.clone()));
    }

    #[test]
    fn test_configured_hosts() {
        let hosts = configured_hosts(&[
            BridgeRegistration::new("10.0.0.2", "00178823af15", "a"),
            BridgeRegistration::new("10.0.0.3", "001788aabbcc", "b"),
        ]);
        assert!(hosts.contains("10.0.0.2"));
        assert!(hosts.contains("10.0.0.3"));
        assert_eq!(hosts.len(), 2);
    }

    #[test]
    fn test_serialized_field_names() {
        let value =
            serde_json::to_value(BridgeRegistration::new("10.0.0.2", "00178823af15", "abc"))
                .unwrap();
        assert_eq!(value["host"], "10.0.0.2");
        assert_eq!(value["bridge_id"], "00178823af15");
        assert_eq!(value["username"], "abc");
    }
}
