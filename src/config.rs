//! Integration constants, options and bridge model detection.

use std::path::Path;
use std::time::Duration;

use log::debug;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Integration domain, used for service registration.
pub const DOMAIN: &str = "hue";

/// Service that recalls a scene by group and scene name.
pub const SERVICE_ACTIVATE_SCENE: &str = "hue_activate_scene";

/// Upper bound for creating and validating a username.
pub const AUTH_TIMEOUT: Duration = Duration::from_secs(10);

/// Upper bound for a discovery round.
pub const DISCOVERY_TIMEOUT: Duration = Duration::from_secs(5);

/// Manufacturer URL advertised by genuine bridges over SSDP.
pub const HUE_MANUFACTURER_URL: &str = "http://www.philips.com";

/// Emulated bridges that advertise themselves like the real thing.
pub const IGNORED_BRIDGE_NAMES: [&str; 2] = ["HASS Bridge", "Espalexa"];

const DEVICE_TYPE_PREFIX: &str = "home-assistant";
const DEVICE_NAME_MAX_LEN: usize = 19;

/// Bridge models and the number of requests they can serve at once.
const CONCURRENCY_LIMITS: [(&str, usize); 1] = [("BSB001", 3)];
const DEFAULT_CONCURRENCY_LIMIT: usize = 10;

/// Per-registration options handed to dependent platforms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeOptions {
    /// Keep lights that the bridge reports as unreachable.
    pub allow_unreachable: bool,
    /// Expose light groups as entities.
    pub allow_groups: bool,
}

impl Default for BridgeOptions {
    fn default() -> Self {
        BridgeOptions {
            allow_unreachable: false,
            allow_groups: true,
        }
    }
}

/// Maximum in-flight requests for a bridge model.
///
/// # Example
///
/// ```
/// use hue_bridge_rs::concurrency_limit;
///
/// assert_eq!(concurrency_limit("BSB001"), 3);
/// assert_eq!(concurrency_limit("BSB002"), 10);
/// ```
pub fn concurrency_limit(model_id: &str) -> usize {
    CONCURRENCY_LIMITS
        .iter()
        .find(|(model, _)| *model == model_id)
        .map(|(_, limit)| *limit)
        .unwrap_or(DEFAULT_CONCURRENCY_LIMIT)
}

/// Label for a username created on the bridge, derived from the host's
/// instance name.
///
/// # Example
///
/// ```
/// use hue_bridge_rs::device_type;
///
/// assert_eq!(device_type("Home"), "home-assistant#home");
/// assert_eq!(
///     device_type("My Holiday Cottage By The Sea"),
///     "home-assistant#my-holiday-cottage"
/// );
/// ```
pub fn device_type(instance_name: &str) -> String {
    let slug = slug::slugify(instance_name);
    let name: String = slug.chars().take(DEVICE_NAME_MAX_LEN).collect();
    format!("{}#{}", DEVICE_TYPE_PREFIX, name.trim_end_matches('-'))
}

/// Read a username from a legacy `phue` configuration file.
///
/// The file maps a bridge host to `{"username": ...}`. A missing file,
/// invalid JSON or an entry without a username yields `None`.
pub fn read_legacy_username(path: &Path) -> Option<String> {
    let contents = std::fs::read_to_string(path).ok()?;
    let config: serde_json::Map<String, Value> = match serde_json::from_str(&contents) {
        Ok(config) => config,
        Err(e) => {
            debug!("Ignoring legacy config {}: {}", path.display(), e);
            return None;
        }
    };
    config
        .values()
        .next()
        .and_then(|entry| entry.get("username"))
        .and_then(|u| u.as_str())
        .map(String::from)
}
