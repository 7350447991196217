//! Bridge identifier normalization.

use log::warn;

/// Normalize a bridge identifier to its 12 character form.
///
/// Bridge ids arrive from several sources: SSDP/UPnP serial numbers,
/// N-UPnP `id` fields and the bridge's own `config.bridgeid`. The 16
/// character variants carry 4 padding characters in the middle (always
/// `fffe` in practice) that the 12 character form omits.
///
/// Any other length is returned unchanged after a warning; ids from
/// discovery sources are untrusted and must never abort a flow.
///
/// # Examples
///
/// ```
/// use hue_bridge_rs::normalize_bridge_id;
///
/// assert_eq!(normalize_bridge_id("001788fffe23af15"), "00178823af15");
/// assert_eq!(normalize_bridge_id("001788112233"), "001788112233");
/// assert_eq!(normalize_bridge_id("abc"), "abc");
/// ```
pub fn normalize_bridge_id(bridge_id: &str) -> String {
    match bridge_id.chars().count() {
        16 => bridge_id
            .chars()
            .take(6)
            .chain(bridge_id.chars().skip(10))
            .collect(),
        12 => bridge_id.to_string(),
        _ => {
            warn!("Unexpected bridge id number found: {}", bridge_id);
            bridge_id.to_string()
        }
    }
}
