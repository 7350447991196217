//! Capabilities the core expects from the bridge's HTTP API client.
//!
//! The client itself lives outside this crate. Implementations only need to
//! speak the bridge protocol; authentication policy, timeouts and
//! concurrency limits are applied by [`crate::bridge`].

use std::collections::BTreeSet;
use std::future::Future;

use serde::{Deserialize, Serialize};

use crate::errors::ApiError;

type ApiResult<T> = std::result::Result<T, ApiError>;

/// Metadata returned by a bridge once a username has been validated.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct BridgeConfig {
    /// User-visible bridge name, used as the registration title.
    pub name: String,
    /// Hardware model, e.g. `BSB001` for the first generation bridge.
    #[serde(rename = "modelid")]
    pub model_id: String,
    /// Raw bridge id as reported by the bridge (16 characters).
    #[serde(rename = "bridgeid")]
    pub bridge_id: String,
    #[serde(default)]
    pub sw_version: Option<String>,
}

/// A group of lights as known to the bridge.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Group {
    pub id: String,
    pub name: String,
    pub lights: Vec<String>,
}

/// A stored scene as known to the bridge.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Scene {
    pub id: String,
    pub name: String,
    pub lights: Vec<String>,
}

impl Scene {
    /// Whether this scene targets exactly the lights of `group`, ignoring order.
    pub fn matches_group(&self, group: &Group) -> bool {
        let ours: BTreeSet<&str> = self.lights.iter().map(String::as_str).collect();
        let theirs: BTreeSet<&str> = group.lights.iter().map(String::as_str).collect();
        ours == theirs
    }
}

/// One client bound to a single bridge host.
pub trait BridgeApi: Send + Sync {
    /// Host this client talks to.
    fn host(&self) -> &str;

    /// Username currently held by the client, if any.
    fn username(&self) -> Option<&str>;

    /// Ask the bridge for a new username labelled `device_type`.
    ///
    /// Succeeds only if the link button was pressed recently; on success the
    /// client keeps the new username for subsequent calls.
    fn create_user(&mut self, device_type: &str) -> impl Future<Output = ApiResult<()>> + Send;

    /// Validate the held username and load the bridge configuration.
    fn initialize(&mut self) -> impl Future<Output = ApiResult<BridgeConfig>> + Send;

    /// Groups from the client's cache.
    fn groups(&self) -> impl Future<Output = ApiResult<Vec<Group>>> + Send;

    /// Scenes from the client's cache.
    fn scenes(&self) -> impl Future<Output = ApiResult<Vec<Scene>>> + Send;

    /// Reload the group cache from the bridge.
    fn update_groups(&self) -> impl Future<Output = ApiResult<()>> + Send;

    /// Reload the scene cache from the bridge.
    fn update_scenes(&self) -> impl Future<Output = ApiResult<()>> + Send;

    /// Recall `scene_id` on the group's action endpoint.
    fn set_group_scene(
        &self,
        group_id: &str,
        scene_id: &str,
    ) -> impl Future<Output = ApiResult<()>> + Send;
}

/// Builds [`BridgeApi`] clients for a host.
pub trait BridgeConnector: Send + Sync {
    type Api: BridgeApi + 'static;

    fn connect(&self, host: &str, username: Option<&str>) -> Self::Api;
}
