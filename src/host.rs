//! Capabilities the core expects from the home-automation host.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use strum_macros::{AsRefStr, Display, EnumIter};
use uuid::Uuid;

use crate::errors::Error;
use crate::registration::BridgeRegistration;
use crate::runtime::BoxFuture;

/// Async handler invoked with a service call's data.
pub type ServiceHandler = Arc<dyn Fn(Value) -> BoxFuture<'static, Result<(), Error>> + Send + Sync>;

/// Platforms the host sets up on top of a bridge session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, AsRefStr, EnumIter)]
#[strum(serialize_all = "snake_case")]
pub enum Platform {
    Light,
    BinarySensor,
    Sensor,
}

/// How a pairing flow was started.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum FlowSource {
    User,
    Import,
    Ssdp,
    Homekit,
}

/// What the host knows about a flow while it is in progress.
#[serde_with::skip_serializing_none]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlowContext {
    pub flow_id: Uuid,
    pub source: FlowSource,
    pub host: Option<String>,
    pub unique_id: Option<String>,
}

impl FlowContext {
    pub fn new(source: FlowSource) -> Self {
        FlowContext {
            flow_id: Uuid::new_v4(),
            source,
            host: None,
            unique_id: None,
        }
    }
}

/// Named service dispatch owned by the host.
///
/// Injected into each session so the core never touches a global registry.
pub trait ServiceRegistry: Send + Sync {
    fn register(&self, domain: &str, service: &str, handler: ServiceHandler);

    /// Returns `false` if nothing was registered under that name.
    fn remove(&self, domain: &str, service: &str) -> bool;

    fn call(&self, domain: &str, service: &str, data: Value) -> BoxFuture<'_, Result<(), Error>>;
}

/// Entry storage, flow management and platform forwarding.
pub trait Host: Send + Sync {
    /// Instance name used to label credentials created on the bridge.
    fn location_name(&self) -> String;

    /// All stored bridge registrations.
    fn registrations(&self) -> Vec<BridgeRegistration>;

    /// Contexts of every pairing flow currently in progress.
    fn flows_in_progress(&self) -> Vec<FlowContext>;

    /// Start a fresh import flow for `host` after its credential was lost.
    fn start_pairing_flow(&self, host: &str);

    /// Resolve `relative` against the host's configuration directory.
    fn config_path(&self, relative: &Path) -> PathBuf;

    /// Schedule setup of `platform` for the registration.
    fn forward_setup(&self, registration: &BridgeRegistration, platform: Platform);

    /// Unload `platform`. `None` means there was nothing to unload.
    fn forward_unload(
        &self,
        registration: &BridgeRegistration,
        platform: Platform,
    ) -> impl Future<Output = Option<bool>> + Send;
}
