//! Pairing flow turning a bridge host into a stored registration.
//!
//! A flow is entered from one of four steps: [`PairingFlow::step_user`] when
//! someone adds a bridge by hand, [`PairingFlow::step_ssdp`] and
//! [`PairingFlow::step_homekit`] when a discovery source announces one, and
//! [`PairingFlow::step_import`] when the host knows a bridge address already
//! (including re-links after a credential was rejected). Each step returns a
//! [`FlowResult`]: a form to show, a registration to store, or an abort.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use log::{debug, error, info};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display};

use crate::api::{BridgeApi, BridgeConnector};
use crate::bridge::{LinkedBridge, acquire_session};
use crate::config::{
    DISCOVERY_TIMEOUT, HUE_MANUFACTURER_URL, IGNORED_BRIDGE_NAMES, read_legacy_username,
};
use crate::errors::{ApiError, Error};
use crate::host::{FlowContext, FlowSource, Host};
use crate::identifier::normalize_bridge_id;
use crate::registration::{BridgeRegistration, configured_hosts};
use crate::runtime;

/// Looks up a username stored by a legacy configuration file.
pub type CredentialLookup = Box<dyn Fn(&Path) -> Option<String> + Send + Sync>;

/// A bridge reported by a discovery round.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscoveredBridge {
    pub host: String,
    pub id: String,
}

/// Finds bridges on the network.
pub trait Discovery: Send + Sync {
    fn discover(&self) -> impl Future<Output = Result<Vec<DiscoveredBridge>, ApiError>> + Send;
}

/// Host chosen from the discovery form.
#[derive(Debug, Clone, Deserialize)]
pub struct HostSelection {
    pub host: String,
}

/// An SSDP advertisement.
#[derive(Debug, Clone, Deserialize)]
pub struct SsdpInfo {
    pub host: String,
    pub manufacturer_url: String,
    #[serde(default)]
    pub name: Option<String>,
    pub serial: String,
}

/// A HomeKit advertisement. `id` is colon separated.
#[derive(Debug, Clone, Deserialize)]
pub struct HomekitInfo {
    pub host: String,
    pub id: String,
}

/// A bridge to register without user interaction, if possible.
#[derive(Debug, Clone, Deserialize)]
pub struct ImportInfo {
    pub host: String,
    /// Legacy config file that may hold a username.
    #[serde(default)]
    pub path: Option<PathBuf>,
}

/// Steps that can be shown as a form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, AsRefStr, Serialize)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum FlowStep {
    Init,
    Link,
}

/// Error shown on the link form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, AsRefStr, Serialize)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum FormError {
    /// The link button was not pressed.
    RegisterFailed,
    /// The bridge could not be reached.
    Linking,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, AsRefStr, Serialize)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum AbortReason {
    DiscoverTimeout,
    NoBridges,
    AllConfigured,
    NotHueBridge,
    AlreadyInProgress,
    AlreadyConfigured,
    CannotConnect,
    Unknown,
}

/// Where a flow currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum FlowState {
    Init,
    DiscoveryResult,
    Link,
    Discovered,
    Import,
    Complete,
    Aborted,
}

/// Outcome of a flow step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlowResult {
    Form {
        step: FlowStep,
        /// Choices for [`FlowStep::Init`]; empty otherwise.
        hosts: Vec<String>,
        error: Option<FormError>,
    },
    CreateEntry {
        title: String,
        registration: BridgeRegistration,
        /// Stored registrations the host must drop when it persists this one.
        replaces: Vec<BridgeRegistration>,
    },
    Abort {
        reason: AbortReason,
    },
}

/// One pairing attempt.
///
/// The flow holds no session and persists nothing until it completes, so
/// dropping it at any step leaves no trace.
pub struct PairingFlow<C, H, D> {
    connector: Arc<C>,
    host_platform: Arc<H>,
    discovery: Arc<D>,
    context: FlowContext,
    candidate_host: Option<String>,
    state: FlowState,
    credential_lookup: CredentialLookup,
}

impl<C, H, D> PairingFlow<C, H, D>
where
    C: BridgeConnector,
    H: Host,
    D: Discovery,
{
    pub fn new(
        connector: Arc<C>,
        host_platform: Arc<H>,
        discovery: Arc<D>,
        source: FlowSource,
    ) -> Self {
        PairingFlow {
            connector,
            host_platform,
            discovery,
            context: FlowContext::new(source),
            candidate_host: None,
            state: FlowState::Init,
            credential_lookup: Box::new(read_legacy_username),
        }
    }

    /// Replace how legacy config files are read.
    pub fn with_credential_lookup<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&Path) -> Option<String> + Send + Sync + 'static,
    {
        self.credential_lookup = Box::new(lookup);
        self
    }

    pub fn context(&self) -> &FlowContext {
        &self.context
    }

    pub fn state(&self) -> FlowState {
        self.state
    }

    pub fn candidate_host(&self) -> Option<&str> {
        self.candidate_host.as_deref()
    }

    /// Flow started by hand.
    pub async fn step_user(&mut self, user_input: Option<HostSelection>) -> FlowResult {
        self.step_init(user_input).await
    }

    /// Pick a host, discovering candidates if none was given.
    ///
    /// A single unconfigured candidate goes straight to the link step
    /// without asking.
    pub async fn step_init(&mut self, user_input: Option<HostSelection>) -> FlowResult {
        self.state = FlowState::Init;

        if let Some(selection) = user_input {
            self.select_host(&selection.host);
            return self.step_link(false).await;
        }

        let bridges = match runtime::timeout(DISCOVERY_TIMEOUT, self.discovery.discover()).await {
            Ok(Ok(bridges)) => bridges,
            Ok(Err(e)) => {
                error!("Bridge discovery failed: {}", e);
                return self.abort(AbortReason::CannotConnect);
            }
            Err(_) => return self.abort(AbortReason::DiscoverTimeout),
        };
        self.state = FlowState::DiscoveryResult;

        if bridges.is_empty() {
            return self.abort(AbortReason::NoBridges);
        }

        let configured = configured_hosts(&self.host_platform.registrations());
        let hosts: Vec<String> = bridges
            .into_iter()
            .map(|bridge| bridge.host)
            .filter(|host| !configured.contains(host))
            .collect();

        match hosts.len() {
            0 => self.abort(AbortReason::AllConfigured),
            1 => {
                let host = hosts[0].clone();
                self.select_host(&host);
                self.step_link(false).await
            }
            _ => self.show_form(FlowStep::Init, hosts, None),
        }
    }

    /// Try to create a username on the selected bridge.
    ///
    /// Linking is attempted on every entry in case the button was already
    /// pressed. Errors are only shown once the user has `submitted` the form.
    pub async fn step_link(&mut self, submitted: bool) -> FlowResult {
        self.state = FlowState::Link;

        let Some(host) = self.candidate_host.clone() else {
            error!("Link step entered without a bridge host");
            return self.abort(AbortReason::Unknown);
        };

        let location = self.host_platform.location_name();
        let error = match acquire_session(&*self.connector, &host, None, &location).await {
            Ok(linked) => return self.entry_from_bridge(linked),
            Err(Error::AuthenticationRequired) => FormError::RegisterFailed,
            Err(Error::CannotConnect) => {
                error!("Error connecting to the Hue bridge at {}", host);
                FormError::Linking
            }
            Err(e) => {
                error!("Unknown error connecting with Hue bridge at {}: {}", host, e);
                FormError::Linking
            }
        };

        self.show_form(FlowStep::Link, Vec::new(), submitted.then_some(error))
    }

    /// Bridge announced over SSDP.
    pub async fn step_ssdp(&mut self, info: SsdpInfo) -> FlowResult {
        self.state = FlowState::Discovered;

        if info.manufacturer_url != HUE_MANUFACTURER_URL {
            return self.abort(AbortReason::NotHueBridge);
        }
        let ignored = info
            .name
            .as_deref()
            .is_some_and(|name| IGNORED_BRIDGE_NAMES.iter().any(|n| name.contains(n)));
        if ignored {
            return self.abort(AbortReason::NotHueBridge);
        }

        self.context.host = Some(info.host.clone());
        if let Err(reason) = self.ensure_unclaimed(&info.host) {
            return self.abort(reason);
        }
        if let Err(reason) = self.set_unique_id(normalize_bridge_id(&info.serial), true) {
            return self.abort(reason);
        }

        let path = PathBuf::from(format!("phue-{}.conf", info.serial));
        self.step_import(ImportInfo {
            host: info.host,
            path: Some(path),
        })
        .await
    }

    /// Bridge announced over HomeKit.
    pub async fn step_homekit(&mut self, info: HomekitInfo) -> FlowResult {
        self.state = FlowState::Discovered;

        self.context.host = Some(info.host.clone());
        if let Err(reason) = self.ensure_unclaimed(&info.host) {
            return self.abort(reason);
        }
        let bridge_id = normalize_bridge_id(&info.id.replace(':', ""));
        if let Err(reason) = self.set_unique_id(bridge_id, true) {
            return self.abort(reason);
        }

        self.step_import(ImportInfo {
            host: info.host,
            path: None,
        })
        .await
    }

    /// Register a known host, reusing a legacy username when one is found.
    ///
    /// The legacy path is resolved against the host's configuration
    /// directory. Falls back to the link step when no valid username is
    /// available.
    pub async fn step_import(&mut self, info: ImportInfo) -> FlowResult {
        self.state = FlowState::Import;
        self.context.host = Some(info.host.clone());

        let legacy_path = info
            .path
            .as_deref()
            .map(|path| self.host_platform.config_path(path));
        let username = legacy_path
            .as_deref()
            .and_then(|path| (self.credential_lookup)(path));

        let location = self.host_platform.location_name();
        match acquire_session(&*self.connector, &info.host, username.as_deref(), &location).await
        {
            Ok(linked) => {
                info!(
                    "Imported authentication for {} from {:?}",
                    info.host, legacy_path
                );
                self.entry_from_bridge(linked)
            }
            Err(Error::AuthenticationRequired) => {
                info!("Invalid authentication for {}, requesting link.", info.host);
                self.candidate_host = Some(info.host);
                self.step_link(false).await
            }
            Err(Error::CannotConnect) => {
                error!("Error connecting to the Hue bridge at {}", info.host);
                self.abort(AbortReason::CannotConnect)
            }
            Err(e) => {
                error!(
                    "Unknown error connecting with Hue bridge at {}: {}",
                    info.host, e
                );
                self.abort(AbortReason::Unknown)
            }
        }
    }

    /// Bind the flow to a unique bridge id.
    ///
    /// With `raise_on_progress`, another in-progress flow holding the same id
    /// makes this one abort.
    pub fn set_unique_id(
        &mut self,
        unique_id: String,
        raise_on_progress: bool,
    ) -> Result<(), AbortReason> {
        if raise_on_progress {
            let taken = self
                .other_flows()
                .iter()
                .any(|flow| flow.unique_id.as_deref() == Some(unique_id.as_str()));
            if taken {
                return Err(AbortReason::AlreadyInProgress);
            }
        }
        self.context.unique_id = Some(unique_id);
        Ok(())
    }

    fn entry_from_bridge(&mut self, linked: LinkedBridge<C::Api>) -> FlowResult {
        let bridge_id = normalize_bridge_id(&linked.config.bridge_id);
        if self.context.unique_id.is_none() {
            self.context.unique_id = Some(bridge_id.clone());
        }

        let registration =
            BridgeRegistration::new(linked.api.host(), &bridge_id, &linked.username);
        let replaces: Vec<BridgeRegistration> = self
            .host_platform
            .registrations()
            .into_iter()
            .filter(|existing| registration.supersedes(existing))
            .collect();
        for stale in &replaces {
            debug!("Registration for {} will be replaced", stale.host);
        }

        self.state = FlowState::Complete;
        FlowResult::CreateEntry {
            title: linked.config.name,
            registration,
            replaces,
        }
    }

    fn select_host(&mut self, host: &str) {
        self.candidate_host = Some(host.to_string());
        self.context.host = Some(host.to_string());
    }

    fn ensure_unclaimed(&self, host: &str) -> Result<(), AbortReason> {
        if self
            .other_flows()
            .iter()
            .any(|flow| flow.host.as_deref() == Some(host))
        {
            return Err(AbortReason::AlreadyInProgress);
        }
        if configured_hosts(&self.host_platform.registrations()).contains(host) {
            return Err(AbortReason::AlreadyConfigured);
        }
        Ok(())
    }

    fn other_flows(&self) -> Vec<FlowContext> {
        self.host_platform
            .flows_in_progress()
            .into_iter()
            .filter(|flow| flow.flow_id != self.context.flow_id)
            .collect()
    }

    fn show_form(
        &self,
        step: FlowStep,
        hosts: Vec<String>,
        error: Option<FormError>,
    ) -> FlowResult {
        FlowResult::Form { step, hosts, error }
    }

    fn abort(&mut self, reason: AbortReason) -> FlowResult {
        debug!("Aborting pairing flow {}: {}", self.context.flow_id, reason);
        self.state = FlowState::Aborted;
        FlowResult::Abort { reason }
    }
}
