//! # hue_bridge_rs
//!
//! Pairing and session management for Philips Hue bridges inside a
//! home-automation host.
//!
//! This crate provides the **runtime-agnostic** core that sits between a Hue
//! HTTP client and the host: the pairing flow that turns a bridge address
//! into a stored [`BridgeRegistration`], and the [`BridgeSession`] that keeps
//! one bridge authenticated while dependent platforms use it.
//!
//! ## Quick Start
//!
//! ```ignore
//! use std::sync::Arc;
//! use hue_bridge_rs::{BridgeSession, FlowResult, FlowSource, PairingFlow, ServiceRegistry, SetupOutcome};
//!
//! async fn pair(
//!     connector: Arc<MyClient>,
//!     host: Arc<MyHost>,
//!     discovery: Arc<MyDiscovery>,
//!     services: Arc<dyn ServiceRegistry>,
//! ) {
//!     let mut flow = PairingFlow::new(connector.clone(), host.clone(), discovery, FlowSource::User);
//!
//!     // Discovers bridges; a single bridge goes straight to the link step
//!     let mut result = flow.step_user(None).await;
//!
//!     // Ask the user to press the link button, then submit
//!     while let FlowResult::Form { .. } = result {
//!         result = flow.step_link(true).await;
//!     }
//!
//!     if let FlowResult::CreateEntry { registration, .. } = result {
//!         let session = Arc::new(BridgeSession::new(
//!             registration,
//!             Default::default(),
//!             connector,
//!             host,
//!             services,
//!         ));
//!         assert_eq!(session.setup().await, SetupOutcome::Loaded);
//!     }
//! }
//! ```
//!
//! ## Features
//!
//! - **Runtime Agnostic**: Works with tokio, async-std, or smol async runtimes
//! - **Pairing**: Discovery, SSDP and HomeKit entry points with link-button handling via [`PairingFlow`]
//! - **Legacy Import**: Reuses usernames from old `phue` config files via [`read_legacy_username`]
//! - **Concurrency Gate**: Per-model limit on in-flight bridge calls via [`BridgeSession::request`]
//! - **Scenes**: Recall scenes by group and scene name via [`BridgeSession::activate_named_scene`]
//! - **Re-linking**: Lost credentials start a fresh pairing flow via [`BridgeSession::mark_unauthorized`]
//!
//! ## Collaborators
//!
//! The crate never talks to the network or the host directly. It calls into
//! implementations of [`BridgeConnector`]/[`BridgeApi`] (the Hue HTTP client),
//! [`Discovery`] (bridge discovery), [`Host`] (entry storage and platform
//! forwarding) and [`ServiceRegistry`] (named service dispatch).
//!
//! ## Feature Flags
//!
//! - `runtime-tokio` (default): Use the tokio async runtime
//! - `runtime-async-std`: Use the async-std runtime
//! - `runtime-smol`: Use the smol runtime

mod api;
mod bridge;
mod config;
mod config_flow;
mod errors;
mod host;
mod identifier;
#[cfg(test)]
mod mock;
mod registration;
pub mod runtime;

// Re-export public API
pub use api::{BridgeApi, BridgeConfig, BridgeConnector, Group, Scene};
pub use bridge::{BridgeSession, LinkedBridge, SessionState, SetupOutcome, acquire_session};
pub use config::{
    AUTH_TIMEOUT, BridgeOptions, DISCOVERY_TIMEOUT, DOMAIN, HUE_MANUFACTURER_URL,
    IGNORED_BRIDGE_NAMES, SERVICE_ACTIVATE_SCENE, concurrency_limit, device_type,
    read_legacy_username,
};
pub use config_flow::{
    AbortReason, CredentialLookup, DiscoveredBridge, Discovery, FlowResult, FlowState, FlowStep,
    FormError, HomekitInfo, HostSelection, ImportInfo, PairingFlow, SsdpInfo,
};
pub use errors::{ApiError, Error};
pub use host::{FlowContext, FlowSource, Host, Platform, ServiceHandler, ServiceRegistry};
pub use identifier::normalize_bridge_id;
pub use registration::{BridgeRegistration, configured_hosts};
