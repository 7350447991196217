//! In-memory doubles for the bridge, host and discovery collaborators.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde_json::Value;

use crate::api::{BridgeApi, BridgeConfig, BridgeConnector, Group, Scene};
use crate::config_flow::{DiscoveredBridge, Discovery};
use crate::errors::{ApiError, Error};
use crate::host::{FlowContext, Host, Platform, ServiceHandler, ServiceRegistry};
use crate::registration::BridgeRegistration;
use crate::runtime::BoxFuture;

type ApiResult<T> = std::result::Result<T, ApiError>;

pub(crate) fn group(id: &str, name: &str, lights: &[&str]) -> Group {
    Group {
        id: id.to_string(),
        name: name.to_string(),
        lights: lights.iter().map(|l| l.to_string()).collect(),
    }
}

pub(crate) fn scene(id: &str, name: &str, lights: &[&str]) -> Scene {
    Scene {
        id: id.to_string(),
        name: name.to_string(),
        lights: lights.iter().map(|l| l.to_string()).collect(),
    }
}

#[derive(Debug)]
struct BridgeState {
    config: BridgeConfig,
    link_pressed: bool,
    usernames: Vec<String>,
    fault: Option<ApiError>,
    delay: Option<Duration>,
    groups: Vec<Group>,
    scenes: Vec<Scene>,
    created_labels: Vec<String>,
    activations: Vec<(String, String)>,
    refreshes: usize,
}

/// A simulated bridge shared by every client connected to it.
#[derive(Debug, Clone)]
pub(crate) struct MockBridge(Arc<Mutex<BridgeState>>);

impl MockBridge {
    pub fn new() -> Self {
        MockBridge(Arc::new(Mutex::new(BridgeState {
            config: BridgeConfig {
                name: "Philips hue".to_string(),
                model_id: "BSB002".to_string(),
                bridge_id: "001788fffe23af15".to_string(),
                sw_version: None,
            },
            link_pressed: false,
            usernames: Vec::new(),
            fault: None,
            delay: None,
            groups: Vec::new(),
            scenes: Vec::new(),
            created_labels: Vec::new(),
            activations: Vec::new(),
            refreshes: 0,
        })))
    }

    fn with<T>(&self, f: impl FnOnce(&mut BridgeState) -> T) -> T {
        f(&mut self.0.lock().unwrap())
    }

    pub fn press_link_button(&self) {
        self.with(|s| s.link_pressed = true);
    }

    pub fn add_username(&self, username: &str) {
        self.with(|s| s.usernames.push(username.to_string()));
    }

    pub fn revoke_usernames(&self) {
        self.with(|s| s.usernames.clear());
    }

    pub fn fail_with(&self, fault: ApiError) {
        self.with(|s| s.fault = Some(fault));
    }

    pub fn respond_after(&self, delay: Duration) {
        self.with(|s| s.delay = Some(delay));
    }

    pub fn set_model(&self, model_id: &str) {
        self.with(|s| s.config.model_id = model_id.to_string());
    }

    pub fn set_groups(&self, groups: Vec<Group>) {
        self.with(|s| s.groups = groups);
    }

    pub fn set_scenes(&self, scenes: Vec<Scene>) {
        self.with(|s| s.scenes = scenes);
    }

    pub fn created_labels(&self) -> Vec<String> {
        self.with(|s| s.created_labels.clone())
    }

    pub fn activations(&self) -> Vec<(String, String)> {
        self.with(|s| s.activations.clone())
    }

    pub fn refreshes(&self) -> usize {
        self.with(|s| s.refreshes)
    }
}

#[derive(Debug)]
pub(crate) struct MockApi {
    host: String,
    username: Option<String>,
    bridge: MockBridge,
    groups: Mutex<Vec<Group>>,
    scenes: Mutex<Vec<Scene>>,
}

impl MockApi {
    fn authorized(&self) -> ApiResult<()> {
        let known = self.bridge.with(|s| {
            self.username
                .as_ref()
                .is_some_and(|u| s.usernames.contains(u))
        });
        if known { Ok(()) } else { Err(ApiError::Unauthorized) }
    }
}

impl BridgeApi for MockApi {
    fn host(&self) -> &str {
        &self.host
    }

    fn username(&self) -> Option<&str> {
        self.username.as_deref()
    }

    async fn create_user(&mut self, device_type: &str) -> ApiResult<()> {
        let username = self.bridge.with(|s| {
            if let Some(fault) = &s.fault {
                return Err(fault.clone());
            }
            if !s.link_pressed {
                return Err(ApiError::LinkButtonNotPressed);
            }
            let username = format!("user-{}", s.usernames.len() + 1);
            s.usernames.push(username.clone());
            s.created_labels.push(device_type.to_string());
            Ok(username)
        })?;
        self.username = Some(username);
        Ok(())
    }

    async fn initialize(&mut self) -> ApiResult<BridgeConfig> {
        if let Some(delay) = self.bridge.with(|s| s.delay) {
            tokio::time::sleep(delay).await;
        }
        if let Some(fault) = self.bridge.with(|s| s.fault.clone()) {
            return Err(fault);
        }
        self.authorized()?;
        let (config, groups, scenes) =
            self.bridge
                .with(|s| (s.config.clone(), s.groups.clone(), s.scenes.clone()));
        *self.groups.lock().unwrap() = groups;
        *self.scenes.lock().unwrap() = scenes;
        Ok(config)
    }

    async fn groups(&self) -> ApiResult<Vec<Group>> {
        Ok(self.groups.lock().unwrap().clone())
    }

    async fn scenes(&self) -> ApiResult<Vec<Scene>> {
        Ok(self.scenes.lock().unwrap().clone())
    }

    async fn update_groups(&self) -> ApiResult<()> {
        self.authorized()?;
        let groups = self.bridge.with(|s| {
            s.refreshes += 1;
            s.groups.clone()
        });
        *self.groups.lock().unwrap() = groups;
        Ok(())
    }

    async fn update_scenes(&self) -> ApiResult<()> {
        self.authorized()?;
        *self.scenes.lock().unwrap() = self.bridge.with(|s| s.scenes.clone());
        Ok(())
    }

    async fn set_group_scene(&self, group_id: &str, scene_id: &str) -> ApiResult<()> {
        self.authorized()?;
        self.bridge.with(|s| {
            s.activations
                .push((group_id.to_string(), scene_id.to_string()))
        });
        Ok(())
    }
}

pub(crate) struct MockConnector {
    bridge: MockBridge,
}

impl MockConnector {
    pub fn new(bridge: &MockBridge) -> Self {
        MockConnector {
            bridge: bridge.clone(),
        }
    }
}

impl BridgeConnector for MockConnector {
    type Api = MockApi;

    fn connect(&self, host: &str, username: Option<&str>) -> MockApi {
        MockApi {
            host: host.to_string(),
            username: username.map(String::from),
            bridge: self.bridge.clone(),
            groups: Mutex::new(Vec::new()),
            scenes: Mutex::new(Vec::new()),
        }
    }
}

#[derive(Default)]
pub(crate) struct MockHost {
    registrations: Mutex<Vec<BridgeRegistration>>,
    flows: Mutex<Vec<FlowContext>>,
    pairing_requests: Mutex<Vec<String>>,
    config_dir: Mutex<Option<PathBuf>>,
    forwarded: Mutex<Vec<Platform>>,
    unloaded: Mutex<Vec<Platform>>,
    unload_results: Mutex<HashMap<Platform, Option<bool>>>,
}

impl MockHost {
    pub fn add_registration(&self, registration: BridgeRegistration) {
        self.registrations.lock().unwrap().push(registration);
    }

    pub fn add_flow(&self, context: FlowContext) {
        self.flows.lock().unwrap().push(context);
    }

    pub fn set_unload_result(&self, platform: Platform, result: Option<bool>) {
        self.unload_results.lock().unwrap().insert(platform, result);
    }

    pub fn pairing_requests(&self) -> Vec<String> {
        self.pairing_requests.lock().unwrap().clone()
    }

    pub fn set_config_dir(&self, dir: &Path) {
        *self.config_dir.lock().unwrap() = Some(dir.to_path_buf());
    }

    pub fn forwarded(&self) -> Vec<Platform> {
        self.forwarded.lock().unwrap().clone()
    }

    pub fn unloaded(&self) -> Vec<Platform> {
        self.unloaded.lock().unwrap().clone()
    }
}

impl Host for MockHost {
    fn location_name(&self) -> String {
        "Home".to_string()
    }

    fn registrations(&self) -> Vec<BridgeRegistration> {
        self.registrations.lock().unwrap().clone()
    }

    fn flows_in_progress(&self) -> Vec<FlowContext> {
        self.flows.lock().unwrap().clone()
    }

    fn start_pairing_flow(&self, host: &str) {
        self.pairing_requests.lock().unwrap().push(host.to_string());
    }

    fn config_path(&self, relative: &Path) -> PathBuf {
        match &*self.config_dir.lock().unwrap() {
            Some(dir) => dir.join(relative),
            None => relative.to_path_buf(),
        }
    }

    fn forward_setup(&self, _registration: &BridgeRegistration, platform: Platform) {
        self.forwarded.lock().unwrap().push(platform);
    }

    async fn forward_unload(
        &self,
        _registration: &BridgeRegistration,
        platform: Platform,
    ) -> Option<bool> {
        self.unloaded.lock().unwrap().push(platform);
        self.unload_results
            .lock()
            .unwrap()
            .get(&platform)
            .copied()
            .unwrap_or(Some(true))
    }
}

#[derive(Default)]
pub(crate) struct MockServices {
    handlers: Mutex<HashMap<String, ServiceHandler>>,
}

impl MockServices {
    pub fn has(&self, domain: &str, service: &str) -> bool {
        self.handlers
            .lock()
            .unwrap()
            .contains_key(&format!("{domain}.{service}"))
    }
}

impl ServiceRegistry for MockServices {
    fn register(&self, domain: &str, service: &str, handler: ServiceHandler) {
        self.handlers
            .lock()
            .unwrap()
            .insert(format!("{domain}.{service}"), handler);
    }

    fn remove(&self, domain: &str, service: &str) -> bool {
        self.handlers
            .lock()
            .unwrap()
            .remove(&format!("{domain}.{service}"))
            .is_some()
    }

    fn call(&self, domain: &str, service: &str, data: Value) -> BoxFuture<'_, Result<(), Error>> {
        let key = format!("{domain}.{service}");
        let handler = self.handlers.lock().unwrap().get(&key).cloned();
        Box::pin(async move {
            match handler {
                Some(handler) => handler(data).await,
                None => Err(Error::Unknown(format!("service {key} not found"))),
            }
        })
    }
}

pub(crate) struct MockDiscovery {
    result: ApiResult<Vec<DiscoveredBridge>>,
    delay: Option<Duration>,
}

impl MockDiscovery {
    pub fn found(bridges: &[(&str, &str)]) -> Self {
        MockDiscovery {
            result: Ok(bridges
                .iter()
                .map(|(host, id)| DiscoveredBridge {
                    host: host.to_string(),
                    id: id.to_string(),
                })
                .collect()),
            delay: None,
        }
    }

    pub fn failing(fault: ApiError) -> Self {
        MockDiscovery {
            result: Err(fault),
            delay: None,
        }
    }

    pub fn hanging() -> Self {
        MockDiscovery {
            result: Ok(Vec::new()),
            delay: Some(Duration::from_secs(60)),
        }
    }
}

impl Discovery for MockDiscovery {
    async fn discover(&self) -> ApiResult<Vec<DiscoveredBridge>> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.result.clone()
    }
}
