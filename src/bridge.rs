//! Session management for a single paired bridge.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};

use futures::future::join_all;
use log::{debug, error, info, warn};
use serde::Deserialize;
use serde_json::Value;
use strum::IntoEnumIterator;

use crate::api::{BridgeApi, BridgeConfig, BridgeConnector, Group, Scene};
use crate::config::{
    AUTH_TIMEOUT, BridgeOptions, DOMAIN, SERVICE_ACTIVATE_SCENE, concurrency_limit, device_type,
};
use crate::errors::{ApiError, Error};
use crate::host::{Host, Platform, ServiceHandler, ServiceRegistry};
use crate::registration::BridgeRegistration;
use crate::runtime::{self, BoxFuture, Mutex, Semaphore};

type Result<T> = std::result::Result<T, Error>;

/// Lookups are retried once after refreshing the group and scene caches.
const SCENE_LOOKUP_ATTEMPTS: usize = 2;

/// A bridge client whose username has been validated.
#[derive(Debug)]
pub struct LinkedBridge<A> {
    pub api: A,
    pub config: BridgeConfig,
    pub username: String,
}

/// Obtain a validated client for `host`.
///
/// Without a `username`, the bridge is first asked to create one labelled
/// after `instance_name`, which only works shortly after its link button was
/// pressed. Either way the username is then validated against the bridge.
///
/// The whole exchange is bounded by [`AUTH_TIMEOUT`]. Unexpected protocol
/// faults are logged and reported as [`Error::AuthenticationRequired`] so
/// callers fall back to pairing again.
pub async fn acquire_session<C: BridgeConnector>(
    connector: &C,
    host: &str,
    username: Option<&str>,
    instance_name: &str,
) -> Result<LinkedBridge<C::Api>> {
    let mut api = connector.connect(host, username);

    let attempt = async {
        if username.is_none() {
            api.create_user(&device_type(instance_name)).await?;
        }
        let config = api.initialize().await?;
        Ok::<_, ApiError>(config)
    };

    let config = match runtime::timeout(AUTH_TIMEOUT, attempt).await {
        Ok(Ok(config)) => config,
        Ok(Err(e)) => {
            return Err(match Error::from_api(e) {
                Error::Unknown(msg) => {
                    error!("Unknown Hue linking error occurred: {}", msg);
                    Error::AuthenticationRequired
                }
                err => err,
            });
        }
        Err(_) => return Err(Error::CannotConnect),
    };

    let username = api
        .username()
        .map(String::from)
        .ok_or(Error::AuthenticationRequired)?;

    Ok(LinkedBridge {
        api,
        config,
        username,
    })
}

/// Lifecycle of a [`BridgeSession`].
///
/// `AuthFailed` and `ConnFailed` are terminal; the host builds a new session
/// once the bridge is paired again or a retry is due.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Uninitialized,
    Authenticating,
    Authorized,
    AuthFailed,
    ConnFailed,
}

/// What the host should do after [`BridgeSession::setup`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetupOutcome {
    Loaded,
    /// The bridge could not be reached; try again later.
    RetryLater,
    /// Setup cannot succeed with this registration.
    Failed,
}

#[derive(Debug, Deserialize)]
struct SceneCall {
    group_name: String,
    scene_name: String,
}

struct Ready<A> {
    api: A,
    config: BridgeConfig,
    limit: usize,
    gate: Semaphore,
}

/// Runtime object for one registered bridge.
///
/// Built from a [`BridgeRegistration`] by the host, then [`setup`](Self::setup)
/// authenticates it and hooks it into the host. All outbound calls go through
/// [`request`](Self::request), which never lets more calls run at once than
/// the bridge model can take.
pub struct BridgeSession<C: BridgeConnector, H: Host> {
    registration: BridgeRegistration,
    options: BridgeOptions,
    connector: Arc<C>,
    host_platform: Arc<H>,
    services: Arc<dyn ServiceRegistry>,
    state: Mutex<SessionState>,
    ready: OnceLock<Ready<C::Api>>,
    available: AtomicBool,
    authorized: AtomicBool,
}

impl<C, H> BridgeSession<C, H>
where
    C: BridgeConnector + 'static,
    H: Host + 'static,
{
    pub fn new(
        registration: BridgeRegistration,
        options: BridgeOptions,
        connector: Arc<C>,
        host_platform: Arc<H>,
        services: Arc<dyn ServiceRegistry>,
    ) -> Self {
        BridgeSession {
            registration,
            options,
            connector,
            host_platform,
            services,
            state: Mutex::new(SessionState::Uninitialized),
            ready: OnceLock::new(),
            available: AtomicBool::new(true),
            authorized: AtomicBool::new(false),
        }
    }

    pub fn host(&self) -> &str {
        &self.registration.host
    }

    pub fn registration(&self) -> &BridgeRegistration {
        &self.registration
    }

    pub fn options(&self) -> BridgeOptions {
        self.options
    }

    pub async fn state(&self) -> SessionState {
        *self.state.lock().await
    }

    /// Last known reachability, maintained by dependent platforms.
    pub fn available(&self) -> bool {
        self.available.load(Ordering::SeqCst)
    }

    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// `false` once the bridge rejected the stored username.
    pub fn authorized(&self) -> bool {
        self.authorized.load(Ordering::SeqCst)
    }

    /// Configuration reported by the bridge during setup.
    pub fn bridge_config(&self) -> Option<&BridgeConfig> {
        self.ready.get().map(|ready| &ready.config)
    }

    /// Number of calls allowed in flight, fixed at setup.
    pub fn concurrency_limit(&self) -> Option<usize> {
        self.ready.get().map(|ready| ready.limit)
    }

    /// The validated API client.
    pub fn api(&self) -> Result<&C::Api> {
        self.ready
            .get()
            .map(|ready| &ready.api)
            .ok_or(Error::NotReady)
    }

    /// Authenticate with the stored username and hook the session into the host.
    pub async fn setup(self: &Arc<Self>) -> SetupOutcome {
        {
            let mut state = self.state.lock().await;
            if *state != SessionState::Uninitialized {
                warn!("Bridge session for {} was already set up", self.host());
                return SetupOutcome::Failed;
            }
            *state = SessionState::Authenticating;
        }

        let host = self.host();
        let location = self.host_platform.location_name();
        let linked = match acquire_session(
            &*self.connector,
            host,
            Some(&self.registration.username),
            &location,
        )
        .await
        {
            Ok(linked) => linked,
            Err(Error::AuthenticationRequired) => {
                // The username is gone, e.g. after a bridge reset. Pairing
                // again replaces this registration once it succeeds.
                self.set_state(SessionState::AuthFailed).await;
                self.host_platform.start_pairing_flow(host);
                return SetupOutcome::Failed;
            }
            Err(Error::CannotConnect) => {
                error!("Error connecting to the Hue bridge at {}", host);
                self.set_state(SessionState::ConnFailed).await;
                return SetupOutcome::RetryLater;
            }
            Err(e) => {
                error!("Unknown error connecting with Hue bridge at {}: {}", host, e);
                self.set_state(SessionState::AuthFailed).await;
                return SetupOutcome::Failed;
            }
        };

        let limit = concurrency_limit(&linked.config.model_id);
        debug!(
            "Bridge {} is a {}, allowing {} parallel requests",
            host, linked.config.model_id, limit
        );
        let ready = Ready {
            api: linked.api,
            config: linked.config,
            limit,
            gate: Semaphore::new(limit),
        };
        if self.ready.set(ready).is_err() {
            return SetupOutcome::Failed;
        }

        for platform in Platform::iter() {
            self.host_platform.forward_setup(&self.registration, platform);
        }
        self.services
            .register(DOMAIN, SERVICE_ACTIVATE_SCENE, self.scene_handler());

        self.authorized.store(true, Ordering::SeqCst);
        self.set_state(SessionState::Authorized).await;
        info!("Connected to Hue bridge at {}", host);
        SetupOutcome::Loaded
    }

    /// Run `call` once a concurrency slot is free.
    ///
    /// The slot is released when `call` finishes, fails or is dropped.
    pub async fn request<F, T>(&self, call: F) -> Result<T>
    where
        F: Future<Output = T>,
    {
        let ready = self.ready.get().ok_or(Error::NotReady)?;
        let _permit = runtime::acquire(&ready.gate)
            .await
            .map_err(|_| Error::NotReady)?;
        Ok(call.await)
    }

    /// Gated API call that reacts to a rejected username.
    pub async fn call_api<'a, F, Fut, T>(&'a self, call: F) -> Result<T>
    where
        F: FnOnce(&'a C::Api) -> Fut,
        Fut: Future<Output = std::result::Result<T, ApiError>>,
    {
        let api = self.api()?;
        match self.request(call(api)).await? {
            Ok(value) => Ok(value),
            Err(ApiError::Unauthorized) => {
                self.mark_unauthorized().await;
                Err(Error::AuthenticationRequired)
            }
            Err(e) => Err(Error::from_api(e)),
        }
    }

    /// Recall the scene called `scene_name` on the group called `group_name`.
    ///
    /// Scene names repeat across groups, so only a scene whose lights are
    /// exactly the group's lights qualifies. A missing group or scene is
    /// logged and ignored.
    pub async fn activate_named_scene(&self, group_name: &str, scene_name: &str) -> Result<()> {
        let api = self.api()?;
        let mut found: (Option<Group>, Option<Scene>) = (None, None);

        for attempt in 0..SCENE_LOOKUP_ATTEMPTS {
            if attempt > 0 {
                debug!("Refreshing groups and scenes of {}", self.host());
                self.call_api(|api| api.update_groups()).await?;
                self.call_api(|api| api.update_scenes()).await?;
            }

            let group = api
                .groups()
                .await?
                .into_iter()
                .find(|group| group.name == group_name);
            let scene = match &group {
                Some(group) => api
                    .scenes()
                    .await?
                    .into_iter()
                    .find(|scene| scene.name == scene_name && scene.matches_group(group)),
                None => None,
            };

            let resolved = group.is_some() && scene.is_some();
            found = (group, scene);
            if resolved {
                break;
            }
        }

        let (Some(group), scene) = found else {
            warn!("Unable to find group {}", group_name);
            return Ok(());
        };
        let Some(scene) = scene else {
            warn!("Unable to find scene {}", scene_name);
            return Ok(());
        };

        self.call_api(|api| api.set_group_scene(&group.id, &scene.id))
            .await
    }

    /// Record that the bridge rejected our username and ask for a re-link.
    ///
    /// Only the first call after a successful setup has any effect.
    pub async fn mark_unauthorized(&self) {
        if self
            .authorized
            .compare_exchange(true, false, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return;
        }

        error!(
            "Unable to authorize to bridge {}, setup the linking again.",
            self.host()
        );
        self.set_state(SessionState::AuthFailed).await;
        self.host_platform.start_pairing_flow(self.host());
    }

    /// Remove the scene service and unload every forwarded platform.
    ///
    /// Returns `false` if any platform failed to unload.
    pub async fn teardown(&self) -> bool {
        if self.ready.get().is_none() {
            return true;
        }

        self.services.remove(DOMAIN, SERVICE_ACTIVATE_SCENE);

        let results = join_all(Platform::iter().map(|platform| {
            self.host_platform
                .forward_unload(&self.registration, platform)
        }))
        .await;

        // No-op unloads count as success
        results.into_iter().all(|result| result.unwrap_or(true))
    }

    async fn set_state(&self, state: SessionState) {
        *self.state.lock().await = state;
    }

    fn scene_handler(self: &Arc<Self>) -> ServiceHandler {
        let session = Arc::downgrade(self);
        Arc::new(move |data: Value| {
            let session = session.clone();
            Box::pin(async move {
                let call: SceneCall = match serde_json::from_value(data) {
                    Ok(call) => call,
                    Err(e) => return Err(Error::InvalidServiceData(e)),
                };
                match session.upgrade() {
                    Some(session) => {
                        session
                            .activate_named_scene(&call.group_name, &call.scene_name)
                            .await
                    }
                    None => Ok(()),
                }
            }) as BoxFuture<'static, Result<()>>
        })
    }
}
