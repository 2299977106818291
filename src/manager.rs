//! The singleton resource lifecycle manager.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::debug;

use crate::binding::SourceKind;
use crate::config::ResourceConfig;
use crate::error::{Error, TetherResult};
use crate::key::{keys, tags, BindingKey};
use crate::registry::Registry;
use crate::resource::Resource;
use crate::scope::BindingScope;

/// Factory building a client from the configuration bound in the registry.
pub type ClientFactory = Box<dyn Fn(&ResourceConfig) -> TetherResult<Arc<dyn Resource>> + Send + Sync>;

/// Where the managed client comes from.
///
/// Either the application hands the manager a pre-built instance, or the
/// manager builds one itself during [`init`](ResourceManager::init) from the
/// configuration record current at that moment.
pub enum ClientSource {
    /// A pre-built client supplied by the application.
    Instance(Arc<dyn Resource>),
    /// Build the client at `init` time from the bound configuration.
    Factory(ClientFactory),
}

impl ClientSource {
    /// Wraps a pre-built client.
    pub fn instance(client: Arc<dyn Resource>) -> Self {
        ClientSource::Instance(client)
    }

    /// Wraps a factory invoked at `init` time.
    pub fn factory<F>(build: F) -> Self
    where
        F: Fn(&ResourceConfig) -> TetherResult<Arc<dyn Resource>> + Send + Sync + 'static,
    {
        ClientSource::Factory(Box::new(build))
    }
}

impl fmt::Debug for ClientSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClientSource::Instance(_) => f.write_str("ClientSource::Instance"),
            ClientSource::Factory(_) => f.write_str("ClientSource::Factory"),
        }
    }
}

/// Wires a single stateful client into a [`Registry`] and gates its
/// lifecycle.
///
/// The manager enforces the singleton protocol on top of the registry:
///
/// - reconciles a client arriving from two independent sources (supplied to
///   the constructor vs. previously bound under [`keys::CLIENT`]), failing
///   with [`Error::ConflictingInstance`] when they differ by reference;
/// - materializes the client from configuration when neither source
///   provided one;
/// - irreversibly locks the client and configuration bindings once
///   consumed;
/// - derives one discoverable binding per sub-resource the client exposes;
/// - exposes [`start`](Self::start) and [`stop`](Self::stop), both gated on
///   [`init`](Self::init) having completed.
///
/// Constructing several managers against the same registry, calling `init`
/// repeatedly, or calling the lifecycle hooks out of order never corrupts
/// registry state; every misuse surfaces as an error or a no-op.
///
/// # Examples
///
/// ```rust
/// use tether::{
///     keys, ClientSource, Registry, Resource, ResourceConfig, ResourceError,
///     ResourceManager, SharedValue,
/// };
/// use async_trait::async_trait;
/// use std::sync::Arc;
///
/// struct MemoryClient;
///
/// #[async_trait]
/// impl Resource for MemoryClient {
///     async fn connect(&self) -> Result<(), ResourceError> {
///         Ok(())
///     }
///     async fn disconnect(&self) -> Result<(), ResourceError> {
///         Ok(())
///     }
///     fn subresource_names(&self) -> Vec<String> {
///         Vec::new()
///     }
///     fn subresource(&self, _name: &str) -> Option<SharedValue> {
///         None
///     }
/// }
///
/// let registry = Arc::new(Registry::new());
/// let manager = ResourceManager::new(
///     Arc::clone(&registry),
///     ClientSource::instance(Arc::new(MemoryClient)),
///     Some(ResourceConfig::default()),
/// ).unwrap();
///
/// manager.init().unwrap();
/// assert!(manager.is_initialized());
/// assert!(registry.binding(keys::CLIENT).unwrap().locked);
/// ```
pub struct ResourceManager {
    registry: Arc<Registry>,
    source: ClientSource,
    initialized: AtomicBool,
}

impl ResourceManager {
    /// Creates a manager against `registry`.
    ///
    /// If no configuration is bound under [`keys::CONFIG`] yet, the supplied
    /// record (or [`ResourceConfig::default`] when `None`) is bound there,
    /// unlocked, and the application may still edit it until `init` consumes
    /// it. If a configuration is already bound, the supplied record is
    /// ignored and the existing binding wins.
    ///
    /// Fails with [`Error::ConflictingInstance`] when a client instance is
    /// supplied while a different instance is already bound under
    /// [`keys::CLIENT`]. The same check re-runs at the start of
    /// [`init`](Self::init), since the registry may change in between.
    pub fn new(
        registry: Arc<Registry>,
        source: ClientSource,
        config: Option<ResourceConfig>,
    ) -> TetherResult<Self> {
        if !registry.is_bound(keys::CONFIG) {
            registry
                .bind(keys::CONFIG)?
                .to(config.unwrap_or_default())?
                .in_scope(BindingScope::Singleton)?;
        }
        let manager = Self {
            registry,
            source,
            initialized: AtomicBool::new(false),
        };
        manager.check_conflict()?;
        Ok(manager)
    }

    /// Creates a manager and binds it under [`keys::MANAGER`], tagged
    /// [`tags::LIFECYCLE`], so lifecycle registries can discover it.
    pub fn attach(
        registry: Arc<Registry>,
        source: ClientSource,
        config: Option<ResourceConfig>,
    ) -> TetherResult<Arc<Self>> {
        let manager = Arc::new(Self::new(Arc::clone(&registry), source, config)?);
        registry
            .bind(keys::MANAGER)?
            .to(Arc::clone(&manager))?
            .in_scope(BindingScope::Singleton)?
            .tag(tags::LIFECYCLE)?;
        Ok(manager)
    }

    /// Whether [`init`](Self::init) has completed.
    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::Acquire)
    }

    /// The managed client, resolved from the registry.
    pub fn client(&self) -> TetherResult<Arc<dyn Resource>> {
        let client = self.registry.get_sync::<Arc<dyn Resource>>(keys::CLIENT)?;
        Ok(Arc::clone(&*client))
    }

    /// Performs all one-time setup.
    ///
    /// Steps, in order:
    ///
    /// 1. Re-run the constructor's conflict check.
    /// 2. Settle the client binding under [`keys::CLIENT`]: a supplied
    ///    instance is bound as a singleton constant unless an entry already
    ///    exists, in which case that entry must itself be a singleton
    ///    constant ([`Error::NotSingletonConstant`] otherwise; alias,
    ///    dynamic, and provider shapes could all yield a different instance
    ///    per resolution). Without a supplied instance the configuration is
    ///    re-read from the registry and the factory builds the client; an
    ///    instance bound directly into the registry beforehand is adopted
    ///    as-is.
    /// 3. Lock the configuration and client bindings for the registry's
    ///    lifetime.
    /// 4. Register one binding per sub-resource under
    ///    [`keys::SUB_RESOURCE_NAMESPACE`], tagged [`tags::SUB_RESOURCE`].
    ///
    /// Calling `init` again after it completed is a no-op. There is no
    /// rollback: steps are ordered validation-first, and anything registered
    /// before a later failure stays in place.
    pub fn init(&self) -> TetherResult<()> {
        if self.is_initialized() {
            return Ok(());
        }
        self.check_conflict()?;
        match &self.source {
            ClientSource::Instance(client) => match self.registry.binding(keys::CLIENT) {
                Some(info) => {
                    if info.kind != SourceKind::Constant || info.scope != BindingScope::Singleton {
                        return Err(Error::NotSingletonConstant(BindingKey::new(keys::CLIENT)));
                    }
                }
                None => self.bind_client(Arc::clone(client))?,
            },
            ClientSource::Factory(build) => {
                if !self.registry.is_bound(keys::CLIENT) {
                    let config = self.registry.get_sync::<ResourceConfig>(keys::CONFIG)?;
                    let client = build(&config)?;
                    self.bind_client(client)?;
                }
            }
        }
        self.registry.lock(keys::CONFIG)?;
        self.registry.lock(keys::CLIENT)?;
        self.register_subresources()?;
        self.initialized.store(true, Ordering::Release);
        debug!("resource manager initialized");
        Ok(())
    }

    /// Opens the client's connection, unless configuration defers it.
    ///
    /// Fails with [`Error::NotInitialized`] before [`init`](Self::init) has
    /// completed. With `lazy_connect` set, this is a no-op and the client is
    /// expected to connect on first use. Otherwise the client's `connect`
    /// outcome is propagated verbatim; no timeout, retry, or backoff is
    /// added here. Each `start` call issues its own connect call; collapsing
    /// repeats is the client's concern, not the manager's.
    pub async fn start(&self) -> TetherResult<()> {
        if !self.is_initialized() {
            return Err(Error::NotInitialized("start"));
        }
        let config = self.registry.get_sync::<ResourceConfig>(keys::CONFIG)?;
        if config.lazy_connect {
            debug!(name = %config.name, "lazy connect, skipping");
            return Ok(());
        }
        debug!(name = %config.name, "connecting client");
        self.client()?.connect().await.map_err(Error::Resource)
    }

    /// Closes the client's connection.
    ///
    /// Fails with [`Error::NotInitialized`] before [`init`](Self::init) has
    /// completed. Always attempts the disconnect: there is no
    /// `lazy_connect` short-circuit on this path and no guard against
    /// disconnecting an unopened connection. The outcome is propagated
    /// verbatim.
    pub async fn stop(&self) -> TetherResult<()> {
        if !self.is_initialized() {
            return Err(Error::NotInitialized("stop"));
        }
        debug!("disconnecting client");
        self.client()?.disconnect().await.map_err(Error::Resource)
    }

    fn check_conflict(&self) -> TetherResult<()> {
        let supplied = match &self.source {
            ClientSource::Instance(client) => client,
            ClientSource::Factory(_) => return Ok(()),
        };
        match self.registry.constant_value(keys::CLIENT) {
            Some(bound) => match bound.downcast::<Arc<dyn Resource>>() {
                Ok(existing) if Arc::ptr_eq(&*existing, supplied) => Ok(()),
                _ => Err(Error::ConflictingInstance),
            },
            None => Ok(()),
        }
    }

    fn bind_client(&self, client: Arc<dyn Resource>) -> TetherResult<()> {
        debug!(key = keys::CLIENT, "binding client instance");
        self.registry
            .bind(keys::CLIENT)?
            .to(client)?
            .in_scope(BindingScope::Singleton)?;
        Ok(())
    }

    // Best-effort: names whose projection returns None are skipped.
    fn register_subresources(&self) -> TetherResult<()> {
        let client = self.client()?;
        for name in client.subresource_names() {
            if let Some(value) = client.subresource(&name) {
                let key = BindingKey::namespaced(keys::SUB_RESOURCE_NAMESPACE, &name);
                debug!(key = %key, "binding sub-resource");
                self.registry
                    .bind(key)?
                    .to_shared(value)?
                    .in_scope(BindingScope::Singleton)?
                    .tag(tags::SUB_RESOURCE)?;
            }
        }
        Ok(())
    }
}

impl fmt::Debug for ResourceManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceManager")
            .field("source", &self.source)
            .field("initialized", &self.is_initialized())
            .finish()
    }
}
