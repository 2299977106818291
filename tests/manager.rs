use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tether::{
    keys, tags, BindingKey, BindingScope, ClientSource, Error, Provider, Registry, Resource,
    ResourceConfig, ResourceError, ResourceManager, SharedValue, SourceKind, TetherResult,
};

#[derive(Default)]
struct Users;

#[derive(Default)]
struct Orders;

#[derive(Default)]
struct FakeClient {
    connects: AtomicUsize,
    disconnects: AtomicUsize,
    fail_connect: bool,
    users: Arc<Users>,
    orders: Arc<Orders>,
}

#[async_trait]
impl Resource for FakeClient {
    async fn connect(&self) -> Result<(), ResourceError> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        if self.fail_connect {
            return Err("connect refused".into());
        }
        Ok(())
    }

    async fn disconnect(&self) -> Result<(), ResourceError> {
        self.disconnects.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn subresource_names(&self) -> Vec<String> {
        // "ghost" has no projection and must be skipped without error
        vec!["users".into(), "orders".into(), "ghost".into()]
    }

    fn subresource(&self, name: &str) -> Option<SharedValue> {
        match name {
            "users" => Some(self.users.clone()),
            "orders" => Some(self.orders.clone()),
            _ => None,
        }
    }
}

struct ClientProvider(Arc<dyn Resource>);

#[async_trait]
impl Provider for ClientProvider {
    async fn provide(&self, _registry: &Registry) -> TetherResult<SharedValue> {
        let value: SharedValue = Arc::new(self.0.clone());
        Ok(value)
    }
}

fn factory_source() -> ClientSource {
    ClientSource::factory(|_config| {
        let client: Arc<dyn Resource> = Arc::new(FakeClient::default());
        Ok(client)
    })
}

#[test]
fn test_init_without_instance_builds_from_config() {
    let registry = Arc::new(Registry::new());
    let manager = ResourceManager::new(Arc::clone(&registry), factory_source(), None).unwrap();

    manager.init().unwrap();

    assert!(manager.is_initialized());
    let client = registry.binding(keys::CLIENT).unwrap();
    assert_eq!(client.kind, SourceKind::Constant);
    assert_eq!(client.scope, BindingScope::Singleton);
    assert!(client.locked);
    assert!(registry.binding(keys::CONFIG).unwrap().locked);

    let models = registry.find_tagged(tags::SUB_RESOURCE);
    assert_eq!(models.len(), 2); // "ghost" projected nothing
    for model in &models {
        assert!(model.key.matches("resource.subresources.*"));
    }
}

#[test]
fn test_init_with_supplied_instance_binds_it() {
    let registry = Arc::new(Registry::new());
    let client: Arc<dyn Resource> = Arc::new(FakeClient::default());
    let manager = ResourceManager::new(
        Arc::clone(&registry),
        ClientSource::instance(client.clone()),
        None,
    )
    .unwrap();

    manager.init().unwrap();

    assert!(Arc::ptr_eq(&manager.client().unwrap(), &client));
    assert!(registry.binding(keys::CLIENT).unwrap().locked);
}

#[test]
fn test_prebound_same_instance_succeeds() {
    let registry = Arc::new(Registry::new());
    let client: Arc<dyn Resource> = Arc::new(FakeClient::default());
    registry
        .bind(keys::CLIENT)
        .unwrap()
        .to(client.clone())
        .unwrap()
        .in_scope(BindingScope::Singleton)
        .unwrap();

    let manager = ResourceManager::new(
        Arc::clone(&registry),
        ClientSource::instance(client.clone()),
        None,
    )
    .unwrap();
    manager.init().unwrap();

    assert!(Arc::ptr_eq(&manager.client().unwrap(), &client));
    assert!(registry.binding(keys::CLIENT).unwrap().locked);
}

#[test]
fn test_conflicting_instance_fails_at_construction() {
    let registry = Arc::new(Registry::new());
    let bound: Arc<dyn Resource> = Arc::new(FakeClient::default());
    registry
        .bind(keys::CLIENT)
        .unwrap()
        .to(bound)
        .unwrap()
        .in_scope(BindingScope::Singleton)
        .unwrap();

    let other: Arc<dyn Resource> = Arc::new(FakeClient::default());
    let result = ResourceManager::new(
        Arc::clone(&registry),
        ClientSource::instance(other),
        None,
    );
    assert!(matches!(result, Err(Error::ConflictingInstance)));
}

#[test]
fn test_conflicting_instance_fails_at_init() {
    // The registry changes between construction and init; the conflict
    // check must re-run.
    let registry = Arc::new(Registry::new());
    let supplied: Arc<dyn Resource> = Arc::new(FakeClient::default());
    let manager = ResourceManager::new(
        Arc::clone(&registry),
        ClientSource::instance(supplied),
        None,
    )
    .unwrap();

    let interloper: Arc<dyn Resource> = Arc::new(FakeClient::default());
    registry
        .bind(keys::CLIENT)
        .unwrap()
        .to(interloper)
        .unwrap()
        .in_scope(BindingScope::Singleton)
        .unwrap();

    assert!(matches!(manager.init(), Err(Error::ConflictingInstance)));
    assert!(!manager.is_initialized());
}

#[test]
fn test_alias_backed_prebinding_fails() {
    let registry = Arc::new(Registry::new());
    let client: Arc<dyn Resource> = Arc::new(FakeClient::default());
    registry
        .bind("the.client")
        .unwrap()
        .to(client.clone())
        .unwrap()
        .in_scope(BindingScope::Singleton)
        .unwrap();
    registry
        .bind(keys::CLIENT)
        .unwrap()
        .to_alias("the.client")
        .unwrap()
        .in_scope(BindingScope::Singleton)
        .unwrap();

    let manager = ResourceManager::new(
        Arc::clone(&registry),
        ClientSource::instance(client),
        None,
    )
    .unwrap();
    assert!(matches!(
        manager.init(),
        Err(Error::NotSingletonConstant(_))
    ));
}

#[test]
fn test_dynamic_backed_prebinding_fails() {
    let registry = Arc::new(Registry::new());
    let client: Arc<dyn Resource> = Arc::new(FakeClient::default());
    let for_binding = client.clone();
    registry
        .bind(keys::CLIENT)
        .unwrap()
        .to_dynamic(move |_| Ok(for_binding.clone()))
        .unwrap()
        .in_scope(BindingScope::Singleton)
        .unwrap();

    let manager = ResourceManager::new(
        Arc::clone(&registry),
        ClientSource::instance(client),
        None,
    )
    .unwrap();
    assert!(matches!(
        manager.init(),
        Err(Error::NotSingletonConstant(_))
    ));
}

#[test]
fn test_provider_backed_prebinding_fails() {
    let registry = Arc::new(Registry::new());
    let client: Arc<dyn Resource> = Arc::new(FakeClient::default());
    registry
        .bind(keys::CLIENT)
        .unwrap()
        .to_provider(Arc::new(ClientProvider(client.clone())))
        .unwrap()
        .in_scope(BindingScope::Singleton)
        .unwrap();

    let manager = ResourceManager::new(
        Arc::clone(&registry),
        ClientSource::instance(client),
        None,
    )
    .unwrap();
    assert!(matches!(
        manager.init(),
        Err(Error::NotSingletonConstant(_))
    ));
}

#[test]
fn test_transient_constant_prebinding_fails() {
    let registry = Arc::new(Registry::new());
    let client: Arc<dyn Resource> = Arc::new(FakeClient::default());
    // Constant-sourced but not singleton-scoped
    registry
        .bind(keys::CLIENT)
        .unwrap()
        .to(client.clone())
        .unwrap()
        .in_scope(BindingScope::Transient)
        .unwrap();

    let manager = ResourceManager::new(
        Arc::clone(&registry),
        ClientSource::instance(client),
        None,
    )
    .unwrap();
    assert!(matches!(
        manager.init(),
        Err(Error::NotSingletonConstant(_))
    ));
}

#[test]
fn test_init_twice_is_noop() {
    let registry = Arc::new(Registry::new());
    let manager = ResourceManager::new(Arc::clone(&registry), factory_source(), None).unwrap();

    manager.init().unwrap();
    let first = manager.client().unwrap();
    let models_before = registry.find_tagged(tags::SUB_RESOURCE).len();

    manager.init().unwrap();

    assert!(manager.is_initialized());
    assert!(Arc::ptr_eq(&manager.client().unwrap(), &first));
    assert_eq!(registry.find_tagged(tags::SUB_RESOURCE).len(), models_before);
}

#[test]
fn test_locked_bindings_reject_rebinding_after_init() {
    let registry = Arc::new(Registry::new());
    let manager = ResourceManager::new(Arc::clone(&registry), factory_source(), None).unwrap();
    manager.init().unwrap();

    assert!(matches!(
        registry.bind(keys::CLIENT),
        Err(Error::LockedBinding(_))
    ));
    assert!(matches!(
        registry.bind(keys::CONFIG),
        Err(Error::LockedBinding(_))
    ));
}

#[test]
fn test_subresource_bindings_resolve_to_projections() {
    let registry = Arc::new(Registry::new());
    let client = Arc::new(FakeClient::default());
    let as_resource: Arc<dyn Resource> = client.clone();
    let manager = ResourceManager::new(
        Arc::clone(&registry),
        ClientSource::instance(as_resource),
        None,
    )
    .unwrap();
    manager.init().unwrap();

    let users_key = BindingKey::namespaced(keys::SUB_RESOURCE_NAMESPACE, "users");
    let users = registry.get_sync::<Users>(users_key).unwrap();
    assert!(Arc::ptr_eq(&users, &client.users));

    let orders_key = BindingKey::namespaced(keys::SUB_RESOURCE_NAMESPACE, "orders");
    let orders = registry.get_sync::<Orders>(orders_key).unwrap();
    assert!(Arc::ptr_eq(&orders, &client.orders));

    assert!(!registry.is_bound(BindingKey::namespaced(keys::SUB_RESOURCE_NAMESPACE, "ghost")));
}

#[test]
fn test_config_edits_before_init_win() {
    let registry = Arc::new(Registry::new());
    let seen = Arc::new(std::sync::Mutex::new(String::new()));
    let seen_clone = seen.clone();
    let source = ClientSource::factory(move |config: &ResourceConfig| {
        *seen_clone.lock().unwrap() = config.name.clone();
        let client: Arc<dyn Resource> = Arc::new(FakeClient::default());
        Ok(client)
    });

    let manager = ResourceManager::new(
        Arc::clone(&registry),
        source,
        Some(ResourceConfig {
            name: "original".into(),
            ..ResourceConfig::default()
        }),
    )
    .unwrap();

    // Last write before the lock wins.
    registry
        .bind(keys::CONFIG)
        .unwrap()
        .to(ResourceConfig {
            name: "edited".into(),
            ..ResourceConfig::default()
        })
        .unwrap()
        .in_scope(BindingScope::Singleton)
        .unwrap();

    manager.init().unwrap();
    assert_eq!(&*seen.lock().unwrap(), "edited");
    assert!(matches!(
        registry.bind(keys::CONFIG),
        Err(Error::LockedBinding(_))
    ));
}

#[test]
fn test_existing_config_binding_wins_over_supplied() {
    let registry = Arc::new(Registry::new());
    registry
        .bind(keys::CONFIG)
        .unwrap()
        .to(ResourceConfig {
            name: "pre".into(),
            ..ResourceConfig::default()
        })
        .unwrap()
        .in_scope(BindingScope::Singleton)
        .unwrap();

    let seen = Arc::new(std::sync::Mutex::new(String::new()));
    let seen_clone = seen.clone();
    let source = ClientSource::factory(move |config: &ResourceConfig| {
        *seen_clone.lock().unwrap() = config.name.clone();
        let client: Arc<dyn Resource> = Arc::new(FakeClient::default());
        Ok(client)
    });

    let manager = ResourceManager::new(
        Arc::clone(&registry),
        source,
        Some(ResourceConfig {
            name: "supplied".into(),
            ..ResourceConfig::default()
        }),
    )
    .unwrap();
    manager.init().unwrap();

    assert_eq!(&*seen.lock().unwrap(), "pre");
}

#[test]
fn test_directly_registered_instance_is_adopted() {
    // No instance supplied, but one was registered into the registry before
    // init: the manager adopts it instead of building a new one.
    let registry = Arc::new(Registry::new());
    let prebound = Arc::new(FakeClient::default());
    let as_resource: Arc<dyn Resource> = prebound.clone();
    registry
        .bind(keys::CLIENT)
        .unwrap()
        .to(as_resource.clone())
        .unwrap()
        .in_scope(BindingScope::Singleton)
        .unwrap();

    let manager = ResourceManager::new(Arc::clone(&registry), factory_source(), None).unwrap();
    manager.init().unwrap();

    assert!(Arc::ptr_eq(&manager.client().unwrap(), &as_resource));
}

#[test]
fn test_attach_registers_manager_for_discovery() {
    let registry = Arc::new(Registry::new());
    let manager =
        ResourceManager::attach(Arc::clone(&registry), factory_source(), None).unwrap();

    let discovered = registry.find_tagged(tags::LIFECYCLE);
    assert_eq!(discovered.len(), 1);
    assert_eq!(discovered[0].key.as_str(), keys::MANAGER);

    let resolved = registry
        .get_sync::<Arc<ResourceManager>>(keys::MANAGER)
        .unwrap();
    assert!(Arc::ptr_eq(&*resolved, &manager));
}

#[tokio::test]
async fn test_start_and_stop_before_init_fail() {
    let registry = Arc::new(Registry::new());
    let manager = ResourceManager::new(Arc::clone(&registry), factory_source(), None).unwrap();

    assert!(matches!(
        manager.start().await,
        Err(Error::NotInitialized("start"))
    ));
    assert!(matches!(
        manager.stop().await,
        Err(Error::NotInitialized("stop"))
    ));
}

#[tokio::test]
async fn test_lazy_connect_skips_connect() {
    let registry = Arc::new(Registry::new());
    let client = Arc::new(FakeClient::default());
    let as_resource: Arc<dyn Resource> = client.clone();
    let manager = ResourceManager::new(
        Arc::clone(&registry),
        ClientSource::instance(as_resource),
        Some(ResourceConfig {
            lazy_connect: true,
            ..ResourceConfig::default()
        }),
    )
    .unwrap();
    manager.init().unwrap();

    manager.start().await.unwrap();
    manager.start().await.unwrap();
    assert_eq!(client.connects.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_eager_start_connects_once_per_call() {
    let registry = Arc::new(Registry::new());
    let client = Arc::new(FakeClient::default());
    let as_resource: Arc<dyn Resource> = client.clone();
    let manager = ResourceManager::new(
        Arc::clone(&registry),
        ClientSource::instance(as_resource),
        None,
    )
    .unwrap();
    manager.init().unwrap();

    manager.start().await.unwrap();
    assert_eq!(client.connects.load(Ordering::SeqCst), 1);
    // Repeated start passes through; collapsing is the client's concern.
    manager.start().await.unwrap();
    assert_eq!(client.connects.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_stop_always_disconnects() {
    let registry = Arc::new(Registry::new());
    let client = Arc::new(FakeClient::default());
    let as_resource: Arc<dyn Resource> = client.clone();
    let manager = ResourceManager::new(
        Arc::clone(&registry),
        ClientSource::instance(as_resource),
        Some(ResourceConfig {
            lazy_connect: true,
            ..ResourceConfig::default()
        }),
    )
    .unwrap();
    manager.init().unwrap();

    // No lazy short-circuit on the stop path.
    manager.stop().await.unwrap();
    assert_eq!(client.disconnects.load(Ordering::SeqCst), 1);
    manager.stop().await.unwrap();
    assert_eq!(client.disconnects.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_connect_failure_propagates() {
    let registry = Arc::new(Registry::new());
    let client = Arc::new(FakeClient {
        fail_connect: true,
        ..FakeClient::default()
    });
    let as_resource: Arc<dyn Resource> = client.clone();
    let manager = ResourceManager::new(
        Arc::clone(&registry),
        ClientSource::instance(as_resource),
        None,
    )
    .unwrap();
    manager.init().unwrap();

    let err = manager.start().await.unwrap_err();
    match err {
        Error::Resource(inner) => assert_eq!(inner.to_string(), "connect refused"),
        other => panic!("unexpected error: {}", other),
    }
    assert_eq!(client.connects.load(Ordering::SeqCst), 1);
}
