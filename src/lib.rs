//! # tether
//!
//! Lifecycle wiring for a singleton stateful client over a keyed, lockable
//! binding registry.
//!
//! ## Features
//!
//! - **Single-instance protocol**: at most one client per registry,
//!   reconciled across constructor injection and prior registration
//! - **Irreversible locking**: configuration and client bindings are frozen
//!   once initialization consumes them
//! - **Derived bindings**: one discoverable entry per sub-resource the
//!   client exposes, registered under a common namespace and tag
//! - **Gated lifecycle**: `start`/`stop` open and close the connection and
//!   require initialization to have completed
//! - **Sum-typed bindings**: constant, alias, dynamic factory, and async
//!   provider sources with explicit discriminants
//!
//! ## Quick Start
//!
//! ```rust
//! use tether::{
//!     keys, tags, ClientSource, Registry, Resource, ResourceError,
//!     ResourceManager, SharedValue,
//! };
//! use async_trait::async_trait;
//! use std::sync::Arc;
//!
//! // The stateful client being managed
//! struct Users;
//!
//! struct MemoryClient {
//!     users: Arc<Users>,
//! }
//!
//! #[async_trait]
//! impl Resource for MemoryClient {
//!     async fn connect(&self) -> Result<(), ResourceError> {
//!         Ok(())
//!     }
//!     async fn disconnect(&self) -> Result<(), ResourceError> {
//!         Ok(())
//!     }
//!     fn subresource_names(&self) -> Vec<String> {
//!         vec!["users".to_string()]
//!     }
//!     fn subresource(&self, name: &str) -> Option<SharedValue> {
//!         match name {
//!             "users" => Some(self.users.clone()),
//!             _ => None,
//!         }
//!     }
//! }
//!
//! let registry = Arc::new(Registry::new());
//! let client = Arc::new(MemoryClient { users: Arc::new(Users) });
//!
//! let manager = ResourceManager::attach(
//!     Arc::clone(&registry),
//!     ClientSource::instance(client),
//!     None, // default configuration
//! ).unwrap();
//!
//! manager.init().unwrap();
//!
//! // The client binding is locked, and the users model is discoverable.
//! assert!(registry.binding(keys::CLIENT).unwrap().locked);
//! let models = registry.find_tagged(tags::SUB_RESOURCE);
//! assert_eq!(models.len(), 1);
//! let users = registry.get_sync::<Users>(&models[0].key).unwrap();
//! # let _ = users;
//! ```
//!
//! ## Lifecycle
//!
//! `init` runs exactly once per manager (later calls are no-ops) and is
//! where every irreversible step happens: conflict validation, client
//! materialization, binding locks, sub-resource derivation. `start` and
//! `stop` may run any number of times afterwards; they forward to the
//! client's `connect`/`disconnect` and propagate outcomes verbatim. The
//! manager assumes serialized lifecycle invocation; it never interleaves
//! its own operations.

// Module declarations
pub mod binding;
pub mod config;
pub mod error;
pub mod key;
pub mod manager;
pub mod provider;
pub mod registry;
pub mod resource;
pub mod scope;

// Re-export core types
pub use binding::{BindingInfo, BindingRef, SharedValue, SourceKind};
pub use config::ResourceConfig;
pub use error::{Error, TetherResult};
pub use key::{keys, tags, BindingKey};
pub use manager::{ClientFactory, ClientSource, ResourceManager};
pub use provider::Provider;
pub use registry::Registry;
pub use resource::{Resource, ResourceError};
pub use scope::BindingScope;
