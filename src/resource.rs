//! The wrapped client abstraction.

use async_trait::async_trait;

use crate::binding::SharedValue;

/// Error type surfaced by client connect and disconnect operations.
///
/// The lifecycle manager forwards these unchanged; it never wraps,
/// reinterprets, or retries them.
pub type ResourceError = Box<dyn std::error::Error + Send + Sync>;

/// The externally owned stateful client the manager wires into the registry.
///
/// Implementations own their connection state entirely, including any
/// timeout, retry, or idempotence behavior. The manager issues `connect` and
/// `disconnect` calls as directed by its lifecycle hooks and propagates the
/// outcomes verbatim; repeated calls reach the client unfiltered.
///
/// A client also exposes the sub-resources it owns (models, collections,
/// topic handles). The manager enumerates [`subresource_names`] once during
/// initialization and registers one discoverable binding per projected
/// value.
///
/// [`subresource_names`]: Resource::subresource_names
///
/// # Examples
///
/// ```rust
/// use tether::{Resource, ResourceError, SharedValue};
/// use async_trait::async_trait;
/// use std::sync::Arc;
///
/// struct Users;
///
/// struct MemoryClient {
///     users: Arc<Users>,
/// }
///
/// #[async_trait]
/// impl Resource for MemoryClient {
///     async fn connect(&self) -> Result<(), ResourceError> {
///         Ok(())
///     }
///
///     async fn disconnect(&self) -> Result<(), ResourceError> {
///         Ok(())
///     }
///
///     fn subresource_names(&self) -> Vec<String> {
///         vec!["users".to_string()]
///     }
///
///     fn subresource(&self, name: &str) -> Option<SharedValue> {
///         match name {
///             "users" => Some(self.users.clone()),
///             _ => None,
///         }
///     }
/// }
/// ```
#[async_trait]
pub trait Resource: Send + Sync {
    /// Opens the underlying connection.
    async fn connect(&self) -> Result<(), ResourceError>;

    /// Closes the underlying connection.
    async fn disconnect(&self) -> Result<(), ResourceError>;

    /// Names of the sub-resources this client exposes.
    fn subresource_names(&self) -> Vec<String>;

    /// Projects a named sub-resource off the client.
    ///
    /// Returning `None` for a name is not an error; the manager skips it
    /// when deriving bindings.
    fn subresource(&self, name: &str) -> Option<SharedValue>;
}
