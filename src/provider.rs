//! Asynchronous value providers for bindings.

use async_trait::async_trait;

use crate::binding::SharedValue;
use crate::error::TetherResult;
use crate::registry::Registry;

/// Factory for binding values that need asynchronous construction, such as
/// connection pools, network handshakes, or authenticated sessions.
///
/// Provider-backed bindings resolve only through the async path
/// ([`Registry::get`]); the sync path reports
/// [`Error::RequiresAsync`](crate::Error::RequiresAsync). The provider may
/// resolve other bindings from the registry it is handed.
///
/// # Examples
///
/// ```rust
/// use tether::{Provider, Registry, SharedValue, TetherResult};
/// use async_trait::async_trait;
/// use std::sync::Arc;
///
/// struct PoolProvider;
///
/// #[async_trait]
/// impl Provider for PoolProvider {
///     async fn provide(&self, _registry: &Registry) -> TetherResult<SharedValue> {
///         let pool: SharedValue = Arc::new("pool".to_string());
///         Ok(pool)
///     }
/// }
///
/// # async fn demo() -> TetherResult<()> {
/// let registry = Registry::new();
/// registry.bind("db.pool")?.to_provider(Arc::new(PoolProvider))?;
/// let pool = registry.get::<String>("db.pool").await?;
/// assert_eq!(&*pool, "pool");
/// # Ok(())
/// # }
/// ```
#[async_trait]
pub trait Provider: Send + Sync {
    /// Produces the value for the binding.
    async fn provide(&self, registry: &Registry) -> TetherResult<SharedValue>;
}
