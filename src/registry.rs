//! The binding registry: a keyed, lockable map of bindings.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, RwLock};

use tracing::{debug, trace};

use crate::binding::{Binding, BindingInfo, BindingRef, BindingSource, SharedValue};
use crate::error::{Error, TetherResult};
use crate::key::BindingKey;
use crate::scope::BindingScope;

/// Alias chains longer than this fail with [`Error::DepthExceeded`].
const MAX_RESOLUTION_DEPTH: usize = 32;

type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Keyed registry of [bindings](crate::BindingInfo) with per-entry locking.
///
/// The registry is the substrate the lifecycle manager runs on: a map from
/// dot-separated keys to value sources (constant, alias, dynamic factory,
/// async provider), each carrying a caching scope, discovery tags, and an
/// irreversible lock flag. Lock enforcement is centralized here: every
/// write path into an entry checks the flag.
///
/// Reads are safe to share across threads; registration and locking are
/// serialized through an internal `RwLock`.
///
/// # Examples
///
/// ```rust
/// use tether::{BindingScope, Registry};
///
/// let registry = Registry::new();
/// registry.bind("app.port").unwrap()
///     .to(8080u16).unwrap()
///     .in_scope(BindingScope::Singleton).unwrap();
///
/// let port = registry.get_sync::<u16>("app.port").unwrap();
/// assert_eq!(*port, 8080);
///
/// registry.lock("app.port").unwrap();
/// assert!(registry.bind("app.port").is_err()); // Locked entries cannot be rebound
/// ```
pub struct Registry {
    bindings: RwLock<HashMap<BindingKey, Binding>>,
}

impl Registry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self {
            bindings: RwLock::new(HashMap::new()),
        }
    }

    /// Registers a fresh entry under `key` and returns a chainable handle.
    ///
    /// An existing unlocked entry under the same key is replaced; replacing
    /// a locked entry fails with [`Error::LockedBinding`].
    pub fn bind(&self, key: impl Into<BindingKey>) -> TetherResult<BindingRef<'_>> {
        let key = key.into();
        let mut bindings = self.bindings.write().unwrap();
        if let Some(existing) = bindings.get(&key) {
            if existing.locked {
                return Err(Error::LockedBinding(key));
            }
        }
        bindings.insert(key.clone(), Binding::empty());
        debug!(key = %key, "binding registered");
        Ok(BindingRef::new(self, key))
    }

    /// Whether any entry exists under `key`. Never creates one.
    pub fn is_bound(&self, key: impl Into<BindingKey>) -> bool {
        self.bindings.read().unwrap().contains_key(&key.into())
    }

    /// Metadata snapshot for the entry under `key`, if any. Never creates
    /// one and never evaluates its source.
    pub fn binding(&self, key: impl Into<BindingKey>) -> Option<BindingInfo> {
        let key = key.into();
        self.bindings
            .read()
            .unwrap()
            .get(&key)
            .map(|binding| binding.info(&key))
    }

    /// Irreversibly locks the entry under `key` against further mutation.
    ///
    /// Locking an already locked entry is a no-op. The flag can never be
    /// cleared for the registry's lifetime.
    pub fn lock(&self, key: impl Into<BindingKey>) -> TetherResult<()> {
        let key = key.into();
        let mut bindings = self.bindings.write().unwrap();
        let binding = bindings
            .get_mut(&key)
            .ok_or_else(|| Error::NotFound(key.clone()))?;
        binding.locked = true;
        debug!(key = %key, "binding locked");
        Ok(())
    }

    /// All entries whose key matches `pattern`, sorted by key.
    ///
    /// A pattern ending in `*` selects by prefix; any other pattern selects
    /// the exact key.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use tether::Registry;
    ///
    /// let registry = Registry::new();
    /// registry.bind("models.users").unwrap().to(1u8).unwrap();
    /// registry.bind("models.orders").unwrap().to(2u8).unwrap();
    /// registry.bind("config").unwrap().to(3u8).unwrap();
    ///
    /// let models = registry.find("models.*");
    /// assert_eq!(models.len(), 2);
    /// ```
    pub fn find(&self, pattern: &str) -> Vec<BindingInfo> {
        let bindings = self.bindings.read().unwrap();
        let mut found: Vec<BindingInfo> = bindings
            .iter()
            .filter(|(key, _)| key.matches(pattern))
            .map(|(key, binding)| binding.info(key))
            .collect();
        found.sort_by(|a, b| a.key.cmp(&b.key));
        found
    }

    /// All entries carrying `tag`, sorted by key.
    pub fn find_tagged(&self, tag: &str) -> Vec<BindingInfo> {
        let bindings = self.bindings.read().unwrap();
        let mut found: Vec<BindingInfo> = bindings
            .iter()
            .filter(|(_, binding)| binding.tags.iter().any(|t| t == tag))
            .map(|(key, binding)| binding.info(key))
            .collect();
        found.sort_by(|a, b| a.key.cmp(&b.key));
        found
    }

    /// Resolves the entry under `key` on the synchronous path and downcasts
    /// to `T`.
    ///
    /// Constant, alias, and dynamic sources resolve here; a provider-backed
    /// entry fails with [`Error::RequiresAsync`]. Singleton-scoped entries
    /// cache the materialized value on first resolution.
    pub fn get_sync<T: Send + Sync + 'static>(
        &self,
        key: impl Into<BindingKey>,
    ) -> TetherResult<Arc<T>> {
        let key = key.into();
        let value = self.resolve_sync(&key, 0)?;
        value.downcast::<T>().map_err(|_| Error::TypeMismatch(key))
    }

    /// Resolves the entry under `key` on the asynchronous path and downcasts
    /// to `T`.
    ///
    /// Handles every source kind, awaiting provider-backed entries.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use tether::{Registry, TetherResult};
    ///
    /// # async fn demo() -> TetherResult<()> {
    /// let registry = Registry::new();
    /// registry.bind("app.name")?.to("demo".to_string())?;
    /// let name = registry.get::<String>("app.name").await?;
    /// assert_eq!(&*name, "demo");
    /// # Ok(())
    /// # }
    /// ```
    pub async fn get<T: Send + Sync + 'static>(
        &self,
        key: impl Into<BindingKey>,
    ) -> TetherResult<Arc<T>> {
        let key = key.into();
        let value = self.resolve_async(key.clone(), 0).await?;
        value.downcast::<T>().map_err(|_| Error::TypeMismatch(key))
    }

    /// The constant value bound under `key`, if the entry exists and is
    /// constant-sourced. Never evaluates factories.
    pub(crate) fn constant_value(&self, key: impl Into<BindingKey>) -> Option<SharedValue> {
        let bindings = self.bindings.read().unwrap();
        match bindings.get(&key.into()).map(|binding| &binding.source) {
            Some(BindingSource::Constant(value)) => Some(value.clone()),
            _ => None,
        }
    }

    /// Applies `f` to the entry under `key`, enforcing the lock flag.
    pub(crate) fn mutate<F>(&self, key: &BindingKey, f: F) -> TetherResult<()>
    where
        F: FnOnce(&mut Binding),
    {
        let mut bindings = self.bindings.write().unwrap();
        let binding = bindings
            .get_mut(key)
            .ok_or_else(|| Error::NotFound(key.clone()))?;
        if binding.locked {
            return Err(Error::LockedBinding(key.clone()));
        }
        f(binding);
        Ok(())
    }

    fn lookup(
        &self,
        key: &BindingKey,
    ) -> TetherResult<(BindingSource, BindingScope, Option<SharedValue>)> {
        let bindings = self.bindings.read().unwrap();
        let binding = bindings
            .get(key)
            .ok_or_else(|| Error::NotFound(key.clone()))?;
        Ok((binding.source.clone(), binding.scope, binding.cache.clone()))
    }

    // First resolution wins if two callers race to fill the cache.
    fn fill_cache(&self, key: &BindingKey, value: &SharedValue) {
        let mut bindings = self.bindings.write().unwrap();
        if let Some(binding) = bindings.get_mut(key) {
            binding.cache.get_or_insert_with(|| value.clone());
        }
    }

    fn resolve_sync(&self, key: &BindingKey, depth: usize) -> TetherResult<SharedValue> {
        if depth > MAX_RESOLUTION_DEPTH {
            return Err(Error::DepthExceeded(MAX_RESOLUTION_DEPTH));
        }
        let (source, scope, cache) = self.lookup(key)?;
        if scope == BindingScope::Singleton {
            if let Some(value) = cache {
                return Ok(value);
            }
        }
        trace!(key = %key, "resolving binding");
        let value = match source {
            BindingSource::Empty => return Err(Error::NotFound(key.clone())),
            BindingSource::Constant(value) => value,
            BindingSource::Alias(target) => self.resolve_sync(&target, depth + 1)?,
            BindingSource::Dynamic(factory) => factory(self)?,
            BindingSource::Provider(_) => return Err(Error::RequiresAsync(key.clone())),
        };
        if scope == BindingScope::Singleton {
            self.fill_cache(key, &value);
        }
        Ok(value)
    }

    fn resolve_async(&self, key: BindingKey, depth: usize) -> BoxFuture<'_, TetherResult<SharedValue>> {
        Box::pin(async move {
            if depth > MAX_RESOLUTION_DEPTH {
                return Err(Error::DepthExceeded(MAX_RESOLUTION_DEPTH));
            }
            let (source, scope, cache) = self.lookup(&key)?;
            if scope == BindingScope::Singleton {
                if let Some(value) = cache {
                    return Ok(value);
                }
            }
            trace!(key = %key, "resolving binding");
            let value = match source {
                BindingSource::Empty => return Err(Error::NotFound(key)),
                BindingSource::Constant(value) => value,
                BindingSource::Alias(target) => self.resolve_async(target, depth + 1).await?,
                BindingSource::Dynamic(factory) => factory(self)?,
                BindingSource::Provider(provider) => provider.provide(self).await?,
            };
            if scope == BindingScope::Singleton {
                self.fill_cache(&key, &value);
            }
            Ok(value)
        })
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binding::SourceKind;

    #[test]
    fn bind_replaces_unlocked_entry() {
        let registry = Registry::new();
        registry.bind("value").unwrap().to(1u32).unwrap();
        registry.bind("value").unwrap().to(2u32).unwrap();
        assert_eq!(*registry.get_sync::<u32>("value").unwrap(), 2);
    }

    #[test]
    fn lock_blocks_rebinding() {
        let registry = Registry::new();
        registry.bind("value").unwrap().to(1u32).unwrap();
        registry.lock("value").unwrap();

        assert!(registry.binding("value").unwrap().locked);
        assert!(matches!(
            registry.bind("value"),
            Err(Error::LockedBinding(_))
        ));
    }

    #[test]
    fn lock_is_idempotent() {
        let registry = Registry::new();
        registry.bind("value").unwrap().to(1u32).unwrap();
        registry.lock("value").unwrap();
        registry.lock("value").unwrap();
        assert!(registry.binding("value").unwrap().locked);
    }

    #[test]
    fn alias_cycle_reports_depth_exceeded() {
        let registry = Registry::new();
        registry.bind("a").unwrap().to_alias("b").unwrap();
        registry.bind("b").unwrap().to_alias("a").unwrap();
        assert!(matches!(
            registry.get_sync::<u32>("a"),
            Err(Error::DepthExceeded(_))
        ));
    }

    #[test]
    fn empty_binding_resolves_as_not_found() {
        let registry = Registry::new();
        registry.bind("pending").unwrap();
        assert_eq!(
            registry.binding("pending").unwrap().kind,
            SourceKind::Empty
        );
        assert!(matches!(
            registry.get_sync::<u32>("pending"),
            Err(Error::NotFound(_))
        ));
    }
}
