//! Binding entries: the association between a key and a value source.

use std::any::Any;
use std::sync::Arc;

use crate::error::TetherResult;
use crate::key::BindingKey;
use crate::provider::Provider;
use crate::registry::Registry;
use crate::scope::BindingScope;

/// Type-erased shared value stored and resolved by bindings.
pub type SharedValue = Arc<dyn Any + Send + Sync>;

pub(crate) type DynamicFn = Arc<dyn Fn(&Registry) -> TetherResult<SharedValue> + Send + Sync>;

/// What a binding resolves to.
///
/// A tagged variant with an explicit discriminant ([`SourceKind`]) so
/// callers can inspect a binding's shape without resolving it.
#[derive(Clone)]
pub(crate) enum BindingSource {
    /// Fresh binding with no value attached yet
    Empty,
    /// Fixed, already-materialized value
    Constant(SharedValue),
    /// Delegates resolution to another key
    Alias(BindingKey),
    /// Synchronous factory evaluated against the registry
    Dynamic(DynamicFn),
    /// Asynchronous factory, only reachable via the async path
    Provider(Arc<dyn Provider>),
}

impl BindingSource {
    pub(crate) fn kind(&self) -> SourceKind {
        match self {
            BindingSource::Empty => SourceKind::Empty,
            BindingSource::Constant(_) => SourceKind::Constant,
            BindingSource::Alias(_) => SourceKind::Alias,
            BindingSource::Dynamic(_) => SourceKind::Dynamic,
            BindingSource::Provider(_) => SourceKind::Provider,
        }
    }
}

/// Discriminant of a binding's source, for introspection.
///
/// The lifecycle manager pattern-matches on this when validating a
/// pre-existing client binding: anything other than `Constant` (with
/// singleton scope) fails with
/// [`Error::NotSingletonConstant`](crate::Error::NotSingletonConstant).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    /// Bound but no source attached yet
    Empty,
    /// Fixed value
    Constant,
    /// Delegation to another key
    Alias,
    /// Synchronous factory
    Dynamic,
    /// Asynchronous factory
    Provider,
}

/// A registry entry.
pub(crate) struct Binding {
    pub(crate) source: BindingSource,
    pub(crate) scope: BindingScope,
    pub(crate) tags: Vec<String>,
    pub(crate) locked: bool,
    /// Materialized value for singleton-scoped bindings
    pub(crate) cache: Option<SharedValue>,
}

impl Binding {
    pub(crate) fn empty() -> Self {
        Self {
            source: BindingSource::Empty,
            scope: BindingScope::Transient,
            tags: Vec::new(),
            locked: false,
            cache: None,
        }
    }

    pub(crate) fn info(&self, key: &BindingKey) -> BindingInfo {
        BindingInfo {
            key: key.clone(),
            kind: self.source.kind(),
            scope: self.scope,
            tags: self.tags.clone(),
            locked: self.locked,
        }
    }
}

/// Snapshot of a binding's metadata.
///
/// Returned by [`Registry::binding`](crate::Registry::binding),
/// [`Registry::find`](crate::Registry::find) and
/// [`Registry::find_tagged`](crate::Registry::find_tagged). Reflects the
/// binding at the moment of the call; it does not track later mutation.
#[derive(Debug, Clone)]
pub struct BindingInfo {
    /// The binding's key
    pub key: BindingKey,
    /// Source discriminant
    pub kind: SourceKind,
    /// Caching scope
    pub scope: BindingScope,
    /// Discovery tags
    pub tags: Vec<String>,
    /// Whether the binding is locked against further mutation
    pub locked: bool,
}

/// Chainable handle for configuring a binding, returned by
/// [`Registry::bind`](crate::Registry::bind).
///
/// Every mutator runs through the registry's central lock check: once the
/// entry is locked, each of them fails with
/// [`Error::LockedBinding`](crate::Error::LockedBinding).
///
/// # Examples
///
/// ```rust
/// use tether::{BindingScope, Registry, TetherResult};
///
/// fn wire(registry: &Registry) -> TetherResult<()> {
///     registry.bind("app.name")?
///         .to("demo".to_string())?
///         .in_scope(BindingScope::Singleton)?
///         .tag("app:meta")?;
///     Ok(())
/// }
/// ```
pub struct BindingRef<'r> {
    registry: &'r Registry,
    key: BindingKey,
}

impl<'r> BindingRef<'r> {
    pub(crate) fn new(registry: &'r Registry, key: BindingKey) -> Self {
        Self { registry, key }
    }

    /// The key this handle configures.
    pub fn key(&self) -> &BindingKey {
        &self.key
    }

    /// Binds to a fixed value, wrapped in an `Arc`.
    pub fn to<T: Send + Sync + 'static>(self, value: T) -> TetherResult<Self> {
        let value: SharedValue = Arc::new(value);
        self.set_source(BindingSource::Constant(value))
    }

    /// Binds to an already type-erased shared value.
    ///
    /// Used when the value arrives pre-wrapped, e.g. sub-resources projected
    /// off a client by [`Resource::subresource`](crate::Resource::subresource).
    pub fn to_shared(self, value: SharedValue) -> TetherResult<Self> {
        self.set_source(BindingSource::Constant(value))
    }

    /// Binds as an alias delegating resolution to another key.
    pub fn to_alias(self, target: impl Into<BindingKey>) -> TetherResult<Self> {
        self.set_source(BindingSource::Alias(target.into()))
    }

    /// Binds to a synchronous factory evaluated against the registry.
    pub fn to_dynamic<T, F>(self, factory: F) -> TetherResult<Self>
    where
        T: Send + Sync + 'static,
        F: Fn(&Registry) -> TetherResult<T> + Send + Sync + 'static,
    {
        let factory: DynamicFn =
            Arc::new(move |registry| factory(registry).map(|value| Arc::new(value) as SharedValue));
        self.set_source(BindingSource::Dynamic(factory))
    }

    /// Binds to an asynchronous [`Provider`].
    ///
    /// The binding becomes resolvable only through
    /// [`Registry::get`](crate::Registry::get); the sync path reports
    /// [`Error::RequiresAsync`](crate::Error::RequiresAsync).
    pub fn to_provider(self, provider: Arc<dyn Provider>) -> TetherResult<Self> {
        self.set_source(BindingSource::Provider(provider))
    }

    /// Sets the caching scope.
    pub fn in_scope(self, scope: BindingScope) -> TetherResult<Self> {
        self.registry.mutate(&self.key, |binding| {
            binding.scope = scope;
            binding.cache = None;
        })?;
        Ok(self)
    }

    /// Attaches a discovery tag.
    pub fn tag(self, tag: impl Into<String>) -> TetherResult<Self> {
        let tag = tag.into();
        self.registry.mutate(&self.key, |binding| {
            if !binding.tags.contains(&tag) {
                binding.tags.push(tag);
            }
        })?;
        Ok(self)
    }

    /// Locks the binding, irreversibly, and consumes the handle.
    pub fn lock(self) -> TetherResult<()> {
        self.registry.lock(&self.key)
    }

    fn set_source(self, source: BindingSource) -> TetherResult<Self> {
        self.registry.mutate(&self.key, |binding| {
            binding.source = source;
            binding.cache = None;
        })?;
        Ok(self)
    }
}
