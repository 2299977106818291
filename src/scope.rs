//! Binding scope definitions.

/// Binding scopes controlling instance caching behavior
///
/// Defines how binding values are created and cached within the registry.
///
/// # Examples
///
/// ```rust
/// use tether::{BindingScope, Registry};
/// use std::sync::{Arc, Mutex};
///
/// let registry = Registry::new();
/// let counter = Arc::new(Mutex::new(0));
/// let counter_clone = counter.clone();
///
/// registry.bind("request.id").unwrap()
///     .to_dynamic(move |_| {
///         let mut c = counter_clone.lock().unwrap();
///         *c += 1;
///         Ok(format!("req-{}", *c))
///     }).unwrap()
///     .in_scope(BindingScope::Singleton).unwrap();
///
/// let a = registry.get_sync::<String>("request.id").unwrap();
/// let b = registry.get_sync::<String>("request.id").unwrap();
/// assert!(Arc::ptr_eq(&a, &b)); // Evaluated once, cached
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindingScope {
    /// Single instance per registry, cached after first resolution
    ///
    /// The binding's source is evaluated at most once; every later
    /// resolution returns the cached instance. The client binding and every
    /// binding the lifecycle manager derives from it use this scope.
    Singleton,
    /// Fresh evaluation of the source on every resolution
    ///
    /// No caching is performed. Constant-backed bindings return the same
    /// value either way; dynamic and provider-backed bindings re-run their
    /// factory each time.
    Transient,
}
