//! Binding keys and the well-known key and tag constants.

use std::fmt;
use std::sync::Arc;

/// Key for binding storage and lookup.
///
/// Keys are dot-separated paths (`"resource.config"`,
/// `"resource.subresources.users"`). They are cheap to clone and compare,
/// and support trailing-`*` prefix patterns for discovery via
/// [`Registry::find`](crate::Registry::find).
///
/// # Examples
///
/// ```rust
/// use tether::BindingKey;
///
/// let key = BindingKey::namespaced("resource.subresources", "users");
/// assert_eq!(key.as_str(), "resource.subresources.users");
/// assert!(key.matches("resource.subresources.*"));
/// assert!(!key.matches("resource.config"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BindingKey(Arc<str>);

impl BindingKey {
    /// Creates a key from any string-like value.
    pub fn new(key: impl AsRef<str>) -> Self {
        BindingKey(Arc::from(key.as_ref()))
    }

    /// Builds a namespaced key `<namespace>.<name>`.
    pub fn namespaced(namespace: &str, name: &str) -> Self {
        BindingKey(Arc::from(format!("{}.{}", namespace, name).as_str()))
    }

    /// The key as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Matches the key against a pattern.
    ///
    /// A pattern ending in `*` matches any key sharing the prefix before the
    /// star; any other pattern must match exactly.
    pub fn matches(&self, pattern: &str) -> bool {
        match pattern.strip_suffix('*') {
            Some(prefix) => self.0.starts_with(prefix),
            None => &*self.0 == pattern,
        }
    }
}

impl fmt::Display for BindingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for BindingKey {
    fn from(key: &str) -> Self {
        BindingKey::new(key)
    }
}

impl From<String> for BindingKey {
    fn from(key: String) -> Self {
        BindingKey::new(key)
    }
}

impl From<&BindingKey> for BindingKey {
    fn from(key: &BindingKey) -> Self {
        key.clone()
    }
}

/// Well-known registry keys used by the lifecycle manager.
pub mod keys {
    /// The singleton client instance.
    pub const CLIENT: &str = "resource.client";
    /// The client configuration record.
    pub const CONFIG: &str = "resource.config";
    /// Namespace prefix for derived sub-resource bindings.
    pub const SUB_RESOURCE_NAMESPACE: &str = "resource.subresources";
    /// The lifecycle manager itself.
    pub const MANAGER: &str = "components.resource-manager";
}

/// Discovery tags attached to bindings the manager registers.
pub mod tags {
    /// Carried by every derived sub-resource binding.
    pub const SUB_RESOURCE: &str = "resource:subresource";
    /// Carried by the manager binding for lifecycle-registry discovery.
    pub const LIFECYCLE: &str = "resource:lifecycle";
}
