//! Client configuration record.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Configuration for the managed client.
///
/// The manager binds this under
/// [`keys::CONFIG`](crate::keys::CONFIG) at construction time if no
/// configuration is bound yet, and locks that binding during
/// [`init`](crate::ResourceManager::init). Edits made to the bound record
/// between construction and `init` win; after the lock the record is
/// read-only for the registry's lifetime.
///
/// Serialized field names are camelCase (`lazyConnect`, `url`, ...).
///
/// # Examples
///
/// ```rust
/// use tether::ResourceConfig;
///
/// let config = ResourceConfig {
///     name: "orders-db".to_string(),
///     url: Some("postgres://localhost/orders".to_string()),
///     lazy_connect: true,
///     ..ResourceConfig::default()
/// };
/// assert!(config.lazy_connect);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ResourceConfig {
    /// Display name for the client, used in log output.
    pub name: String,
    /// Connection URL handed to the client factory.
    pub url: Option<String>,
    /// Defer connection establishment to first use instead of opening it
    /// during `start`.
    pub lazy_connect: bool,
    /// Free-form client settings.
    pub settings: HashMap<String, String>,
}

impl Default for ResourceConfig {
    fn default() -> Self {
        Self {
            name: "client".to_string(),
            url: None,
            lazy_connect: false,
            settings: HashMap::new(),
        }
    }
}
