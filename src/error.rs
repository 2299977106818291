//! Error types for the binding registry and the resource lifecycle manager.

use std::fmt;

use crate::key::BindingKey;

/// Errors surfaced by registry operations and lifecycle transitions.
///
/// Failures are hard stops: the crate performs no retries and no local
/// recovery, and bindings registered before a later step fails are left in
/// place (step ordering is validation-first, see
/// [`ResourceManager::init`](crate::ResourceManager::init)).
///
/// # Examples
///
/// ```rust
/// use tether::{Error, Registry};
///
/// let registry = Registry::new();
/// match registry.get_sync::<String>("greeting") {
///     Err(Error::NotFound(key)) => assert_eq!(key.as_str(), "greeting"),
///     _ => unreachable!(),
/// }
/// ```
#[derive(Debug)]
pub enum Error {
    /// A client instance was supplied to the manager while a different
    /// instance was already bound under the client key
    ConflictingInstance,
    /// A pre-existing client binding is not a singleton-scoped constant
    NotSingletonConstant(BindingKey),
    /// A lifecycle operation ran before `init` completed
    NotInitialized(&'static str),
    /// No binding registered under the key
    NotFound(BindingKey),
    /// Bound value could not be downcast to the requested type
    TypeMismatch(BindingKey),
    /// Write attempted against a locked binding
    LockedBinding(BindingKey),
    /// Provider-backed binding resolved on the synchronous path
    RequiresAsync(BindingKey),
    /// Maximum alias/resolution depth exceeded
    DepthExceeded(usize),
    /// Failure propagated unchanged from the wrapped client
    Resource(Box<dyn std::error::Error + Send + Sync>),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::ConflictingInstance => {
                write!(f, "a different client instance is already bound")
            }
            Error::NotSingletonConstant(key) => {
                write!(f, "binding {} is not a singleton constant", key)
            }
            Error::NotInitialized(op) => {
                write!(f, "cannot {}: manager is not initialized", op)
            }
            Error::NotFound(key) => write!(f, "binding not found: {}", key),
            Error::TypeMismatch(key) => write!(f, "type mismatch for binding: {}", key),
            Error::LockedBinding(key) => write!(f, "binding is locked: {}", key),
            Error::RequiresAsync(key) => {
                write!(f, "binding {} requires async resolution", key)
            }
            Error::DepthExceeded(depth) => write!(f, "max resolution depth {} exceeded", depth),
            Error::Resource(err) => write!(f, "client error: {}", err),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Resource(err) => Some(err.as_ref()),
            _ => None,
        }
    }
}

/// Result type for registry and lifecycle operations
///
/// A convenience alias for `Result<T, Error>` used throughout tether.
pub type TetherResult<T> = Result<T, Error>;
