//! Caller-supplied token callbacks.
//!
//! A [`TokenProvider`] is a capability with one job: produce the current
//! token. The helper performs no network call for this method; whatever the
//! callback returns is wrapped as the bearer header.
//!
//! The callback boundary is dynamically typed on purpose: the value it
//! produces is validated at the call site, and a non-string result is
//! reported by its concrete type name instead of propagating as an
//! unrelated fault.

use std::any::Any;

/// A value produced by a [`TokenProvider`] callback.
///
/// Records the concrete type name of whatever the callback returned, so a
/// contract violation (anything other than a string token) can be named in
/// the resulting error.
pub struct ProviderToken {
    value: Box<dyn Any + Send>,
    type_name: &'static str,
}

impl ProviderToken {
    /// Wrap a callback result of any type.
    pub fn new<T: Any + Send>(value: T) -> Self {
        Self {
            value: Box::new(value),
            type_name: std::any::type_name::<T>(),
        }
    }

    /// The concrete type name of the wrapped value.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Extract the token string, or the offending type name if the wrapped
    /// value is not a string.
    pub(crate) fn into_token(self) -> Result<String, &'static str> {
        let value = match self.value.downcast::<String>() {
            Ok(token) => return Ok(*token),
            Err(value) => value,
        };
        match value.downcast::<&'static str>() {
            Ok(token) => Ok((*token).to_string()),
            Err(_) => Err(self.type_name),
        }
    }
}

impl From<String> for ProviderToken {
    fn from(token: String) -> Self {
        Self::new(token)
    }
}

impl From<&'static str> for ProviderToken {
    fn from(token: &'static str) -> Self {
        Self::new(token)
    }
}

impl std::fmt::Debug for ProviderToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Never expose the token itself in debug output
        f.debug_struct("ProviderToken")
            .field("type_name", &self.type_name)
            .finish_non_exhaustive()
    }
}

/// A callback producing the current token for a connection.
///
/// Implemented for any `Fn() -> ProviderToken` closure, so the common case
/// reads:
///
/// ```rust
/// use kusto_auth::{ConnectionDescriptor, ProviderToken};
///
/// let descriptor =
///     ConnectionDescriptor::with_token_provider("localhost", || ProviderToken::from("token"));
/// ```
pub trait TokenProvider: Send + Sync {
    /// Produce the current token.
    fn provide_token(&self) -> ProviderToken;
}

impl<F> TokenProvider for F
where
    F: Fn() -> ProviderToken + Send + Sync,
{
    fn provide_token(&self) -> ProviderToken {
        self()
    }
}
