//! Authentication error types.

use std::collections::BTreeMap;
use std::time::Duration;

use thiserror::Error;

use crate::connection::{AuthenticationMethod, ConnectionDescriptor};

/// Low-level token acquisition failures.
///
/// These carry whatever the identity provider reported, plus the helper's
/// own secret-free context. They surface to callers wrapped inside
/// [`AuthenticationError`].
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum TokenError {
    /// Token acquisition was rejected by the identity provider.
    #[error("failed to acquire token: {0}")]
    TokenAcquisition(String),

    /// Azure identity error.
    #[error("Azure identity error: {0}")]
    AzureIdentity(String),

    /// Managed identity token request failed.
    ///
    /// `selector` names the identity disambiguator that was in play
    /// (`client_id=...`, `object_id=...`, `msi_res_id=...`, or
    /// `system-assigned`), so the failing selector is visible from the
    /// error text alone.
    #[error("managed identity token request failed ({selector}): {message}")]
    ManagedIdentity {
        /// The identity selector in effect for the request.
        selector: String,
        /// The underlying failure.
        message: String,
    },

    /// A token provider callback returned something other than a string.
    #[error("token provider returned a value of type {type_name}, expected a string token")]
    InvalidProviderToken {
        /// Concrete type name of the value the callback produced.
        type_name: &'static str,
    },

    /// Network error during authentication.
    #[error("network error: {0}")]
    Network(String),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Token acquisition exceeded the descriptor's timeout.
    #[error("token acquisition timed out after {0:?}")]
    Timeout(Duration),

    /// Certificate error.
    #[cfg(feature = "cert-auth")]
    #[error("certificate error: {0}")]
    Certificate(String),
}

/// An authentication failure, with its full diagnostic context.
///
/// Every failure path of [`AadHelper`](crate::AadHelper) produces exactly
/// this type: the attempted method, the authority URL, the target cluster,
/// the non-secret parameters that were actually set, and the underlying
/// [`TokenError`]. Secret material never appears here.
#[derive(Debug, Error)]
#[error(
    "authentication failed for cluster {cluster} using {method} \
     (authority: {authority}, parameters: {params:?}): {source}"
)]
pub struct AuthenticationError {
    method: AuthenticationMethod,
    authority: String,
    cluster: String,
    params: BTreeMap<&'static str, String>,
    #[source]
    source: TokenError,
}

impl AuthenticationError {
    /// Build the failure context for a descriptor.
    ///
    /// The parameter map comes from the descriptor's per-method allow-list,
    /// so a future descriptor field cannot leak here by accident.
    pub(crate) fn new(descriptor: &ConnectionDescriptor, source: TokenError) -> Self {
        Self {
            method: descriptor.authentication_method(),
            authority: descriptor.authority(),
            cluster: descriptor.cluster_uri().to_string(),
            params: descriptor.credential().diagnostic_params(),
            source,
        }
    }

    /// The authentication method that was attempted.
    #[must_use]
    pub fn authentication_method(&self) -> AuthenticationMethod {
        self.method
    }

    /// The authority URL the attempt was made against.
    #[must_use]
    pub fn authority(&self) -> &str {
        &self.authority
    }

    /// The target cluster URI.
    #[must_use]
    pub fn cluster(&self) -> &str {
        &self.cluster
    }

    /// The method-specific non-secret parameters that were set.
    ///
    /// Only keys the caller actually supplied appear here; secrets never do.
    #[must_use]
    pub fn params(&self) -> &BTreeMap<&'static str, String> {
        &self.params
    }

    /// The underlying low-level failure.
    #[must_use]
    pub fn token_error(&self) -> &TokenError {
        &self.source
    }
}
