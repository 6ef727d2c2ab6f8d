//! Connection descriptors for Kusto authentication.
//!
//! A [`ConnectionDescriptor`] is an immutable value describing the target
//! cluster, the chosen authentication method, and exactly the parameters
//! that method needs. Descriptors are built once through a named
//! constructor, one per method, and never mutated afterwards.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use azure_core::credentials::Secret;

use crate::token_provider::TokenProvider;

/// Base URL of the Microsoft identity platform.
pub(crate) const MICROSOFT_LOGIN_URL: &str = "https://login.microsoftonline.com/";

/// Tenant used when the caller does not name one.
pub(crate) const DEFAULT_AUTHORITY_ID: &str = "common";

/// Authentication method tag.
///
/// This identifies which authentication flow a descriptor selects. The tag
/// also travels on [`AuthenticationError`](crate::AuthenticationError) so a
/// caller can distinguish failures by method.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum AuthenticationMethod {
    /// Username/password (resource-owner password) grant.
    UsernamePassword,
    /// Service principal with a client secret.
    ApplicationKey,
    /// Service principal with an X.509 certificate.
    ApplicationCertificate,
    /// Device-code sign-in for browserless hosts.
    DeviceCode,
    /// Managed service identity (system- or user-assigned).
    ManagedIdentity,
    /// Caller-supplied token callback.
    TokenProvider,
    /// Token cached by a prior interactive sign-in.
    Interactive,
}

impl AuthenticationMethod {
    /// Stable name of this method, as reported in diagnostics.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::UsernamePassword => "aad_username_password",
            Self::ApplicationKey => "aad_application_key",
            Self::ApplicationCertificate => "aad_application_certificate",
            Self::DeviceCode => "aad_device_code",
            Self::ManagedIdentity => "aad_msi",
            Self::TokenProvider => "aad_token_provider",
            Self::Interactive => "aad_interactive",
        }
    }
}

impl std::fmt::Display for AuthenticationMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Selector for a user-assigned managed identity.
///
/// A host can expose several managed identities; at most one selector
/// disambiguates which identity to use. Being an enum, it is impossible to
/// supply more than one selector at a time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MsiIdentity {
    /// Select by the identity's client ID.
    ClientId(String),
    /// Select by the identity's object ID.
    ObjectId(String),
    /// Select by the identity's Azure resource ID.
    ResourceId(String),
}

impl MsiIdentity {
    /// Parameter key this selector is reported under.
    #[must_use]
    pub fn key(&self) -> &'static str {
        match self {
            Self::ClientId(_) => "client_id",
            Self::ObjectId(_) => "object_id",
            Self::ResourceId(_) => "msi_res_id",
        }
    }

    /// The selector value as supplied by the caller.
    #[must_use]
    pub fn value(&self) -> &str {
        match self {
            Self::ClientId(v) | Self::ObjectId(v) | Self::ResourceId(v) => v,
        }
    }
}

impl std::fmt::Display for MsiIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}={}", self.key(), self.value())
    }
}

/// Method-specific credential material.
///
/// Each variant carries exactly the fields relevant to its method, so an
/// irrelevant field cannot be set by construction.
#[derive(Clone)]
pub(crate) enum CredentialSpec {
    /// Username/password grant.
    UsernamePassword {
        /// User principal name.
        username: String,
        /// Account password.
        password: Secret,
    },

    /// Service principal with a client secret.
    ApplicationKey {
        /// Application (client) ID.
        client_id: String,
        /// Client secret.
        client_secret: Secret,
    },

    /// Service principal with an X.509 certificate.
    #[cfg(feature = "cert-auth")]
    ApplicationCertificate {
        /// Application (client) ID.
        client_id: String,
        /// PKCS#12 certificate bytes, raw or base64-encoded.
        certificate: Vec<u8>,
        /// Password protecting the certificate's private key.
        password: Secret,
    },

    /// Device-code sign-in.
    DeviceCode,

    /// Managed service identity.
    ManagedIdentity {
        /// Optional user-assigned identity selector.
        identity: Option<MsiIdentity>,
    },

    /// Caller-supplied token callback.
    TokenProvider {
        /// The callback producing the current token.
        provider: Arc<dyn TokenProvider>,
    },

    /// Token cached by a prior interactive sign-in.
    Interactive,
}

impl CredentialSpec {
    pub(crate) fn method(&self) -> AuthenticationMethod {
        match self {
            Self::UsernamePassword { .. } => AuthenticationMethod::UsernamePassword,
            Self::ApplicationKey { .. } => AuthenticationMethod::ApplicationKey,
            #[cfg(feature = "cert-auth")]
            Self::ApplicationCertificate { .. } => AuthenticationMethod::ApplicationCertificate,
            Self::DeviceCode => AuthenticationMethod::DeviceCode,
            Self::ManagedIdentity { .. } => AuthenticationMethod::ManagedIdentity,
            Self::TokenProvider { .. } => AuthenticationMethod::TokenProvider,
            Self::Interactive => AuthenticationMethod::Interactive,
        }
    }

    /// Non-secret parameters reported on failure.
    ///
    /// This is an explicit allow-list per method, not a dump of the
    /// descriptor: secrets (passwords, client secrets, certificate material,
    /// raw tokens) can never appear here. Keys absent from the descriptor
    /// are absent from the map, never present with an empty value.
    pub(crate) fn diagnostic_params(&self) -> BTreeMap<&'static str, String> {
        let mut params = BTreeMap::new();
        match self {
            Self::UsernamePassword { username, .. } => {
                params.insert("username", username.clone());
            }
            Self::ApplicationKey { client_id, .. } => {
                params.insert("client_id", client_id.clone());
            }
            #[cfg(feature = "cert-auth")]
            Self::ApplicationCertificate { client_id, .. } => {
                params.insert("client_id", client_id.clone());
            }
            Self::ManagedIdentity {
                identity: Some(identity),
            } => {
                params.insert(identity.key(), identity.value().to_string());
            }
            Self::DeviceCode
            | Self::ManagedIdentity { identity: None }
            | Self::TokenProvider { .. }
            | Self::Interactive => {}
        }
        params
    }
}

impl std::fmt::Debug for CredentialSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Never expose sensitive data in debug output
        match self {
            Self::UsernamePassword { username, .. } => f
                .debug_struct("UsernamePassword")
                .field("username", username)
                .field("password", &"[REDACTED]")
                .finish(),
            Self::ApplicationKey { client_id, .. } => f
                .debug_struct("ApplicationKey")
                .field("client_id", client_id)
                .field("client_secret", &"[REDACTED]")
                .finish(),
            #[cfg(feature = "cert-auth")]
            Self::ApplicationCertificate { client_id, .. } => f
                .debug_struct("ApplicationCertificate")
                .field("client_id", client_id)
                .field("certificate", &"[REDACTED]")
                .field("password", &"[REDACTED]")
                .finish(),
            Self::DeviceCode => f.debug_struct("DeviceCode").finish(),
            Self::ManagedIdentity { identity } => f
                .debug_struct("ManagedIdentity")
                .field("identity", identity)
                .finish(),
            Self::TokenProvider { .. } => f
                .debug_struct("TokenProvider")
                .field("provider", &"<callback>")
                .finish(),
            Self::Interactive => f.debug_struct("Interactive").finish(),
        }
    }
}

/// Immutable description of how to authenticate against a Kusto cluster.
///
/// Built once through a named constructor (one per authentication method)
/// and shared freely afterwards. The authority URL is derived from the
/// tenant: `https://login.microsoftonline.com/<authority_id>`, with tenant
/// `common` when none is named.
#[derive(Debug, Clone)]
pub struct ConnectionDescriptor {
    cluster_uri: String,
    authority_id: String,
    timeout: Option<Duration>,
    credential: CredentialSpec,
}

impl ConnectionDescriptor {
    fn new(cluster_uri: impl Into<String>, credential: CredentialSpec) -> Self {
        Self {
            cluster_uri: cluster_uri.into(),
            authority_id: DEFAULT_AUTHORITY_ID.to_string(),
            timeout: None,
            credential,
        }
    }

    /// Authenticate with a username and password (resource-owner password
    /// grant).
    pub fn with_aad_user_password_authentication(
        cluster_uri: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self::new(
            cluster_uri,
            CredentialSpec::UsernamePassword {
                username: username.into(),
                password: Secret::new(password.into()),
            },
        )
    }

    /// Authenticate as a service principal with a client secret.
    pub fn with_aad_application_key_authentication(
        cluster_uri: impl Into<String>,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
    ) -> Self {
        Self::new(
            cluster_uri,
            CredentialSpec::ApplicationKey {
                client_id: client_id.into(),
                client_secret: Secret::new(client_secret.into()),
            },
        )
    }

    /// Authenticate as a service principal with an X.509 certificate.
    ///
    /// The certificate must be PKCS#12 (`.pfx`/`.p12`), raw or
    /// base64-encoded. To use PEM certificates, convert them with openssl:
    /// `openssl pkcs12 -export -out cert.pfx -inkey key.pem -in cert.pem`
    #[cfg(feature = "cert-auth")]
    pub fn with_aad_application_certificate_authentication(
        cluster_uri: impl Into<String>,
        client_id: impl Into<String>,
        certificate: impl Into<Vec<u8>>,
        certificate_password: Option<&str>,
    ) -> Self {
        Self::new(
            cluster_uri,
            CredentialSpec::ApplicationCertificate {
                client_id: client_id.into(),
                certificate: certificate.into(),
                password: Secret::new(certificate_password.unwrap_or("").to_string()),
            },
        )
    }

    /// Authenticate with a device code, for hosts without a browser.
    pub fn with_aad_device_code_authentication(cluster_uri: impl Into<String>) -> Self {
        Self::new(cluster_uri, CredentialSpec::DeviceCode)
    }

    /// Authenticate with the host's managed service identity.
    ///
    /// With `None` the system-assigned (default) identity is used. When the
    /// host exposes several identities, pass a single [`MsiIdentity`]
    /// selector to disambiguate.
    pub fn with_aad_managed_service_identity_authentication(
        cluster_uri: impl Into<String>,
        identity: Option<MsiIdentity>,
    ) -> Self {
        Self::new(cluster_uri, CredentialSpec::ManagedIdentity { identity })
    }

    /// Authenticate with a caller-supplied token callback.
    ///
    /// The helper performs no network call for this method: the callback's
    /// result is wrapped verbatim as the bearer header.
    pub fn with_token_provider(
        cluster_uri: impl Into<String>,
        provider: impl TokenProvider + 'static,
    ) -> Self {
        Self::new(
            cluster_uri,
            CredentialSpec::TokenProvider {
                provider: Arc::new(provider),
            },
        )
    }

    /// Authenticate with the token cached by a prior interactive sign-in
    /// (`az login`).
    pub fn with_aad_interactive_authentication(cluster_uri: impl Into<String>) -> Self {
        Self::new(cluster_uri, CredentialSpec::Interactive)
    }

    /// Name the Azure AD tenant (authority) to authenticate against.
    ///
    /// Defaults to `common` when not set.
    #[must_use]
    pub fn with_authority_id(mut self, authority_id: impl Into<String>) -> Self {
        self.authority_id = authority_id.into();
        self
    }

    /// Bound token acquisition to the given duration.
    ///
    /// Without this, acquisition blocks for as long as the underlying
    /// transport takes; an unreachable managed-identity endpoint can take
    /// tens of seconds to time out on its own.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// The target cluster URI.
    #[must_use]
    pub fn cluster_uri(&self) -> &str {
        &self.cluster_uri
    }

    /// The tenant (authority) name.
    #[must_use]
    pub fn authority_id(&self) -> &str {
        &self.authority_id
    }

    /// The derived authority URL:
    /// `https://login.microsoftonline.com/<authority_id>`.
    #[must_use]
    pub fn authority(&self) -> String {
        format!("{MICROSOFT_LOGIN_URL}{}", self.authority_id)
    }

    /// The configured acquisition timeout, if any.
    #[must_use]
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// The authentication method this descriptor selects.
    #[must_use]
    pub fn authentication_method(&self) -> AuthenticationMethod {
        self.credential.method()
    }

    /// The token request scope for this cluster: `<cluster_uri>/.default`.
    #[must_use]
    pub fn resource_scope(&self) -> String {
        format!("{}/.default", self.cluster_uri.trim_end_matches('/'))
    }

    pub(crate) fn credential(&self) -> &CredentialSpec {
        &self.credential
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_authority_defaults_to_common() {
        let descriptor = ConnectionDescriptor::with_aad_device_code_authentication(
            "https://somecluster.kusto.windows.net",
        );
        assert_eq!(
            descriptor.authority(),
            "https://login.microsoftonline.com/common"
        );
    }

    #[test]
    fn test_authority_uses_named_tenant() {
        let descriptor = ConnectionDescriptor::with_aad_user_password_authentication(
            "https://somecluster.kusto.windows.net",
            "username@microsoft.com",
            "StrongestPasswordEver",
        )
        .with_authority_id("authorityName");
        assert_eq!(
            descriptor.authority(),
            "https://login.microsoftonline.com/authorityName"
        );
    }

    #[test]
    fn test_method_tags() {
        let descriptor = ConnectionDescriptor::with_aad_managed_service_identity_authentication(
            "localhost",
            None,
        );
        assert_eq!(
            descriptor.authentication_method(),
            AuthenticationMethod::ManagedIdentity
        );
        assert_eq!(descriptor.authentication_method().as_str(), "aad_msi");
        assert_eq!(
            AuthenticationMethod::TokenProvider.as_str(),
            "aad_token_provider"
        );
    }

    #[test]
    fn test_resource_scope_strips_trailing_slash() {
        let descriptor = ConnectionDescriptor::with_aad_device_code_authentication(
            "https://somecluster.kusto.windows.net/",
        );
        assert_eq!(
            descriptor.resource_scope(),
            "https://somecluster.kusto.windows.net/.default"
        );
    }

    #[test]
    fn test_user_password_params_exclude_password() {
        let descriptor = ConnectionDescriptor::with_aad_user_password_authentication(
            "https://somecluster.kusto.windows.net",
            "username@microsoft.com",
            "StrongestPasswordEver",
        );
        let params = descriptor.credential().diagnostic_params();
        assert_eq!(params.len(), 1);
        assert_eq!(params["username"], "username@microsoft.com");
    }

    #[test]
    fn test_msi_params_track_only_the_supplied_selector() {
        let system = ConnectionDescriptor::with_aad_managed_service_identity_authentication(
            "localhost",
            None,
        );
        assert!(system.credential().diagnostic_params().is_empty());

        let user = ConnectionDescriptor::with_aad_managed_service_identity_authentication(
            "localhost",
            Some(MsiIdentity::ObjectId("87687687".into())),
        );
        let params = user.credential().diagnostic_params();
        assert_eq!(params.len(), 1);
        assert_eq!(params["object_id"], "87687687");
        assert!(!params.contains_key("client_id"));
        assert!(!params.contains_key("msi_res_id"));
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let descriptor = ConnectionDescriptor::with_aad_user_password_authentication(
            "https://somecluster.kusto.windows.net",
            "username@microsoft.com",
            "StrongestPasswordEver",
        );
        let debug = format!("{descriptor:?}");
        assert!(debug.contains("username@microsoft.com"));
        assert!(!debug.contains("StrongestPasswordEver"));

        let descriptor = ConnectionDescriptor::with_aad_application_key_authentication(
            "https://somecluster.kusto.windows.net",
            "app-client-id",
            "app-secret-value",
        );
        let debug = format!("{descriptor:?}");
        assert!(debug.contains("app-client-id"));
        assert!(!debug.contains("app-secret-value"));
    }

    #[test]
    fn test_msi_identity_display_names_key_and_value() {
        let identity = MsiIdentity::ClientId("kjhjk".into());
        let text = identity.to_string();
        assert!(text.contains("client_id"));
        assert!(text.contains("kjhjk"));
    }
}
