//! Authentication-method dispatch.
//!
//! [`AadHelper`] is constructed from a [`ConnectionDescriptor`] and exposes
//! one operation: [`acquire_authorization_header`]. Dispatch is a single
//! exhaustive match over the descriptor's credential, so every method is
//! handled and no method can see another method's parameters.
//!
//! [`acquire_authorization_header`]: AadHelper::acquire_authorization_header

use std::sync::Arc;

use azure_core::credentials::{Secret, TokenCredential};
use azure_identity::{
    AzureCliCredential, ClientSecretCredential, ManagedIdentityCredential,
    ManagedIdentityCredentialOptions, UserAssignedId,
};

use crate::connection::{ConnectionDescriptor, CredentialSpec, MsiIdentity};
use crate::error::{AuthenticationError, TokenError};
use crate::oauth;

/// Scheme prefixed to acquired tokens in the authorization header.
const AUTHORIZATION_SCHEME: &str = "Bearer";

/// Acquires bearer authorization headers for a Kusto cluster.
///
/// The helper is stateless: the descriptor is immutable and credentials are
/// built per call, so one instance may be shared and called from multiple
/// tasks concurrently. Token caching, if any, is the identity provider's
/// concern, not the helper's.
///
/// The helper never retries: a single underlying failure surfaces
/// immediately as one [`AuthenticationError`].
pub struct AadHelper {
    descriptor: ConnectionDescriptor,
}

impl AadHelper {
    /// Create a helper for the given descriptor.
    #[must_use]
    pub fn new(descriptor: ConnectionDescriptor) -> Self {
        Self { descriptor }
    }

    /// The descriptor this helper was built from.
    #[must_use]
    pub fn descriptor(&self) -> &ConnectionDescriptor {
        &self.descriptor
    }

    /// Acquire an authorization header of the form `"Bearer <token>"`.
    ///
    /// Performs the method-appropriate token acquisition against the
    /// identity provider. This may block for the duration of the network
    /// round-trip; the only bound is the descriptor's configured timeout.
    ///
    /// # Errors
    ///
    /// Returns [`AuthenticationError`] carrying the attempted method, the
    /// authority URL, the target cluster, the non-secret parameters that
    /// were set, and the underlying failure.
    pub async fn acquire_authorization_header(&self) -> Result<String, AuthenticationError> {
        tracing::debug!(
            method = %self.descriptor.authentication_method(),
            cluster = self.descriptor.cluster_uri(),
            authority = %self.descriptor.authority(),
            "acquiring authorization header"
        );

        let token = self
            .acquire_token()
            .await
            .map_err(|source| AuthenticationError::new(&self.descriptor, source))?;
        Ok(format!("{AUTHORIZATION_SCHEME} {token}"))
    }

    async fn acquire_token(&self) -> Result<String, TokenError> {
        let scope = self.descriptor.resource_scope();

        match self.descriptor.credential() {
            CredentialSpec::UsernamePassword { username, password } => {
                let client = oauth::http_client(self.descriptor.timeout())?;
                oauth::username_password_token(
                    &client,
                    &self.descriptor.authority(),
                    username,
                    password.secret(),
                    &scope,
                )
                .await
            }

            CredentialSpec::ApplicationKey {
                client_id,
                client_secret,
            } => {
                let credential = ClientSecretCredential::new(
                    self.descriptor.authority_id(),
                    client_id.clone(),
                    Secret::new(client_secret.secret().to_string()),
                    None,
                )
                .map_err(|e| TokenError::AzureIdentity(e.to_string()))?;
                self.sdk_token(credential, &scope).await
            }

            #[cfg(feature = "cert-auth")]
            CredentialSpec::ApplicationCertificate {
                client_id,
                certificate,
                password,
            } => {
                let credential = self.certificate_credential(client_id, certificate, password)?;
                self.sdk_token(credential, &scope).await
            }

            CredentialSpec::DeviceCode => {
                let client = oauth::http_client(self.descriptor.timeout())?;
                oauth::device_code_token(&client, &self.descriptor.authority(), &scope).await
            }

            CredentialSpec::ManagedIdentity { identity } => {
                let selector = identity
                    .as_ref()
                    .map_or_else(|| "system-assigned".to_string(), ToString::to_string);
                self.managed_identity_token(identity.as_ref(), &scope)
                    .await
                    .map_err(|message| TokenError::ManagedIdentity { selector, message })
            }

            CredentialSpec::TokenProvider { provider } => provider
                .provide_token()
                .into_token()
                .map_err(|type_name| TokenError::InvalidProviderToken { type_name }),

            CredentialSpec::Interactive => {
                let credential = AzureCliCredential::new(None)
                    .map_err(|e| TokenError::AzureIdentity(e.to_string()))?;
                self.sdk_token(credential, &scope).await
            }
        }
    }

    /// Request a token from the managed-identity endpoint.
    ///
    /// Every failure on this path is reported as a plain message so the
    /// caller can fold it into [`TokenError::ManagedIdentity`] together
    /// with the identity selector in effect.
    async fn managed_identity_token(
        &self,
        identity: Option<&MsiIdentity>,
        scope: &str,
    ) -> Result<String, String> {
        let options = identity.map(|identity| ManagedIdentityCredentialOptions {
            user_assigned_id: Some(match identity {
                MsiIdentity::ClientId(id) => UserAssignedId::ClientId(id.clone()),
                MsiIdentity::ObjectId(id) => UserAssignedId::ObjectId(id.clone()),
                MsiIdentity::ResourceId(id) => UserAssignedId::ResourceId(id.clone()),
            }),
            ..Default::default()
        });
        let credential = ManagedIdentityCredential::new(options).map_err(|e| e.to_string())?;
        self.sdk_token(credential, scope)
            .await
            .map_err(|e| e.to_string())
    }

    #[cfg(feature = "cert-auth")]
    fn certificate_credential(
        &self,
        client_id: &str,
        certificate: &[u8],
        password: &Secret,
    ) -> Result<Arc<azure_identity::ClientCertificateCredential>, TokenError> {
        use azure_identity::{ClientCertificateCredential, ClientCertificateCredentialOptions};
        use base64::Engine;

        // PKCS#12 DER always base64-encodes to a string starting with "MII".
        let cert_b64 = if certificate.starts_with(b"MII") {
            String::from_utf8_lossy(certificate).to_string()
        } else {
            base64::engine::general_purpose::STANDARD.encode(certificate)
        };

        // send_certificate_chain=false sends only the leaf certificate
        let options = ClientCertificateCredentialOptions::new(
            azure_identity::TokenCredentialOptions::default(),
            false,
        );

        ClientCertificateCredential::new(
            self.descriptor.authority_id().to_string(),
            client_id.to_string(),
            Secret::new(cert_b64),
            Secret::new(password.secret().to_string()),
            options,
        )
        .map_err(|e| TokenError::Certificate(format!("failed to create certificate credential: {e}")))
    }

    /// Request a token through an `azure_identity` credential, honoring the
    /// descriptor's timeout when one is configured.
    async fn sdk_token(
        &self,
        credential: Arc<dyn TokenCredential>,
        scope: &str,
    ) -> Result<String, TokenError> {
        let scopes = [scope];
        let request = credential.get_token(&scopes, None);
        let token = match self.descriptor.timeout() {
            Some(limit) => tokio::time::timeout(limit, request)
                .await
                .map_err(|_| TokenError::Timeout(limit))?,
            None => request.await,
        }
        .map_err(|e| TokenError::AzureIdentity(e.to_string()))?;
        Ok(token.token.secret().to_string())
    }
}

impl std::fmt::Debug for AadHelper {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AadHelper")
            .field("descriptor", &self.descriptor)
            .finish()
    }
}
