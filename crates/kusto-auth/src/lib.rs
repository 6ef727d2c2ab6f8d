//! # kusto-auth
//!
//! Azure Active Directory authentication for Azure Data Explorer (Kusto)
//! clients.
//!
//! This crate turns an immutable [`ConnectionDescriptor`] (cluster URI +
//! authentication method + method-specific parameters) into a bearer
//! authorization header via [`AadHelper::acquire_authorization_header`],
//! isolated from query and transport logic for better modularity and testing.
//!
//! ## Supported Authentication Methods
//!
//! | Method | Feature Flag | Description |
//! |--------|--------------|-------------|
//! | Username/Password | default | ROPC grant against the tenant authority |
//! | Application Key | default | Service principal with client secret |
//! | Application Certificate | `cert-auth` | Service principal with X.509 certificate |
//! | Device Code | default | Device-code sign-in for browserless hosts |
//! | Managed Identity | default | VM/container identity, system or user-assigned |
//! | Token Provider | default | Caller-supplied token callback |
//! | Interactive | default | Token cached by a prior interactive `az login` |
//!
//! ## Example
//!
//! ```rust,ignore
//! use kusto_auth::{AadHelper, ConnectionDescriptor};
//!
//! let descriptor = ConnectionDescriptor::with_aad_application_key_authentication(
//!     "https://mycluster.kusto.windows.net",
//!     "client-id",
//!     "client-secret",
//! )
//! .with_authority_id("my-tenant-id");
//!
//! let helper = AadHelper::new(descriptor);
//! let header = helper.acquire_authorization_header().await?;
//! ```
//!
//! ## Failure Reporting
//!
//! Every failure surfaces as a single [`AuthenticationError`] carrying the
//! attempted method, the authority URL, the target cluster, the non-secret
//! parameters that were set, and the underlying low-level error. Secrets
//! never appear in that diagnostic surface.

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod connection;
pub mod error;
pub mod helper;
pub mod token_provider;

mod oauth;

pub use connection::{AuthenticationMethod, ConnectionDescriptor, MsiIdentity};
pub use error::{AuthenticationError, TokenError};
pub use helper::AadHelper;
pub use token_provider::{ProviderToken, TokenProvider};
