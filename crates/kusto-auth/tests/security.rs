//! Failure-contract tests for the authentication helper.
//!
//! These exercise the observable contract of `acquire_authorization_header`:
//! which method/authority/cluster/parameters an `AuthenticationError`
//! carries, that secrets never appear in diagnostics, and that the
//! token-provider path needs no network. The managed-identity tests bound
//! acquisition with a descriptor timeout so they hold whether or not a
//! metadata endpoint is reachable; tests that need a real Azure environment
//! are `#[ignore]`d.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::time::Duration;

use kusto_auth::{
    AadHelper, AuthenticationMethod, ConnectionDescriptor, MsiIdentity, ProviderToken,
};

#[tokio::test]
async fn unauthorized_user_password_reports_full_context() {
    let cluster = "https://somecluster.kusto.windows.net";
    let username = "username@microsoft.com";
    let descriptor = ConnectionDescriptor::with_aad_user_password_authentication(
        cluster,
        username,
        "StrongestPasswordEver",
    )
    .with_authority_id("authorityName")
    .with_timeout(Duration::from_secs(10));
    let helper = AadHelper::new(descriptor);

    let error = helper
        .acquire_authorization_header()
        .await
        .expect_err("bogus credentials must not authenticate");

    assert_eq!(
        error.authentication_method(),
        AuthenticationMethod::UsernamePassword
    );
    assert_eq!(
        error.authority(),
        "https://login.microsoftonline.com/authorityName"
    );
    assert_eq!(error.cluster(), cluster);
    assert_eq!(error.params().len(), 1);
    assert_eq!(error.params()["username"], username);
    assert!(
        !error.to_string().contains("StrongestPasswordEver"),
        "the password must never reach the diagnostic surface"
    );
}

#[tokio::test]
async fn msi_failure_without_selector_reports_no_selector_params() {
    let descriptor = ConnectionDescriptor::with_aad_managed_service_identity_authentication(
        "https://localhost",
        None,
    )
    .with_timeout(Duration::from_secs(2));
    let helper = AadHelper::new(descriptor);

    let error = helper
        .acquire_authorization_header()
        .await
        .expect_err("no managed identity endpoint is reachable here");

    assert_eq!(
        error.authentication_method(),
        AuthenticationMethod::ManagedIdentity
    );
    for key in ["client_id", "object_id", "msi_res_id"] {
        assert!(
            !error.params().contains_key(key),
            "{key} was never supplied and must be absent"
        );
    }
}

#[tokio::test]
async fn msi_failure_with_client_id_reports_exactly_that_selector() {
    let client_guid = "kjhjk";
    let descriptor = ConnectionDescriptor::with_aad_managed_service_identity_authentication(
        "https://localhost",
        Some(MsiIdentity::ClientId(client_guid.into())),
    )
    .with_timeout(Duration::from_secs(2));
    let helper = AadHelper::new(descriptor);

    let error = helper
        .acquire_authorization_header()
        .await
        .expect_err("no managed identity endpoint is reachable here");

    assert_eq!(
        error.authentication_method(),
        AuthenticationMethod::ManagedIdentity
    );
    assert_eq!(error.params()["client_id"], client_guid);
    assert!(!error.params().contains_key("object_id"));
    assert!(!error.params().contains_key("msi_res_id"));

    // The failing selector must be readable from the low-level error alone.
    let source = error.token_error().to_string();
    assert!(source.contains("client_id"));
    assert!(source.contains(client_guid));
}

#[tokio::test]
async fn independent_msi_helpers_report_their_own_selector() {
    let object_guid = "87687687";
    let res_guid = "kajsdghdijewhag";

    let helpers = [
        AadHelper::new(
            ConnectionDescriptor::with_aad_managed_service_identity_authentication(
                "https://localhost",
                Some(MsiIdentity::ObjectId(object_guid.into())),
            )
            .with_timeout(Duration::from_secs(2)),
        ),
        AadHelper::new(
            ConnectionDescriptor::with_aad_managed_service_identity_authentication(
                "https://localhost",
                Some(MsiIdentity::ResourceId(res_guid.into())),
            )
            .with_timeout(Duration::from_secs(2)),
        ),
    ];

    let (object_result, res_result) = tokio::join!(
        helpers[0].acquire_authorization_header(),
        helpers[1].acquire_authorization_header(),
    );

    let object_error = object_result.expect_err("no managed identity endpoint is reachable here");
    assert_eq!(object_error.params()["object_id"], object_guid);
    assert!(!object_error.params().contains_key("client_id"));
    assert!(!object_error.params().contains_key("msi_res_id"));

    let res_error = res_result.expect_err("no managed identity endpoint is reachable here");
    assert_eq!(res_error.params()["msi_res_id"], res_guid);
    assert!(!res_error.params().contains_key("client_id"));
    assert!(!res_error.params().contains_key("object_id"));
}

#[tokio::test]
async fn token_provider_wraps_the_callback_result() {
    let descriptor = ConnectionDescriptor::with_token_provider("localhost", || {
        ProviderToken::from("caller token")
    });
    let helper = AadHelper::new(descriptor);

    let header = helper
        .acquire_authorization_header()
        .await
        .expect("provider tokens need no network");
    assert!(header.contains("caller token"));
    assert!(header.starts_with("Bearer "));
}

#[tokio::test]
async fn token_provider_is_reusable_across_calls() {
    let descriptor = ConnectionDescriptor::with_token_provider("localhost", || {
        ProviderToken::from("caller token")
    });
    let helper = AadHelper::new(descriptor);

    let first = helper.acquire_authorization_header().await.expect("first call");
    let second = helper.acquire_authorization_header().await.expect("second call");
    assert!(first.contains("caller token"));
    assert!(second.contains("caller token"));
}

#[tokio::test]
async fn non_string_provider_token_fails_with_its_type_name() {
    let descriptor =
        ConnectionDescriptor::with_token_provider("localhost", || ProviderToken::new(12345678_i32));
    let helper = AadHelper::new(descriptor);

    let error = helper
        .acquire_authorization_header()
        .await
        .expect_err("a non-string token is a caller contract violation");

    assert_eq!(
        error.authentication_method(),
        AuthenticationMethod::TokenProvider
    );
    assert!(error.params().is_empty());
    assert!(error.token_error().to_string().contains("i32"));
}

#[tokio::test]
#[ignore = "Requires an Azure environment with a reachable managed identity endpoint"]
async fn live_msi_acquires_a_bearer_header() {
    let descriptor = ConnectionDescriptor::with_aad_managed_service_identity_authentication(
        "https://help.kusto.windows.net",
        None,
    );
    let helper = AadHelper::new(descriptor);

    let header = helper
        .acquire_authorization_header()
        .await
        .expect("managed identity environment");
    assert!(header.starts_with("Bearer "));
}

#[tokio::test]
#[ignore = "Requires Azure Service Principal credentials in the environment"]
async fn live_application_key_acquires_a_bearer_header() {
    let tenant_id = std::env::var("AZURE_TENANT_ID").expect("AZURE_TENANT_ID not set");
    let client_id = std::env::var("AZURE_CLIENT_ID").expect("AZURE_CLIENT_ID not set");
    let client_secret = std::env::var("AZURE_CLIENT_SECRET").expect("AZURE_CLIENT_SECRET not set");

    let descriptor = ConnectionDescriptor::with_aad_application_key_authentication(
        "https://help.kusto.windows.net",
        client_id,
        client_secret,
    )
    .with_authority_id(tenant_id);
    let helper = AadHelper::new(descriptor);

    let header = helper
        .acquire_authorization_header()
        .await
        .expect("service principal credentials");
    assert!(header.starts_with("Bearer "));
}
