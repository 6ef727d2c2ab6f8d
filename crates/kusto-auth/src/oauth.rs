//! Raw OAuth 2.0 flows against the Microsoft identity platform.
//!
//! `azure_identity` has no credential type for the resource-owner password
//! (ROPC) and device-code grants, so these two are spoken directly: a form
//! POST to the tenant's token endpoint, using the Kusto client application
//! id. Nothing here is cached or refreshed; each call is one grant.

use std::time::{Duration, Instant};

use serde::Deserialize;

use crate::error::TokenError;

/// First-party client application id registered for Kusto clients.
const KUSTO_CLIENT_APP_ID: &str = "db662dc1-0cfe-4e1c-a843-19a68e65be58";

/// Token endpoint path, relative to the authority URL.
const TOKEN_ENDPOINT: &str = "oauth2/v2.0/token";

/// Device-code initiation endpoint path, relative to the authority URL.
const DEVICE_CODE_ENDPOINT: &str = "oauth2/v2.0/devicecode";

/// Poll interval used when the device-code response does not name one.
const DEFAULT_DEVICE_CODE_INTERVAL_SECS: u64 = 5;

/// Device-code lifetime used when the response does not name one.
const DEFAULT_DEVICE_CODE_EXPIRY_SECS: u64 = 900;

/// How much `slow_down` stretches the poll interval (RFC 8628).
const SLOW_DOWN_INTERVAL_INCREMENT: Duration = Duration::from_secs(5);

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Deserialize)]
struct DeviceCodeResponse {
    device_code: String,
    message: Option<String>,
    interval: Option<u64>,
    expires_in: Option<u64>,
}

#[derive(Deserialize)]
struct OAuthErrorBody {
    error: Option<String>,
    error_description: Option<String>,
}

/// Build the HTTP client for a flow, honoring the descriptor timeout.
///
/// No timeout is set unless the descriptor configured one; the transport's
/// own limits apply otherwise.
pub(crate) fn http_client(timeout: Option<Duration>) -> Result<reqwest::Client, TokenError> {
    let mut builder = reqwest::Client::builder();
    if let Some(timeout) = timeout {
        builder = builder.timeout(timeout);
    }
    builder
        .build()
        .map_err(|e| TokenError::Configuration(e.to_string()))
}

/// Acquire a token through the resource-owner password grant.
pub(crate) async fn username_password_token(
    client: &reqwest::Client,
    authority: &str,
    username: &str,
    password: &str,
    scope: &str,
) -> Result<String, TokenError> {
    let form = [
        ("client_id", KUSTO_CLIENT_APP_ID),
        ("grant_type", "password"),
        ("username", username),
        ("password", password),
        ("scope", scope),
    ];
    let response = client
        .post(format!("{authority}/{TOKEN_ENDPOINT}"))
        .form(&form)
        .send()
        .await
        .map_err(|e| TokenError::Network(e.to_string()))?;
    parse_token_response(response).await
}

/// Acquire a token through the device-code grant.
///
/// Initiates the flow, surfaces the sign-in message through `tracing`, then
/// polls the token endpoint until the user completes sign-in or the device
/// code expires.
pub(crate) async fn device_code_token(
    client: &reqwest::Client,
    authority: &str,
    scope: &str,
) -> Result<String, TokenError> {
    let form = [("client_id", KUSTO_CLIENT_APP_ID), ("scope", scope)];
    let response = client
        .post(format!("{authority}/{DEVICE_CODE_ENDPOINT}"))
        .form(&form)
        .send()
        .await
        .map_err(|e| TokenError::Network(e.to_string()))?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(TokenError::TokenAcquisition(oauth_failure(status, &body)));
    }
    let device: DeviceCodeResponse = response
        .json()
        .await
        .map_err(|e| TokenError::TokenAcquisition(format!("malformed device code response: {e}")))?;

    if let Some(message) = &device.message {
        // The user has to see this to complete the sign-in.
        tracing::info!("{message}");
    }

    // A poll interval longer than a device code can live is nonsense from a
    // broken server; cap it. Same for a lifetime large enough to overflow
    // the deadline arithmetic.
    let mut interval = Duration::from_secs(
        device
            .interval
            .unwrap_or(DEFAULT_DEVICE_CODE_INTERVAL_SECS)
            .min(DEFAULT_DEVICE_CODE_EXPIRY_SECS),
    );
    let lifetime = Duration::from_secs(device.expires_in.unwrap_or(DEFAULT_DEVICE_CODE_EXPIRY_SECS));
    let deadline = Instant::now()
        .checked_add(lifetime)
        .unwrap_or_else(|| Instant::now() + Duration::from_secs(DEFAULT_DEVICE_CODE_EXPIRY_SECS));

    loop {
        tokio::time::sleep(interval).await;

        let form = [
            ("client_id", KUSTO_CLIENT_APP_ID),
            ("grant_type", "urn:ietf:params:oauth:grant-type:device_code"),
            ("device_code", device.device_code.as_str()),
        ];
        let response = client
            .post(format!("{authority}/{TOKEN_ENDPOINT}"))
            .form(&form)
            .send()
            .await
            .map_err(|e| TokenError::Network(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return parse_token_response(response).await;
        }

        let body = response.text().await.unwrap_or_default();
        match serde_json::from_str::<OAuthErrorBody>(&body) {
            Ok(pending)
                if matches!(
                    pending.error.as_deref(),
                    Some("authorization_pending" | "slow_down")
                ) =>
            {
                if pending.error.as_deref() == Some("slow_down") {
                    interval = interval.saturating_add(SLOW_DOWN_INTERVAL_INCREMENT);
                }
                if Instant::now() >= deadline {
                    return Err(TokenError::TokenAcquisition(
                        "device code expired before the sign-in completed".into(),
                    ));
                }
            }
            _ => return Err(TokenError::TokenAcquisition(oauth_failure(status, &body))),
        }
    }
}

async fn parse_token_response(response: reqwest::Response) -> Result<String, TokenError> {
    let status = response.status();
    if status.is_success() {
        let body: TokenResponse = response
            .json()
            .await
            .map_err(|e| TokenError::TokenAcquisition(format!("malformed token response: {e}")))?;
        return Ok(body.access_token);
    }
    let body = response.text().await.unwrap_or_default();
    Err(TokenError::TokenAcquisition(oauth_failure(status, &body)))
}

/// Summarize an OAuth error response without echoing the request.
fn oauth_failure(status: reqwest::StatusCode, body: &str) -> String {
    match serde_json::from_str::<OAuthErrorBody>(body) {
        Ok(OAuthErrorBody {
            error: Some(error),
            error_description: Some(description),
        }) => format!("{status}: {error}: {description}"),
        Ok(OAuthErrorBody {
            error: Some(error), ..
        }) => format!("{status}: {error}"),
        _ => status.to_string(),
    }
}
