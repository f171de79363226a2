#![doc = "Authentication: turns loaded credentials into a bearer token and a connected DriveClient."]
//
//! # Authentication
//!
//! The interactive OAuth consent flow is not run here. A credential file that
//! already carries a refresh token is exchanged at the OAuth token endpoint
//! (`grant_type=refresh_token`); a bare access token is used as-is.
//!
//! ## Environment
//! - `GDRIVE_ACCESS_TOKEN`: use this token directly, skipping the credential file.
//! - `GDRIVE_REFRESH_TOKEN`: refresh token paired with a client-secret file.
//! - `GDRIVE_API_URL` / `GDRIVE_UPLOAD_URL`: override the Drive endpoints.

use anyhow::{anyhow, bail, Context, Result};
use gdrive_core::client::{DriveClient, DEFAULT_API_URL, DEFAULT_UPLOAD_URL};
use serde::Deserialize;
use std::env;

use crate::credentials::Credentials;

pub const ACCESS_TOKEN_ENV: &str = "GDRIVE_ACCESS_TOKEN";
pub const REFRESH_TOKEN_ENV: &str = "GDRIVE_REFRESH_TOKEN";
pub const API_URL_ENV: &str = "GDRIVE_API_URL";
pub const UPLOAD_URL_ENV: &str = "GDRIVE_UPLOAD_URL";

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<u64>,
}

fn non_empty_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Access token supplied through the environment, if any.
pub fn access_token_from_env() -> Option<String> {
    non_empty_env(ACCESS_TOKEN_ENV)
}

/// Obtain an access token for `credentials`.
pub async fn authorize(credentials: &Credentials, http: &reqwest::Client) -> Result<String> {
    match credentials {
        Credentials::AccessToken(token) => {
            tracing::info!("Using access token from credential file");
            Ok(token.access_token.clone())
        }
        Credentials::AuthorizedUser(user) => {
            refresh_access_token(
                http,
                &user.token_uri,
                &user.client_id,
                &user.client_secret,
                &user.refresh_token,
            )
            .await
        }
        Credentials::ClientSecret(secret) => {
            let refresh_token = non_empty_env(REFRESH_TOKEN_ENV).ok_or_else(|| {
                tracing::error!("{REFRESH_TOKEN_ENV} missing in environment");
                anyhow!(
                    "Client secret files need a refresh token: set {REFRESH_TOKEN_ENV} or use an authorised-user credential file"
                )
            })?;
            let client = secret.client();
            refresh_access_token(
                http,
                &client.token_uri,
                &client.client_id,
                &client.client_secret,
                &refresh_token,
            )
            .await
        }
    }
}

async fn refresh_access_token(
    http: &reqwest::Client,
    token_uri: &str,
    client_id: &str,
    client_secret: &str,
    refresh_token: &str,
) -> Result<String> {
    tracing::info!(token_uri, "Exchanging refresh token for an access token");
    let response = http
        .post(token_uri)
        .form(&[
            ("grant_type", "refresh_token"),
            ("client_id", client_id),
            ("client_secret", client_secret),
            ("refresh_token", refresh_token),
        ])
        .send()
        .await
        .context("Token request failed")?;

    let status = response.status();
    if !status.is_success() {
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| String::from("<Failed to decode response body>"));
        tracing::error!(status = %status, token_uri, "Token endpoint returned error. Response body: {body}");
        bail!("Token endpoint returned {status}: {body}");
    }

    let token: TokenResponse = response
        .json()
        .await
        .context("Failed to parse token response")?;
    tracing::info!(expires_in = ?token.expires_in, "Obtained access token");
    Ok(token.access_token)
}

/// Drive endpoints, honouring the environment overrides.
pub fn endpoints_from_env() -> (String, String) {
    (
        non_empty_env(API_URL_ENV).unwrap_or_else(|| DEFAULT_API_URL.to_string()),
        non_empty_env(UPLOAD_URL_ENV).unwrap_or_else(|| DEFAULT_UPLOAD_URL.to_string()),
    )
}

/// Build a [`DriveClient`] authorised with `access_token`.
pub fn connect(access_token: String) -> Result<DriveClient> {
    let (api_url, upload_url) = endpoints_from_env();
    let client = DriveClient::with_endpoints(access_token, api_url, upload_url)
        .context("Failed to construct Drive client")?;
    Ok(client)
}
