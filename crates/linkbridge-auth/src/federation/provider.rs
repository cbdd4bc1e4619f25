//! Provider profile client.
//!
//! This module provides the [`ProviderClient`] trait and its HTTP
//! implementation, which validates an access token by fetching the profile it
//! belongs to.
//!
//! # Example
//!
//! ```ignore
//! use linkbridge_auth::config::ProviderConfig;
//! use linkbridge_auth::federation::{HttpProviderClient, ProviderClient};
//!
//! let client = HttpProviderClient::new(ProviderConfig::default())?;
//! let profile = client.fetch_profile("line-access-token").await?;
//! println!("provider user {}", profile.provider_user_id);
//! ```

use async_trait::async_trait;
use reqwest::header::{ACCEPT, HeaderValue};
use serde::Deserialize;

use super::profile::ProviderProfile;
use crate::config::{ConfigError, ProviderConfig};
use crate::error::ExchangeError;

/// Rejects empty access tokens before any network call.
///
/// # Errors
///
/// Returns `InvalidInput` for an empty or whitespace-only token, and for a
/// token that cannot be sent as a bearer `Authorization` header.
pub fn validate_access_token(access_token: &str) -> Result<(), ExchangeError> {
    if access_token.trim().is_empty() {
        return Err(ExchangeError::invalid_input("accessToken must not be empty"));
    }
    if HeaderValue::from_str(&format!("Bearer {access_token}")).is_err() {
        return Err(ExchangeError::invalid_input(
            "accessToken contains characters not allowed in a header",
        ));
    }
    Ok(())
}

/// One outbound lookup against the provider.
#[async_trait]
pub trait ProviderClient: Send + Sync {
    /// Fetches the profile owning `access_token`.
    ///
    /// Implementations must not retry.
    async fn fetch_profile(&self, access_token: &str) -> Result<ProviderProfile, ExchangeError>;
}

/// Profile document returned by the provider.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProfileResponse {
    user_id: Option<String>,
    display_name: Option<String>,
    picture_url: Option<String>,
}

/// Provider client backed by the provider's HTTP profile endpoint.
pub struct HttpProviderClient {
    http_client: reqwest::Client,
    config: ProviderConfig,
}

impl HttpProviderClient {
    /// Creates a client whose requests are bounded by `config.timeout`.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if the HTTP client cannot be built.
    pub fn new(config: ProviderConfig) -> Result<Self, ConfigError> {
        let http_client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| ConfigError::InvalidValue(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            http_client,
            config,
        })
    }

    fn transport_error(&self, err: reqwest::Error) -> ExchangeError {
        if err.is_timeout() {
            tracing::warn!(
                url = %self.config.profile_url,
                timeout_ms = self.config.timeout.as_millis() as u64,
                "Provider profile request timed out"
            );
            return ExchangeError::UpstreamTimeout {
                timeout: self.config.timeout,
            };
        }

        tracing::warn!(url = %self.config.profile_url, error = %err, "Provider profile request failed");
        ExchangeError::UpstreamUnavailable {
            message: err.to_string(),
            status: err.status().map(|s| s.as_u16()),
            body: None,
        }
    }
}

#[async_trait]
impl ProviderClient for HttpProviderClient {
    async fn fetch_profile(&self, access_token: &str) -> Result<ProviderProfile, ExchangeError> {
        validate_access_token(access_token)?;

        let response = self
            .http_client
            .get(&self.config.profile_url)
            .bearer_auth(access_token)
            .header(ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(
                status = status.as_u16(),
                "Provider rejected profile request"
            );
            return Err(ExchangeError::upstream_status(
                status.as_u16(),
                truncate_body(body, self.config.max_error_body_bytes),
            ));
        }

        let document: ProfileResponse = response.json().await.map_err(|e| {
            if e.is_timeout() {
                self.transport_error(e)
            } else {
                ExchangeError::upstream_invalid_response(format!(
                    "Malformed profile response: {e}"
                ))
            }
        })?;

        let profile = ProviderProfile::new(
            document.user_id.unwrap_or_default(),
            document.display_name,
            document.picture_url,
        )?;

        tracing::debug!(
            provider = %self.config.name,
            provider_user_id = %profile.provider_user_id,
            "Fetched provider profile"
        );

        Ok(profile)
    }
}

/// Cuts `body` to at most `max` bytes on a character boundary.
fn truncate_body(mut body: String, max: usize) -> String {
    if body.len() > max {
        let mut cut = max;
        while !body.is_char_boundary(cut) {
            cut -= 1;
        }
        body.truncate(cut);
    }
    body
}
