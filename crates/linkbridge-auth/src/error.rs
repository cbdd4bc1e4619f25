//! Token exchange error types.
//!
//! This module defines every failure a token exchange can surface, together
//! with the HTTP status and diagnostic code the boundary layer reports.

use std::fmt;
use std::time::Duration;

use axum::http::StatusCode;

use crate::federation::{ExchangeStage, LocalAccountId};
use crate::storage::AccountStoreError;

/// Errors that can occur during a token exchange.
#[derive(Debug, thiserror::Error)]
pub enum ExchangeError {
    /// The access token is missing or malformed. No network call was made.
    #[error("Invalid input: {message}")]
    InvalidInput {
        /// Description of why the input is invalid.
        message: String,
    },

    /// The provider profile endpoint did not answer within the timeout.
    #[error("Provider request timed out after {}s", timeout.as_secs())]
    UpstreamTimeout {
        /// The timeout that elapsed.
        timeout: Duration,
    },

    /// The provider answered, but the response is unusable.
    #[error("Invalid provider response: {message}")]
    UpstreamInvalidResponse {
        /// Description of what was wrong with the response.
        message: String,
    },

    /// The provider could not be reached or rejected the token.
    #[error("Provider unavailable: {message}")]
    UpstreamUnavailable {
        /// Description of the transport failure.
        message: String,
        /// HTTP status returned by the provider, if any.
        status: Option<u16>,
        /// Response body returned by the provider, for diagnostics only.
        body: Option<String>,
    },

    /// The account store failed during lookup or creation.
    #[error("Account store error: {0}")]
    AccountStore(AccountStoreError),

    /// Account creation conflicted and the follow-up lookup found nothing.
    #[error("Account already exists: {account_id}")]
    AccountAlreadyExists {
        /// The conflicting account id.
        account_id: LocalAccountId,
    },

    /// Setting the federation claim failed.
    #[error("Failed to update claims for {account_id}: {source}")]
    ClaimUpdateFailed {
        /// The account whose claims could not be set.
        account_id: LocalAccountId,
        /// The underlying store error.
        source: AccountStoreError,
    },

    /// Minting the exchange credential failed.
    #[error("Failed to mint credential for {account_id}: {source}")]
    CredentialMintFailed {
        /// The account the credential was requested for.
        account_id: LocalAccountId,
        /// The underlying store error.
        source: AccountStoreError,
    },

    /// The exchange was cancelled by the caller.
    #[error("Exchange cancelled after stage {stage}")]
    Cancelled {
        /// The last stage that completed before cancellation.
        stage: ExchangeStage,
    },
}

impl ExchangeError {
    /// Creates a new `InvalidInput` error.
    #[must_use]
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    /// Creates a new `UpstreamInvalidResponse` error.
    #[must_use]
    pub fn upstream_invalid_response(message: impl Into<String>) -> Self {
        Self::UpstreamInvalidResponse {
            message: message.into(),
        }
    }

    /// Creates a new `UpstreamUnavailable` error without upstream details.
    #[must_use]
    pub fn upstream_unavailable(message: impl Into<String>) -> Self {
        Self::UpstreamUnavailable {
            message: message.into(),
            status: None,
            body: None,
        }
    }

    /// Creates a new `UpstreamUnavailable` error from a non-success response.
    #[must_use]
    pub fn upstream_status(status: u16, body: impl Into<String>) -> Self {
        Self::UpstreamUnavailable {
            message: format!("provider returned HTTP {status}"),
            status: Some(status),
            body: Some(body.into()),
        }
    }

    /// Returns `true` if the error originates at the provider.
    #[must_use]
    pub fn is_upstream_error(&self) -> bool {
        matches!(
            self,
            Self::UpstreamTimeout { .. }
                | Self::UpstreamInvalidResponse { .. }
                | Self::UpstreamUnavailable { .. }
        )
    }

    /// Returns `true` if the error originates at the account store.
    #[must_use]
    pub fn is_store_error(&self) -> bool {
        matches!(
            self,
            Self::AccountStore(_)
                | Self::AccountAlreadyExists { .. }
                | Self::ClaimUpdateFailed { .. }
                | Self::CredentialMintFailed { .. }
        )
    }

    /// Returns the error category for logging purposes.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::InvalidInput { .. } => ErrorCategory::Validation,
            Self::UpstreamTimeout { .. }
            | Self::UpstreamInvalidResponse { .. }
            | Self::UpstreamUnavailable { .. } => ErrorCategory::Upstream,
            Self::AccountStore(_) | Self::AccountAlreadyExists { .. } => ErrorCategory::Storage,
            Self::ClaimUpdateFailed { .. } | Self::CredentialMintFailed { .. } => {
                ErrorCategory::Credential
            }
            Self::Cancelled { .. } => ErrorCategory::Cancelled,
        }
    }

    /// Returns the machine-readable diagnostic code for this error.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidInput { .. } => "invalid_input",
            Self::UpstreamTimeout { .. } => "upstream_timeout",
            Self::UpstreamInvalidResponse { .. } => "upstream_invalid_response",
            Self::UpstreamUnavailable { .. } => "upstream_unavailable",
            Self::AccountStore(_) => "account_store_error",
            Self::AccountAlreadyExists { .. } => "account_already_exists",
            Self::ClaimUpdateFailed { .. } => "claim_update_failed",
            Self::CredentialMintFailed { .. } => "credential_mint_failed",
            Self::Cancelled { .. } => "cancelled",
        }
    }

    /// Returns the HTTP status the boundary layer reports for this error.
    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidInput { .. } => StatusCode::BAD_REQUEST,
            Self::UpstreamTimeout { .. } => StatusCode::GATEWAY_TIMEOUT,
            Self::UpstreamInvalidResponse { .. } | Self::UpstreamUnavailable { .. } => {
                StatusCode::BAD_GATEWAY
            }
            Self::AccountStore(_)
            | Self::AccountAlreadyExists { .. }
            | Self::ClaimUpdateFailed { .. }
            | Self::CredentialMintFailed { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Cancelled { .. } => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    /// Returns a message safe to show to clients.
    ///
    /// Upstream payloads and store internals are omitted; they are only
    /// available through `Debug` and the server logs.
    #[must_use]
    pub fn public_message(&self) -> String {
        match self {
            Self::InvalidInput { message } => message.clone(),
            Self::UpstreamTimeout { .. } => "Provider did not respond in time".to_string(),
            Self::UpstreamInvalidResponse { message } => message.clone(),
            Self::UpstreamUnavailable { .. } => "Provider rejected or could not verify the access token".to_string(),
            Self::AccountStore(_) | Self::AccountAlreadyExists { .. } => {
                "Account lookup failed".to_string()
            }
            Self::ClaimUpdateFailed { .. } => "Failed to update account claims".to_string(),
            Self::CredentialMintFailed { .. } => "Failed to mint credential".to_string(),
            Self::Cancelled { .. } => "Exchange cancelled".to_string(),
        }
    }
}

/// Categories of exchange errors for logging and monitoring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Request validation errors.
    Validation,
    /// Provider failures.
    Upstream,
    /// Account store failures during resolution.
    Storage,
    /// Claim or credential failures after resolution.
    Credential,
    /// Caller cancellation.
    Cancelled,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Validation => write!(f, "validation"),
            Self::Upstream => write!(f, "upstream"),
            Self::Storage => write!(f, "storage"),
            Self::Credential => write!(f, "credential"),
            Self::Cancelled => write!(f, "cancelled"),
        }
    }
}
