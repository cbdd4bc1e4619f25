//! Provider token exchange.
//!
//! This module provides the [`TokenExchangeVerifier`], the single entry point
//! that turns a provider access token into an Account Service credential.
//!
//! # Overview
//!
//! An exchange moves through fixed stages:
//!
//! `Started -> ProfileFetched -> AccountResolved -> ClaimsSet -> CredentialMinted`
//!
//! Each transition is idempotent. A failed exchange is never rolled back; the
//! client retries with the same provider identity and the retry completes the
//! remaining stages against the same account.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use linkbridge_auth::config::ProviderConfig;
//! use linkbridge_auth::federation::{HttpProviderClient, TokenExchangeVerifier};
//!
//! let config = ProviderConfig::default();
//! let provider = Arc::new(HttpProviderClient::new(config.clone())?);
//! let verifier = TokenExchangeVerifier::new(provider, store, &config);
//!
//! let credential = verifier.exchange("line-access-token").await?;
//! println!("signed in as {}", credential.account_id);
//! ```

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::field::{Empty, display};

use super::profile::LocalAccountId;
use super::provider::{ProviderClient, validate_access_token};
use super::resolver::IdentityResolver;
use crate::config::ProviderConfig;
use crate::error::ExchangeError;
use crate::storage::{AccountStore, FederationClaim};

/// Stages of a token exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExchangeStage {
    /// Input validated, nothing called yet.
    Started,
    /// The provider vouched for the token.
    ProfileFetched,
    /// The account exists.
    AccountResolved,
    /// The federation claim is set.
    ClaimsSet,
    /// The credential is minted.
    CredentialMinted,
}

impl ExchangeStage {
    /// Returns the stage name used in logs.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Started => "started",
            Self::ProfileFetched => "profile_fetched",
            Self::AccountResolved => "account_resolved",
            Self::ClaimsSet => "claims_set",
            Self::CredentialMinted => "credential_minted",
        }
    }
}

impl fmt::Display for ExchangeStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Credential produced by a successful exchange.
#[derive(Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExchangeCredential {
    /// The account the credential is scoped to.
    pub account_id: LocalAccountId,
    /// Opaque signed token.
    pub token: String,
}

impl fmt::Debug for ExchangeCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExchangeCredential")
            .field("account_id", &self.account_id)
            .field("token", &"[redacted]")
            .finish()
    }
}

/// Orchestrates provider verification, account resolution, claim update and
/// credential minting.
///
/// Dependencies are injected; the verifier itself is stateless and can be
/// shared across tasks behind an `Arc`.
pub struct TokenExchangeVerifier {
    provider: Arc<dyn ProviderClient>,
    store: Arc<dyn AccountStore>,
    resolver: IdentityResolver,
    federation_claim: FederationClaim,
}

impl TokenExchangeVerifier {
    /// Creates a verifier for the provider described by `config`.
    #[must_use]
    pub fn new(
        provider: Arc<dyn ProviderClient>,
        store: Arc<dyn AccountStore>,
        config: &ProviderConfig,
    ) -> Self {
        Self {
            resolver: IdentityResolver::new(store.clone(), config.namespace.clone()),
            federation_claim: FederationClaim::new(config.name.clone()),
            provider,
            store,
        }
    }

    /// Exchanges a provider access token for an Account Service credential.
    ///
    /// # Errors
    ///
    /// Returns the typed failure of the first stage that failed. Nothing is
    /// retried and nothing is rolled back.
    pub async fn exchange(&self, access_token: &str) -> Result<ExchangeCredential, ExchangeError> {
        self.exchange_with_cancellation(access_token, &CancellationToken::new())
            .await
    }

    /// Like [`exchange`](Self::exchange), aborting with
    /// [`ExchangeError::Cancelled`] as soon as `cancel` fires.
    ///
    /// The reported stage is the last one that completed. Cancellation after
    /// `ClaimsSet` leaves the claim applied without a credential; a retry
    /// completes it.
    ///
    /// # Errors
    ///
    /// See [`exchange`](Self::exchange).
    #[tracing::instrument(name = "token_exchange", skip_all, fields(account_id = Empty))]
    pub async fn exchange_with_cancellation(
        &self,
        access_token: &str,
        cancel: &CancellationToken,
    ) -> Result<ExchangeCredential, ExchangeError> {
        let result = self.run(access_token, cancel).await;

        if let Err(err) = &result {
            tracing::warn!(
                error_code = err.error_code(),
                category = %err.category(),
                error = %err,
                "Token exchange failed"
            );
        }

        result
    }

    async fn run(
        &self,
        access_token: &str,
        cancel: &CancellationToken,
    ) -> Result<ExchangeCredential, ExchangeError> {
        validate_access_token(access_token)?;
        let mut stage = ExchangeStage::Started;

        let profile = until_cancelled(cancel, stage, self.provider.fetch_profile(access_token)).await??;
        stage = advance(stage, ExchangeStage::ProfileFetched);

        let resolution = until_cancelled(cancel, stage, self.resolver.resolve(&profile)).await??;
        let account_id = resolution.account.id;
        tracing::Span::current().record("account_id", display(&account_id));
        stage = advance(stage, ExchangeStage::AccountResolved);

        until_cancelled(
            cancel,
            stage,
            self.store
                .set_claims(&account_id, self.federation_claim.to_claims()),
        )
        .await?
        .map_err(|source| ExchangeError::ClaimUpdateFailed {
            account_id: account_id.clone(),
            source,
        })?;
        stage = advance(stage, ExchangeStage::ClaimsSet);

        let token = until_cancelled(cancel, stage, self.store.mint_credential(&account_id))
            .await?
            .map_err(|source| ExchangeError::CredentialMintFailed {
                account_id: account_id.clone(),
                source,
            })?;
        advance(stage, ExchangeStage::CredentialMinted);

        tracing::info!(
            account_id = %account_id,
            action = %resolution.action,
            "Token exchange completed"
        );

        Ok(ExchangeCredential { account_id, token })
    }
}

fn advance(from: ExchangeStage, to: ExchangeStage) -> ExchangeStage {
    tracing::debug!(from = %from, to = %to, "Exchange stage transition");
    to
}

/// Awaits `fut` unless `cancel` fires first.
async fn until_cancelled<F: Future>(
    cancel: &CancellationToken,
    stage: ExchangeStage,
    fut: F,
) -> Result<F::Output, ExchangeError> {
    tokio::select! {
        biased;
        () = cancel.cancelled() => Err(ExchangeError::Cancelled { stage }),
        out = fut => Ok(out),
    }
}
