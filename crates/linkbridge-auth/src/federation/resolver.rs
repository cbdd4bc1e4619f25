//! Identity resolution for federated sign-in.
//!
//! This module provides the [`IdentityResolver`], which maps a verified
//! provider profile onto an account in the Account Service.
//!
//! # Overview
//!
//! 1. **Derive id** - `<namespace>:<provider user id>`
//! 2. **Find by id** - An existing account is returned unchanged
//! 3. **Create** - A first-seen identity gets a new account
//! 4. **Converge** - A lost creation race re-reads the winner's account once
//!
//! Profile fields only seed a freshly created account. A later sign-in with a
//! changed display name or picture never overwrites them.

use std::fmt;
use std::sync::Arc;

use super::profile::{LocalAccountId, ProviderProfile};
use crate::error::ExchangeError;
use crate::storage::{Account, AccountSpec, AccountStore, AccountStoreError};

/// Result of resolving a profile.
#[derive(Debug, Clone)]
pub struct Resolution {
    /// The resolved account.
    pub account: Account,

    /// The path that produced it.
    pub action: ResolutionAction,
}

/// The path taken during resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionAction {
    /// The account already existed.
    Existing,

    /// The account was created by this call.
    Created,

    /// Creation conflicted with a concurrent create; the winner's account was
    /// read back.
    ConvergedAfterConflict,
}

impl fmt::Display for ResolutionAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Existing => write!(f, "existing"),
            Self::Created => write!(f, "created"),
            Self::ConvergedAfterConflict => write!(f, "converged_after_conflict"),
        }
    }
}

/// Maps provider profiles to Account Service accounts.
///
/// Holds no mutable state; concurrent resolutions of the same identity rely on
/// the store's uniqueness constraint.
#[derive(Clone)]
pub struct IdentityResolver {
    store: Arc<dyn AccountStore>,
    namespace: String,
}

impl IdentityResolver {
    /// Creates a resolver deriving ids under `namespace`.
    #[must_use]
    pub fn new(store: Arc<dyn AccountStore>, namespace: impl Into<String>) -> Self {
        Self {
            store,
            namespace: namespace.into(),
        }
    }

    /// Returns the account id a profile resolves to.
    #[must_use]
    pub fn account_id(&self, profile: &ProviderProfile) -> LocalAccountId {
        profile.local_account_id(&self.namespace)
    }

    /// Resolves a profile to its account, creating it on first sight.
    ///
    /// # Errors
    ///
    /// Returns `AccountStore` for store failures other than the recovered
    /// creation conflict, and `AccountAlreadyExists` if a conflict is reported
    /// but the account still cannot be read back.
    pub async fn resolve_account(&self, profile: &ProviderProfile) -> Result<Account, ExchangeError> {
        self.resolve(profile).await.map(|r| r.account)
    }

    /// Like [`resolve_account`](Self::resolve_account), also reporting which
    /// path was taken.
    ///
    /// # Errors
    ///
    /// See [`resolve_account`](Self::resolve_account).
    pub async fn resolve(&self, profile: &ProviderProfile) -> Result<Resolution, ExchangeError> {
        let id = self.account_id(profile);

        match self.store.get_by_id(&id).await {
            Ok(account) => {
                tracing::debug!(account_id = %id, "Account found");
                return Ok(Resolution {
                    account,
                    action: ResolutionAction::Existing,
                });
            }
            Err(AccountStoreError::NotFound(_)) => {}
            Err(e) => return Err(ExchangeError::AccountStore(e)),
        }

        let spec = AccountSpec::from_profile(id.clone(), profile);
        match self.store.create(spec).await {
            Ok(account) => {
                tracing::info!(account_id = %id, "Account created");
                Ok(Resolution {
                    account,
                    action: ResolutionAction::Created,
                })
            }
            Err(AccountStoreError::AlreadyExists(_)) => {
                tracing::info!(account_id = %id, "Concurrent account creation detected, re-reading");
                self.read_after_conflict(id).await
            }
            Err(e) => Err(ExchangeError::AccountStore(e)),
        }
    }

    async fn read_after_conflict(&self, id: LocalAccountId) -> Result<Resolution, ExchangeError> {
        match self.store.get_by_id(&id).await {
            Ok(account) => Ok(Resolution {
                account,
                action: ResolutionAction::ConvergedAfterConflict,
            }),
            Err(AccountStoreError::NotFound(_)) => {
                tracing::warn!(account_id = %id, "Account reported as existing but not found");
                Err(ExchangeError::AccountAlreadyExists { account_id: id })
            }
            Err(e) => Err(ExchangeError::AccountStore(e)),
        }
    }
}
