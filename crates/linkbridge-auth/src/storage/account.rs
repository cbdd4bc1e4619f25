//! Account storage trait.
//!
//! Defines the contract of the Account Service's identity directory as seen
//! by the token exchange: lookup by id, create, set claims and mint a custom
//! credential.

use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::federation::{LocalAccountId, ProviderProfile};

/// Custom claims attached to an account.
pub type Claims = HashMap<String, serde_json::Value>;

// =============================================================================
// Account Types
// =============================================================================

/// An account in the Account Service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    /// Account id, derived from the provider identity.
    pub id: LocalAccountId,

    /// Display name established at creation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,

    /// Photo URL established at creation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub photo_url: Option<String>,

    /// Custom claims.
    #[serde(default)]
    pub claims: Claims,

    /// When the account was created.
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl Account {
    /// Creates an account from a creation request.
    #[must_use]
    pub fn from_spec(spec: AccountSpec) -> Self {
        Self {
            id: spec.id,
            display_name: spec.display_name,
            photo_url: spec.photo_url,
            claims: Claims::new(),
            created_at: OffsetDateTime::now_utc(),
        }
    }

    /// Returns the provider recorded in the federation claim, if any.
    #[must_use]
    pub fn federated_provider(&self) -> Option<&str> {
        self.claims
            .get(FederationClaim::KEY)
            .and_then(serde_json::Value::as_str)
    }
}

/// Request to create an account.
///
/// Optional fields are only set when the provider returned them, so an absent
/// profile field never reaches the store as an empty string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountSpec {
    /// Account id.
    pub id: LocalAccountId,
    /// Display name, if known.
    pub display_name: Option<String>,
    /// Photo URL, if known.
    pub photo_url: Option<String>,
}

impl AccountSpec {
    /// Creates a spec with only the id set.
    #[must_use]
    pub fn new(id: LocalAccountId) -> Self {
        Self {
            id,
            display_name: None,
            photo_url: None,
        }
    }

    /// Builds the creation request for a first-seen provider profile.
    #[must_use]
    pub fn from_profile(id: LocalAccountId, profile: &ProviderProfile) -> Self {
        let mut spec = Self::new(id);
        if let Some(name) = &profile.display_name {
            spec = spec.display_name(name.clone());
        }
        if let Some(url) = &profile.picture_url {
            spec = spec.photo_url(url.clone());
        }
        spec
    }

    /// Sets the display name.
    #[must_use]
    pub fn display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }

    /// Sets the photo URL.
    #[must_use]
    pub fn photo_url(mut self, url: impl Into<String>) -> Self {
        self.photo_url = Some(url.into());
        self
    }
}

/// Federation marker recording which provider established an account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FederationClaim {
    /// Provider name, e.g. `LINE`.
    pub provider: String,
}

impl FederationClaim {
    /// Claim key under which the provider name is stored.
    pub const KEY: &'static str = "provider";

    /// Creates a federation claim for a provider.
    #[must_use]
    pub fn new(provider: impl Into<String>) -> Self {
        Self {
            provider: provider.into(),
        }
    }

    /// Converts the marker into a claims map.
    #[must_use]
    pub fn to_claims(&self) -> Claims {
        let mut claims = Claims::new();
        claims.insert(
            Self::KEY.to_string(),
            serde_json::Value::String(self.provider.clone()),
        );
        claims
    }
}

// =============================================================================
// Errors
// =============================================================================

/// Errors returned by an account store.
#[derive(Debug, Clone, thiserror::Error)]
pub enum AccountStoreError {
    /// No account with this id exists.
    #[error("Account not found: {0}")]
    NotFound(LocalAccountId),

    /// An account with this id already exists.
    #[error("Account already exists: {0}")]
    AlreadyExists(LocalAccountId),

    /// The store failed for another reason.
    #[error("Account store backend error: {0}")]
    Backend(String),
}

impl AccountStoreError {
    /// Creates a new `Backend` error.
    #[must_use]
    pub fn backend(message: impl Into<String>) -> Self {
        Self::Backend(message.into())
    }

    /// Returns `true` for a missing account.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// Returns `true` for a uniqueness conflict.
    #[must_use]
    pub fn is_already_exists(&self) -> bool {
        matches!(self, Self::AlreadyExists(_))
    }
}

// =============================================================================
// Account Store Trait
// =============================================================================

/// Capability over the Account Service's identity directory.
///
/// `create` must enforce id uniqueness atomically: when two creates race for
/// the same id exactly one succeeds and the other returns
/// [`AccountStoreError::AlreadyExists`]. The exchange relies on this instead of
/// any in-process locking.
#[async_trait]
pub trait AccountStore: Send + Sync {
    /// Looks up an account by id.
    ///
    /// Returns [`AccountStoreError::NotFound`] when it does not exist.
    async fn get_by_id(&self, id: &LocalAccountId) -> Result<Account, AccountStoreError>;

    /// Creates an account.
    ///
    /// Returns [`AccountStoreError::AlreadyExists`] on an id conflict.
    async fn create(&self, spec: AccountSpec) -> Result<Account, AccountStoreError>;

    /// Replaces the custom claims of an account. Re-applying the same claims
    /// is a no-op.
    async fn set_claims(&self, id: &LocalAccountId, claims: Claims)
    -> Result<(), AccountStoreError>;

    /// Mints a signed, short-lived custom credential for an account.
    async fn mint_credential(&self, id: &LocalAccountId) -> Result<String, AccountStoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile(name: Option<&str>, picture: Option<&str>) -> ProviderProfile {
        ProviderProfile::new("U1", name.map(String::from), picture.map(String::from))
            .expect("valid profile")
    }

    #[test]
    fn test_spec_from_full_profile() {
        let id = LocalAccountId::new("line", "U1");
        let spec = AccountSpec::from_profile(id.clone(), &profile(Some("Alice"), Some("https://p/a.png")));

        assert_eq!(spec.id, id);
        assert_eq!(spec.display_name.as_deref(), Some("Alice"));
        assert_eq!(spec.photo_url.as_deref(), Some("https://p/a.png"));
    }

    #[test]
    fn test_spec_omits_absent_fields() {
        let id = LocalAccountId::new("line", "U1");
        let spec = AccountSpec::from_profile(id, &profile(None, None));

        assert!(spec.display_name.is_none());
        assert!(spec.photo_url.is_none());
    }

    #[test]
    fn test_federation_claim() {
        let claims = FederationClaim::new("LINE").to_claims();
        assert_eq!(claims.len(), 1);
        assert_eq!(claims["provider"], serde_json::json!("LINE"));

        let mut account = Account::from_spec(AccountSpec::new(LocalAccountId::new("line", "U1")));
        assert!(account.federated_provider().is_none());
        account.claims = claims;
        assert_eq!(account.federated_provider(), Some("LINE"));
    }

    #[test]
    fn test_account_serialization() {
        let account = Account::from_spec(
            AccountSpec::new(LocalAccountId::new("line", "U1")).display_name("Alice"),
        );
        let json = serde_json::to_value(&account).unwrap();

        assert_eq!(json["id"], "line:U1");
        assert_eq!(json["displayName"], "Alice");
        assert!(json.get("photoUrl").is_none());
    }

    #[test]
    fn test_store_error_predicates() {
        let id = LocalAccountId::new("line", "U1");
        assert!(AccountStoreError::NotFound(id.clone()).is_not_found());
        assert!(AccountStoreError::AlreadyExists(id).is_already_exists());
        assert!(!AccountStoreError::backend("x").is_not_found());
    }
}
