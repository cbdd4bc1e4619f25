//! Provider profile and local account identity.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ExchangeError;

/// A verified provider profile.
///
/// Only produced from a successful profile lookup; lives for one exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderProfile {
    /// Opaque, non-empty provider user id.
    pub provider_user_id: String,
    /// Display name, if the provider returned a non-empty one.
    pub display_name: Option<String>,
    /// Picture URL, if the provider returned a non-empty one.
    pub picture_url: Option<String>,
}

impl ProviderProfile {
    /// Creates a profile, normalizing empty optional fields to `None`.
    ///
    /// # Errors
    ///
    /// Returns `UpstreamInvalidResponse` when the user id is empty.
    pub fn new(
        provider_user_id: impl Into<String>,
        display_name: Option<String>,
        picture_url: Option<String>,
    ) -> Result<Self, ExchangeError> {
        let provider_user_id = provider_user_id.into();
        if provider_user_id.is_empty() {
            return Err(ExchangeError::upstream_invalid_response("No userId"));
        }

        Ok(Self {
            provider_user_id,
            display_name: display_name.filter(|s| !s.is_empty()),
            picture_url: picture_url.filter(|s| !s.is_empty()),
        })
    }

    /// Returns the local account id for this profile.
    #[must_use]
    pub fn local_account_id(&self, namespace: &str) -> LocalAccountId {
        LocalAccountId::new(namespace, &self.provider_user_id)
    }
}

/// Account id in the Account Service, `<namespace>:<provider user id>`.
///
/// A pure function of the provider user id; the namespace keeps ids from
/// different providers apart.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LocalAccountId(String);

impl LocalAccountId {
    /// Derives the account id for a provider user.
    #[must_use]
    pub fn new(namespace: &str, provider_user_id: &str) -> Self {
        Self(format!("{namespace}:{provider_user_id}"))
    }

    /// Returns the id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LocalAccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_local_account_id_is_deterministic() {
        let a = LocalAccountId::new("line", "U1");
        let b = LocalAccountId::new("line", "U1");
        assert_eq!(a, b);
        assert_eq!(a.as_str(), "line:U1");
    }

    #[test]
    fn test_namespace_separates_providers() {
        assert_ne!(
            LocalAccountId::new("line", "U1"),
            LocalAccountId::new("kakao", "U1")
        );
    }

    #[test]
    fn test_provider_user_id_may_contain_colons() {
        let id = LocalAccountId::new("line", "a:b");
        assert_eq!(id.as_str(), "line:a:b");
        assert_ne!(id, LocalAccountId::new("line", "a"));
    }

    #[test]
    fn test_profile_requires_user_id() {
        let err = ProviderProfile::new("", Some("Alice".into()), None).unwrap_err();
        assert!(matches!(err, ExchangeError::UpstreamInvalidResponse { .. }));
        assert!(err.to_string().contains("No userId"));
    }

    #[test]
    fn test_profile_normalizes_empty_fields() {
        let profile = ProviderProfile::new("U1", Some(String::new()), Some(String::new())).unwrap();
        assert!(profile.display_name.is_none());
        assert!(profile.picture_url.is_none());
        assert_eq!(profile.local_account_id("line").as_str(), "line:U1");
    }

    #[test]
    fn test_local_account_id_serializes_as_string() {
        let id = LocalAccountId::new("line", "U1");
        assert_eq!(serde_json::to_value(&id).unwrap(), serde_json::json!("line:U1"));
    }
}
