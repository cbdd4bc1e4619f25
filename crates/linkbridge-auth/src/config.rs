//! Provider and credential configuration.
//!
//! # Example (TOML)
//!
//! ```toml
//! [provider]
//! name = "LINE"
//! namespace = "line"
//! profile_url = "https://api.line.me/v2/profile"
//! timeout = "10s"
//!
//! [credential]
//! issuer = "firebase-adminsdk@example.iam.gserviceaccount.com"
//! ttl = "1h"
//! algorithm = "HS256"
//! secret = "change-me"
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

/// Audience of custom tokens redeemed with the identity toolkit.
pub const DEFAULT_CREDENTIAL_AUDIENCE: &str =
    "https://identitytoolkit.googleapis.com/google.identity.identitytoolkit.v1.IdentityToolkit";

/// Longest lifetime the Account Service accepts for a custom credential.
pub const MAX_CREDENTIAL_TTL: Duration = Duration::from_secs(3600);

/// Root configuration for the token exchange.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct FederationConfig {
    /// External identity provider settings.
    pub provider: ProviderConfig,

    /// Credential signing settings.
    pub credential: CredentialConfig,
}

impl FederationConfig {
    /// Validates both sections.
    ///
    /// # Errors
    ///
    /// Returns the first invalid or missing value found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.provider.validate()?;
        self.credential.validate()
    }
}

/// External identity provider configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ProviderConfig {
    /// Provider name written into the federation claim.
    pub name: String,

    /// Prefix of local account ids (`<namespace>:<provider user id>`).
    pub namespace: String,

    /// Profile endpoint queried with the bearer access token.
    pub profile_url: String,

    /// Upper bound for the profile request.
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,

    /// Upstream response bodies kept for diagnostics are cut to this length.
    pub max_error_body_bytes: usize,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            name: "LINE".to_string(),
            namespace: "line".to_string(),
            profile_url: "https://api.line.me/v2/profile".to_string(),
            timeout: Duration::from_secs(10),
            max_error_body_bytes: 1024,
        }
    }
}

impl ProviderConfig {
    /// Sets the profile endpoint.
    #[must_use]
    pub fn with_profile_url(mut self, url: impl Into<String>) -> Self {
        self.profile_url = url.into();
        self
    }

    /// Sets the request timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Validates the provider section.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` for an empty name or namespace, a
    /// namespace containing `:`, an unparsable profile URL, or a zero timeout.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.name.is_empty() {
            return Err(ConfigError::InvalidValue(
                "provider.name cannot be empty".to_string(),
            ));
        }
        if self.namespace.is_empty() || self.namespace.contains(':') {
            return Err(ConfigError::InvalidValue(
                "provider.namespace must be non-empty and must not contain ':'".to_string(),
            ));
        }
        Url::parse(&self.profile_url).map_err(|e| {
            ConfigError::InvalidValue(format!(
                "provider.profile_url '{}' is not a valid URL: {e}",
                self.profile_url
            ))
        })?;
        if self.timeout.is_zero() {
            return Err(ConfigError::InvalidValue(
                "provider.timeout must be > 0".to_string(),
            ));
        }
        Ok(())
    }
}

/// Signing algorithm for exchange credentials.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub enum CredentialAlgorithm {
    /// HMAC with SHA-256 over a shared secret.
    HS256,
    /// RSA with SHA-256 over a service account private key.
    RS256,
}

impl CredentialAlgorithm {
    /// Converts to the `jsonwebtoken` Algorithm type.
    #[must_use]
    pub fn to_jwt_algorithm(self) -> jsonwebtoken::Algorithm {
        match self {
            Self::HS256 => jsonwebtoken::Algorithm::HS256,
            Self::RS256 => jsonwebtoken::Algorithm::RS256,
        }
    }
}

/// Credential signing configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CredentialConfig {
    /// Service account identity, used as `iss` and `sub`.
    pub issuer: String,

    /// Audience the Account Service expects.
    pub audience: String,

    /// Credential lifetime. Capped at one hour.
    #[serde(with = "humantime_serde")]
    pub ttl: Duration,

    /// Signing algorithm.
    pub algorithm: CredentialAlgorithm,

    /// Shared secret for HS256.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secret: Option<String>,

    /// PEM encoded RSA private key for RS256.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub private_key_pem: Option<String>,
}

impl Default for CredentialConfig {
    fn default() -> Self {
        Self {
            issuer: "linkbridge@localhost".to_string(),
            audience: DEFAULT_CREDENTIAL_AUDIENCE.to_string(),
            ttl: MAX_CREDENTIAL_TTL,
            algorithm: CredentialAlgorithm::HS256,
            secret: None,
            private_key_pem: None,
        }
    }
}

impl CredentialConfig {
    /// Creates an HS256 configuration with the given secret.
    #[must_use]
    pub fn hs256(secret: impl Into<String>) -> Self {
        Self {
            secret: Some(secret.into()),
            ..Self::default()
        }
    }

    /// Validates the credential section.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Missing` when the key material for the selected
    /// algorithm is absent and `ConfigError::InvalidValue` for an empty issuer
    /// or a TTL outside `(0, 1h]`.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.issuer.is_empty() {
            return Err(ConfigError::InvalidValue(
                "credential.issuer cannot be empty".to_string(),
            ));
        }
        if self.ttl.is_zero() || self.ttl > MAX_CREDENTIAL_TTL {
            return Err(ConfigError::InvalidValue(
                "credential.ttl must be between 1s and 1h".to_string(),
            ));
        }
        match self.algorithm {
            CredentialAlgorithm::HS256 => {
                if self.secret.as_deref().unwrap_or("").is_empty() {
                    return Err(ConfigError::Missing("credential.secret".to_string()));
                }
            }
            CredentialAlgorithm::RS256 => {
                if self.private_key_pem.as_deref().unwrap_or("").is_empty() {
                    return Err(ConfigError::Missing(
                        "credential.private_key_pem".to_string(),
                    ));
                }
            }
        }
        Ok(())
    }
}

/// Configuration validation errors.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ConfigError {
    /// An invalid configuration value was provided.
    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),

    /// A required configuration value is missing.
    #[error("Missing required configuration: {0}")]
    Missing(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_defaults() {
        let config = ProviderConfig::default();
        assert_eq!(config.name, "LINE");
        assert_eq!(config.namespace, "line");
        assert_eq!(config.timeout, Duration::from_secs(10));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_provider_rejects_bad_namespace() {
        let mut config = ProviderConfig::default();
        config.namespace = "li:ne".to_string();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue(_))
        ));
    }

    #[test]
    fn test_provider_rejects_bad_url_and_zero_timeout() {
        let config = ProviderConfig::default().with_profile_url("not a url");
        assert!(config.validate().is_err());

        let config = ProviderConfig::default().with_timeout(Duration::ZERO);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_credential_requires_key_material() {
        let config = CredentialConfig::default();
        assert!(matches!(config.validate(), Err(ConfigError::Missing(_))));

        let config = CredentialConfig::hs256("s3cret");
        assert!(config.validate().is_ok());

        let config = CredentialConfig {
            algorithm: CredentialAlgorithm::RS256,
            ..CredentialConfig::hs256("s3cret")
        };
        assert!(matches!(config.validate(), Err(ConfigError::Missing(_))));
    }

    #[test]
    fn test_credential_ttl_is_capped() {
        let config = CredentialConfig {
            ttl: Duration::from_secs(7200),
            ..CredentialConfig::hs256("s3cret")
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue(_))
        ));
    }

    #[test]
    fn test_deserialize_humantime() {
        let json = serde_json::json!({
            "provider": { "timeout": "3s" },
            "credential": { "ttl": "15m", "secret": "abc" }
        });
        let config: FederationConfig = serde_json::from_value(json).unwrap();
        assert_eq!(config.provider.timeout, Duration::from_secs(3));
        assert_eq!(config.provider.namespace, "line");
        assert_eq!(config.credential.ttl, Duration::from_secs(900));
        assert_eq!(config.credential.algorithm, CredentialAlgorithm::HS256);
        assert!(config.validate().is_ok());
    }
}
