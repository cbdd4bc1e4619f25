//! Custom credential signing.
//!
//! Exchange credentials are custom tokens in the form the Account Service's
//! "sign in with custom token" primitive accepts: a JWT issued by a service
//! account, addressed to the identity toolkit audience, carrying the account
//! id as `uid` and expiring within one hour.
//!
//! ## Supported Algorithms
//!
//! - **HS256**: shared secret (local development, in-memory store)
//! - **RS256**: service account private key
//!
//! ## Example
//!
//! ```ignore
//! use linkbridge_auth::config::CredentialConfig;
//! use linkbridge_auth::token::CredentialSigner;
//!
//! let signer = CredentialSigner::new(CredentialConfig::hs256("secret"))?;
//! let token = signer.sign(&account_id)?;
//! ```

use std::fmt;

use jsonwebtoken::{EncodingKey, Header, encode};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::config::{ConfigError, CredentialAlgorithm, CredentialConfig};
use crate::federation::LocalAccountId;

// ============================================================================
// Error Types
// ============================================================================

/// Errors that can occur while minting a credential.
#[derive(Debug, thiserror::Error)]
pub enum CredentialError {
    /// The configured key material is missing or unusable.
    #[error("Invalid key: {message}")]
    InvalidKey {
        /// Description of why the key is invalid.
        message: String,
    },

    /// The credential settings failed validation.
    #[error("Invalid credential configuration: {0}")]
    InvalidConfig(#[from] ConfigError),

    /// Failed to encode the token.
    #[error("Failed to encode credential: {message}")]
    Encoding {
        /// Description of the encoding error.
        message: String,
    },
}

impl CredentialError {
    /// Creates a new `InvalidKey` error.
    #[must_use]
    pub fn invalid_key(message: impl Into<String>) -> Self {
        Self::InvalidKey {
            message: message.into(),
        }
    }
}

impl From<jsonwebtoken::errors::Error> for CredentialError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        use jsonwebtoken::errors::ErrorKind;

        match err.kind() {
            ErrorKind::InvalidRsaKey(_) | ErrorKind::InvalidKeyFormat => {
                Self::invalid_key(err.to_string())
            }
            _ => Self::Encoding {
                message: err.to_string(),
            },
        }
    }
}

// ============================================================================
// Claims
// ============================================================================

/// Claims of a custom credential.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CredentialClaims {
    /// Issuer (service account).
    pub iss: String,

    /// Subject (service account).
    pub sub: String,

    /// Audience (identity toolkit).
    pub aud: String,

    /// Issued at (Unix timestamp).
    pub iat: i64,

    /// Expiration time (Unix timestamp).
    pub exp: i64,

    /// Account the credential signs in as.
    pub uid: String,
}

// ============================================================================
// Signer
// ============================================================================

/// Signs custom credentials for accounts.
pub struct CredentialSigner {
    key: EncodingKey,
    header: Header,
    config: CredentialConfig,
}

impl CredentialSigner {
    /// Creates a signer from configuration.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` when the settings fail validation (missing key
    /// material, TTL above one hour) and `InvalidKey` when the key cannot be
    /// parsed.
    pub fn new(config: CredentialConfig) -> Result<Self, CredentialError> {
        config.validate()?;

        let key = match config.algorithm {
            CredentialAlgorithm::HS256 => {
                let secret = config
                    .secret
                    .as_deref()
                    .filter(|s| !s.is_empty())
                    .ok_or_else(|| CredentialError::invalid_key("HS256 requires a secret"))?;
                EncodingKey::from_secret(secret.as_bytes())
            }
            CredentialAlgorithm::RS256 => {
                let pem = config
                    .private_key_pem
                    .as_deref()
                    .filter(|s| !s.is_empty())
                    .ok_or_else(|| CredentialError::invalid_key("RS256 requires a private key"))?;
                EncodingKey::from_rsa_pem(pem.as_bytes())?
            }
        };

        Ok(Self {
            key,
            header: Header::new(config.algorithm.to_jwt_algorithm()),
            config,
        })
    }

    /// Builds the claims for an account, valid from now for the configured TTL.
    #[must_use]
    pub fn claims_for(&self, account_id: &LocalAccountId) -> CredentialClaims {
        let now = OffsetDateTime::now_utc().unix_timestamp();
        CredentialClaims {
            iss: self.config.issuer.clone(),
            sub: self.config.issuer.clone(),
            aud: self.config.audience.clone(),
            iat: now,
            exp: now + self.config.ttl.as_secs() as i64,
            uid: account_id.to_string(),
        }
    }

    /// Signs a credential for an account.
    ///
    /// # Errors
    ///
    /// Returns `Encoding` if the token cannot be produced.
    pub fn sign(&self, account_id: &LocalAccountId) -> Result<String, CredentialError> {
        let claims = self.claims_for(account_id);
        Ok(encode(&self.header, &claims, &self.key)?)
    }
}

impl fmt::Debug for CredentialSigner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialSigner")
            .field("algorithm", &self.config.algorithm)
            .field("issuer", &self.config.issuer)
            .finish_non_exhaustive()
    }
}
