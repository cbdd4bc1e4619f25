//! # linkbridge-auth
//!
//! Provider token exchange for the Linkbridge server.
//!
//! A client that signed in with an external identity provider (LINE) sends the
//! provider access token here. The exchange verifies it against the provider's
//! profile endpoint, maps the provider identity onto a stable account in the
//! Account Service, marks that account as federated, and mints a short-lived
//! custom credential the client redeems with the Account Service.
//!
//! ## Modules
//!
//! - [`config`] - Provider and credential configuration
//! - [`error`] - Exchange error taxonomy
//! - [`federation`] - Provider client, identity resolver and the exchange itself
//! - [`storage`] - Account Service capability trait
//! - [`token`] - Custom credential signing
//! - [`http`] - Axum handler for the verify endpoint

pub mod config;
pub mod error;
pub mod federation;
pub mod http;
pub mod storage;
pub mod token;

pub use config::{ConfigError, CredentialConfig, FederationConfig, ProviderConfig};
pub use error::{ErrorCategory, ExchangeError};
pub use federation::{
    ExchangeCredential, ExchangeStage, HttpProviderClient, IdentityResolver, LocalAccountId,
    ProviderClient, ProviderProfile, Resolution, ResolutionAction, TokenExchangeVerifier,
};
pub use http::{VerifyRequest, VerifyResponse, VerifyState, verify_handler};
pub use storage::{Account, AccountSpec, AccountStore, AccountStoreError, Claims, FederationClaim};
pub use token::{CredentialError, CredentialSigner};
