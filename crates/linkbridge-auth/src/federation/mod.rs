//! External identity provider federation.
//!
//! This module turns a provider access token into an Account Service
//! credential:
//!
//! - Provider profile lookup with the bearer token
//! - Mapping of the provider identity onto a local account id
//! - Race-safe find-or-create of the account
//! - Federation claim and credential minting

pub mod exchange;
pub mod profile;
pub mod provider;
pub mod resolver;

#[cfg(test)]
pub(crate) mod testing;

pub use exchange::{ExchangeCredential, ExchangeStage, TokenExchangeVerifier};
pub use profile::{LocalAccountId, ProviderProfile};
pub use provider::{HttpProviderClient, ProviderClient, validate_access_token};
pub use resolver::{IdentityResolver, Resolution, ResolutionAction};
