//! Credential generation.
//!
//! - [`credential`] - Custom token signing for the Account Service

pub mod credential;

pub use credential::{CredentialClaims, CredentialError, CredentialSigner};
