//! Storage traits for the Account Service.
//!
//! The Account Service owns accounts; this crate only describes the
//! capability the exchange needs from it.
//!
//! # Implementations
//!
//! - `linkbridge-db-memory` - In-memory account store

pub mod account;

pub use account::{Account, AccountSpec, AccountStore, AccountStoreError, Claims, FederationClaim};
