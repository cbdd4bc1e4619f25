//! In-memory account store backend for Linkbridge.
//!
//! This crate provides an in-memory implementation of the `AccountStore` trait
//! from `linkbridge-auth`, using `dashmap` for concurrent access. Credentials
//! are minted locally with a [`CredentialSigner`].
//!
//! # Example
//!
//! ```ignore
//! use linkbridge_auth::{AccountSpec, AccountStore, CredentialConfig, CredentialSigner, LocalAccountId};
//! use linkbridge_db_memory::InMemoryAccountStore;
//!
//! let signer = CredentialSigner::new(CredentialConfig::hs256("dev-secret"))?;
//! let store = InMemoryAccountStore::new(signer);
//!
//! let id = LocalAccountId::new("line", "U1");
//! store.create(AccountSpec::new(id.clone()).display_name("Alice")).await?;
//! let credential = store.mint_credential(&id).await?;
//! ```

pub mod store;

pub use linkbridge_auth::{AccountStore, AccountStoreError, CredentialSigner};
pub use store::InMemoryAccountStore;

/// Type alias for a shareable AccountStore instance.
pub type DynAccountStore = std::sync::Arc<dyn AccountStore>;

/// Creates a new in-memory AccountStore instance.
pub fn create_account_store(signer: CredentialSigner) -> DynAccountStore {
    std::sync::Arc::new(InMemoryAccountStore::new(signer))
}
