use async_trait::async_trait;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use linkbridge_auth::{
    Account, AccountSpec, AccountStore, AccountStoreError, Claims, CredentialSigner,
    LocalAccountId,
};

/// In-memory account directory.
///
/// - Atomic create-if-absent per id via the `dashmap` entry API
/// - `set_claims` replaces the whole claims map
/// - Credentials are signed with the configured [`CredentialSigner`]
#[derive(Debug)]
pub struct InMemoryAccountStore {
    accounts: DashMap<LocalAccountId, Account>,
    signer: CredentialSigner,
}

impl InMemoryAccountStore {
    /// Creates an empty store minting credentials with `signer`.
    pub fn new(signer: CredentialSigner) -> Self {
        Self {
            accounts: DashMap::new(),
            signer,
        }
    }

    /// Number of accounts.
    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    /// Returns `true` if no account exists.
    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }
}

#[async_trait]
impl AccountStore for InMemoryAccountStore {
    async fn get_by_id(&self, id: &LocalAccountId) -> Result<Account, AccountStoreError> {
        self.accounts
            .get(id)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| AccountStoreError::NotFound(id.clone()))
    }

    async fn create(&self, spec: AccountSpec) -> Result<Account, AccountStoreError> {
        match self.accounts.entry(spec.id.clone()) {
            Entry::Occupied(_) => Err(AccountStoreError::AlreadyExists(spec.id)),
            Entry::Vacant(slot) => {
                let account = Account::from_spec(spec);
                slot.insert(account.clone());
                tracing::debug!(account_id = %account.id, "Stored new account");
                Ok(account)
            }
        }
    }

    async fn set_claims(
        &self,
        id: &LocalAccountId,
        claims: Claims,
    ) -> Result<(), AccountStoreError> {
        let mut account = self
            .accounts
            .get_mut(id)
            .ok_or_else(|| AccountStoreError::NotFound(id.clone()))?;
        account.claims = claims;
        Ok(())
    }

    async fn mint_credential(&self, id: &LocalAccountId) -> Result<String, AccountStoreError> {
        if !self.accounts.contains_key(id) {
            return Err(AccountStoreError::NotFound(id.clone()));
        }

        self.signer.sign(id).map_err(|e| {
            tracing::error!(account_id = %id, error = %e, "Failed to sign credential");
            AccountStoreError::backend(e.to_string())
        })
    }
}
