//! Scriptable provider and store doubles for exchange tests.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use tokio::sync::Barrier;

use super::profile::{LocalAccountId, ProviderProfile};
use super::provider::ProviderClient;
use crate::error::ExchangeError;
use crate::storage::{Account, AccountSpec, AccountStore, AccountStoreError, Claims};

/// Provider double answering every token with a fixed outcome.
pub(crate) struct StaticProvider {
    outcome: Mutex<Result<ProviderProfile, fn() -> ExchangeError>>,
    calls: AtomicUsize,
}

impl StaticProvider {
    pub(crate) fn profile(user_id: &str, display_name: Option<&str>) -> Arc<Self> {
        let profile = ProviderProfile::new(user_id, display_name.map(String::from), None)
            .expect("valid profile");
        Arc::new(Self {
            outcome: Mutex::new(Ok(profile)),
            calls: AtomicUsize::new(0),
        })
    }

    pub(crate) fn failing(make: fn() -> ExchangeError) -> Arc<Self> {
        Arc::new(Self {
            outcome: Mutex::new(Err(make)),
            calls: AtomicUsize::new(0),
        })
    }

    pub(crate) fn set_display_name(&self, name: &str) {
        let mut outcome = self.outcome.lock().unwrap();
        if let Ok(profile) = outcome.as_mut() {
            profile.display_name = Some(name.to_string());
        }
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ProviderClient for StaticProvider {
    async fn fetch_profile(&self, _access_token: &str) -> Result<ProviderProfile, ExchangeError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &*self.outcome.lock().unwrap() {
            Ok(profile) => Ok(profile.clone()),
            Err(make) => Err(make()),
        }
    }
}

/// Account store double with call counters and failure injection.
#[derive(Default)]
pub(crate) struct ScriptedStore {
    accounts: Mutex<HashMap<LocalAccountId, Account>>,
    pub(crate) gets: AtomicUsize,
    pub(crate) creates: AtomicUsize,
    pub(crate) claim_updates: AtomicUsize,
    pub(crate) mints: AtomicUsize,
    fail_get: Mutex<Option<AccountStoreError>>,
    fail_create: Mutex<Option<AccountStoreError>>,
    fail_set_claims: Mutex<Option<AccountStoreError>>,
    fail_mint: Mutex<Option<AccountStoreError>>,
    /// Next create behaves as if a concurrent worker won the race.
    lose_next_create: AtomicBool,
    /// Next create reports a conflict without any account appearing.
    phantom_conflict: AtomicBool,
    hang_set_claims: AtomicBool,
    lookup_barrier: Option<(Arc<Barrier>, usize)>,
}

impl ScriptedStore {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// The first `parties` lookups read the directory, then wait for each
    /// other before answering, so they all observe the same (empty) directory.
    pub(crate) fn with_lookup_barrier(parties: usize) -> Arc<Self> {
        Arc::new(Self {
            lookup_barrier: Some((Arc::new(Barrier::new(parties)), parties)),
            ..Self::default()
        })
    }

    pub(crate) fn insert(&self, spec: AccountSpec) {
        let account = Account::from_spec(spec);
        self.accounts
            .lock()
            .unwrap()
            .insert(account.id.clone(), account);
    }

    pub(crate) fn account(&self, id: &str) -> Option<Account> {
        self.accounts
            .lock()
            .unwrap()
            .values()
            .find(|a| a.id.as_str() == id)
            .cloned()
    }

    pub(crate) fn len(&self) -> usize {
        self.accounts.lock().unwrap().len()
    }

    pub(crate) fn fail_get(&self, err: AccountStoreError) {
        *self.fail_get.lock().unwrap() = Some(err);
    }

    pub(crate) fn fail_create(&self, err: AccountStoreError) {
        *self.fail_create.lock().unwrap() = Some(err);
    }

    pub(crate) fn fail_set_claims(&self, err: Option<AccountStoreError>) {
        *self.fail_set_claims.lock().unwrap() = err;
    }

    pub(crate) fn fail_mint(&self, err: AccountStoreError) {
        *self.fail_mint.lock().unwrap() = Some(err);
    }

    pub(crate) fn lose_next_create(&self) {
        self.lose_next_create.store(true, Ordering::SeqCst);
    }

    pub(crate) fn phantom_conflict(&self) {
        self.phantom_conflict.store(true, Ordering::SeqCst);
    }

    pub(crate) fn hang_set_claims(&self) {
        self.hang_set_claims.store(true, Ordering::SeqCst);
    }

    pub(crate) fn total_calls(&self) -> usize {
        self.gets.load(Ordering::SeqCst)
            + self.creates.load(Ordering::SeqCst)
            + self.claim_updates.load(Ordering::SeqCst)
            + self.mints.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AccountStore for ScriptedStore {
    async fn get_by_id(&self, id: &LocalAccountId) -> Result<Account, AccountStoreError> {
        let n = self.gets.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = self.fail_get.lock().unwrap().clone() {
            return Err(err);
        }
        let found = self.accounts.lock().unwrap().get(id).cloned();
        if let Some((barrier, parties)) = &self.lookup_barrier
            && n < *parties
        {
            barrier.wait().await;
        }
        found.ok_or_else(|| AccountStoreError::NotFound(id.clone()))
    }

    async fn create(&self, spec: AccountSpec) -> Result<Account, AccountStoreError> {
        self.creates.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = self.fail_create.lock().unwrap().clone() {
            return Err(err);
        }
        if self.phantom_conflict.swap(false, Ordering::SeqCst) {
            return Err(AccountStoreError::AlreadyExists(spec.id));
        }
        if self.lose_next_create.swap(false, Ordering::SeqCst) {
            let winner = AccountSpec::new(spec.id.clone()).display_name("Concurrent Winner");
            self.insert(winner);
            return Err(AccountStoreError::AlreadyExists(spec.id));
        }

        let mut accounts = self.accounts.lock().unwrap();
        if accounts.contains_key(&spec.id) {
            return Err(AccountStoreError::AlreadyExists(spec.id));
        }
        let account = Account::from_spec(spec);
        accounts.insert(account.id.clone(), account.clone());
        Ok(account)
    }

    async fn set_claims(
        &self,
        id: &LocalAccountId,
        claims: Claims,
    ) -> Result<(), AccountStoreError> {
        self.claim_updates.fetch_add(1, Ordering::SeqCst);
        if self.hang_set_claims.load(Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }
        if let Some(err) = self.fail_set_claims.lock().unwrap().clone() {
            return Err(err);
        }
        let mut accounts = self.accounts.lock().unwrap();
        let account = accounts
            .get_mut(id)
            .ok_or_else(|| AccountStoreError::NotFound(id.clone()))?;
        account.claims = claims;
        Ok(())
    }

    async fn mint_credential(&self, id: &LocalAccountId) -> Result<String, AccountStoreError> {
        self.mints.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = self.fail_mint.lock().unwrap().clone() {
            return Err(err);
        }
        Ok(format!("credential-for-{id}"))
    }
}
