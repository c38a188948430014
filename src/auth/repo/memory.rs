//! In-memory credential store for tests and local runs. Not durable.
//!
//! The uniqueness check and the insert happen under the same write lock, which
//! gives the same all-or-nothing behavior as the Postgres unique constraints.
use std::collections::HashMap;

use async_trait::async_trait;
use time::OffsetDateTime;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{CredentialStore, StoreError, StoreResult};
use crate::auth::errors::Field;
use crate::auth::repo_types::{Account, NewAccount};

#[derive(Debug, Default)]
pub struct MemoryCredentialStore {
    accounts: RwLock<HashMap<Uuid, Account>>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.accounts.read().await.len()
    }
}

#[async_trait]
impl CredentialStore for MemoryCredentialStore {
    async fn find_by_email(&self, email: &str) -> StoreResult<Option<Account>> {
        let accounts = self.accounts.read().await;
        Ok(accounts.values().find(|a| a.email == email).cloned())
    }

    async fn find_by_username(&self, username: &str) -> StoreResult<Option<Account>> {
        let accounts = self.accounts.read().await;
        Ok(accounts.values().find(|a| a.username == username).cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<Account>> {
        Ok(self.accounts.read().await.get(&id).cloned())
    }

    async fn insert(&self, account: NewAccount) -> StoreResult<Account> {
        let mut accounts = self.accounts.write().await;
        if accounts.values().any(|a| a.email == account.email) {
            return Err(StoreError::Duplicate(Field::Email));
        }
        if accounts.values().any(|a| a.username == account.username) {
            return Err(StoreError::Duplicate(Field::Username));
        }
        let stored = Account {
            id: Uuid::new_v4(),
            email: account.email,
            username: account.username,
            password_hash: account.password_hash,
            created_at: OffsetDateTime::now_utc(),
        };
        accounts.insert(stored.id, stored.clone());
        Ok(stored)
    }

    async fn delete(&self, id: Uuid) -> StoreResult<()> {
        match self.accounts.write().await.remove(&id) {
            Some(_) => Ok(()),
            None => Err(StoreError::NotFound),
        }
    }
}
