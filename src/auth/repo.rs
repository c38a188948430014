//! Credential store abstraction.
//!
//! Uniqueness of email and username is the store's job: `insert` must reject a
//! conflicting row atomically and report which field collided. Any lookup the
//! service does beforehand is only a fast path.
use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::auth::errors::Field;
use crate::auth::repo_types::{Account, NewAccount};

pub mod memory;
pub mod postgres;

pub use memory::MemoryCredentialStore;
pub use postgres::PgCredentialStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{0} already in use")]
    Duplicate(Field),
    #[error("account not found")]
    NotFound,
    #[error("store operation `{0}` timed out")]
    Timeout(&'static str),
    #[error(transparent)]
    Unexpected(#[from] anyhow::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn find_by_email(&self, email: &str) -> StoreResult<Option<Account>>;
    /// `username` must already be lower case.
    async fn find_by_username(&self, username: &str) -> StoreResult<Option<Account>>;
    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<Account>>;
    async fn insert(&self, account: NewAccount) -> StoreResult<Account>;
    async fn delete(&self, id: Uuid) -> StoreResult<()>;
}
