use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use super::{CredentialStore, StoreError, StoreResult};
use crate::auth::errors::Field;
use crate::auth::repo_types::{Account, NewAccount};

const EMAIL_CONSTRAINT: &str = "accounts_email_key";
const USERNAME_CONSTRAINT: &str = "accounts_username_key";

/// Postgres-backed store. Uniqueness comes from the `UNIQUE` constraints on
/// `accounts.email` and `accounts.username`.
#[derive(Clone)]
pub struct PgCredentialStore {
    pool: PgPool,
    timeout: Duration,
}

impl PgCredentialStore {
    pub fn new(pool: PgPool, timeout: Duration) -> Self {
        Self { pool, timeout }
    }

    async fn bounded<T, F>(&self, op: &'static str, fut: F) -> StoreResult<T>
    where
        F: Future<Output = Result<T, sqlx::Error>>,
    {
        match tokio::time::timeout(self.timeout, fut).await {
            Ok(res) => res.map_err(map_sqlx_error),
            Err(_) => Err(StoreError::Timeout(op)),
        }
    }
}

#[async_trait]
impl CredentialStore for PgCredentialStore {
    async fn find_by_email(&self, email: &str) -> StoreResult<Option<Account>> {
        self.bounded(
            "find_by_email",
            sqlx::query_as::<_, Account>(
                r#"
                SELECT id, email, username, password_hash, created_at
                FROM accounts
                WHERE email = $1
                "#,
            )
            .bind(email)
            .fetch_optional(&self.pool),
        )
        .await
    }

    async fn find_by_username(&self, username: &str) -> StoreResult<Option<Account>> {
        self.bounded(
            "find_by_username",
            sqlx::query_as::<_, Account>(
                r#"
                SELECT id, email, username, password_hash, created_at
                FROM accounts
                WHERE username = $1
                "#,
            )
            .bind(username)
            .fetch_optional(&self.pool),
        )
        .await
    }

    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<Account>> {
        self.bounded(
            "find_by_id",
            sqlx::query_as::<_, Account>(
                r#"
                SELECT id, email, username, password_hash, created_at
                FROM accounts
                WHERE id = $1
                "#,
            )
            .bind(id)
            .fetch_optional(&self.pool),
        )
        .await
    }

    async fn insert(&self, account: NewAccount) -> StoreResult<Account> {
        self.bounded(
            "insert",
            sqlx::query_as::<_, Account>(
                r#"
                INSERT INTO accounts (email, username, password_hash)
                VALUES ($1, $2, $3)
                RETURNING id, email, username, password_hash, created_at
                "#,
            )
            .bind(&account.email)
            .bind(&account.username)
            .bind(&account.password_hash)
            .fetch_one(&self.pool),
        )
        .await
    }

    async fn delete(&self, id: Uuid) -> StoreResult<()> {
        let result = self
            .bounded(
                "delete",
                sqlx::query(r#"DELETE FROM accounts WHERE id = $1"#)
                    .bind(id)
                    .execute(&self.pool),
            )
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }
}

fn map_sqlx_error(err: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.code().as_deref() == Some("23505") {
            if let Some(field) = db_err.constraint().and_then(field_for_constraint) {
                return StoreError::Duplicate(field);
            }
        }
    }
    StoreError::Unexpected(err.into())
}

fn field_for_constraint(name: &str) -> Option<Field> {
    match name {
        EMAIL_CONSTRAINT => Some(Field::Email),
        USERNAME_CONSTRAINT => Some(Field::Username),
        _ => None,
    }
}
