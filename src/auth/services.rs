use std::sync::Arc;

use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use crate::auth::{
    dto::{AccountView, AuthResponse, RegisterRequest},
    errors::AuthError,
    jwt::TokenIssuer,
    password::PasswordHasher,
    repo::CredentialStore,
    repo_types::{Account, NewAccount},
    validation,
};

/// Registration, login and deletion on top of an injected credential store.
///
/// Holds no mutable state of its own; share it behind an `Arc`.
#[derive(Clone)]
pub struct AccountService {
    store: Arc<dyn CredentialStore>,
    hasher: PasswordHasher,
    tokens: TokenIssuer,
}

impl AccountService {
    pub fn new(
        store: Arc<dyn CredentialStore>,
        hasher: PasswordHasher,
        tokens: TokenIssuer,
    ) -> Self {
        Self {
            store,
            hasher,
            tokens,
        }
    }

    pub fn tokens(&self) -> &TokenIssuer {
        &self.tokens
    }

    #[instrument(skip(self, req), fields(email = %req.email, username = %req.username))]
    pub async fn register(&self, req: RegisterRequest) -> Result<AuthResponse, AuthError> {
        let username = validation::validate(self.store.as_ref(), &req).await?;
        let RegisterRequest {
            email, password, ..
        } = req;

        let password_hash = self.hash(password).await?;

        // The insert is the authoritative uniqueness check; a Duplicate here
        // means a concurrent registration won the race.
        let account = self
            .store
            .insert(NewAccount {
                email,
                username,
                password_hash,
            })
            .await
            .map_err(|e| {
                let err = AuthError::from(e);
                if let AuthError::Duplicate { field } = &err {
                    debug!(%field, "lost registration race");
                }
                err
            })?;

        let token = self.tokens.issue(account.id)?;
        info!(account_id = %account.id, "account registered");
        Ok(AuthResponse {
            account: account.into(),
            token,
        })
    }

    #[instrument(skip(self, password))]
    pub async fn authenticate_by_email(
        &self,
        email: &str,
        password: String,
    ) -> Result<AuthResponse, AuthError> {
        let account = self.store.find_by_email(email).await?;
        self.login(account, password).await
    }

    #[instrument(skip(self, password))]
    pub async fn authenticate_by_username(
        &self,
        username: &str,
        password: String,
    ) -> Result<AuthResponse, AuthError> {
        let account = self.store.find_by_username(&username.to_lowercase()).await?;
        self.login(account, password).await
    }

    /// Identity resolution for an already-authenticated caller.
    #[instrument(skip(self))]
    pub async fn account(&self, account_id: Uuid) -> Result<AccountView, AuthError> {
        self.store
            .find_by_id(account_id)
            .await?
            .map(AccountView::from)
            .ok_or(AuthError::NotFound)
    }

    /// `account_id` must come from a verified token subject.
    #[instrument(skip(self))]
    pub async fn delete(&self, account_id: Uuid) -> Result<(), AuthError> {
        let account = self
            .store
            .find_by_id(account_id)
            .await?
            .ok_or(AuthError::NotFound)?;
        self.store.delete(account.id).await?;
        info!(account_id = %account.id, "account deleted");
        Ok(())
    }

    async fn login(
        &self,
        account: Option<Account>,
        password: String,
    ) -> Result<AuthResponse, AuthError> {
        let Some(account) = account else {
            debug!("login for unknown account");
            return Err(AuthError::NotFound);
        };

        if !self.verify(account.password_hash.clone(), password).await? {
            warn!(account_id = %account.id, "login invalid password");
            return Err(AuthError::Authentication);
        }

        let token = self.tokens.issue(account.id)?;
        info!(account_id = %account.id, "account logged in");
        Ok(AuthResponse {
            account: account.into(),
            token,
        })
    }

    async fn hash(&self, password: String) -> Result<String, AuthError> {
        let hasher = self.hasher.clone();
        tokio::task::spawn_blocking(move || hasher.hash(&password))
            .await
            .map_err(|e| {
                error!(error = %e, "hash task failed");
                AuthError::Hashing(e.to_string())
            })?
    }

    async fn verify(&self, hash: String, password: String) -> Result<bool, AuthError> {
        let hasher = self.hasher.clone();
        tokio::task::spawn_blocking(move || hasher.verify(&hash, &password))
            .await
            .map_err(|e| {
                error!(error = %e, "verify task failed");
                AuthError::Hashing(e.to_string())
            })?
    }
}
