use tracing::debug;

use crate::auth::{
    dto::RegisterRequest,
    errors::{AuthError, Field},
    repo::CredentialStore,
};

const USERNAME_LEN: std::ops::RangeInclusive<usize> = 5..=60;
const PASSWORD_LEN: std::ops::RangeInclusive<usize> = 8..=60;

/// Format checks only; no store access. Returns the lower-cased username.
///
/// Lengths are measured in bytes of the UTF-8 encoding.
pub fn check_format(req: &RegisterRequest) -> Result<String, AuthError> {
    if !req.email.contains('@') {
        return Err(AuthError::Validation {
            field: Field::Email,
            reason: "missing or malformed email",
        });
    }
    if !USERNAME_LEN.contains(&req.username.len()) {
        return Err(AuthError::Validation {
            field: Field::Username,
            reason: "length must be between 5 and 60 bytes",
        });
    }
    if !PASSWORD_LEN.contains(&req.password.len()) {
        return Err(AuthError::Validation {
            field: Field::Password,
            reason: "length must be between 8 and 60 bytes",
        });
    }
    Ok(req.username.to_lowercase())
}

/// Full registration check: format, then email and username availability.
///
/// Availability here is advisory. Two racing registrations can both pass, and
/// the store's insert decides which one wins.
pub async fn validate(
    store: &dyn CredentialStore,
    req: &RegisterRequest,
) -> Result<String, AuthError> {
    let username = check_format(req)?;

    if store.find_by_email(&req.email).await.map_err(AuthError::Store)?.is_some() {
        debug!(email = %req.email, "email already in use");
        return Err(AuthError::Duplicate { field: Field::Email });
    }
    if store.find_by_username(&username).await.map_err(AuthError::Store)?.is_some() {
        debug!(username = %username, "username already in use");
        return Err(AuthError::Duplicate {
            field: Field::Username,
        });
    }
    Ok(username)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::repo::{MemoryCredentialStore, StoreError, StoreResult};
    use crate::auth::repo_types::{Account, NewAccount};
    use async_trait::async_trait;
    use uuid::Uuid;

    fn req(email: &str, username: &str, password: &str) -> RegisterRequest {
        RegisterRequest {
            email: email.into(),
            username: username.into(),
            password: password.into(),
        }
    }

    fn field_of(err: AuthError) -> Field {
        match err {
            AuthError::Validation { field, .. } => field,
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn format_failures_name_the_field() {
        let bad_email = check_format(&req("bad-email", "validuser", "longenough1")).unwrap_err();
        assert_eq!(field_of(bad_email), Field::Email);

        let short_name = check_format(&req("a@b.com", "usr", "longenough1")).unwrap_err();
        assert_eq!(field_of(short_name), Field::Username);

        let long_name = "x".repeat(61);
        let err = check_format(&req("a@b.com", &long_name, "longenough1")).unwrap_err();
        assert_eq!(field_of(err), Field::Username);

        let short_pw = check_format(&req("a@b.com", "validuser", "short")).unwrap_err();
        assert_eq!(field_of(short_pw), Field::Password);

        let long_pw = "p".repeat(61);
        let err = check_format(&req("a@b.com", "validuser", &long_pw)).unwrap_err();
        assert_eq!(field_of(err), Field::Password);
    }

    #[test]
    fn checks_run_in_order() {
        // Everything is wrong; email is reported first.
        let err = check_format(&req("nope", "usr", "short")).unwrap_err();
        assert_eq!(field_of(err), Field::Email);
        let err = check_format(&req("a@b.com", "usr", "short")).unwrap_err();
        assert_eq!(field_of(err), Field::Username);
    }

    #[test]
    fn bounds_are_inclusive_and_username_is_lowered_after_check() {
        assert_eq!(
            check_format(&req("a@b.com", "AbCdE", "12345678")).unwrap(),
            "abcde"
        );
        let max_name = "N".repeat(60);
        let max_pw = "p".repeat(60);
        assert_eq!(
            check_format(&req("a@b.com", &max_name, &max_pw)).unwrap(),
            "n".repeat(60)
        );
    }

    #[test]
    fn multibyte_lengths_count_bytes() {
        // "é" is two bytes in UTF-8.
        let err = check_format(&req("a@b.com", "éé", "longenough1")).unwrap_err();
        assert_eq!(field_of(err), Field::Username);
        assert_eq!(
            check_format(&req("a@b.com", "ééa", "longenough1")).unwrap(),
            "ééa"
        );
        assert_eq!(
            check_format(&req("a@b.com", "ÉÉÉÉ", "longenough1")).unwrap(),
            "éééé"
        );

        let max_name = "é".repeat(30);
        assert!(check_format(&req("a@b.com", &max_name, "longenough1")).is_ok());
        let over_name = format!("{max_name}a");
        let err = check_format(&req("a@b.com", &over_name, "longenough1")).unwrap_err();
        assert_eq!(field_of(err), Field::Username);

        let err = check_format(&req("a@b.com", "validuser", "ééé")).unwrap_err();
        assert_eq!(field_of(err), Field::Password);
        assert!(check_format(&req("a@b.com", "validuser", "éééé")).is_ok());
        assert!(check_format(&req("a@b.com", "validuser", &"é".repeat(30))).is_ok());
        let err = check_format(&req("a@b.com", "validuser", &"é".repeat(40))).unwrap_err();
        assert_eq!(field_of(err), Field::Password);
        let over_pw = format!("{}a", "é".repeat(30));
        let err = check_format(&req("a@b.com", "validuser", &over_pw)).unwrap_err();
        assert_eq!(field_of(err), Field::Password);
    }

    #[tokio::test]
    async fn duplicates_are_reported_per_field() {
        let store = MemoryCredentialStore::new();
        store
            .insert(NewAccount {
                email: "a@b.com".into(),
                username: "alice".into(),
                password_hash: "h".into(),
            })
            .await
            .unwrap();

        let err = validate(&store, &req("a@b.com", "someone", "longenough1"))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::Duplicate { field: Field::Email }));

        let err = validate(&store, &req("c@d.com", "ALICE", "longenough1"))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::Duplicate { field: Field::Username }));

        // Email comparison is exact.
        let ok = validate(&store, &req("A@B.com", "bobby", "longenough1")).await;
        assert_eq!(ok.unwrap(), "bobby");
    }

    struct DownStore;

    #[async_trait]
    impl CredentialStore for DownStore {
        async fn find_by_email(&self, _email: &str) -> StoreResult<Option<Account>> {
            Err(StoreError::Timeout("find_by_email"))
        }
        async fn find_by_username(&self, _username: &str) -> StoreResult<Option<Account>> {
            Err(StoreError::Timeout("find_by_username"))
        }
        async fn find_by_id(&self, _id: Uuid) -> StoreResult<Option<Account>> {
            Err(StoreError::Timeout("find_by_id"))
        }
        async fn insert(&self, _account: NewAccount) -> StoreResult<Account> {
            Err(StoreError::Timeout("insert"))
        }
        async fn delete(&self, _id: Uuid) -> StoreResult<()> {
            Err(StoreError::Timeout("delete"))
        }
    }

    #[tokio::test]
    async fn store_failure_is_not_a_duplicate() {
        let err = validate(&DownStore, &req("a@b.com", "validuser", "longenough1"))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::Store(StoreError::Timeout(_))));
    }
}
