use std::fmt;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;
use tracing::error;

use crate::auth::repo::StoreError;

/// Account field named by validation and uniqueness failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Field {
    Email,
    Username,
    Password,
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Field::Email => "email",
            Field::Username => "username",
            Field::Password => "password",
        })
    }
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("invalid {field}: {reason}")]
    Validation { field: Field, reason: &'static str },
    #[error("{field} already in use")]
    Duplicate { field: Field },
    #[error("account not found")]
    NotFound,
    #[error("invalid login credentials")]
    Authentication,
    #[error("invalid or expired token")]
    Token(#[source] jsonwebtoken::errors::Error),
    #[error("store unavailable: {0}")]
    Store(#[source] StoreError),
    #[error("token signing unavailable: {0}")]
    Signing(String),
    #[error("password hashing failed: {0}")]
    Hashing(String),
}

impl AuthError {
    /// Only transient backend failures are worth retrying.
    pub fn is_retriable(&self) -> bool {
        matches!(self, AuthError::Store(_))
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AuthError::Validation { .. } => StatusCode::BAD_REQUEST,
            AuthError::Duplicate { .. } => StatusCode::CONFLICT,
            AuthError::NotFound => StatusCode::NOT_FOUND,
            AuthError::Authentication | AuthError::Token(_) => StatusCode::UNAUTHORIZED,
            AuthError::Store(_) => StatusCode::SERVICE_UNAVAILABLE,
            AuthError::Signing(_) | AuthError::Hashing(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<StoreError> for AuthError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Duplicate(field) => AuthError::Duplicate { field },
            StoreError::NotFound => AuthError::NotFound,
            other => AuthError::Store(other),
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            AuthError::Store(_) => {
                error!(error = %self, "store failure");
                "Connection error, try again".to_string()
            }
            AuthError::Signing(_) | AuthError::Hashing(_) => {
                error!(error = %self, "internal auth failure");
                "Internal server error".to_string()
            }
            _ => self.to_string(),
        };
        (status, message).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_errors_translate_to_domain_errors() {
        assert!(matches!(
            AuthError::from(StoreError::Duplicate(Field::Username)),
            AuthError::Duplicate { field: Field::Username }
        ));
        assert!(matches!(AuthError::from(StoreError::NotFound), AuthError::NotFound));

        let timeout = AuthError::from(StoreError::Timeout("insert"));
        assert!(matches!(timeout, AuthError::Store(_)));
        assert!(timeout.is_retriable());
    }

    #[test]
    fn status_codes() {
        let validation = AuthError::Validation {
            field: Field::Email,
            reason: "missing @",
        };
        assert_eq!(validation.status(), StatusCode::BAD_REQUEST);
        assert_eq!(validation.to_string(), "invalid email: missing @");
        assert_eq!(
            AuthError::Duplicate { field: Field::Email }.status(),
            StatusCode::CONFLICT
        );
        assert_eq!(AuthError::NotFound.status(), StatusCode::NOT_FOUND);
        assert_eq!(AuthError::Authentication.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            AuthError::Signing("no secret".into()).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert!(!AuthError::Signing("no secret".into()).is_retriable());
    }

    #[test]
    fn store_failure_response_hides_details() {
        let err = AuthError::Store(StoreError::Unexpected(anyhow::anyhow!("pg: secret dsn")));
        let res = err.into_response();
        assert_eq!(res.status(), StatusCode::SERVICE_UNAVAILABLE);
    }
}
