use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

/// Account record in the database.
///
/// Deliberately not `Serialize`: the hash must never leave the service. Callers
/// receive [`AccountView`](crate::auth::dto::AccountView) instead.
#[derive(Debug, Clone, FromRow)]
pub struct Account {
    pub id: Uuid,                   // assigned by the store
    pub email: String,              // stored as given
    pub username: String,           // always lower case
    pub password_hash: String,      // Argon2 PHC string
    pub created_at: OffsetDateTime, // set at insert
}

/// Row to insert; the store assigns `id` and `created_at`.
#[derive(Debug, Clone)]
pub struct NewAccount {
    pub email: String,
    pub username: String,
    pub password_hash: String,
}
