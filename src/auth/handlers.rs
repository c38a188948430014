use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::instrument;

use crate::{
    auth::{
        dto::{AccountView, AuthResponse, EmailLoginRequest, RegisterRequest, UsernameLoginRequest},
        errors::AuthError,
        extractors::AuthUser,
    },
    state::AppState,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/accounts", post(register))
        .route("/accounts/login", post(login_email))
        .route("/accounts/login/username", post(login_username))
}

pub fn me_routes() -> Router<AppState> {
    Router::new().route("/accounts/me", get(get_me).delete(delete_me))
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<AuthResponse>), AuthError> {
    let res = state.accounts.register(payload).await?;
    Ok((StatusCode::CREATED, Json(res)))
}

#[instrument(skip(state, payload))]
pub async fn login_email(
    State(state): State<AppState>,
    Json(payload): Json<EmailLoginRequest>,
) -> Result<Json<AuthResponse>, AuthError> {
    let res = state
        .accounts
        .authenticate_by_email(&payload.email, payload.password)
        .await?;
    Ok(Json(res))
}

#[instrument(skip(state, payload))]
pub async fn login_username(
    State(state): State<AppState>,
    Json(payload): Json<UsernameLoginRequest>,
) -> Result<Json<AuthResponse>, AuthError> {
    let res = state
        .accounts
        .authenticate_by_username(&payload.username, payload.password)
        .await?;
    Ok(Json(res))
}

#[instrument(skip(state))]
pub async fn get_me(
    State(state): State<AppState>,
    AuthUser(account_id): AuthUser,
) -> Result<Json<AccountView>, AuthError> {
    Ok(Json(state.accounts.account(account_id).await?))
}

#[instrument(skip(state))]
pub async fn delete_me(
    State(state): State<AppState>,
    AuthUser(account_id): AuthUser,
) -> Result<StatusCode, AuthError> {
    state.accounts.delete(account_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
