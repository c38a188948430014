use crate::state::AppState;
use axum::Router;

mod claims;
pub mod dto;
pub mod errors;
pub(crate) mod extractors;
pub mod handlers;
pub mod jwt;
pub mod password;
pub mod repo;
pub mod repo_types;
pub mod services;
pub mod validation;

pub use errors::{AuthError, Field};
pub use services::AccountService;

pub fn router() -> Router<AppState> {
    Router::new()
        .merge(handlers::auth_routes())
        .merge(handlers::me_routes())
}
