use axum::{
    routing::{get, post},
    Router,
};

use crate::state::AppState;

pub mod dto;
pub mod handlers;

/// Nested under /admin; every handler requires the admin role.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/users", get(handlers::list_users))
        .route("/approve/:id", post(handlers::approve_user))
        .route("/set-role/:id", post(handlers::set_role))
}
