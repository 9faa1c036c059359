use axum::{routing::get, Router};

use crate::state::AppState;

pub mod dto;
pub mod handlers;
pub mod repo;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/user/:username", get(handlers::profile))
        .route(
            "/edit_profile",
            get(handlers::edit_profile_page).post(handlers::edit_profile),
        )
}
