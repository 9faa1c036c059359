use axum::{
    routing::{get, post},
    Router,
};

use crate::state::AppState;

pub mod dto;
pub mod handlers;
pub mod repo;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::index).post(handlers::compose))
        .route("/index", get(handlers::index).post(handlers::compose))
        .route("/explore", get(handlers::explore))
        .route("/posts/:id", get(handlers::show))
        .route(
            "/posts/edit/:id",
            get(handlers::edit_page).post(handlers::edit),
        )
        .route("/posts/delete/:id", get(handlers::delete))
        .route("/search", post(handlers::search))
}
