use axum::routing::{get, post};
use axum::Router;

use crate::state::AppState;

mod dto;
pub mod handlers;
pub mod repo;
pub mod services;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/users", post(handlers::register))
        .route("/login", post(handlers::login))
        .route("/me", get(handlers::get_me))
}
