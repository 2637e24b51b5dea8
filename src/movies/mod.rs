use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;

use crate::state::AppState;

mod dto;
pub mod handlers;
pub mod repo;
pub mod services;

pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/movies",
            post(handlers::create_movie).get(handlers::list_movies),
        )
        .route(
            "/movies/:id",
            get(handlers::get_movie)
                .put(handlers::update_movie)
                .delete(handlers::delete_movie),
        )
        .route(
            "/movies/upload",
            post(handlers::upload_image).layer(DefaultBodyLimit::max(20 * 1024 * 1024)),
        )
}
