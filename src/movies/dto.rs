use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Movie attribute set as sent by the client on create. The release date
/// arrives as a string (RFC 3339 or `YYYY-MM-DD`); any `movie_id` the client
/// sends is ignored, the server generates its own.
#[derive(Debug, Deserialize)]
pub struct MovieInput {
    pub movie_title: Option<String>,
    pub movie_sinopse: Option<String>,
    pub movie_popularity: Option<f64>,
    pub movie_date_lauch: Option<String>,
    pub movie_duration: Option<i32>,
    pub movie_situation: Option<String>,
    pub movie_language: Option<String>,
    pub movie_genre: Option<Vec<String>>,
    pub movie_budget: Option<f64>,
    pub movie_revenue: Option<f64>,
    pub movie_description: Option<String>,
    pub movie_image_url: Option<String>,
    pub movie_trailer_url: Option<String>,
    pub movie_porcentage_like: Option<f64>,
}

/// Listing query parameters. Everything arrives as strings and is parsed by
/// the use-case; three of the filters are mandatory.
#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub page: Option<String>,
    pub limit: Option<String>,
    pub movie_date_lauch_start: Option<String>,
    pub movie_date_lauch_end: Option<String>,
    pub movie_duration: Option<String>,
    pub movie_popularity: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CreatedMovieResponse {
    pub movie_id: Uuid,
    pub user_id: Uuid,
}

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub url: String,
}
