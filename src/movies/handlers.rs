use axum::{
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    Json,
};
use bytes::Bytes;
use time::OffsetDateTime;
use tracing::{error, instrument};
use uuid::Uuid;

use crate::auth::services::AuthUser;
use crate::error::AppError;
use crate::movies::dto::{CreatedMovieResponse, ListQuery, MovieInput, UploadResponse};
use crate::movies::repo::{JsonMap, Movie, MovieListPage};
use crate::movies::services;
use crate::state::AppState;

#[instrument(skip(state, input))]
pub async fn create_movie(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(input): Json<MovieInput>,
) -> Result<(StatusCode, Json<CreatedMovieResponse>), AppError> {
    let saved = services::create_movie(&state, user_id, input).await?;
    Ok((
        StatusCode::CREATED,
        Json(CreatedMovieResponse {
            movie_id: saved.movie.movie_id,
            user_id: saved.movie.user_id,
        }),
    ))
}

#[instrument(skip(state))]
pub async fn get_movie(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Movie>, AppError> {
    let movie = services::get_movie(&state.db, id, user_id).await?;
    Ok(Json(movie))
}

#[instrument(skip(state))]
pub async fn list_movies(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Query(q): Query<ListQuery>,
) -> Result<Json<MovieListPage>, AppError> {
    let page = services::list_movies(&state.db, user_id, q).await?;
    Ok(Json(page))
}

#[instrument(skip(state, updates))]
pub async fn update_movie(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
    Json(updates): Json<JsonMap>,
) -> Result<Json<Movie>, AppError> {
    let movie = services::update_movie(&state.db, &updates, id, user_id).await?;
    Ok(Json(movie))
}

#[instrument(skip(state))]
pub async fn delete_movie(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    services::delete_movie(&state.db, id, user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub(crate) fn upload_key(file_name: &str, millis: i64) -> String {
    format!("{millis}_{file_name}")
}

/// POST /movies/upload, multipart field `image`. The upload is not
/// transactional with any movie write; nothing cleans up orphaned objects.
#[instrument(skip(state, multipart))]
pub async fn upload_image(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, AppError> {
    let mut file: Option<(String, String, Bytes)> = None;
    while let Ok(Some(field)) = multipart.next_field().await {
        if field.name() == Some("image") {
            let file_name = field.file_name().unwrap_or("upload").to_string();
            let content_type = field
                .content_type()
                .unwrap_or("application/octet-stream")
                .to_string();
            let data = field
                .bytes()
                .await
                .map_err(|e| AppError::Internal(e.to_string()))?;
            file = Some((file_name, content_type, data));
        }
    }

    let Some((file_name, content_type, data)) = file else {
        return Err(AppError::Validation("Arquivo não enviado".into()));
    };

    let millis = (OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000) as i64;
    let key = upload_key(&file_name, millis);

    if let Err(e) = state.storage.put_object(&key, data, &content_type).await {
        error!(error = %e, key = %key, user_id = %user_id, "s3 upload failed");
        return Err(AppError::Internal("Erro ao enviar arquivo".into()));
    }

    Ok(Json(UploadResponse {
        url: state.storage.public_url(&key),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upload_key_is_timestamp_prefixed_original_name() {
        assert_eq!(upload_key("poster.png", 1717243800000), "1717243800000_poster.png");
    }

    #[test]
    fn list_page_serializes_total_pages_camel_case() {
        let page = MovieListPage {
            page: 1,
            limit: 10,
            total: 25,
            total_pages: 3,
            data: vec![],
        };
        let json = serde_json::to_string(&page).unwrap();
        assert!(json.contains("\"totalPages\":3"));
        assert!(json.contains("\"data\":[]"));
    }
}
