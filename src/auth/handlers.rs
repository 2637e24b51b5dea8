use axum::{
    extract::{FromRef, State},
    http::StatusCode,
    Json,
};
use tracing::instrument;

use crate::auth::dto::{LoginRequest, RegisterRequest, TokenResponse};
use crate::auth::repo::{RegisteredUser, User, UserProfile};
use crate::auth::services::{self, AuthUser, JwtKeys};
use crate::error::AppError;
use crate::state::AppState;

fn present(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.is_empty())
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<RegisteredUser>), AppError> {
    let user_name = present(payload.user_name)
        .ok_or_else(|| AppError::Validation("Nome é obrigatório".into()))?;
    let user_email = present(payload.user_email)
        .ok_or_else(|| AppError::Validation("Email é obrigatório".into()))?;
    let user_password = present(payload.user_password)
        .ok_or_else(|| AppError::Validation("Senha é obrigatória".into()))?;

    let user = services::register(&state.db, &user_name, &user_email, &user_password).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<TokenResponse>, AppError> {
    let (Some(user_email), Some(user_password)) = (
        present(payload.user_email),
        present(payload.user_password),
    ) else {
        return Err(AppError::Validation(
            "Email e senha são obrigatórios".into(),
        ));
    };

    let keys = JwtKeys::from_ref(&state);
    let token = services::authenticate(&state.db, &keys, &user_email, &user_password).await?;
    Ok(Json(TokenResponse { token }))
}

#[instrument(skip(state))]
pub async fn get_me(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<UserProfile>, AppError> {
    let profile = User::get_profile(&state.db, user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Usuário não encontrado".into()))?;
    Ok(Json(profile))
}
