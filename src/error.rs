use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

/// Application-level error taxonomy. Variants carry the user-facing message;
/// this is the only place error kinds are mapped to HTTP status codes.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Missing or invalid required input.
    #[error("{0}")]
    Validation(String),

    /// Login failure. One indistinguishable message for unknown email and
    /// wrong password, so callers cannot enumerate accounts.
    #[error("Credenciais inválidas")]
    InvalidCredentials,

    /// Missing or invalid bearer token.
    #[error("{0}")]
    Unauthorized(String),

    /// Entity absent, or owned by a different user (the two are
    /// indistinguishable at the query level).
    #[error("{0}")]
    NotFound(String),

    /// Duplicate email. Mapped to 400, matching observed behavior.
    #[error("{0}")]
    Conflict(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("{0}")]
    Internal(String),
}

pub type AppResult<T> = Result<T, AppError>;

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::InvalidCredentials => {
                (StatusCode::UNAUTHORIZED, self.to_string())
            }
            AppError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg.clone()),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            AppError::Conflict(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::Database(err) => classify_sqlx_error(err),
            AppError::Internal(msg) => {
                tracing::error!(error = %msg, "internal error");
                (StatusCode::INTERNAL_SERVER_ERROR, "Erro interno".to_string())
            }
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}

/// Unique-violation (23505) on the user email constraint is a duplicate
/// registration; everything else is an opaque 500.
fn classify_sqlx_error(err: &sqlx::Error) -> (StatusCode, String) {
    if let sqlx::Error::Database(db_err) = err {
        if db_err.code().as_deref() == Some("23505")
            && db_err
                .constraint()
                .map(|c| c.contains("user_email"))
                .unwrap_or(false)
        {
            return (StatusCode::BAD_REQUEST, "Email já cadastrado".to_string());
        }
    }
    tracing::error!(error = %err, "database error");
    (StatusCode::INTERNAL_SERVER_ERROR, "Erro interno".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status_of(err: AppError) -> StatusCode {
        err.into_response().status()
    }

    #[test]
    fn validation_maps_to_400() {
        assert_eq!(
            status_of(AppError::Validation("campo faltando".into())),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn invalid_credentials_maps_to_401() {
        assert_eq!(
            status_of(AppError::InvalidCredentials),
            StatusCode::UNAUTHORIZED
        );
    }

    #[test]
    fn unauthorized_maps_to_401() {
        assert_eq!(
            status_of(AppError::Unauthorized("Token ausente".into())),
            StatusCode::UNAUTHORIZED
        );
    }

    #[test]
    fn not_found_maps_to_404() {
        assert_eq!(
            status_of(AppError::NotFound("Filme não encontrado".into())),
            StatusCode::NOT_FOUND
        );
    }

    #[test]
    fn conflict_maps_to_400_not_409() {
        assert_eq!(
            status_of(AppError::Conflict("Email já cadastrado".into())),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn internal_maps_to_500_with_opaque_body() {
        assert_eq!(
            status_of(AppError::Internal("pool exploded".into())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn generic_database_error_maps_to_500() {
        assert_eq!(
            status_of(AppError::Database(sqlx::Error::RowNotFound)),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
