use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

/// User record in the database.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub user_id: Uuid,
    pub user_email: String,
    pub user_name: String,
    #[serde(skip_serializing)]
    pub user_password: String, // argon2 hash, never exposed in JSON
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// Projection returned on registration.
#[derive(Debug, Serialize, FromRow)]
pub struct RegisteredUser {
    pub user_id: Uuid,
    pub user_name: String,
    pub user_email: String,
}

/// Public profile, without the password hash.
#[derive(Debug, Serialize, FromRow)]
pub struct UserProfile {
    pub user_id: Uuid,
    pub user_name: String,
    pub user_email: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl User {
    /// Find a user by email.
    pub async fn find_by_email(db: &PgPool, user_email: &str) -> Result<Option<User>, sqlx::Error> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT user_id, user_email, user_name, user_password, created_at
            FROM cubosmovie.user
            WHERE user_email = $1
            "#,
        )
        .bind(user_email)
        .fetch_optional(db)
        .await?;
        Ok(user)
    }

    /// Create a new user with an already-hashed password.
    pub async fn create(
        db: &PgPool,
        user_id: Uuid,
        user_email: &str,
        user_password: &str,
        user_name: &str,
    ) -> Result<RegisteredUser, sqlx::Error> {
        let user = sqlx::query_as::<_, RegisteredUser>(
            r#"
            INSERT INTO cubosmovie.user (user_id, user_email, user_password, user_name)
            VALUES ($1, $2, $3, $4)
            RETURNING user_id, user_name, user_email
            "#,
        )
        .bind(user_id)
        .bind(user_email)
        .bind(user_password)
        .bind(user_name)
        .fetch_one(db)
        .await?;
        Ok(user)
    }

    /// Public profile by id, or `None` if the user does not exist.
    pub async fn get_profile(db: &PgPool, user_id: Uuid) -> Result<Option<UserProfile>, sqlx::Error> {
        let profile = sqlx::query_as::<_, UserProfile>(
            r#"
            SELECT user_id, user_name, user_email, created_at
            FROM cubosmovie.user
            WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(db)
        .await?;
        Ok(profile)
    }
}
