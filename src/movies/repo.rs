use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::error::AppError;
use crate::movies::services::parse_launch_date;

pub type JsonMap = serde_json::Map<String, Value>;

/// Movie row. All descriptive attributes are nullable at the column level;
/// `movie_date_lauch` and `movie_duration` are enforced at creation.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Movie {
    pub movie_id: Uuid,
    pub user_id: Uuid,
    pub movie_title: Option<String>,
    pub movie_sinopse: Option<String>,
    pub movie_popularity: Option<f64>,
    #[serde(with = "time::serde::rfc3339::option")]
    pub movie_date_lauch: Option<OffsetDateTime>,
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

/// Attribute set ready for insertion, after use-case validation.
#[derive(Debug, Clone)]
pub struct NewMovie {
    pub movie_title: Option<String>,
    pub movie_sinopse: Option<String>,
    pub movie_popularity: Option<f64>,
    pub movie_date_lauch: OffsetDateTime,
    pub movie_duration: i32,
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

/// Saved movie merged with the owner's contact data, so the release reminder
/// can be addressed without a second query.
#[derive(Debug, Serialize)]
pub struct MovieWithOwner {
    #[serde(flatten)]
    pub movie: Movie,
    pub user_email: String,
    pub user_name: String,
}

/// One page of a filtered listing.
#[derive(Debug, Serialize)]
pub struct MovieListPage {
    pub page: i64,
    pub limit: i64,
    pub total: i64,
    #[serde(rename = "totalPages")]
    pub total_pages: i64,
    pub data: Vec<Movie>,
}

/// Parsed listing filters. Duration and popularity are exact-match equality,
/// not ranges; the date bounds are inclusive on both ends.
#[derive(Debug, Clone)]
pub struct MovieFilters {
    pub date_lauch_start: OffsetDateTime,
    pub date_lauch_end: OffsetDateTime,
    pub duration: i32,
    pub popularity: Option<f64>,
}

/// Fields a partial update may touch. Ids and ownership are never mutable.
pub const ALLOWED_UPDATE_FIELDS: [&str; 14] = [
    "movie_title",
    "movie_sinopse",
    "movie_popularity",
    "movie_date_lauch",
    "movie_duration",
    "movie_situation",
    "movie_language",
    "movie_genre",
    "movie_budget",
    "movie_revenue",
    "movie_description",
    "movie_image_url",
    "movie_trailer_url",
    "movie_porcentage_like",
];

#[derive(FromRow)]
struct Owner {
    user_email: String,
    user_name: String,
}

/// Insert a new movie owned by `user_id`. The id is generated here; the
/// owner must exist or nothing is written.
pub async fn save(
    db: &PgPool,
    input: NewMovie,
    user_id: Uuid,
) -> Result<MovieWithOwner, AppError> {
    let owner = sqlx::query_as::<_, Owner>(
        r#"
        SELECT user_email, user_name
        FROM cubosmovie.user
        WHERE user_id = $1
        "#,
    )
    .bind(user_id)
    .fetch_optional(db)
    .await?;

    let Some(owner) = owner else {
        return Err(AppError::NotFound("Usuário não encontrado".into()));
    };

    let movie_id = Uuid::new_v4();
    let movie = sqlx::query_as::<_, Movie>(
        r#"
        INSERT INTO cubosmovie.movie (
            movie_id, user_id, movie_title, movie_sinopse, movie_popularity,
            movie_date_lauch, movie_duration, movie_situation, movie_language,
            movie_genre, movie_budget, movie_revenue, movie_description,
            movie_image_url, movie_trailer_url, movie_porcentage_like
        )
        VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11,$12,$13,$14,$15,$16)
        RETURNING *
        "#,
    )
    .bind(movie_id)
    .bind(user_id)
    .bind(input.movie_title)
    .bind(input.movie_sinopse)
    .bind(input.movie_popularity)
    .bind(input.movie_date_lauch)
    .bind(input.movie_duration)
    .bind(input.movie_situation)
    .bind(input.movie_language)
    .bind(input.movie_genre)
    .bind(input.movie_budget)
    .bind(input.movie_revenue)
    .bind(input.movie_description)
    .bind(input.movie_image_url)
    .bind(input.movie_trailer_url)
    .bind(input.movie_porcentage_like)
    .fetch_one(db)
    .await?;

    Ok(MovieWithOwner {
        movie,
        user_email: owner.user_email,
        user_name: owner.user_name,
    })
}

/// Single movie by id and owner. A movie belonging to another user is
/// indistinguishable from a nonexistent one.
pub async fn get_one(
    db: &PgPool,
    movie_id: Uuid,
    user_id: Uuid,
) -> Result<Option<Movie>, AppError> {
    let movie = sqlx::query_as::<_, Movie>(
        r#"
        SELECT *
        FROM cubosmovie.movie
        WHERE movie_id = $1 AND user_id = $2
        "#,
    )
    .bind(movie_id)
    .bind(user_id)
    .fetch_optional(db)
    .await?;
    Ok(movie)
}

/// Conjunctive owner-scoped predicate shared by the page and count queries.
fn push_filters(qb: &mut QueryBuilder<'_, Postgres>, user_id: Uuid, f: &MovieFilters) {
    qb.push("user_id = ");
    qb.push_bind(user_id);
    qb.push(" AND movie_date_lauch BETWEEN ");
    qb.push_bind(f.date_lauch_start);
    qb.push(" AND ");
    qb.push_bind(f.date_lauch_end);
    qb.push(" AND movie_duration = ");
    qb.push_bind(f.duration);
    if let Some(popularity) = f.popularity {
        qb.push(" AND movie_popularity = ");
        qb.push_bind(popularity);
    }
}

fn page_query<'a>(
    user_id: Uuid,
    f: &MovieFilters,
    limit: i64,
    offset: i64,
) -> QueryBuilder<'a, Postgres> {
    let mut qb = QueryBuilder::new("SELECT * FROM cubosmovie.movie WHERE ");
    push_filters(&mut qb, user_id, f);
    qb.push(" LIMIT ");
    qb.push_bind(limit);
    qb.push(" OFFSET ");
    qb.push_bind(offset);
    qb
}

fn count_query<'a>(user_id: Uuid, f: &MovieFilters) -> QueryBuilder<'a, Postgres> {
    let mut qb = QueryBuilder::new("SELECT COUNT(*) FROM cubosmovie.movie WHERE ");
    push_filters(&mut qb, user_id, f);
    qb
}

pub(crate) fn total_pages(total: i64, limit: i64) -> i64 {
    if limit <= 0 {
        return 0;
    }
    (total + limit - 1) / limit
}

/// Filtered, paginated listing. `total` counts every matching row under the
/// identical predicate, irrespective of pagination.
pub async fn list(
    db: &PgPool,
    user_id: Uuid,
    f: &MovieFilters,
    page: i64,
    limit: i64,
) -> Result<MovieListPage, AppError> {
    let offset = (page - 1) * limit;

    let mut qb = page_query(user_id, f, limit, offset);
    let data: Vec<Movie> = qb.build_query_as::<Movie>().fetch_all(db).await?;

    let mut count_qb = count_query(user_id, f);
    let total: i64 = count_qb.build_query_scalar().fetch_one(db).await?;

    Ok(MovieListPage {
        page,
        limit,
        total,
        total_pages: total_pages(total, limit),
        data,
    })
}

/// Delete by id and owner; the caller decides what zero rows means.
pub async fn delete(db: &PgPool, movie_id: Uuid, user_id: Uuid) -> Result<u64, AppError> {
    let result = sqlx::query(
        r#"
        DELETE FROM cubosmovie.movie
        WHERE movie_id = $1 AND user_id = $2
        "#,
    )
    .bind(movie_id)
    .bind(user_id)
    .execute(db)
    .await?;
    Ok(result.rows_affected())
}

/// Keys of `updates` intersected with the allow-list, in allow-list order.
/// Anything else is silently dropped.
pub fn allowed_updates<'m>(updates: &'m JsonMap) -> Vec<(&'static str, &'m Value)> {
    ALLOWED_UPDATE_FIELDS
        .iter()
        .filter_map(|field| updates.get(*field).map(|value| (*field, value)))
        .collect()
}

fn decode_field<T: DeserializeOwned>(field: &str, value: &Value) -> Result<Option<T>, AppError> {
    serde_json::from_value::<Option<T>>(value.clone())
        .map_err(|_| AppError::Validation(format!("Valor inválido para {field}")))
}

fn update_query<'a>(
    updates: &JsonMap,
    movie_id: Uuid,
    user_id: Uuid,
) -> Result<QueryBuilder<'a, Postgres>, AppError> {
    let fields = allowed_updates(updates);
    if fields.is_empty() {
        return Err(AppError::Validation(
            "Nenhum campo válido para atualizar".into(),
        ));
    }

    let mut qb = QueryBuilder::new("UPDATE cubosmovie.movie SET ");
    {
        let mut sep = qb.separated(", ");
        for (field, value) in fields {
            sep.push(field);
            sep.push_unseparated(" = ");
            match field {
                "movie_duration" => {
                    sep.push_bind_unseparated(decode_field::<i32>(field, value)?);
                }
                "movie_popularity" | "movie_budget" | "movie_revenue"
                | "movie_porcentage_like" => {
                    sep.push_bind_unseparated(decode_field::<f64>(field, value)?);
                }
                "movie_genre" => {
                    sep.push_bind_unseparated(decode_field::<Vec<String>>(field, value)?);
                }
                "movie_date_lauch" => {
                    let parsed = match value {
                        Value::Null => None,
                        Value::String(raw) => Some(parse_launch_date(raw)?),
                        _ => {
                            return Err(AppError::Validation(format!(
                                "Valor inválido para {field}"
                            )))
                        }
                    };
                    sep.push_bind_unseparated(parsed);
                }
                _ => {
                    sep.push_bind_unseparated(decode_field::<String>(field, value)?);
                }
            }
        }
    }
    qb.push(" WHERE movie_id = ");
    qb.push_bind(movie_id);
    qb.push(" AND user_id = ");
    qb.push_bind(user_id);
    qb.push(" RETURNING *");
    Ok(qb)
}

/// Allow-listed partial update. `None` means id+owner matched no row.
pub async fn update(
    db: &PgPool,
    updates: &JsonMap,
    movie_id: Uuid,
    user_id: Uuid,
) -> Result<Option<Movie>, AppError> {
    let mut qb = update_query(updates, movie_id, user_id)?;
    let movie = qb.build_query_as::<Movie>().fetch_optional(db).await?;
    Ok(movie)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use time::macros::datetime;

    fn filters(popularity: Option<f64>) -> MovieFilters {
        MovieFilters {
            date_lauch_start: datetime!(2020-01-01 0:00 UTC),
            date_lauch_end: datetime!(2025-12-31 0:00 UTC),
            duration: 142,
            popularity,
        }
    }

    #[test]
    fn page_query_binds_filters_and_pagination() {
        let sql = page_query(Uuid::new_v4(), &filters(Some(8.7)), 10, 0).into_sql();
        assert_eq!(
            sql,
            "SELECT * FROM cubosmovie.movie WHERE user_id = $1 \
             AND movie_date_lauch BETWEEN $2 AND $3 \
             AND movie_duration = $4 AND movie_popularity = $5 \
             LIMIT $6 OFFSET $7"
        );
    }

    #[test]
    fn popularity_is_optional_in_predicate() {
        let sql = page_query(Uuid::new_v4(), &filters(None), 10, 0).into_sql();
        assert!(!sql.contains("movie_popularity"));
        assert!(sql.contains("LIMIT $5 OFFSET $6"));
    }

    #[test]
    fn count_query_reuses_predicate_without_pagination() {
        let f = filters(Some(8.7));
        let page_sql = page_query(Uuid::new_v4(), &f, 10, 0).into_sql();
        let count_sql = count_query(Uuid::new_v4(), &f).into_sql();
        assert!(count_sql.starts_with("SELECT COUNT(*) FROM cubosmovie.movie WHERE "));
        assert!(!count_sql.contains("LIMIT"));
        assert!(!count_sql.contains("OFFSET"));
        let predicate = count_sql
            .strip_prefix("SELECT COUNT(*) FROM cubosmovie.movie WHERE ")
            .unwrap();
        assert!(page_sql.contains(predicate));
    }

    #[test]
    fn total_pages_rounds_up() {
        assert_eq!(total_pages(0, 10), 0);
        assert_eq!(total_pages(1, 10), 1);
        assert_eq!(total_pages(10, 10), 1);
        assert_eq!(total_pages(11, 10), 2);
        assert_eq!(total_pages(25, 10), 3);
    }

    #[test]
    fn allowed_updates_drops_unknown_and_immutable_keys() {
        let mut map = JsonMap::new();
        map.insert("movie_title".into(), json!("Alien"));
        map.insert("movie_id".into(), json!("attacker-controlled"));
        map.insert("user_id".into(), json!("attacker-controlled"));
        map.insert("nonsense".into(), json!(true));

        let fields = allowed_updates(&map);
        assert_eq!(fields.len(), 1);
        assert_eq!(fields[0].0, "movie_title");
    }

    #[test]
    fn update_query_builds_allowlisted_set_clause() {
        let mut map = JsonMap::new();
        map.insert("movie_duration".into(), json!(117));
        map.insert("movie_title".into(), json!("Alien"));
        map.insert("nonsense".into(), json!(true));

        let sql = update_query(&map, Uuid::new_v4(), Uuid::new_v4())
            .unwrap()
            .into_sql();
        assert_eq!(
            sql,
            "UPDATE cubosmovie.movie SET movie_title = $1, movie_duration = $2 \
             WHERE movie_id = $3 AND user_id = $4 RETURNING *"
        );
    }

    #[test]
    fn update_query_rejects_empty_intersection() {
        let mut map = JsonMap::new();
        map.insert("nonsense".into(), json!(true));

        let err = update_query(&map, Uuid::new_v4(), Uuid::new_v4()).err().unwrap();
        assert!(err.to_string().contains("Nenhum campo válido"));
    }

    #[test]
    fn update_query_rejects_wrongly_typed_value() {
        let mut map = JsonMap::new();
        map.insert("movie_duration".into(), json!("not a number"));

        let err = update_query(&map, Uuid::new_v4(), Uuid::new_v4()).err().unwrap();
        assert!(err.to_string().contains("movie_duration"));
    }

    #[test]
    fn update_query_accepts_genre_list_and_null() {
        let mut map = JsonMap::new();
        map.insert("movie_genre".into(), json!(["sci-fi", "horror"]));
        map.insert("movie_description".into(), Value::Null);

        let sql = update_query(&map, Uuid::new_v4(), Uuid::new_v4())
            .unwrap()
            .into_sql();
        assert!(sql.contains("movie_genre = $1"));
        assert!(sql.contains("movie_description = $2"));
    }
}
