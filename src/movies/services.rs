use sqlx::PgPool;
use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::{Date, OffsetDateTime};
use tracing::error;
use uuid::Uuid;

use crate::error::AppError;
use crate::movies::dto::{ListQuery, MovieInput};
use crate::movies::repo::{self, JsonMap, Movie, MovieFilters, MovieListPage, MovieWithOwner, NewMovie};
use crate::state::AppState;

const REQUIRED_FILTERS_MSG: &str = "Filtros obrigatórios faltando. É necessário informar \
     movie_date_lauch_start, movie_date_lauch_end e movie_duration";

/// Accepts RFC 3339 or a bare `YYYY-MM-DD` (taken as UTC midnight).
pub(crate) fn parse_launch_date(raw: &str) -> Result<OffsetDateTime, AppError> {
    if let Ok(dt) = OffsetDateTime::parse(raw, &Rfc3339) {
        return Ok(dt);
    }
    Date::parse(raw, format_description!("[year]-[month]-[day]"))
        .map(|d| d.midnight().assume_utc())
        .map_err(|_| AppError::Validation(format!("Data inválida: {raw}")))
}

pub(crate) fn release_reminder_due(date_lauch: OffsetDateTime, now: OffsetDateTime) -> bool {
    date_lauch > now
}

/// Detached best-effort reminder. Failures only reach the log; the create
/// response never waits on this.
fn spawn_release_reminder(state: &AppState, saved: &MovieWithOwner) {
    let Some(date_lauch) = saved.movie.movie_date_lauch else {
        return;
    };
    if !release_reminder_due(date_lauch, OffsetDateTime::now_utc()) {
        return;
    }

    let mailer = state.mailer.clone();
    let to = saved.user_email.clone();
    let title = saved
        .movie
        .movie_title
        .clone()
        .unwrap_or_else(|| "seu filme".to_string());

    tokio::spawn(async move {
        let d = date_lauch.date();
        let subject = format!("Lembrete: estreia do filme {title}");
        let body = format!(
            "Seu filme {title} estreia em {:02}/{:02}/{:04}",
            d.day(),
            u8::from(d.month()),
            d.year()
        );
        if let Err(e) = mailer.send(&to, &subject, &body).await {
            error!(error = %e, to = %to, "failed to send release reminder");
        }
    });
}

/// Create a movie for the authenticated owner. Release date and duration are
/// required here as well as by the repository contract, since either layer
/// can be invoked independently.
pub async fn create_movie(
    state: &AppState,
    user_id: Uuid,
    input: MovieInput,
) -> Result<MovieWithOwner, AppError> {
    let (Some(date_raw), Some(movie_duration)) =
        (input.movie_date_lauch.as_deref(), input.movie_duration)
    else {
        return Err(AppError::Validation("Campos obrigatórios faltando".into()));
    };
    let movie_date_lauch = parse_launch_date(date_raw)?;

    let new_movie = NewMovie {
        movie_title: input.movie_title,
        movie_sinopse: input.movie_sinopse,
        movie_popularity: input.movie_popularity,
        movie_date_lauch,
        movie_duration,
        movie_situation: input.movie_situation,
        movie_language: input.movie_language,
        movie_genre: input.movie_genre,
        movie_budget: input.movie_budget,
        movie_revenue: input.movie_revenue,
        movie_description: input.movie_description,
        movie_image_url: input.movie_image_url,
        movie_trailer_url: input.movie_trailer_url,
        movie_porcentage_like: input.movie_porcentage_like,
    };

    let saved = repo::save(&state.db, new_movie, user_id).await?;
    spawn_release_reminder(state, &saved);
    Ok(saved)
}

pub async fn get_movie(db: &PgPool, movie_id: Uuid, user_id: Uuid) -> Result<Movie, AppError> {
    repo::get_one(db, movie_id, user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Movie not found".into()))
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|s| !s.is_empty())
}

fn parse_i64(value: Option<&str>, default: &str, name: &str) -> Result<i64, AppError> {
    value
        .filter(|s| !s.is_empty())
        .unwrap_or(default)
        .parse()
        .map_err(|_| AppError::Validation(format!("{name} inválido")))
}

fn parse_filters(q: &ListQuery) -> Result<MovieFilters, AppError> {
    let (Some(start), Some(end), Some(duration)) = (
        present(&q.movie_date_lauch_start),
        present(&q.movie_date_lauch_end),
        present(&q.movie_duration),
    ) else {
        return Err(AppError::Validation(REQUIRED_FILTERS_MSG.into()));
    };

    let popularity = match present(&q.movie_popularity) {
        Some(p) => Some(
            p.parse()
                .map_err(|_| AppError::Validation("movie_popularity inválido".into()))?,
        ),
        None => None,
    };

    Ok(MovieFilters {
        date_lauch_start: parse_launch_date(start)?,
        date_lauch_end: parse_launch_date(end)?,
        duration: duration
            .parse()
            .map_err(|_| AppError::Validation("movie_duration inválido".into()))?,
        popularity,
    })
}

/// Filtered listing. The three mandatory filters are checked before the
/// repository is ever invoked.
pub async fn list_movies(
    db: &PgPool,
    user_id: Uuid,
    q: ListQuery,
) -> Result<MovieListPage, AppError> {
    let filters = parse_filters(&q)?;
    let page = parse_i64(q.page.as_deref(), "1", "page")?;
    let limit = parse_i64(q.limit.as_deref(), "10", "limit")?;
    repo::list(db, user_id, &filters, page, limit).await
}

pub async fn update_movie(
    db: &PgPool,
    updates: &JsonMap,
    movie_id: Uuid,
    user_id: Uuid,
) -> Result<Movie, AppError> {
    repo::update(db, updates, movie_id, user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Filme não encontrado".into()))
}

pub async fn delete_movie(db: &PgPool, movie_id: Uuid, user_id: Uuid) -> Result<(), AppError> {
    let affected = repo::delete(db, movie_id, user_id).await?;
    if affected == 0 {
        return Err(AppError::NotFound("Filme não encontrado".into()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    fn empty_input() -> MovieInput {
        MovieInput {
            movie_title: None,
            movie_sinopse: None,
            movie_popularity: None,
            movie_date_lauch: None,
            movie_duration: None,
            movie_situation: None,
            movie_language: None,
            movie_genre: None,
            movie_budget: None,
            movie_revenue: None,
            movie_description: None,
            movie_image_url: None,
            movie_trailer_url: None,
            movie_porcentage_like: None,
        }
    }

    fn empty_query() -> ListQuery {
        ListQuery {
            page: None,
            limit: None,
            movie_date_lauch_start: None,
            movie_date_lauch_end: None,
            movie_duration: None,
            movie_popularity: None,
        }
    }

    #[test]
    fn parse_launch_date_accepts_rfc3339() {
        let dt = parse_launch_date("2024-06-01T10:30:00Z").unwrap();
        assert_eq!(dt, datetime!(2024-06-01 10:30 UTC));
    }

    #[test]
    fn parse_launch_date_accepts_bare_date_at_utc_midnight() {
        let dt = parse_launch_date("2024-06-01").unwrap();
        assert_eq!(dt, datetime!(2024-06-01 0:00 UTC));
    }

    #[test]
    fn parse_launch_date_rejects_garbage() {
        assert!(parse_launch_date("not-a-date").is_err());
        assert!(parse_launch_date("2024-13-01").is_err());
    }

    #[test]
    fn reminder_is_due_only_for_future_dates() {
        let now = datetime!(2024-06-01 12:00 UTC);
        assert!(release_reminder_due(datetime!(2024-06-02 0:00 UTC), now));
        assert!(!release_reminder_due(datetime!(2024-05-01 0:00 UTC), now));
        assert!(!release_reminder_due(now, now));
    }

    #[tokio::test]
    async fn create_rejects_missing_required_fields() {
        let state = AppState::fake();

        let err = create_movie(&state, Uuid::new_v4(), empty_input())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Campos obrigatórios faltando"));

        let mut only_date = empty_input();
        only_date.movie_date_lauch = Some("2024-06-01".into());
        let err = create_movie(&state, Uuid::new_v4(), only_date)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Campos obrigatórios faltando"));

        let mut only_duration = empty_input();
        only_duration.movie_duration = Some(142);
        let err = create_movie(&state, Uuid::new_v4(), only_duration)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Campos obrigatórios faltando"));
    }

    #[test]
    fn filters_require_all_three_mandatory_params() {
        let mut q = empty_query();
        q.movie_popularity = Some("8.7".into());
        assert!(parse_filters(&q).is_err());

        q.movie_date_lauch_start = Some("2020-01-01".into());
        q.movie_date_lauch_end = Some("2025-12-31".into());
        assert!(parse_filters(&q).is_err()); // duration still missing

        q.movie_duration = Some("142".into());
        let filters = parse_filters(&q).unwrap();
        assert_eq!(filters.duration, 142);
        assert_eq!(filters.popularity, Some(8.7));
    }

    #[test]
    fn empty_string_filter_counts_as_missing() {
        let mut q = empty_query();
        q.movie_date_lauch_start = Some("2020-01-01".into());
        q.movie_date_lauch_end = Some("2025-12-31".into());
        q.movie_duration = Some(String::new());
        let err = parse_filters(&q).unwrap_err();
        assert!(err.to_string().contains("Filtros obrigatórios faltando"));
    }

    #[test]
    fn popularity_is_optional() {
        let mut q = empty_query();
        q.movie_date_lauch_start = Some("2020-01-01".into());
        q.movie_date_lauch_end = Some("2025-12-31".into());
        q.movie_duration = Some("142".into());
        let filters = parse_filters(&q).unwrap();
        assert_eq!(filters.popularity, None);
    }

    #[test]
    fn page_and_limit_default_and_parse() {
        assert_eq!(parse_i64(None, "1", "page").unwrap(), 1);
        assert_eq!(parse_i64(Some(""), "10", "limit").unwrap(), 10);
        assert_eq!(parse_i64(Some("3"), "1", "page").unwrap(), 3);
        assert!(parse_i64(Some("abc"), "1", "page").is_err());
    }
}
