use async_trait::async_trait;
use boxoffice_core::{CatalogRepository, Entity, StoreError, StoreResult};
use boxoffice_shared::{Movie, MovieId, NewMovie, Seat, SeatFilter, SeatId};
use chrono::NaiveDate;
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::database::map_sqlx;
use crate::reservation_repo::SeatRow;

pub struct PgCatalogRepository {
    pool: PgPool,
}

impl PgCatalogRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

// Internal struct for type-safe querying
#[derive(sqlx::FromRow)]
struct MovieRow {
    id: Uuid,
    title: String,
    description: String,
    release_date: NaiveDate,
    duration: i32,
}

impl TryFrom<MovieRow> for Movie {
    type Error = StoreError;

    fn try_from(row: MovieRow) -> Result<Self, Self::Error> {
        let duration = u32::try_from(row.duration).map_err(|_| {
            StoreError::Backend(format!("movie {} has negative duration {}", row.id, row.duration))
        })?;
        Ok(Movie {
            id: MovieId(row.id),
            title: row.title,
            description: row.description,
            release_date: row.release_date,
            duration,
        })
    }
}

/// Callers validate `NewMovie` first, so an overflow here is a bug upstream.
fn db_duration(minutes: u32) -> StoreResult<i32> {
    i32::try_from(minutes).map_err(|_| StoreError::Backend(format!("duration {} does not fit the column", minutes)))
}

#[async_trait]
impl CatalogRepository for PgCatalogRepository {
    async fn create_movie(&self, movie: NewMovie) -> StoreResult<Movie> {
        let id = MovieId::new();
        sqlx::query(
            r#"
            INSERT INTO movies (id, title, description, release_date, duration)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(id.0)
        .bind(&movie.title)
        .bind(&movie.description)
        .bind(movie.release_date)
        .bind(db_duration(movie.duration)?)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx)?;

        Ok(Movie::from_new(id, movie))
    }

    async fn get_movie(&self, id: MovieId) -> StoreResult<Movie> {
        sqlx::query_as::<_, MovieRow>(
            "SELECT id, title, description, release_date, duration FROM movies WHERE id = $1",
        )
        .bind(id.0)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx)?
        .ok_or_else(|| StoreError::not_found(Entity::Movie, id))
        .and_then(Movie::try_from)
    }

    async fn list_movies(&self) -> StoreResult<Vec<Movie>> {
        let rows = sqlx::query_as::<_, MovieRow>(
            "SELECT id, title, description, release_date, duration FROM movies ORDER BY release_date, title",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx)?;

        rows.into_iter().map(Movie::try_from).collect()
    }

    async fn update_movie(&self, id: MovieId, movie: NewMovie) -> StoreResult<Movie> {
        let result = sqlx::query(
            r#"
            UPDATE movies
            SET title = $2, description = $3, release_date = $4, duration = $5
            WHERE id = $1
            "#,
        )
        .bind(id.0)
        .bind(&movie.title)
        .bind(&movie.description)
        .bind(movie.release_date)
        .bind(db_duration(movie.duration)?)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::not_found(Entity::Movie, id));
        }
        Ok(Movie::from_new(id, movie))
    }

    async fn delete_movie(&self, id: MovieId) -> StoreResult<()> {
        let result = sqlx::query("DELETE FROM movies WHERE id = $1")
            .bind(id.0)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::not_found(Entity::Movie, id));
        }
        Ok(())
    }

    async fn create_seat(&self, seat_number: &str) -> StoreResult<Seat> {
        let seat = Seat::new(seat_number);
        sqlx::query("INSERT INTO seats (id, seat_number, available) VALUES ($1, $2, $3)")
            .bind(seat.id.0)
            .bind(&seat.seat_number)
            .bind(seat.available)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx)?;

        Ok(seat)
    }

    async fn get_seat(&self, id: SeatId) -> StoreResult<Seat> {
        sqlx::query_as::<_, SeatRow>("SELECT id, seat_number, available FROM seats WHERE id = $1")
            .bind(id.0)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx)?
            .map(Seat::from)
            .ok_or_else(|| StoreError::not_found(Entity::Seat, id))
    }

    async fn list_seats(&self, filter: &SeatFilter) -> StoreResult<Vec<Seat>> {
        let mut query = QueryBuilder::<Postgres>::new("SELECT id, seat_number, available FROM seats");
        if let Some(available) = filter.available {
            query.push(" WHERE available = ").push_bind(available);
        }
        query.push(" ORDER BY seat_number");

        let rows = query
            .build_query_as::<SeatRow>()
            .fetch_all(&self.pool)
            .await
            .map_err(map_sqlx)?;

        Ok(rows.into_iter().map(Seat::from).collect())
    }

    async fn delete_seat(&self, id: SeatId) -> StoreResult<()> {
        let result = sqlx::query("DELETE FROM seats WHERE id = $1")
            .bind(id.0)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::not_found(Entity::Seat, id));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_negative_duration_is_rejected_on_read() {
        let row = MovieRow {
            id: Uuid::new_v4(),
            title: "Broken".into(),
            description: String::new(),
            release_date: NaiveDate::from_ymd_opt(2020, 1, 1).unwrap(),
            duration: -5,
        };
        assert!(matches!(Movie::try_from(row), Err(StoreError::Backend(_))));
    }

    #[test]
    fn test_duration_range() {
        assert_eq!(db_duration(148).unwrap(), 148);
        assert!(matches!(db_duration(u32::MAX), Err(StoreError::Backend(_))));
    }
}
