use async_trait::async_trait;
use boxoffice_core::{
    BookingLedger, Entity, ReservationStore, SeatStore, StoreError, StoreResult, UnitOfWork,
};
use boxoffice_shared::{Booking, BookingFilter, BookingId, MovieId, Seat, SeatId, UserId};
use chrono::{NaiveDate, Utc};
use sqlx::{PgPool, Postgres, QueryBuilder, Transaction};
use uuid::Uuid;

use crate::database::{db_error_parts, map_sqlx, FOREIGN_KEY_VIOLATION};

#[derive(sqlx::FromRow)]
pub(crate) struct SeatRow {
    id: Uuid,
    seat_number: String,
    available: bool,
}

impl From<SeatRow> for Seat {
    fn from(row: SeatRow) -> Self {
        Seat {
            id: SeatId(row.id),
            seat_number: row.seat_number,
            available: row.available,
        }
    }
}

#[derive(sqlx::FromRow)]
struct BookingRow {
    id: Uuid,
    movie_id: Uuid,
    seat_id: Uuid,
    user_id: Uuid,
    booking_date: NaiveDate,
}

impl From<BookingRow> for Booking {
    fn from(row: BookingRow) -> Self {
        Booking {
            id: BookingId(row.id),
            movie_id: MovieId(row.movie_id),
            seat_id: SeatId(row.seat_id),
            user_id: UserId(row.user_id),
            booking_date: row.booking_date,
        }
    }
}

/// Units of work backed by SERIALIZABLE PostgreSQL transactions
pub struct PgReservationStore {
    pool: PgPool,
}

impl PgReservationStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

pub struct PgUnitOfWork {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl ReservationStore for PgReservationStore {
    async fn begin(&self) -> StoreResult<Box<dyn UnitOfWork>> {
        let mut tx = self.pool.begin().await.map_err(map_sqlx)?;
        sqlx::query("SET TRANSACTION ISOLATION LEVEL SERIALIZABLE")
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx)?;
        Ok(Box::new(PgUnitOfWork { tx }))
    }
}

#[async_trait]
impl SeatStore for PgUnitOfWork {
    async fn get_seat(&mut self, id: SeatId) -> StoreResult<Seat> {
        sqlx::query_as::<_, SeatRow>(
            "SELECT id, seat_number, available FROM seats WHERE id = $1 FOR UPDATE",
        )
        .bind(id.0)
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(map_sqlx)?
        .map(Seat::from)
        .ok_or_else(|| StoreError::not_found(Entity::Seat, id))
    }

    async fn set_availability(&mut self, id: SeatId, available: bool) -> StoreResult<()> {
        let result = sqlx::query("UPDATE seats SET available = $1 WHERE id = $2")
            .bind(available)
            .bind(id.0)
            .execute(&mut *self.tx)
            .await
            .map_err(map_sqlx)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::not_found(Entity::Seat, id));
        }
        Ok(())
    }
}

#[async_trait]
impl BookingLedger for PgUnitOfWork {
    async fn create_booking(
        &mut self,
        movie_id: MovieId,
        seat_id: SeatId,
        user_id: UserId,
    ) -> StoreResult<Booking> {
        let booking = Booking::new(movie_id, seat_id, user_id, Utc::now().date_naive());

        sqlx::query(
            r#"
            INSERT INTO bookings (id, movie_id, seat_id, user_id, booking_date)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(booking.id.0)
        .bind(booking.movie_id.0)
        .bind(booking.seat_id.0)
        .bind(booking.user_id.0)
        .bind(booking.booking_date)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| match db_error_parts(&e) {
            Some((code, Some(constraint))) if code == FOREIGN_KEY_VIOLATION => {
                match constraint.as_str() {
                    "bookings_movie_id_fkey" => StoreError::not_found(Entity::Movie, movie_id),
                    "bookings_seat_id_fkey" => StoreError::not_found(Entity::Seat, seat_id),
                    "bookings_user_id_fkey" => StoreError::not_found(Entity::User, user_id),
                    _ => map_sqlx(e),
                }
            }
            _ => map_sqlx(e),
        })?;

        Ok(booking)
    }

    async fn get_booking(&mut self, id: BookingId) -> StoreResult<Booking> {
        sqlx::query_as::<_, BookingRow>(
            "SELECT id, movie_id, seat_id, user_id, booking_date FROM bookings WHERE id = $1",
        )
        .bind(id.0)
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(map_sqlx)?
        .map(Booking::from)
        .ok_or_else(|| StoreError::not_found(Entity::Booking, id))
    }

    async fn delete_booking(&mut self, id: BookingId) -> StoreResult<()> {
        let result = sqlx::query("DELETE FROM bookings WHERE id = $1")
            .bind(id.0)
            .execute(&mut *self.tx)
            .await
            .map_err(map_sqlx)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::not_found(Entity::Booking, id));
        }
        Ok(())
    }

    async fn list_bookings(&mut self, filter: &BookingFilter) -> StoreResult<Vec<Booking>> {
        let mut query = QueryBuilder::<Postgres>::new(
            "SELECT id, movie_id, seat_id, user_id, booking_date FROM bookings WHERE TRUE",
        );
        if let Some(user_id) = filter.user_id {
            query.push(" AND user_id = ").push_bind(user_id.0);
        }
        if let Some(movie_id) = filter.movie_id {
            query.push(" AND movie_id = ").push_bind(movie_id.0);
        }
        if let Some(seat_id) = filter.seat_id {
            query.push(" AND seat_id = ").push_bind(seat_id.0);
        }
        query.push(" ORDER BY booking_date, id");

        let rows = query
            .build_query_as::<BookingRow>()
            .fetch_all(&mut *self.tx)
            .await
            .map_err(map_sqlx)?;

        Ok(rows.into_iter().map(Booking::from).collect())
    }
}

#[async_trait]
impl UnitOfWork for PgUnitOfWork {
    async fn commit(self: Box<Self>) -> StoreResult<()> {
        self.tx.commit().await.map_err(map_sqlx)
    }

    async fn rollback(self: Box<Self>) -> StoreResult<()> {
        self.tx.rollback().await.map_err(map_sqlx)
    }
}
