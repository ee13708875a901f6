use async_trait::async_trait;
use boxoffice_shared::{
    Booking, BookingFilter, BookingId, Movie, MovieId, NewMovie, NewUser, Seat, SeatFilter, SeatId,
    User, UserId,
};

use crate::credentials;
use crate::{StoreError, StoreResult};

/// Seat access inside a unit of work. No business rules live here.
#[async_trait]
pub trait SeatStore: Send {
    /// Reads a seat and holds it for the rest of the unit of work, so a
    /// concurrent unit reading the same seat waits for this one to finish.
    async fn get_seat(&mut self, id: SeatId) -> StoreResult<Seat>;

    async fn set_availability(&mut self, id: SeatId, available: bool) -> StoreResult<()>;
}

/// Booking record access inside a unit of work. Availability is not checked
/// here; that belongs to the coordinator.
#[async_trait]
pub trait BookingLedger: Send {
    async fn create_booking(
        &mut self,
        movie_id: MovieId,
        seat_id: SeatId,
        user_id: UserId,
    ) -> StoreResult<Booking>;

    async fn get_booking(&mut self, id: BookingId) -> StoreResult<Booking>;

    async fn delete_booking(&mut self, id: BookingId) -> StoreResult<()>;

    /// Ordered by booking date, then id
    async fn list_bookings(&mut self, filter: &BookingFilter) -> StoreResult<Vec<Booking>>;
}

/// One atomic, isolated transaction over seats and bookings.
/// Dropping it without `commit` discards every write.
#[async_trait]
pub trait UnitOfWork: SeatStore + BookingLedger {
    async fn commit(self: Box<Self>) -> StoreResult<()>;

    async fn rollback(self: Box<Self>) -> StoreResult<()>;
}

/// Hands out units of work. This is what the coordinator is built from.
#[async_trait]
pub trait ReservationStore: Send + Sync {
    async fn begin(&self) -> StoreResult<Box<dyn UnitOfWork>>;
}

/// Movies and seats outside of the reservation path. Never writes the
/// availability flag of an existing seat.
#[async_trait]
pub trait CatalogRepository: Send + Sync {
    async fn create_movie(&self, movie: NewMovie) -> StoreResult<Movie>;

    async fn get_movie(&self, id: MovieId) -> StoreResult<Movie>;

    async fn list_movies(&self) -> StoreResult<Vec<Movie>>;

    async fn update_movie(&self, id: MovieId, movie: NewMovie) -> StoreResult<Movie>;

    /// Fails with `Conflict` while any booking references the movie
    async fn delete_movie(&self, id: MovieId) -> StoreResult<()>;

    /// Seat numbers are unique; a duplicate is a `Conflict`
    async fn create_seat(&self, seat_number: &str) -> StoreResult<Seat>;

    async fn get_seat(&self, id: SeatId) -> StoreResult<Seat>;

    /// Ordered by seat number
    async fn list_seats(&self, filter: &SeatFilter) -> StoreResult<Vec<Seat>>;

    /// Fails with `Conflict` while a booking holds the seat
    async fn delete_seat(&self, id: SeatId) -> StoreResult<()>;
}

#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// Hashes the password and stores the user; usernames are unique.
    async fn create_user(&self, user: NewUser) -> StoreResult<User>;

    async fn get_user(&self, id: UserId) -> StoreResult<User>;

    /// The user and their stored password hash
    async fn find_credentials(&self, username: &str) -> StoreResult<Option<(User, String)>>;

    async fn verify_credentials(&self, username: &str, password: &str) -> StoreResult<User> {
        match self.find_credentials(username).await? {
            Some((user, hash)) if credentials::verify_password(password, &hash) => Ok(user),
            _ => Err(StoreError::InvalidCredentials),
        }
    }
}
