use async_trait::async_trait;
use boxoffice_shared::{
    Booking, BookingFilter, BookingId, Masked, Movie, MovieId, NewMovie, NewUser, Seat, SeatFilter,
    SeatId, User, UserId,
};
use chrono::Utc;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::credentials;
use crate::repository::{
    BookingLedger, CatalogRepository, ReservationStore, SeatStore, UnitOfWork, UserDirectory,
};
use crate::{Entity, StoreError, StoreResult};

#[derive(Debug, Clone)]
struct StoredUser {
    user: User,
    password_hash: String,
}

#[derive(Debug, Clone, Default)]
struct Tables {
    movies: BTreeMap<MovieId, Movie>,
    seats: BTreeMap<SeatId, Seat>,
    bookings: BTreeMap<BookingId, Booking>,
    users: BTreeMap<UserId, StoredUser>,
}

impl Tables {
    fn seat_mut(&mut self, id: SeatId) -> StoreResult<&mut Seat> {
        self.seats
            .get_mut(&id)
            .ok_or_else(|| StoreError::not_found(Entity::Seat, id))
    }
}

/// Process-local storage engine implementing every repository trait.
///
/// A unit of work owns the table lock for its whole lifetime and edits a
/// private copy, so units are fully serialized and a dropped unit leaves
/// nothing behind.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    tables: Arc<Mutex<Tables>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

pub struct MemoryUnitOfWork {
    guard: OwnedMutexGuard<Tables>,
    working: Tables,
}

#[async_trait]
impl ReservationStore for InMemoryStore {
    async fn begin(&self) -> StoreResult<Box<dyn UnitOfWork>> {
        let guard = self.tables.clone().lock_owned().await;
        let working = guard.clone();
        Ok(Box::new(MemoryUnitOfWork { guard, working }))
    }
}

#[async_trait]
impl SeatStore for MemoryUnitOfWork {
    async fn get_seat(&mut self, id: SeatId) -> StoreResult<Seat> {
        self.working.seat_mut(id).map(|seat| seat.clone())
    }

    async fn set_availability(&mut self, id: SeatId, available: bool) -> StoreResult<()> {
        self.working.seat_mut(id)?.available = available;
        Ok(())
    }
}

#[async_trait]
impl BookingLedger for MemoryUnitOfWork {
    async fn create_booking(
        &mut self,
        movie_id: MovieId,
        seat_id: SeatId,
        user_id: UserId,
    ) -> StoreResult<Booking> {
        if !self.working.movies.contains_key(&movie_id) {
            return Err(StoreError::not_found(Entity::Movie, movie_id));
        }
        if !self.working.seats.contains_key(&seat_id) {
            return Err(StoreError::not_found(Entity::Seat, seat_id));
        }
        if !self.working.users.contains_key(&user_id) {
            return Err(StoreError::not_found(Entity::User, user_id));
        }
        if self.working.bookings.values().any(|b| b.seat_id == seat_id) {
            return Err(StoreError::Conflict(format!("seat {} already has a booking", seat_id)));
        }

        let booking = Booking::new(movie_id, seat_id, user_id, Utc::now().date_naive());
        self.working.bookings.insert(booking.id, booking.clone());
        Ok(booking)
    }

    async fn get_booking(&mut self, id: BookingId) -> StoreResult<Booking> {
        self.working
            .bookings
            .get(&id)
            .cloned()
            .ok_or_else(|| StoreError::not_found(Entity::Booking, id))
    }

    async fn delete_booking(&mut self, id: BookingId) -> StoreResult<()> {
        self.working
            .bookings
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| StoreError::not_found(Entity::Booking, id))
    }

    async fn list_bookings(&mut self, filter: &BookingFilter) -> StoreResult<Vec<Booking>> {
        let mut bookings: Vec<Booking> = self
            .working
            .bookings
            .values()
            .filter(|b| filter.matches(b))
            .cloned()
            .collect();
        bookings.sort_by_key(|b| (b.booking_date, b.id));
        Ok(bookings)
    }
}

#[async_trait]
impl UnitOfWork for MemoryUnitOfWork {
    async fn commit(self: Box<Self>) -> StoreResult<()> {
        let MemoryUnitOfWork { mut guard, working } = *self;
        *guard = working;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> StoreResult<()> {
        Ok(())
    }
}

#[async_trait]
impl CatalogRepository for InMemoryStore {
    async fn create_movie(&self, movie: NewMovie) -> StoreResult<Movie> {
        let movie = Movie::from_new(MovieId::new(), movie);
        self.tables.lock().await.movies.insert(movie.id, movie.clone());
        Ok(movie)
    }

    async fn get_movie(&self, id: MovieId) -> StoreResult<Movie> {
        self.tables
            .lock()
            .await
            .movies
            .get(&id)
            .cloned()
            .ok_or_else(|| StoreError::not_found(Entity::Movie, id))
    }

    async fn list_movies(&self) -> StoreResult<Vec<Movie>> {
        let mut movies: Vec<Movie> = self.tables.lock().await.movies.values().cloned().collect();
        movies.sort_by(|a, b| a.release_date.cmp(&b.release_date).then_with(|| a.title.cmp(&b.title)));
        Ok(movies)
    }

    async fn update_movie(&self, id: MovieId, movie: NewMovie) -> StoreResult<Movie> {
        let mut tables = self.tables.lock().await;
        let slot = tables
            .movies
            .get_mut(&id)
            .ok_or_else(|| StoreError::not_found(Entity::Movie, id))?;
        *slot = Movie::from_new(id, movie);
        Ok(slot.clone())
    }

    async fn delete_movie(&self, id: MovieId) -> StoreResult<()> {
        let mut tables = self.tables.lock().await;
        if !tables.movies.contains_key(&id) {
            return Err(StoreError::not_found(Entity::Movie, id));
        }
        if tables.bookings.values().any(|b| b.movie_id == id) {
            return Err(StoreError::Conflict(format!("movie {} has bookings", id)));
        }
        tables.movies.remove(&id);
        Ok(())
    }

    async fn create_seat(&self, seat_number: &str) -> StoreResult<Seat> {
        let mut tables = self.tables.lock().await;
        if tables.seats.values().any(|s| s.seat_number == seat_number) {
            return Err(StoreError::Conflict(format!("seat {} already exists", seat_number)));
        }
        let seat = Seat::new(seat_number);
        tables.seats.insert(seat.id, seat.clone());
        Ok(seat)
    }

    async fn get_seat(&self, id: SeatId) -> StoreResult<Seat> {
        self.tables
            .lock()
            .await
            .seats
            .get(&id)
            .cloned()
            .ok_or_else(|| StoreError::not_found(Entity::Seat, id))
    }

    async fn list_seats(&self, filter: &SeatFilter) -> StoreResult<Vec<Seat>> {
        let mut seats: Vec<Seat> = self
            .tables
            .lock()
            .await
            .seats
            .values()
            .filter(|s| filter.matches(s))
            .cloned()
            .collect();
        seats.sort_by(|a, b| a.seat_number.cmp(&b.seat_number));
        Ok(seats)
    }

    async fn delete_seat(&self, id: SeatId) -> StoreResult<()> {
        let mut tables = self.tables.lock().await;
        if !tables.seats.contains_key(&id) {
            return Err(StoreError::not_found(Entity::Seat, id));
        }
        if tables.bookings.values().any(|b| b.seat_id == id) {
            return Err(StoreError::Conflict(format!("seat {} is booked", id)));
        }
        tables.seats.remove(&id);
        Ok(())
    }
}

#[async_trait]
impl UserDirectory for InMemoryStore {
    async fn create_user(&self, new_user: NewUser) -> StoreResult<User> {
        let password_hash = credentials::hash_password(&new_user.password)?;
        let mut tables = self.tables.lock().await;
        if tables.users.values().any(|u| u.user.username == new_user.username) {
            return Err(StoreError::Conflict(format!("username {} is taken", new_user.username)));
        }
        let user = User {
            id: UserId::new(),
            username: new_user.username,
            email: new_user.email.map(Masked),
            is_admin: new_user.is_admin,
        };
        tables.users.insert(
            user.id,
            StoredUser { user: user.clone(), password_hash },
        );
        Ok(user)
    }

    async fn get_user(&self, id: UserId) -> StoreResult<User> {
        self.tables
            .lock()
            .await
            .users
            .get(&id)
            .map(|u| u.user.clone())
            .ok_or_else(|| StoreError::not_found(Entity::User, id))
    }

    async fn find_credentials(&self, username: &str) -> StoreResult<Option<(User, String)>> {
        Ok(self
            .tables
            .lock()
            .await
            .users
            .values()
            .find(|u| u.user.username == username)
            .map(|u| (u.user.clone(), u.password_hash.clone())))
    }
}
