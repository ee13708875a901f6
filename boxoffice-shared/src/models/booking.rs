use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::ids::{BookingId, MovieId, SeatId, UserId};
use super::movie::Movie;
use super::seat::Seat;
use super::user::User;

/// An active reservation. Holds typed references only; display data is
/// resolved through the catalog into a [`BookingDetail`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Booking {
    pub id: BookingId,
    pub movie_id: MovieId,
    pub seat_id: SeatId,
    pub user_id: UserId,
    pub booking_date: NaiveDate,
}

impl Booking {
    pub fn new(movie_id: MovieId, seat_id: SeatId, user_id: UserId, booking_date: NaiveDate) -> Self {
        Self {
            id: BookingId::new(),
            movie_id,
            seat_id,
            user_id,
            booking_date,
        }
    }
}

/// A booking with its references resolved, as returned to clients
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookingDetail {
    pub id: BookingId,
    pub movie: Movie,
    pub seat: Seat,
    pub user: User,
    pub booking_date: NaiveDate,
}

impl fmt::Display for BookingDetail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} - {} - {}", self.user.username, self.movie, self.seat)
    }
}

/// Every present criterion must match.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BookingFilter {
    pub user_id: Option<UserId>,
    pub movie_id: Option<MovieId>,
    pub seat_id: Option<SeatId>,
}

impl BookingFilter {
    pub fn for_user(user_id: UserId) -> Self {
        Self { user_id: Some(user_id), ..Self::default() }
    }

    pub fn for_movie(movie_id: MovieId) -> Self {
        Self { movie_id: Some(movie_id), ..Self::default() }
    }

    pub fn matches(&self, booking: &Booking) -> bool {
        self.user_id.map_or(true, |id| booking.user_id == id)
            && self.movie_id.map_or(true, |id| booking.movie_id == id)
            && self.seat_id.map_or(true, |id| booking.seat_id == id)
    }
}
