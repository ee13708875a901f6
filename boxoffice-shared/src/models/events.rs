use serde::{Deserialize, Serialize};

use super::booking::Booking;
use super::ids::{BookingId, MovieId, SeatId};

/// Seat availability changes, published after the owning transaction commits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SeatEvent {
    SeatBooked {
        seat_id: SeatId,
        seat_number: String,
        movie_id: MovieId,
        booking_id: BookingId,
        at: i64,
    },
    SeatReleased {
        seat_id: SeatId,
        seat_number: String,
        booking_id: BookingId,
        at: i64,
    },
}

impl SeatEvent {
    pub fn booked(booking: &Booking, seat_number: &str) -> Self {
        SeatEvent::SeatBooked {
            seat_id: booking.seat_id,
            seat_number: seat_number.to_string(),
            movie_id: booking.movie_id,
            booking_id: booking.id,
            at: chrono::Utc::now().timestamp(),
        }
    }

    pub fn released(booking: &Booking, seat_number: &str) -> Self {
        SeatEvent::SeatReleased {
            seat_id: booking.seat_id,
            seat_number: seat_number.to_string(),
            booking_id: booking.id,
            at: chrono::Utc::now().timestamp(),
        }
    }

    /// SSE event name
    pub fn kind(&self) -> &'static str {
        match self {
            SeatEvent::SeatBooked { .. } => "seat_booked",
            SeatEvent::SeatReleased { .. } => "seat_released",
        }
    }

    pub fn seat_id(&self) -> SeatId {
        match self {
            SeatEvent::SeatBooked { seat_id, .. } | SeatEvent::SeatReleased { seat_id, .. } => *seat_id,
        }
    }
}
