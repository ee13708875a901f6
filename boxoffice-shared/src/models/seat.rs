use serde::{Deserialize, Serialize};
use std::fmt;

use super::ids::SeatId;
use super::{require_text, ValidationError};

pub const SEAT_NUMBER_MAX_LEN: usize = 10;

/// A physical seat. `available` is the single source of truth for whether
/// the seat can currently be reserved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Seat {
    pub id: SeatId,
    pub seat_number: String,
    pub available: bool,
}

impl Seat {
    /// New seats always start out available.
    pub fn new(seat_number: impl Into<String>) -> Self {
        Self {
            id: SeatId::new(),
            seat_number: seat_number.into(),
            available: true,
        }
    }

    pub fn validate_number(seat_number: &str) -> Result<(), ValidationError> {
        require_text("seat_number", seat_number, SEAT_NUMBER_MAX_LEN)
    }
}

impl fmt::Display for Seat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Seat {}", self.seat_number)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeatFilter {
    pub available: Option<bool>,
}

impl SeatFilter {
    pub fn available() -> Self {
        Self { available: Some(true) }
    }

    pub fn booked() -> Self {
        Self { available: Some(false) }
    }

    pub fn matches(&self, seat: &Seat) -> bool {
        self.available.map_or(true, |flag| seat.available == flag)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_seat_is_available() {
        let seat = Seat::new("A1");
        assert!(seat.available);
        assert_eq!(seat.to_string(), "Seat A1");
    }

    #[test]
    fn test_seat_number_limits() {
        assert!(Seat::validate_number("A1").is_ok());
        assert!(Seat::validate_number("   ").is_err());
        assert!(Seat::validate_number("ABCDEFGHIJK").is_err());
    }

    #[test]
    fn test_filter() {
        let mut seat = Seat::new("B2");
        assert!(SeatFilter::default().matches(&seat));
        assert!(SeatFilter::available().matches(&seat));
        seat.available = false;
        assert!(!SeatFilter::available().matches(&seat));
        assert!(SeatFilter::booked().matches(&seat));
    }
}
