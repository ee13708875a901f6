pub mod coordinator;
pub mod credentials;
pub mod memory;
pub mod repository;
pub mod resolve;

use boxoffice_shared::{BookingId, MovieId, SeatId};
use std::fmt;
use uuid::Uuid;

pub use coordinator::{CoordinatorConfig, ReservationCoordinator};
pub use memory::InMemoryStore;
pub use repository::{
    BookingLedger, CatalogRepository, ReservationStore, SeatStore, UnitOfWork, UserDirectory,
};

/// Kinds of stored records, for not-found reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Entity {
    Movie,
    Seat,
    Booking,
    User,
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Entity::Movie => "Movie",
            Entity::Seat => "Seat",
            Entity::Booking => "Booking",
            Entity::User => "User",
        })
    }
}

/// Faults raised by storage engines
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("{entity} not found: {id}")]
    NotFound { entity: Entity, id: Uuid },

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Invalid credentials")]
    InvalidCredentials,

    /// A concurrent transaction won; the whole unit of work may be retried.
    #[error("Serialization failure")]
    SerializationFailure,

    #[error("Storage backend error: {0}")]
    Backend(String),
}

impl StoreError {
    pub fn not_found(entity: Entity, id: impl Into<Uuid>) -> Self {
        StoreError::NotFound { entity, id: id.into() }
    }

    pub fn is_not_found(&self, entity: Entity) -> bool {
        matches!(self, StoreError::NotFound { entity: e, .. } if *e == entity)
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Outcomes of reserve / cancel other than success. State is unchanged
/// whenever one of these is returned.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ReservationError {
    #[error("Seat {0} is already booked")]
    SeatAlreadyBooked(SeatId),

    #[error("Seat {0} does not exist")]
    SeatNotFound(SeatId),

    #[error("Movie {0} does not exist")]
    MovieNotFound(MovieId),

    #[error("Booking {0} not found")]
    BookingNotFound(BookingId),

    #[error("Not authorized to modify this booking")]
    NotAuthorized,

    #[error("Transaction failed: {0}")]
    TransactionFailed(String),
}

impl ReservationError {
    /// Only infrastructure faults are worth retrying from the caller's side.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ReservationError::TransactionFailed(_))
    }
}

pub type ReservationResult<T> = Result<T, ReservationError>;
