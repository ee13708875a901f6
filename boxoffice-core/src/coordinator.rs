use boxoffice_shared::{Booking, BookingFilter, BookingId, MovieId, Seat, SeatId, UserId};
use serde::Deserialize;
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::repository::{ReservationStore, UnitOfWork};
use crate::{Entity, ReservationError, ReservationResult, StoreError};

#[derive(Debug, Clone, Deserialize)]
pub struct CoordinatorConfig {
    /// Total tries of one reserve/cancel when the store reports a
    /// serialization failure
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
}

fn default_max_attempts() -> u32 {
    3
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self { max_attempts: default_max_attempts() }
    }
}

/// Why one attempt at a unit of work stopped
enum Failure {
    Rejected(ReservationError),
    Store(StoreError),
}

impl From<StoreError> for Failure {
    fn from(err: StoreError) -> Self {
        Failure::Store(err)
    }
}

impl From<ReservationError> for Failure {
    fn from(err: ReservationError) -> Self {
        Failure::Rejected(err)
    }
}

/// Sole writer of seat availability and sole creator/destroyer of bookings.
///
/// Every check-then-act sequence runs inside a single unit of work, so the
/// availability read and the writes that depend on it are isolated from
/// concurrent callers.
pub struct ReservationCoordinator {
    store: Arc<dyn ReservationStore>,
    config: CoordinatorConfig,
}

impl ReservationCoordinator {
    pub fn new(store: Arc<dyn ReservationStore>, config: CoordinatorConfig) -> Self {
        Self { store, config }
    }

    /// Marks the seat unavailable and records the booking, atomically.
    pub async fn reserve(
        &self,
        movie_id: MovieId,
        seat_id: SeatId,
        user_id: UserId,
    ) -> ReservationResult<Booking> {
        self.reserve_with_seat(movie_id, seat_id, user_id)
            .await
            .map(|(booking, _)| booking)
    }

    /// Like [`reserve`](Self::reserve), also returning the seat as written
    /// by the committed unit of work.
    pub async fn reserve_with_seat(
        &self,
        movie_id: MovieId,
        seat_id: SeatId,
        user_id: UserId,
    ) -> ReservationResult<(Booking, Seat)> {
        let (booking, seat) = self
            .with_retries("reserve", move || async move {
                let mut uow = self.store.begin().await?;
                let result = reserve_in(uow.as_mut(), movie_id, seat_id, user_id).await;
                finish(uow, result).await
            })
            .await?;

        info!(
            booking_id = %booking.id,
            seat_id = %seat_id,
            movie_id = %movie_id,
            user_id = %user_id,
            "Seat reserved"
        );
        Ok((booking, seat))
    }

    /// Releases the seat and deletes the booking, atomically. Returns the
    /// booking as it was before deletion.
    pub async fn cancel(
        &self,
        booking_id: BookingId,
        requester: UserId,
        is_admin: bool,
    ) -> ReservationResult<Booking> {
        let booking = self
            .with_retries("cancel", move || async move {
                let mut uow = self.store.begin().await?;
                let result = cancel_in(uow.as_mut(), booking_id, requester, is_admin).await;
                finish(uow, result).await
            })
            .await?;

        info!(
            booking_id = %booking_id,
            seat_id = %booking.seat_id,
            user_id = %requester,
            is_admin,
            "Booking cancelled"
        );
        Ok(booking)
    }

    /// A booking visible to the requester. Non-admins only see their own;
    /// anything else reads as not found.
    pub async fn booking(
        &self,
        booking_id: BookingId,
        requester: UserId,
        is_admin: bool,
    ) -> ReservationResult<Booking> {
        self.with_retries("booking", move || async move {
            let mut uow = self.store.begin().await?;
            let result: Result<Booking, Failure> = match uow.get_booking(booking_id).await {
                Ok(b) if is_admin || b.user_id == requester => Ok(b),
                Ok(_) => Err(ReservationError::BookingNotFound(booking_id).into()),
                Err(e) if e.is_not_found(Entity::Booking) => {
                    Err(ReservationError::BookingNotFound(booking_id).into())
                }
                Err(e) => Err(e.into()),
            };
            finish(uow, result).await
        })
        .await
    }

    /// Bookings matching the filter. Non-admins are always narrowed to
    /// their own bookings.
    pub async fn bookings(
        &self,
        mut filter: BookingFilter,
        requester: UserId,
        is_admin: bool,
    ) -> ReservationResult<Vec<Booking>> {
        if !is_admin {
            filter.user_id = Some(requester);
        }
        let filter = &filter;
        self.with_retries("bookings", move || async move {
            let mut uow = self.store.begin().await?;
            let result = uow.list_bookings(filter).await.map_err(Failure::from);
            finish(uow, result).await
        })
        .await
    }

    async fn with_retries<T, F, Fut>(&self, operation: &'static str, mut attempt: F) -> ReservationResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, Failure>>,
    {
        let max_attempts = self.config.max_attempts.max(1);
        let mut tries = 0;
        loop {
            tries += 1;
            match attempt().await {
                Ok(value) => return Ok(value),
                Err(Failure::Rejected(err)) => {
                    debug!(operation, error = %err, "Request rejected");
                    return Err(err);
                }
                Err(Failure::Store(StoreError::SerializationFailure)) if tries < max_attempts => {
                    warn!(operation, attempt = tries, "Concurrent update detected, retrying");
                }
                Err(Failure::Store(err)) => {
                    error!(operation, attempt = tries, error = %err, "Transaction failed");
                    return Err(ReservationError::TransactionFailed(err.to_string()));
                }
            }
        }
    }
}

async fn reserve_in(
    uow: &mut dyn UnitOfWork,
    movie_id: MovieId,
    seat_id: SeatId,
    user_id: UserId,
) -> Result<(Booking, Seat), Failure> {
    let mut seat = uow.get_seat(seat_id).await.map_err(|e| {
        if e.is_not_found(Entity::Seat) {
            ReservationError::SeatNotFound(seat_id).into()
        } else {
            Failure::Store(e)
        }
    })?;

    if !seat.available {
        return Err(ReservationError::SeatAlreadyBooked(seat_id).into());
    }

    uow.set_availability(seat_id, false).await?;
    let booking = uow.create_booking(movie_id, seat_id, user_id).await.map_err(|e| {
        if e.is_not_found(Entity::Movie) {
            ReservationError::MovieNotFound(movie_id).into()
        } else {
            Failure::Store(e)
        }
    })?;
    seat.available = false;
    Ok((booking, seat))
}

async fn cancel_in(
    uow: &mut dyn UnitOfWork,
    booking_id: BookingId,
    requester: UserId,
    is_admin: bool,
) -> Result<Booking, Failure> {
    let booking = uow.get_booking(booking_id).await.map_err(|e| {
        if e.is_not_found(Entity::Booking) {
            ReservationError::BookingNotFound(booking_id).into()
        } else {
            Failure::Store(e)
        }
    })?;

    if booking.user_id != requester && !is_admin {
        return Err(ReservationError::NotAuthorized.into());
    }

    // Lock the seat row before touching it
    uow.get_seat(booking.seat_id).await?;
    uow.set_availability(booking.seat_id, true).await?;
    uow.delete_booking(booking_id).await.map_err(|e| {
        if e.is_not_found(Entity::Booking) {
            ReservationError::BookingNotFound(booking_id).into()
        } else {
            Failure::Store(e)
        }
    })?;
    Ok(booking)
}

/// Commits on success, rolls back otherwise.
async fn finish<T>(uow: Box<dyn UnitOfWork>, result: Result<T, Failure>) -> Result<T, Failure> {
    match result {
        Ok(value) => {
            uow.commit().await?;
            Ok(value)
        }
        Err(failure) => {
            if let Err(err) = uow.rollback().await {
                warn!(error = %err, "Rollback failed");
            }
            Err(failure)
        }
    }
}
