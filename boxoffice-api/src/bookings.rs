use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use boxoffice_core::resolve::{booking_detail, booking_details};
use boxoffice_shared::{Booking, BookingDetail, BookingFilter, BookingId, MovieId, SeatEvent, SeatId};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::{error::AppError, middleware::AuthUser, state::AppState};

#[derive(Debug, Deserialize)]
struct CreateBookingRequest {
    movie: MovieId,
    seat: SeatId,
}

#[derive(Debug, Deserialize)]
struct ByMovieQuery {
    movie_id: Option<MovieId>,
}

/// The resolved booking, or its bare ids when resolution failed
#[derive(Debug, Serialize)]
#[serde(untagged)]
enum CreatedBooking {
    Detail(BookingDetail),
    Reference(Booking),
}

#[derive(Debug, Serialize)]
struct MessageResponse {
    message: String,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/bookings", get(list_bookings).post(create_booking))
        .route("/v1/bookings/my_bookings", get(my_bookings))
        .route("/v1/bookings/by_movie", get(bookings_by_movie))
        .route("/v1/bookings/{id}", get(get_booking))
        .route("/v1/bookings/{id}/cancel", post(cancel_booking))
}

async fn resolve_all(
    state: &AppState,
    filter: BookingFilter,
    user: &AuthUser,
    is_admin: bool,
) -> Result<Json<Vec<BookingDetail>>, AppError> {
    let bookings = state.coordinator.bookings(filter, user.id, is_admin).await?;
    let details = booking_details(state.catalog.as_ref(), state.users.as_ref(), bookings).await?;
    Ok(Json(details))
}

async fn list_bookings(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<Vec<BookingDetail>>, AppError> {
    resolve_all(&state, BookingFilter::default(), &user, user.is_admin).await
}

/// Own bookings only, admins included
async fn my_bookings(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<Vec<BookingDetail>>, AppError> {
    resolve_all(&state, BookingFilter::for_user(user.id), &user, false).await
}

async fn bookings_by_movie(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<ByMovieQuery>,
) -> Result<Json<Vec<BookingDetail>>, AppError> {
    let movie_id = query
        .movie_id
        .ok_or_else(|| AppError::ValidationError("movie_id parameter is required".to_string()))?;
    resolve_all(&state, BookingFilter::for_movie(movie_id), &user, user.is_admin).await
}

async fn get_booking(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<BookingId>,
) -> Result<Json<BookingDetail>, AppError> {
    let booking = state.coordinator.booking(id, user.id, user.is_admin).await?;
    let detail = booking_detail(state.catalog.as_ref(), state.users.as_ref(), booking).await?;
    Ok(Json(detail))
}

async fn create_booking(
    State(state): State<AppState>,
    user: AuthUser,
    Json(req): Json<CreateBookingRequest>,
) -> Result<(StatusCode, Json<CreatedBooking>), AppError> {
    let (booking, seat) = state.coordinator.reserve_with_seat(req.movie, req.seat, user.id).await?;
    state.publish(SeatEvent::booked(&booking, &seat.seat_number));

    // Committed from here on; a failed lookup must not turn into an error
    let body = match booking_detail(state.catalog.as_ref(), state.users.as_ref(), booking.clone()).await {
        Ok(detail) => {
            info!(booking_id = %booking.id, username = %user.username, "Booking created: {}", detail);
            CreatedBooking::Detail(detail)
        }
        Err(e) => {
            warn!(booking_id = %booking.id, error = %e, "Booking created but not resolved");
            CreatedBooking::Reference(booking)
        }
    };

    Ok((StatusCode::CREATED, Json(body)))
}

async fn cancel_booking(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<BookingId>,
) -> Result<Json<MessageResponse>, AppError> {
    let booking = state.coordinator.cancel(id, user.id, user.is_admin).await?;

    match state.catalog.get_seat(booking.seat_id).await {
        Ok(seat) => state.publish(SeatEvent::released(&booking, &seat.seat_number)),
        Err(e) => warn!(booking_id = %id, error = %e, "Seat released but not announced"),
    }

    Ok(Json(MessageResponse {
        message: "Booking cancelled successfully".to_string(),
    }))
}
