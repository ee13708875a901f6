use std::convert::Infallible;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::sse::{Event, KeepAlive, Sse},
    routing::get,
    Json, Router,
};
use boxoffice_shared::{Seat, SeatFilter, SeatId};
use futures_util::{Stream, StreamExt};
use serde::Deserialize;
use tokio_stream::wrappers::BroadcastStream;
use tracing::{info, warn};

use crate::{error::AppError, middleware::AdminUser, state::AppState};

#[derive(Debug, Deserialize)]
struct SeatQuery {
    available: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CreateSeatRequest {
    seat_number: String,
}

#[derive(Debug, Deserialize)]
struct StreamQuery {
    /// Only events for this seat
    seat_id: Option<SeatId>,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/seats", get(list_seats).post(create_seat))
        .route("/v1/seats/available", get(available_seats))
        .route("/v1/seats/booked", get(booked_seats))
        .route("/v1/seats/stream", get(seat_stream))
        .route("/v1/seats/{id}", get(get_seat).delete(delete_seat))
}

/// Accepts the usual spellings of a boolean query flag.
fn parse_flag(raw: &str) -> Option<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Some(true),
        "false" | "0" | "no" => Some(false),
        _ => None,
    }
}

async fn list_seats(
    State(state): State<AppState>,
    Query(query): Query<SeatQuery>,
) -> Result<Json<Vec<Seat>>, AppError> {
    let available = match query.available.as_deref() {
        None => None,
        Some(raw) => Some(parse_flag(raw).ok_or_else(|| {
            AppError::ValidationError(format!("Invalid value for available: {}", raw))
        })?),
    };
    Ok(Json(state.catalog.list_seats(&SeatFilter { available }).await?))
}

async fn available_seats(State(state): State<AppState>) -> Result<Json<Vec<Seat>>, AppError> {
    Ok(Json(state.catalog.list_seats(&SeatFilter::available()).await?))
}

async fn booked_seats(State(state): State<AppState>) -> Result<Json<Vec<Seat>>, AppError> {
    Ok(Json(state.catalog.list_seats(&SeatFilter::booked()).await?))
}

async fn get_seat(
    State(state): State<AppState>,
    Path(id): Path<SeatId>,
) -> Result<Json<Seat>, AppError> {
    Ok(Json(state.catalog.get_seat(id).await?))
}

async fn create_seat(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Json(req): Json<CreateSeatRequest>,
) -> Result<(StatusCode, Json<Seat>), AppError> {
    Seat::validate_number(&req.seat_number)?;
    let seat = state.catalog.create_seat(&req.seat_number).await?;

    info!(seat_id = %seat.id, seat_number = %seat.seat_number, admin = %admin.username, "Seat created");
    Ok((StatusCode::CREATED, Json(seat)))
}

async fn delete_seat(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path(id): Path<SeatId>,
) -> Result<StatusCode, AppError> {
    state.catalog.delete_seat(id).await?;

    info!(seat_id = %id, admin = %admin.username, "Seat deleted");
    Ok(StatusCode::NO_CONTENT)
}

async fn seat_stream(
    State(state): State<AppState>,
    Query(query): Query<StreamQuery>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = state.seat_events.subscribe();
    let only_seat = query.seat_id;

    let stream = BroadcastStream::new(rx).filter_map(move |result| async move {
        match result {
            Ok(event) if only_seat.map_or(true, |id| event.seat_id() == id) => {
                match Event::default().event(event.kind()).json_data(&event) {
                    Ok(sse) => Some(Ok::<_, Infallible>(sse)),
                    Err(e) => {
                        warn!(error = %e, "Dropping unserializable seat event");
                        None
                    }
                }
            }
            Ok(_) => None,
            Err(e) => {
                warn!(error = %e, "Seat stream subscriber lagged");
                None
            }
        }
    });

    Sse::new(stream).keep_alive(KeepAlive::default())
}
