use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use boxoffice_shared::{Movie, MovieId, NewMovie, Seat, SeatFilter};
use serde::Serialize;
use tracing::info;

use crate::{error::AppError, middleware::AdminUser, state::AppState};

#[derive(Debug, Serialize)]
struct MovieSeats {
    movie: Movie,
    available_seats: Vec<Seat>,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/movies", get(list_movies).post(create_movie))
        .route("/v1/movies/{id}", get(get_movie).put(update_movie).delete(delete_movie))
        .route("/v1/movies/{id}/available_seats", get(available_seats))
}

async fn list_movies(State(state): State<AppState>) -> Result<Json<Vec<Movie>>, AppError> {
    Ok(Json(state.catalog.list_movies().await?))
}

async fn get_movie(
    State(state): State<AppState>,
    Path(id): Path<MovieId>,
) -> Result<Json<Movie>, AppError> {
    Ok(Json(state.catalog.get_movie(id).await?))
}

async fn create_movie(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Json(movie): Json<NewMovie>,
) -> Result<(StatusCode, Json<Movie>), AppError> {
    movie.validate()?;
    let movie = state.catalog.create_movie(movie).await?;

    info!(movie_id = %movie.id, admin = %admin.username, "Movie created");
    Ok((StatusCode::CREATED, Json(movie)))
}

async fn update_movie(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path(id): Path<MovieId>,
    Json(movie): Json<NewMovie>,
) -> Result<Json<Movie>, AppError> {
    movie.validate()?;
    let movie = state.catalog.update_movie(id, movie).await?;

    info!(movie_id = %id, admin = %admin.username, "Movie updated");
    Ok(Json(movie))
}

async fn delete_movie(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path(id): Path<MovieId>,
) -> Result<StatusCode, AppError> {
    state.catalog.delete_movie(id).await?;

    info!(movie_id = %id, admin = %admin.username, "Movie deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// Availability is tracked per seat, not per screening, so every movie
/// sees the same free seats.
async fn available_seats(
    State(state): State<AppState>,
    Path(id): Path<MovieId>,
) -> Result<Json<MovieSeats>, AppError> {
    let movie = state.catalog.get_movie(id).await?;
    let available_seats = state.catalog.list_seats(&SeatFilter::available()).await?;
    Ok(Json(MovieSeats { movie, available_seats }))
}
