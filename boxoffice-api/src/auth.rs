use axum::{
    extract::State,
    http::StatusCode,
    routing::post,
    Json, Router,
};
use boxoffice_shared::{NewUser, User};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{error::AppError, middleware::auth::issue_token, state::AppState};

#[derive(Debug, Deserialize)]
struct TokenRequest {
    username: String,
    password: String,
}

#[derive(Debug, Serialize)]
struct TokenResponse {
    token: String,
    expires_in: u64,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/auth/token", post(issue))
        .route("/v1/auth/register", post(register))
}

async fn issue(
    State(state): State<AppState>,
    Json(req): Json<TokenRequest>,
) -> Result<Json<TokenResponse>, AppError> {
    let user = state.users.verify_credentials(&req.username, &req.password).await?;
    let token = issue_token(&state.auth, &user)?;

    info!(user_id = %user.id, "Token issued");
    Ok(Json(TokenResponse { token, expires_in: state.auth.expiration }))
}

async fn register(
    State(state): State<AppState>,
    Json(new_user): Json<NewUser>,
) -> Result<(StatusCode, Json<User>), AppError> {
    new_user.validate()?;
    let user = state.users.create_user(new_user).await?;

    info!(user_id = %user.id, username = %user.username, "User registered");
    Ok((StatusCode::CREATED, Json(user)))
}
