use axum::{
    extract::{ConnectInfo, Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use boxoffice_store::redis_repo::rate_limit_key;
use std::net::SocketAddr;

use crate::error::AppError;
use crate::state::AppState;

/// Per client IP fixed window. Fails open when Redis is unreachable.
pub async fn rate_limit_middleware(State(state): State<AppState>, req: Request, next: Next) -> Response {
    let Some(redis) = state.redis.as_ref() else {
        return next.run(req).await;
    };

    let client = req
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string());
    let key = rate_limit_key(&client);

    match redis
        .check_rate_limit(&key, state.rate_limit.requests, state.rate_limit.window_seconds)
        .await
    {
        Ok(true) => next.run(req).await,
        Ok(false) => AppError::TooManyRequests("Rate limit exceeded".to_string()).into_response(),
        Err(e) => {
            tracing::warn!(error = %e, "Rate limiter unavailable, letting request through");
            next.run(req).await
        }
    }
}
