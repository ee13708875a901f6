use axum::{extract::FromRequestParts, http::request::Parts};
use axum_extra::headers::{authorization::Bearer, Authorization};
use axum_extra::TypedHeader;
use boxoffice_shared::{User, UserId};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::state::{AppState, AuthConfig};

pub const ADMIN_ROLE: &str = "ADMIN";
pub const USER_ROLE: &str = "USER";

// ============================================================================
// JWT Claims
// ============================================================================

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// User id
    pub sub: String,
    pub username: String,
    pub role: String,
    pub exp: usize,
}

impl Claims {
    pub fn for_user(user: &User, expires_in: u64) -> Self {
        Self {
            sub: user.id.to_string(),
            username: user.username.clone(),
            role: if user.is_admin { ADMIN_ROLE } else { USER_ROLE }.to_owned(),
            exp: (Utc::now() + Duration::seconds(expires_in as i64)).timestamp() as usize,
        }
    }
}

pub fn issue_token(auth: &AuthConfig, user: &User) -> Result<String, AppError> {
    let claims = Claims::for_user(user, auth.expiration);
    encode(&Header::default(), &claims, &EncodingKey::from_secret(auth.secret.as_bytes()))
        .map_err(|e| AppError::InternalServerError(format!("Token encoding failed: {}", e)))
}

// ============================================================================
// Extractors
// ============================================================================

/// Any authenticated caller
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: UserId,
    pub username: String,
    pub is_admin: bool,
}

/// An authenticated caller holding the ADMIN role
#[derive(Debug, Clone)]
pub struct AdminUser(pub AuthUser);

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let TypedHeader(Authorization(bearer)) =
            TypedHeader::<Authorization<Bearer>>::from_request_parts(parts, state)
                .await
                .map_err(|_| AppError::AuthenticationError("Missing bearer token".to_string()))?;

        let token_data = decode::<Claims>(
            bearer.token(),
            &DecodingKey::from_secret(state.auth.secret.as_bytes()),
            &Validation::default(),
        )
        .map_err(|e| AppError::AuthenticationError(format!("Invalid token: {}", e)))?;

        let claims = token_data.claims;
        let id = claims
            .sub
            .parse::<UserId>()
            .map_err(|_| AppError::AuthenticationError("Invalid token subject".to_string()))?;

        Ok(AuthUser {
            id,
            username: claims.username,
            is_admin: claims.role == ADMIN_ROLE,
        })
    }
}

impl FromRequestParts<AppState> for AdminUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let user = AuthUser::from_request_parts(parts, state).await?;
        if !user.is_admin {
            return Err(AppError::AuthorizationError("Admin privileges required".to_string()));
        }
        Ok(AdminUser(user))
    }
}
