use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};
use diesel::prelude::*;
use log::debug;

use crate::core::shared::error::ApiError;
use crate::core::shared::schema::users;
use crate::core::shared::state::AppState;
use crate::core::shared::utils::with_conn;
use crate::security::jwt::extract_bearer_token;

/// The caller behind a valid `Authorization: Bearer` token.
///
/// The staff flag and active state are re-read from the database on every
/// request, so revoking either takes effect before the token expires.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub user_id: i32,
    pub email: String,
    pub is_staff: bool,
}

#[async_trait]
impl FromRequestParts<Arc<AppState>> for AuthenticatedUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| {
                ApiError::Unauthorized("Authentication credentials were not provided.".into())
            })?;

        let token = extract_bearer_token(header)
            .ok_or_else(|| ApiError::Unauthorized("Invalid authorization header.".into()))?;

        let claims = state.jwt.validate_access_token(token).map_err(|e| {
            debug!("Rejected token: {}", e);
            ApiError::Unauthorized("Invalid or expired token.".into())
        })?;

        let user_id = claims
            .user_id()
            .map_err(|_| ApiError::Unauthorized("Invalid or expired token.".into()))?;

        let row = with_conn(&state.conn, move |conn| {
            users::table
                .find(user_id)
                .select((users::email, users::is_active, users::is_staff))
                .first::<(String, bool, bool)>(conn)
                .optional()
                .map_err(ApiError::from)
        })
        .await?;

        match row {
            Some((email, true, is_staff)) => Ok(Self {
                user_id,
                email,
                is_staff,
            }),
            Some((_, false, _)) => Err(ApiError::Unauthorized("User account is disabled.".into())),
            None => Err(ApiError::Unauthorized("User not found.".into())),
        }
    }
}
