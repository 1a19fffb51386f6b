use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    Json,
};
use chrono::Utc;
use diesel::prelude::*;
use log::info;

use super::service::{authenticate, create_user, get_user, profile_for_user};
use super::types::{
    LoginRequest, LoginResponse, MeResponse, RegisterRequest, UpdateUserRequest, User,
    UserChanges, UserView,
};
use crate::core::shared::error::{ApiError, ApiJson, ApiPath};
use crate::core::shared::schema::users;
use crate::core::shared::state::AppState;
use crate::core::shared::utils::with_conn;
use crate::security::auth::AuthenticatedUser;

pub async fn register(
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<RegisterRequest>,
) -> Result<(StatusCode, Json<UserView>), ApiError> {
    let user = with_conn(&state.conn, move |conn| {
        create_user(conn, &req.email, &req.fullname, &req.password, false)
    })
    .await?;

    Ok((StatusCode::CREATED, Json(UserView::from(&user))))
}

pub async fn login(
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    let user = with_conn(&state.conn, move |conn| {
        authenticate(conn, &req.email, &req.password)
    })
    .await?;

    let token = state
        .jwt
        .generate_access_token(user.id, &user.email, user.is_staff)
        .map_err(|e| ApiError::Internal(e.to_string()))?;

    info!("User {} logged in", user.id);
    Ok(Json(LoginResponse {
        token,
        user: UserView::from(&user),
    }))
}

pub async fn me(
    State(state): State<Arc<AppState>>,
    auth: AuthenticatedUser,
) -> Result<Json<MeResponse>, ApiError> {
    let (user, profile) = with_conn(&state.conn, move |conn| {
        let user = get_user(conn, auth.user_id)?;
        let profile = profile_for_user(conn, auth.user_id)?;
        Ok((user, profile))
    })
    .await?;

    Ok(Json(MeResponse {
        user: UserView::from(&user),
        profile,
    }))
}

pub async fn get_user_by_id(
    State(state): State<Arc<AppState>>,
    auth: AuthenticatedUser,
    ApiPath(id): ApiPath<i32>,
) -> Result<Json<UserView>, ApiError> {
    if !auth.is_staff && auth.user_id != id {
        return Err(ApiError::access_denied());
    }
    let user = with_conn(&state.conn, move |conn| get_user(conn, id)).await?;
    Ok(Json(UserView::from(&user)))
}

pub async fn update_user(
    State(state): State<Arc<AppState>>,
    auth: AuthenticatedUser,
    ApiPath(id): ApiPath<i32>,
    ApiJson(req): ApiJson<UpdateUserRequest>,
) -> Result<Json<UserView>, ApiError> {
    if !auth.is_staff && auth.user_id != id {
        return Err(ApiError::access_denied());
    }
    if !auth.is_staff && (req.is_active.is_some() || req.is_staff.is_some()) {
        return Err(ApiError::Forbidden(
            "Only staff can change account status.".into(),
        ));
    }
    if let Some(name) = &req.fullname {
        if name.trim().is_empty() {
            return Err(ApiError::field("fullname", "Full name is required."));
        }
    }

    let user = with_conn(&state.conn, move |conn| {
        get_user(conn, id)?;
        diesel::update(users::table.find(id))
            .set(&UserChanges {
                fullname: req.fullname.map(|n| n.trim().to_string()),
                is_active: req.is_active,
                is_staff: req.is_staff,
                updated_at: Utc::now(),
            })
            .returning(User::as_returning())
            .get_result(conn)
            .map_err(ApiError::from)
    })
    .await?;

    info!("Updated user {}", user.id);
    Ok(Json(UserView::from(&user)))
}

pub async fn delete_user(
    State(state): State<Arc<AppState>>,
    auth: AuthenticatedUser,
    ApiPath(id): ApiPath<i32>,
) -> Result<StatusCode, ApiError> {
    if !auth.is_staff {
        return Err(ApiError::access_denied());
    }
    if auth.user_id == id {
        return Err(ApiError::Validation("You cannot delete your own account.".into()));
    }

    with_conn(&state.conn, move |conn| {
        let deleted = diesel::delete(users::table.find(id)).execute(conn)?;
        if deleted == 0 {
            return Err(ApiError::NotFound("User not found.".into()));
        }
        Ok(())
    })
    .await?;

    info!("Deleted user {}", id);
    Ok(StatusCode::NO_CONTENT)
}
