use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    Json,
};
use chrono::{NaiveTime, Utc};
use diesel::prelude::*;
use log::info;

use super::access::{is_owner, load_institution, require_member, require_owner};
use super::types::{
    Branch, BranchChanges, CreateBranchRequest, CreateUserBranchRequest, NewBranch,
    NewUserBranch, UpdateBranchRequest, UpdateUserBranchRequest, UserBranch,
};
use crate::core::shared::error::{ApiError, ApiJson, ApiPath, FieldErrors};
use crate::core::shared::schema::{branches, institutions, user_branches, users};
use crate::core::shared::state::AppState;
use crate::core::shared::utils::{non_blank, with_conn};
use crate::security::auth::AuthenticatedUser;
use crate::security::validation::{is_valid_email, is_valid_latitude, is_valid_longitude};

const DEFAULT_OPENING: (u32, u32) = (8, 0);
const DEFAULT_CLOSING: (u32, u32) = (23, 0);

pub(crate) fn parse_time(value: &str) -> Option<NaiveTime> {
    let value = value.trim();
    NaiveTime::parse_from_str(value, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(value, "%H:%M"))
        .ok()
}

fn parse_time_field(errors: &mut FieldErrors, field: &str, value: Option<&str>) -> Option<NaiveTime> {
    let value = value?;
    let parsed = parse_time(value);
    if parsed.is_none() {
        errors.add(field, "Time has wrong format. Use HH:MM or HH:MM:SS.");
    }
    parsed
}

fn validate_branch_fields(
    errors: &mut FieldErrors,
    email: Option<&str>,
    latitude: Option<f64>,
    longitude: Option<f64>,
) {
    if email.is_some_and(|e| !is_valid_email(e)) {
        errors.add("branch_email", "Enter a valid email address.");
    }
    if latitude.is_some_and(|v| !is_valid_latitude(v)) {
        errors.add("branch_latitude", "Latitude must be between -90 and 90.");
    }
    if longitude.is_some_and(|v| !is_valid_longitude(v)) {
        errors.add("branch_longitude", "Longitude must be between -180 and 180.");
    }
}

fn load_branch(conn: &mut PgConnection, id: i32) -> Result<Branch, ApiError> {
    branches::table
        .find(id)
        .select(Branch::as_select())
        .first(conn)
        .optional()?
        .ok_or_else(|| ApiError::NotFound("Branch not found.".into()))
}

fn load_user_branch(conn: &mut PgConnection, id: i32) -> Result<UserBranch, ApiError> {
    user_branches::table
        .find(id)
        .select(UserBranch::as_select())
        .first(conn)
        .optional()?
        .ok_or_else(|| ApiError::NotFound("User branch not found.".into()))
}

/// Loads the branch and requires the caller to own its institution.
fn require_branch_owner(
    conn: &mut PgConnection,
    auth: &AuthenticatedUser,
    branch_id: i32,
) -> Result<Branch, ApiError> {
    let branch = load_branch(conn, branch_id)?;
    require_owner(conn, auth, branch.institution_id)?;
    Ok(branch)
}

fn clear_other_defaults(
    conn: &mut PgConnection,
    user_id: i32,
    keep_id: Option<i32>,
) -> Result<(), ApiError> {
    let mut query = user_branches::table
        .select(user_branches::id)
        .filter(user_branches::user_id.eq(user_id))
        .filter(user_branches::is_default.eq(true))
        .into_boxed();
    if let Some(id) = keep_id {
        query = query.filter(user_branches::id.ne(id));
    }
    let ids: Vec<i32> = query.load(conn)?;
    if !ids.is_empty() {
        diesel::update(user_branches::table.filter(user_branches::id.eq_any(ids)))
            .set((
                user_branches::is_default.eq(false),
                user_branches::updated_at.eq(Utc::now()),
            ))
            .execute(conn)?;
    }
    Ok(())
}

// ===== Branches =====

pub async fn list_branches(
    State(state): State<Arc<AppState>>,
    auth: AuthenticatedUser,
) -> Result<Json<Vec<Branch>>, ApiError> {
    let rows = with_conn(&state.conn, move |conn| {
        let mut query = branches::table
            .select(Branch::as_select())
            .order(branches::id.asc())
            .into_boxed();
        if !auth.is_staff {
            let owned = institutions::table
                .filter(institutions::owner_id.eq(auth.user_id))
                .select(institutions::id);
            let linked = user_branches::table
                .filter(user_branches::user_id.eq(auth.user_id))
                .select(user_branches::branch_id);
            query = query.filter(
                branches::institution_id
                    .eq_any(owned)
                    .or(branches::id.eq_any(linked)),
            );
        }
        query.load(conn).map_err(ApiError::from)
    })
    .await?;
    Ok(Json(rows))
}

pub async fn create_branch(
    State(state): State<Arc<AppState>>,
    auth: AuthenticatedUser,
    ApiJson(req): ApiJson<CreateBranchRequest>,
) -> Result<(StatusCode, Json<Branch>), ApiError> {
    let mut errors = FieldErrors::new();
    let location = req.branch_location.trim().to_string();
    if location.is_empty() {
        errors.add("branch_location", "Branch location is required.");
    }
    let email = non_blank(req.branch_email);
    validate_branch_fields(
        &mut errors,
        email.as_deref(),
        req.branch_latitude,
        req.branch_longitude,
    );
    let opening = parse_time_field(&mut errors, "branch_opening_time", req.branch_opening_time.as_deref());
    let closing = parse_time_field(&mut errors, "branch_closing_time", req.branch_closing_time.as_deref());
    errors.into_result()?;

    let default_time = |(h, m): (u32, u32)| {
        NaiveTime::from_hms_opt(h, m, 0)
            .ok_or_else(|| ApiError::Internal("Invalid default branch hours".into()))
    };
    let opening = match opening {
        Some(t) => t,
        None => default_time(DEFAULT_OPENING)?,
    };
    let closing = match closing {
        Some(t) => t,
        None => default_time(DEFAULT_CLOSING)?,
    };

    let branch = with_conn(&state.conn, move |conn| {
        require_owner(conn, &auth, req.institution)?;
        let now = Utc::now();
        diesel::insert_into(branches::table)
            .values(&NewBranch {
                institution_id: req.institution,
                branch_name: non_blank(req.branch_name),
                branch_phone_number: non_blank(req.branch_phone_number),
                branch_location: location,
                branch_latitude: req.branch_latitude,
                branch_longitude: req.branch_longitude,
                branch_email: email,
                branch_opening_time: opening,
                branch_closing_time: closing,
                created_at: now,
                updated_at: now,
                created_by: Some(auth.user_id),
            })
            .returning(Branch::as_returning())
            .get_result(conn)
            .map_err(ApiError::from)
    })
    .await?;

    info!("Created branch {} for institution {}", branch.id, branch.institution_id);
    Ok((StatusCode::CREATED, Json(branch)))
}

pub async fn get_branch(
    State(state): State<Arc<AppState>>,
    auth: AuthenticatedUser,
    ApiPath(branch_id): ApiPath<i32>,
) -> Result<Json<Branch>, ApiError> {
    let branch = with_conn(&state.conn, move |conn| {
        let branch = load_branch(conn, branch_id)?;
        let institution = load_institution(conn, branch.institution_id)?;
        if is_owner(&auth, &institution) {
            return Ok(branch);
        }
        let linked: i64 = user_branches::table
            .filter(user_branches::user_id.eq(auth.user_id))
            .filter(user_branches::branch_id.eq(branch_id))
            .count()
            .get_result(conn)?;
        if linked == 0 {
            return Err(ApiError::access_denied());
        }
        Ok(branch)
    })
    .await?;
    Ok(Json(branch))
}

pub async fn update_branch(
    State(state): State<Arc<AppState>>,
    auth: AuthenticatedUser,
    ApiPath(branch_id): ApiPath<i32>,
    ApiJson(req): ApiJson<UpdateBranchRequest>,
) -> Result<Json<Branch>, ApiError> {
    let mut errors = FieldErrors::new();
    if req
        .branch_location
        .as_deref()
        .is_some_and(|l| l.trim().is_empty())
    {
        errors.add("branch_location", "Branch location is required.");
    }
    validate_branch_fields(
        &mut errors,
        req.branch_email.as_deref(),
        req.branch_latitude,
        req.branch_longitude,
    );
    let opening = parse_time_field(&mut errors, "branch_opening_time", req.branch_opening_time.as_deref());
    let closing = parse_time_field(&mut errors, "branch_closing_time", req.branch_closing_time.as_deref());
    errors.into_result()?;

    let branch = with_conn(&state.conn, move |conn| {
        require_branch_owner(conn, &auth, branch_id)?;
        diesel::update(branches::table.find(branch_id))
            .set(&BranchChanges {
                branch_name: req.branch_name,
                branch_phone_number: req.branch_phone_number,
                branch_location: req.branch_location.map(|l| l.trim().to_string()),
                branch_latitude: req.branch_latitude,
                branch_longitude: req.branch_longitude,
                branch_email: req.branch_email,
                branch_opening_time: opening,
                branch_closing_time: closing,
                updated_at: Utc::now(),
            })
            .returning(Branch::as_returning())
            .get_result(conn)
            .map_err(ApiError::from)
    })
    .await?;

    info!("Updated branch {}", branch.id);
    Ok(Json(branch))
}

pub async fn delete_branch(
    State(state): State<Arc<AppState>>,
    auth: AuthenticatedUser,
    ApiPath(branch_id): ApiPath<i32>,
) -> Result<StatusCode, ApiError> {
    with_conn(&state.conn, move |conn| {
        require_branch_owner(conn, &auth, branch_id)?;
        diesel::delete(branches::table.find(branch_id)).execute(conn)?;
        Ok(())
    })
    .await?;

    info!("Deleted branch {}", branch_id);
    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_institution_branches(
    State(state): State<Arc<AppState>>,
    auth: AuthenticatedUser,
    ApiPath(institution_id): ApiPath<i32>,
) -> Result<Json<Vec<Branch>>, ApiError> {
    let rows = with_conn(&state.conn, move |conn| {
        let institution = require_member(conn, &auth, institution_id)?;
        let mut query = branches::table
            .filter(branches::institution_id.eq(institution_id))
            .select(Branch::as_select())
            .order(branches::id.asc())
            .into_boxed();
        if !is_owner(&auth, &institution) {
            let linked = user_branches::table
                .filter(user_branches::user_id.eq(auth.user_id))
                .select(user_branches::branch_id);
            query = query.filter(branches::id.eq_any(linked));
        }
        query.load(conn).map_err(ApiError::from)
    })
    .await?;
    Ok(Json(rows))
}

// ===== User branches =====

pub async fn list_user_branches(
    State(state): State<Arc<AppState>>,
    auth: AuthenticatedUser,
) -> Result<Json<Vec<UserBranch>>, ApiError> {
    let rows = with_conn(&state.conn, move |conn| {
        let mut query = user_branches::table
            .select(UserBranch::as_select())
            .order(user_branches::id.asc())
            .into_boxed();
        if !auth.is_staff {
            let owned_branches = branches::table
                .inner_join(institutions::table)
                .filter(institutions::owner_id.eq(auth.user_id))
                .select(branches::id);
            query = query.filter(
                user_branches::user_id
                    .eq(auth.user_id)
                    .or(user_branches::branch_id.eq_any(owned_branches)),
            );
        }
        query.load(conn).map_err(ApiError::from)
    })
    .await?;
    Ok(Json(rows))
}

pub async fn create_user_branch(
    State(state): State<Arc<AppState>>,
    auth: AuthenticatedUser,
    ApiJson(req): ApiJson<CreateUserBranchRequest>,
) -> Result<(StatusCode, Json<UserBranch>), ApiError> {
    let link = with_conn(&state.conn, move |conn| {
        require_branch_owner(conn, &auth, req.branch)?;
        let user_exists: i64 = users::table
            .filter(users::id.eq(req.user))
            .count()
            .get_result(conn)?;
        if user_exists == 0 {
            return Err(ApiError::field("user", "User not found."));
        }

        conn.transaction(|conn| {
            if req.is_default {
                clear_other_defaults(conn, req.user, None)?;
            }
            let now = Utc::now();
            diesel::insert_into(user_branches::table)
                .values(&NewUserBranch {
                    user_id: req.user,
                    branch_id: req.branch,
                    is_default: req.is_default,
                    created_at: now,
                    updated_at: now,
                    created_by: Some(auth.user_id),
                })
                .returning(UserBranch::as_returning())
                .get_result(conn)
                .map_err(ApiError::from)
        })
    })
    .await?;

    info!("Assigned user {} to branch {}", link.user_id, link.branch_id);
    Ok((StatusCode::CREATED, Json(link)))
}

pub async fn get_user_branch(
    State(state): State<Arc<AppState>>,
    auth: AuthenticatedUser,
    ApiPath(user_branch_id): ApiPath<i32>,
) -> Result<Json<UserBranch>, ApiError> {
    let link = with_conn(&state.conn, move |conn| {
        let link = load_user_branch(conn, user_branch_id)?;
        if link.user_id != auth.user_id {
            require_branch_owner(conn, &auth, link.branch_id)?;
        }
        Ok(link)
    })
    .await?;
    Ok(Json(link))
}

pub async fn update_user_branch(
    State(state): State<Arc<AppState>>,
    auth: AuthenticatedUser,
    ApiPath(user_branch_id): ApiPath<i32>,
    ApiJson(req): ApiJson<UpdateUserBranchRequest>,
) -> Result<Json<UserBranch>, ApiError> {
    let link = with_conn(&state.conn, move |conn| {
        let link = load_user_branch(conn, user_branch_id)?;
        require_branch_owner(conn, &auth, link.branch_id)?;

        let Some(is_default) = req.is_default else {
            return Ok(link);
        };

        conn.transaction(|conn| {
            if is_default {
                clear_other_defaults(conn, link.user_id, Some(link.id))?;
            }
            diesel::update(user_branches::table.find(link.id))
                .set((
                    user_branches::is_default.eq(is_default),
                    user_branches::updated_at.eq(Utc::now()),
                ))
                .returning(UserBranch::as_returning())
                .get_result(conn)
                .map_err(ApiError::from)
        })
    })
    .await?;

    info!("Updated user branch {}", link.id);
    Ok(Json(link))
}

pub async fn delete_user_branch(
    State(state): State<Arc<AppState>>,
    auth: AuthenticatedUser,
    ApiPath(user_branch_id): ApiPath<i32>,
) -> Result<StatusCode, ApiError> {
    with_conn(&state.conn, move |conn| {
        let link = load_user_branch(conn, user_branch_id)?;
        require_branch_owner(conn, &auth, link.branch_id)?;
        diesel::delete(user_branches::table.find(link.id)).execute(conn)?;
        Ok(())
    })
    .await?;

    info!("Deleted user branch {}", user_branch_id);
    Ok(StatusCode::NO_CONTENT)
}

pub async fn delete_user_branch_by_ids(
    State(state): State<Arc<AppState>>,
    auth: AuthenticatedUser,
    ApiPath((user_id, branch_id)): ApiPath<(i32, i32)>,
) -> Result<StatusCode, ApiError> {
    with_conn(&state.conn, move |conn| {
        require_branch_owner(conn, &auth, branch_id)?;
        let deleted = diesel::delete(
            user_branches::table
                .filter(user_branches::user_id.eq(user_id))
                .filter(user_branches::branch_id.eq(branch_id)),
        )
        .execute(conn)?;
        if deleted == 0 {
            return Err(ApiError::NotFound("User branch not found.".into()));
        }
        Ok(())
    })
    .await?;

    info!("Removed user {} from branch {}", user_id, branch_id);
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_time() {
        assert_eq!(parse_time("08:00"), NaiveTime::from_hms_opt(8, 0, 0));
        assert_eq!(parse_time("23:15:30"), NaiveTime::from_hms_opt(23, 15, 30));
        assert_eq!(parse_time("25:00"), None);
        assert_eq!(parse_time("noon"), None);
    }

    #[test]
    fn test_time_field_errors() {
        let mut errors = FieldErrors::new();
        assert!(parse_time_field(&mut errors, "branch_opening_time", None).is_none());
        assert!(errors.is_empty());

        parse_time_field(&mut errors, "branch_opening_time", Some("8am"));
        assert!(errors.get("branch_opening_time").is_some());
    }
}
