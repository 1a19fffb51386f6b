use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    Json,
};
use chrono::Utc;
use diesel::prelude::*;
use log::info;

use super::access::{load_institution, require_member, require_owner};
use super::types::{CreateProfileRequest, CreatedProfileView, ProfileChanges, UpdateProfileRequest};
use crate::core::shared::error::{ApiError, ApiJson, ApiPath, ApiQuery};
use crate::core::shared::pagination::{Page, PageParams};
use crate::core::shared::schema::{profiles, users};
use crate::core::shared::state::AppState;
use crate::core::shared::utils::{non_blank, with_conn};
use crate::core::urls::ApiUrls;
use crate::security::auth::AuthenticatedUser;
use crate::security::password::generate_compliant_password;
use crate::users::service::{create_user, get_user, profile_for_user, validate_registration};
use crate::users::types::{NewProfile, Profile, ProfileView, User};

const TEMPORARY_PASSWORD_LENGTH: usize = 12;

fn can_manage_profile(
    conn: &mut PgConnection,
    auth: &AuthenticatedUser,
    profile: &Profile,
) -> Result<bool, ApiError> {
    if auth.is_staff || profile.user_id == auth.user_id {
        return Ok(true);
    }
    match profile.institution_id {
        Some(institution_id) => {
            let institution = load_institution(conn, institution_id)?;
            Ok(institution.owner_id == auth.user_id)
        }
        None => Ok(false),
    }
}

fn load_profile_for_user(conn: &mut PgConnection, user_id: i32) -> Result<Profile, ApiError> {
    profile_for_user(conn, user_id)?.ok_or_else(|| ApiError::NotFound("Profile not found.".into()))
}

pub async fn create_profile(
    State(state): State<Arc<AppState>>,
    auth: AuthenticatedUser,
    ApiJson(req): ApiJson<CreateProfileRequest>,
) -> Result<(StatusCode, Json<CreatedProfileView>), ApiError> {
    validate_registration(&req.user.email, &req.user.fullname, None).into_result()?;
    let temporary_password = generate_compliant_password(TEMPORARY_PASSWORD_LENGTH);
    let password = temporary_password.clone();

    let (profile, user) = with_conn(&state.conn, move |conn| {
        require_owner(conn, &auth, req.institution)?;
        conn.transaction(|conn| {
            let user = create_user(conn, &req.user.email, &req.user.fullname, &password, false)?;
            let profile = diesel::insert_into(profiles::table)
                .values(&NewProfile {
                    user_id: user.id,
                    institution_id: Some(req.institution),
                    phone_number: non_blank(req.phone_number),
                    bio: non_blank(req.bio),
                    created_at: Utc::now(),
                })
                .returning(Profile::as_returning())
                .get_result(conn)?;
            Ok((profile, user))
        })
    })
    .await?;

    info!(
        "Created profile {} for user {} in institution {:?}",
        profile.id, user.id, profile.institution_id
    );
    Ok((
        StatusCode::CREATED,
        Json(CreatedProfileView {
            profile: ProfileView::new(&profile, &user),
            temporary_password,
        }),
    ))
}

pub async fn list_institution_profiles(
    State(state): State<Arc<AppState>>,
    auth: AuthenticatedUser,
    ApiPath(institution_id): ApiPath<i32>,
    ApiQuery(params): ApiQuery<PageParams>,
) -> Result<Json<Page<ProfileView>>, ApiError> {
    let base = state.absolute_url(
        &ApiUrls::INSTITUTION_PROFILES.replace(":institution_id", &institution_id.to_string()),
    );
    let page_params = params.clone();

    let (rows, count) = with_conn(&state.conn, move |conn| {
        require_member(conn, &auth, institution_id)?;
        let count: i64 = profiles::table
            .filter(profiles::institution_id.eq(institution_id))
            .count()
            .get_result(conn)?;
        let rows = profiles::table
            .inner_join(users::table)
            .filter(profiles::institution_id.eq(institution_id))
            .select((Profile::as_select(), User::as_select()))
            .order(profiles::id.asc())
            .limit(page_params.page_size())
            .offset(page_params.offset())
            .load::<(Profile, User)>(conn)?;
        Ok((rows, count))
    })
    .await?;

    let results = rows
        .iter()
        .map(|(profile, user)| ProfileView::new(profile, user))
        .collect();
    Ok(Json(Page::new(results, count, &params, &base)))
}

pub async fn get_user_profile(
    State(state): State<Arc<AppState>>,
    auth: AuthenticatedUser,
    ApiPath(user_id): ApiPath<i32>,
) -> Result<Json<ProfileView>, ApiError> {
    let (profile, user) = with_conn(&state.conn, move |conn| {
        let profile = load_profile_for_user(conn, user_id)?;
        if !can_manage_profile(conn, &auth, &profile)? {
            return Err(ApiError::access_denied());
        }
        let user = get_user(conn, user_id)?;
        Ok((profile, user))
    })
    .await?;
    Ok(Json(ProfileView::new(&profile, &user)))
}

pub async fn update_user_profile(
    State(state): State<Arc<AppState>>,
    auth: AuthenticatedUser,
    ApiPath(user_id): ApiPath<i32>,
    ApiJson(req): ApiJson<UpdateProfileRequest>,
) -> Result<Json<ProfileView>, ApiError> {
    if req.fullname.as_deref().is_some_and(|n| n.trim().is_empty()) {
        return Err(ApiError::field("fullname", "Full name is required."));
    }

    let (profile, user) = with_conn(&state.conn, move |conn| {
        let profile = load_profile_for_user(conn, user_id)?;
        if !can_manage_profile(conn, &auth, &profile)? {
            return Err(ApiError::access_denied());
        }

        conn.transaction(|conn| {
            let profile = if req.phone_number.is_some() || req.bio.is_some() {
                diesel::update(profiles::table.find(profile.id))
                    .set(&ProfileChanges {
                        phone_number: req.phone_number,
                        bio: req.bio,
                    })
                    .returning(Profile::as_returning())
                    .get_result(conn)?
            } else {
                profile
            };

            if let Some(fullname) = req.fullname {
                diesel::update(users::table.find(user_id))
                    .set((
                        users::fullname.eq(fullname.trim()),
                        users::updated_at.eq(Utc::now()),
                    ))
                    .execute(conn)?;
            }

            let user = get_user(conn, user_id)?;
            Ok((profile, user))
        })
    })
    .await?;

    info!("Updated profile {} for user {}", profile.id, user.id);
    Ok(Json(ProfileView::new(&profile, &user)))
}
