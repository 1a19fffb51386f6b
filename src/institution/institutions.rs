use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    Json,
};
use chrono::Utc;
use diesel::prelude::*;
use log::info;

use super::access::require_owner;
use super::types::{
    ApprovalStatus, CreateInstitutionRequest, Institution, InstitutionChanges, InstitutionView,
    NewInstitution, UpdateInstitutionRequest,
};
use crate::core::shared::error::{ApiError, ApiJson, ApiPath, FieldErrors};
use crate::core::shared::schema::institutions;
use crate::core::shared::state::AppState;
use crate::core::shared::utils::{non_blank, with_conn};
use crate::security::auth::AuthenticatedUser;
use crate::security::validation::{
    is_valid_email, is_valid_hex_color, is_valid_latitude, is_valid_longitude,
};

fn validate_contact_fields(
    errors: &mut FieldErrors,
    email: Option<&str>,
    theme_color: Option<&str>,
    latitude: Option<f64>,
    longitude: Option<f64>,
) {
    if let Some(email) = email {
        if !is_valid_email(email) {
            errors.add("institution_email", "Enter a valid email address.");
        }
    }
    if let Some(color) = theme_color {
        if !is_valid_hex_color(color) {
            errors.add("theme_color", "Enter a hex color such as #1A73E8.");
        }
    }
    if latitude.is_some_and(|v| !is_valid_latitude(v)) {
        errors.add("latitude", "Latitude must be between -90 and 90.");
    }
    if longitude.is_some_and(|v| !is_valid_longitude(v)) {
        errors.add("longitude", "Longitude must be between -180 and 180.");
    }
}

pub async fn list_institutions(
    State(state): State<Arc<AppState>>,
    auth: AuthenticatedUser,
) -> Result<Json<Vec<InstitutionView>>, ApiError> {
    let rows = with_conn(&state.conn, move |conn| {
        let mut query = institutions::table
            .select(Institution::as_select())
            .order(institutions::created_at.desc())
            .into_boxed();
        if !auth.is_staff {
            query = query.filter(institutions::owner_id.eq(auth.user_id));
        }
        query.load(conn).map_err(ApiError::from)
    })
    .await?;

    Ok(Json(rows.into_iter().map(InstitutionView::from).collect()))
}

pub async fn create_institution(
    State(state): State<Arc<AppState>>,
    auth: AuthenticatedUser,
    ApiJson(req): ApiJson<CreateInstitutionRequest>,
) -> Result<(StatusCode, Json<InstitutionView>), ApiError> {
    let name = req.institution_name.trim().to_string();
    let email = non_blank(req.institution_email);
    let theme_color = non_blank(req.theme_color);

    let mut errors = FieldErrors::new();
    if name.is_empty() {
        errors.add("institution_name", "Institution name is required.");
    }
    validate_contact_fields(
        &mut errors,
        email.as_deref(),
        theme_color.as_deref(),
        req.latitude,
        req.longitude,
    );
    errors.into_result()?;

    let institution = with_conn(&state.conn, move |conn| {
        let exists: i64 = institutions::table
            .filter(institutions::owner_id.eq(auth.user_id))
            .filter(institutions::institution_name.eq(&name))
            .count()
            .get_result(conn)?;
        if exists > 0 {
            return Err(ApiError::Conflict(
                "User Already has an Institution with the same name.".into(),
            ));
        }

        let now = Utc::now();
        diesel::insert_into(institutions::table)
            .values(&NewInstitution {
                owner_id: auth.user_id,
                institution_email: email,
                institution_name: name,
                first_phone_number: non_blank(req.first_phone_number),
                second_phone_number: non_blank(req.second_phone_number),
                institution_logo: non_blank(req.institution_logo),
                theme_color,
                setup: req.setup.unwrap_or(false),
                location: non_blank(req.location),
                latitude: req.latitude,
                longitude: req.longitude,
                approval_status: ApprovalStatus::Approved.as_str().to_string(),
                description: non_blank(req.description),
                created_at: now,
                updated_at: now,
                created_by: Some(auth.user_id),
            })
            .returning(Institution::as_returning())
            .get_result(conn)
            .map_err(ApiError::from)
    })
    .await?;

    info!(
        "Created institution {} '{}' for user {}",
        institution.id, institution.institution_name, institution.owner_id
    );
    Ok((StatusCode::CREATED, Json(institution.into())))
}

pub async fn get_institution(
    State(state): State<Arc<AppState>>,
    auth: AuthenticatedUser,
    ApiPath(institution_id): ApiPath<i32>,
) -> Result<Json<InstitutionView>, ApiError> {
    let institution = with_conn(&state.conn, move |conn| {
        require_owner(conn, &auth, institution_id)
    })
    .await?;
    Ok(Json(institution.into()))
}

pub async fn update_institution(
    State(state): State<Arc<AppState>>,
    auth: AuthenticatedUser,
    ApiPath(institution_id): ApiPath<i32>,
    ApiJson(req): ApiJson<UpdateInstitutionRequest>,
) -> Result<Json<InstitutionView>, ApiError> {
    let mut errors = FieldErrors::new();
    if req
        .institution_name
        .as_deref()
        .is_some_and(|n| n.trim().is_empty())
    {
        errors.add("institution_name", "Institution name is required.");
    }
    validate_contact_fields(
        &mut errors,
        req.institution_email.as_deref(),
        req.theme_color.as_deref(),
        req.latitude,
        req.longitude,
    );
    if !auth.is_staff && (req.approval_status.is_some() || req.rejection_reason.is_some()) {
        errors.add(
            "approval_status",
            "Only staff can change the approval status.",
        );
    }
    errors.into_result()?;

    let institution = with_conn(&state.conn, move |conn| {
        let current = require_owner(conn, &auth, institution_id)?;

        if let Some(name) = req.institution_name.as_deref().map(str::trim) {
            if name != current.institution_name {
                let clash: i64 = institutions::table
                    .filter(institutions::owner_id.eq(current.owner_id))
                    .filter(institutions::institution_name.eq(name))
                    .count()
                    .get_result(conn)?;
                if clash > 0 {
                    return Err(ApiError::Conflict(
                        "User Already has an Institution with the same name.".into(),
                    ));
                }
            }
        }

        let now = Utc::now();
        let decided = matches!(
            req.approval_status,
            Some(ApprovalStatus::Approved | ApprovalStatus::Rejected)
        );

        diesel::update(institutions::table.find(institution_id))
            .set(&InstitutionChanges {
                institution_name: req.institution_name.map(|n| n.trim().to_string()),
                institution_email: req.institution_email,
                first_phone_number: req.first_phone_number,
                second_phone_number: req.second_phone_number,
                institution_logo: req.institution_logo,
                theme_color: req.theme_color,
                setup: req.setup,
                location: req.location,
                latitude: req.latitude,
                longitude: req.longitude,
                description: req.description,
                approval_status: req.approval_status.map(|s| s.as_str().to_string()),
                approval_date: decided.then_some(now),
                approved_by: decided.then_some(auth.user_id),
                rejection_reason: req.rejection_reason,
                updated_at: now,
            })
            .returning(Institution::as_returning())
            .get_result(conn)
            .map_err(ApiError::from)
    })
    .await?;

    info!("Updated institution {}", institution.id);
    Ok(Json(institution.into()))
}

pub async fn delete_institution(
    State(state): State<Arc<AppState>>,
    auth: AuthenticatedUser,
    ApiPath(institution_id): ApiPath<i32>,
) -> Result<StatusCode, ApiError> {
    with_conn(&state.conn, move |conn| {
        require_owner(conn, &auth, institution_id)?;
        diesel::delete(institutions::table.find(institution_id)).execute(conn)?;
        Ok(())
    })
    .await?;

    info!("Deleted institution {}", institution_id);
    Ok(StatusCode::NO_CONTENT)
}
