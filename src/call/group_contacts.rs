use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    Json,
};
use chrono::Utc;
use diesel::prelude::*;
use log::info;
use uuid::Uuid;

use super::contact_products::load_contact_product_view;
use super::groups::{load_group, mark_assigned};
use super::status::GroupContactStatus;
use super::types::{CallGroupContact, CreateGroupContactRequest, UpdateStatusRequest};
use crate::core::shared::error::{ApiError, ApiJson, ApiPath, FieldErrors};
use crate::core::shared::schema::{call_group_contacts, call_groups};
use crate::core::shared::state::AppState;
use crate::core::shared::utils::with_conn;
use crate::institution::access::require_member;
use crate::security::auth::AuthenticatedUser;

fn load_group_contact(
    conn: &mut PgConnection,
    uuid: Uuid,
) -> Result<(CallGroupContact, i32), ApiError> {
    call_group_contacts::table
        .inner_join(call_groups::table)
        .filter(call_group_contacts::uuid.eq(uuid))
        .select((CallGroupContact::as_select(), call_groups::institution_id))
        .first(conn)
        .optional()?
        .ok_or_else(|| ApiError::NotFound("Call group contact not found.".into()))
}

pub async fn list_group_contacts(
    State(state): State<Arc<AppState>>,
    auth: AuthenticatedUser,
    ApiPath(institution_id): ApiPath<i32>,
) -> Result<Json<Vec<CallGroupContact>>, ApiError> {
    let rows = with_conn(&state.conn, move |conn| {
        require_member(conn, &auth, institution_id)?;
        call_group_contacts::table
            .inner_join(call_groups::table)
            .filter(call_groups::institution_id.eq(institution_id))
            .select(CallGroupContact::as_select())
            .order(call_group_contacts::created_at.desc())
            .load(conn)
            .map_err(ApiError::from)
    })
    .await?;
    Ok(Json(rows))
}

pub async fn create_group_contact(
    State(state): State<Arc<AppState>>,
    auth: AuthenticatedUser,
    ApiPath(institution_id): ApiPath<i32>,
    ApiJson(req): ApiJson<CreateGroupContactRequest>,
) -> Result<(StatusCode, Json<CallGroupContact>), ApiError> {
    let row = with_conn(&state.conn, move |conn| {
        require_member(conn, &auth, institution_id)?;

        let mut errors = FieldErrors::new();
        let group_ok = match load_group(conn, req.call_group) {
            Ok(group) => group.institution_id == institution_id,
            Err(ApiError::NotFound(_)) => false,
            Err(e) => return Err(e),
        };
        if !group_ok {
            errors.add("call_group", "Call group does not belong to this institution.");
        }
        let contact_ok = match load_contact_product_view(conn, req.contact_product) {
            Ok((_, owner)) => owner == institution_id,
            Err(ApiError::NotFound(_)) => false,
            Err(e) => return Err(e),
        };
        if !contact_ok {
            errors.add(
                "contact_product",
                "Contact does not belong to this institution.",
            );
        }
        errors.into_result()?;

        conn.transaction(|conn| {
            let row = diesel::insert_into(call_group_contacts::table)
                .values(&CallGroupContact {
                    uuid: Uuid::new_v4(),
                    call_group_uuid: req.call_group,
                    contact_product_uuid: req.contact_product,
                    status: req
                        .status
                        .unwrap_or(GroupContactStatus::NotAttended)
                        .as_str()
                        .to_string(),
                    created_at: Utc::now(),
                })
                .returning(CallGroupContact::as_returning())
                .get_result(conn)?;
            mark_assigned(conn, &[row.contact_product_uuid])?;
            Ok(row)
        })
    })
    .await?;

    info!(
        "Added contact product {} to call group {}",
        row.contact_product_uuid, row.call_group_uuid
    );
    Ok((StatusCode::CREATED, Json(row)))
}

pub async fn get_group_contact(
    State(state): State<Arc<AppState>>,
    auth: AuthenticatedUser,
    ApiPath(uuid): ApiPath<Uuid>,
) -> Result<Json<CallGroupContact>, ApiError> {
    let row = with_conn(&state.conn, move |conn| {
        let (row, institution_id) = load_group_contact(conn, uuid)?;
        require_member(conn, &auth, institution_id)?;
        Ok(row)
    })
    .await?;
    Ok(Json(row))
}

pub async fn update_group_contact(
    State(state): State<Arc<AppState>>,
    auth: AuthenticatedUser,
    ApiPath(uuid): ApiPath<Uuid>,
    ApiJson(req): ApiJson<UpdateStatusRequest<GroupContactStatus>>,
) -> Result<Json<CallGroupContact>, ApiError> {
    let row = with_conn(&state.conn, move |conn| {
        let (row, institution_id) = load_group_contact(conn, uuid)?;
        require_member(conn, &auth, institution_id)?;
        match req.status {
            Some(status) => diesel::update(call_group_contacts::table.find(uuid))
                .set(call_group_contacts::status.eq(status.as_str()))
                .returning(CallGroupContact::as_returning())
                .get_result(conn)
                .map_err(ApiError::from),
            None => Ok(row),
        }
    })
    .await?;

    info!("Updated call group contact {} ({})", row.uuid, row.status);
    Ok(Json(row))
}

pub async fn delete_group_contact(
    State(state): State<Arc<AppState>>,
    auth: AuthenticatedUser,
    ApiPath(uuid): ApiPath<Uuid>,
) -> Result<StatusCode, ApiError> {
    with_conn(&state.conn, move |conn| {
        let (_, institution_id) = load_group_contact(conn, uuid)?;
        require_member(conn, &auth, institution_id)?;
        diesel::delete(call_group_contacts::table.find(uuid)).execute(conn)?;
        Ok(())
    })
    .await?;

    info!("Removed call group contact {}", uuid);
    Ok(StatusCode::NO_CONTENT)
}
