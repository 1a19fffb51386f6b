use std::collections::HashSet;
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

use super::agents::agents_of_user;
use super::contact_products::contact_product_views;
use super::status::{ContactStatus, GroupContactStatus};
use super::types::{
    AddGroupContactsRequest, AddGroupContactsResponse, CallGroup, CallGroupContact,
    CallGroupRequest, CallGroupView, GroupContactEntry,
};
use crate::core::shared::error::{ApiError, ApiJson, ApiPath};
use crate::core::shared::schema::{
    call_group_agents, call_group_contacts, call_groups, contact_products, contacts,
};
use crate::core::shared::state::AppState;
use crate::core::shared::utils::{non_blank, with_conn};
use crate::institution::access::require_member;
use crate::security::auth::AuthenticatedUser;

pub(crate) fn load_group(conn: &mut PgConnection, uuid: Uuid) -> Result<CallGroup, ApiError> {
    call_groups::table
        .find(uuid)
        .select(CallGroup::as_select())
        .first(conn)
        .optional()?
        .ok_or_else(|| ApiError::NotFound("Call group not found.".into()))
}

/// Moves contacts still marked `new` behind the given contact products to `assigned`.
pub(crate) fn mark_assigned(
    conn: &mut PgConnection,
    contact_product_uuids: &[Uuid],
) -> Result<usize, ApiError> {
    diesel::update(
        contacts::table
            .filter(contacts::status.eq(ContactStatus::New.as_str()))
            .filter(
                contacts::uuid.eq_any(
                    contact_products::table
                        .filter(contact_products::uuid.eq_any(contact_product_uuids.to_vec()))
                        .select(contact_products::contact_uuid),
                ),
            ),
    )
    .set((
        contacts::status.eq(ContactStatus::Assigned.as_str()),
        contacts::updated_at.eq(Utc::now()),
    ))
    .execute(conn)
    .map_err(ApiError::from)
}

pub(crate) fn group_entries(
    conn: &mut PgConnection,
    group_uuid: Uuid,
) -> Result<Vec<GroupContactEntry>, ApiError> {
    let rows: Vec<(CallGroupContact, Uuid, String, String, String)> = call_group_contacts::table
        .inner_join(contact_products::table.inner_join(contacts::table))
        .filter(call_group_contacts::call_group_uuid.eq(group_uuid))
        .select((
            CallGroupContact::as_select(),
            contacts::uuid,
            contacts::name,
            contacts::phone_number,
            contacts::status,
        ))
        .order(call_group_contacts::created_at.asc())
        .load(conn)?;

    Ok(rows
        .into_iter()
        .map(
            |(link, contact, name, phone_number, contact_status)| GroupContactEntry {
                group_contact: link.uuid,
                contact_product: link.contact_product_uuid,
                contact,
                name,
                phone_number,
                contact_status,
                status: link.status,
            },
        )
        .collect())
}

fn group_view(conn: &mut PgConnection, group: CallGroup) -> Result<CallGroupView, ApiError> {
    let mut seen = HashSet::new();
    let contacts = group_entries(conn, group.uuid)?
        .into_iter()
        .filter(|entry| seen.insert(entry.contact))
        .collect();
    Ok(CallGroupView { group, contacts })
}

pub(crate) fn group_views(
    conn: &mut PgConnection,
    groups: Vec<CallGroup>,
) -> Result<Vec<CallGroupView>, ApiError> {
    groups.into_iter().map(|g| group_view(conn, g)).collect()
}

fn required_name(name: Option<String>) -> Result<String, ApiError> {
    non_blank(name).ok_or_else(|| ApiError::field("name", "Name is required."))
}

pub async fn list_groups(
    State(state): State<Arc<AppState>>,
    auth: AuthenticatedUser,
    ApiPath(institution_id): ApiPath<i32>,
) -> Result<Json<Vec<CallGroupView>>, ApiError> {
    let views = with_conn(&state.conn, move |conn| {
        require_member(conn, &auth, institution_id)?;
        let groups = call_groups::table
            .filter(call_groups::institution_id.eq(institution_id))
            .select(CallGroup::as_select())
            .order(call_groups::created_at.desc())
            .load(conn)?;
        group_views(conn, groups)
    })
    .await?;
    Ok(Json(views))
}

pub async fn create_group(
    State(state): State<Arc<AppState>>,
    auth: AuthenticatedUser,
    ApiPath(institution_id): ApiPath<i32>,
    ApiJson(req): ApiJson<CallGroupRequest>,
) -> Result<(StatusCode, Json<CallGroupView>), ApiError> {
    let name = required_name(req.name)?;

    let view = with_conn(&state.conn, move |conn| {
        require_member(conn, &auth, institution_id)?;
        let group = CallGroup {
            uuid: Uuid::new_v4(),
            institution_id,
            name,
            created_at: Utc::now(),
            created_by: Some(auth.user_id),
        };
        diesel::insert_into(call_groups::table)
            .values(&group)
            .execute(conn)?;
        group_view(conn, group)
    })
    .await?;

    info!(
        "Created call group {} '{}' in institution {}",
        view.group.uuid, view.group.name, view.group.institution_id
    );
    Ok((StatusCode::CREATED, Json(view)))
}

pub async fn list_my_groups(
    State(state): State<Arc<AppState>>,
    auth: AuthenticatedUser,
    ApiPath(institution_id): ApiPath<i32>,
) -> Result<Json<Vec<CallGroupView>>, ApiError> {
    let views = with_conn(&state.conn, move |conn| {
        require_member(conn, &auth, institution_id)?;
        let agent_uuids = agents_of_user(conn, auth.user_id, institution_id)?;
        let groups = call_groups::table
            .filter(call_groups::institution_id.eq(institution_id))
            .filter(
                call_groups::uuid.eq_any(
                    call_group_agents::table
                        .filter(call_group_agents::agent_uuid.eq_any(agent_uuids))
                        .select(call_group_agents::call_group_uuid),
                ),
            )
            .select(CallGroup::as_select())
            .order(call_groups::created_at.desc())
            .load(conn)?;
        group_views(conn, groups)
    })
    .await?;
    Ok(Json(views))
}

pub async fn get_group(
    State(state): State<Arc<AppState>>,
    auth: AuthenticatedUser,
    ApiPath(uuid): ApiPath<Uuid>,
) -> Result<Json<CallGroupView>, ApiError> {
    let view = with_conn(&state.conn, move |conn| {
        let group = load_group(conn, uuid)?;
        require_member(conn, &auth, group.institution_id)?;
        group_view(conn, group)
    })
    .await?;
    Ok(Json(view))
}

pub async fn update_group(
    State(state): State<Arc<AppState>>,
    auth: AuthenticatedUser,
    ApiPath(uuid): ApiPath<Uuid>,
    ApiJson(req): ApiJson<CallGroupRequest>,
) -> Result<Json<CallGroupView>, ApiError> {
    let name = match req.name {
        Some(name) => Some(required_name(Some(name))?),
        None => None,
    };

    let view = with_conn(&state.conn, move |conn| {
        let group = load_group(conn, uuid)?;
        require_member(conn, &auth, group.institution_id)?;
        let group = match name {
            Some(name) => diesel::update(call_groups::table.find(uuid))
                .set(call_groups::name.eq(name))
                .returning(CallGroup::as_returning())
                .get_result(conn)?,
            None => group,
        };
        group_view(conn, group)
    })
    .await?;

    info!("Updated call group {}", view.group.uuid);
    Ok(Json(view))
}

pub async fn delete_group(
    State(state): State<Arc<AppState>>,
    auth: AuthenticatedUser,
    ApiPath(uuid): ApiPath<Uuid>,
) -> Result<StatusCode, ApiError> {
    with_conn(&state.conn, move |conn| {
        let group = load_group(conn, uuid)?;
        require_member(conn, &auth, group.institution_id)?;
        diesel::delete(call_groups::table.find(uuid)).execute(conn)?;
        Ok(())
    })
    .await?;

    info!("Deleted call group {}", uuid);
    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_group_contacts(
    State(state): State<Arc<AppState>>,
    auth: AuthenticatedUser,
    ApiPath(call_group_uuid): ApiPath<Uuid>,
) -> Result<Json<Vec<GroupContactEntry>>, ApiError> {
    let entries = with_conn(&state.conn, move |conn| {
        let group = load_group(conn, call_group_uuid)?;
        require_member(conn, &auth, group.institution_id)?;
        group_entries(conn, group.uuid)
    })
    .await?;
    Ok(Json(entries))
}

pub async fn add_group_contacts(
    State(state): State<Arc<AppState>>,
    auth: AuthenticatedUser,
    ApiPath(call_group_uuid): ApiPath<Uuid>,
    ApiJson(req): ApiJson<AddGroupContactsRequest>,
) -> Result<(StatusCode, Json<AddGroupContactsResponse>), ApiError> {
    if req.contact_products.is_empty() {
        return Err(ApiError::field(
            "contact_products",
            "At least one contact product is required.",
        ));
    }

    let response = with_conn(&state.conn, move |conn| {
        let group = load_group(conn, call_group_uuid)?;
        require_member(conn, &auth, group.institution_id)?;

        let mut requested: Vec<Uuid> = Vec::with_capacity(req.contact_products.len());
        for uuid in req.contact_products {
            if !requested.contains(&uuid) {
                requested.push(uuid);
            }
        }

        let found = contact_product_views(conn, Some(&requested), None)?;
        let foreign: Vec<String> = requested
            .iter()
            .filter(|uuid| {
                !found
                    .iter()
                    .any(|(view, inst)| view.link.uuid == **uuid && *inst == group.institution_id)
            })
            .map(Uuid::to_string)
            .collect();
        if !foreign.is_empty() {
            return Err(ApiError::field(
                "contact_products",
                format!(
                    "Contact products do not belong to this institution: {}",
                    foreign.join(", ")
                ),
            ));
        }

        let existing: HashSet<Uuid> = call_group_contacts::table
            .filter(call_group_contacts::call_group_uuid.eq(group.uuid))
            .filter(call_group_contacts::contact_product_uuid.eq_any(&requested))
            .select(call_group_contacts::contact_product_uuid)
            .load::<Uuid>(conn)?
            .into_iter()
            .collect();

        let now = Utc::now();
        let new_rows: Vec<CallGroupContact> = requested
            .iter()
            .filter(|uuid| !existing.contains(*uuid))
            .map(|uuid| CallGroupContact {
                uuid: Uuid::new_v4(),
                call_group_uuid: group.uuid,
                contact_product_uuid: *uuid,
                status: GroupContactStatus::NotAttended.as_str().to_string(),
                created_at: now,
            })
            .collect();

        let added_products: Vec<Uuid> = new_rows.iter().map(|r| r.contact_product_uuid).collect();
        if !new_rows.is_empty() {
            conn.transaction(|conn| {
                diesel::insert_into(call_group_contacts::table)
                    .values(&new_rows)
                    .execute(conn)?;
                mark_assigned(conn, &added_products)
            })?;
        }

        Ok(AddGroupContactsResponse {
            added_count: new_rows.len(),
            skipped_count: existing.len(),
            added: new_rows,
        })
    })
    .await?;

    info!(
        "Added {} contacts to call group {} ({} already present)",
        response.added_count, call_group_uuid, response.skipped_count
    );
    Ok((StatusCode::CREATED, Json(response)))
}
