use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    Json,
};
use chrono::Utc;
use diesel::prelude::*;
use log::{info, warn};
use serde_json::{Map, Value};
use uuid::Uuid;

use super::agents::{agent_user_id, load_agent};
use super::contact_products::contact_product_views;
use super::contacts::load_contact;
use super::feedback::{
    check_client_files, feedback_error, is_stored_file, validate_feedback, validate_upload,
};
use super::groups::group_views;
use super::status::{CallStatus, ContactStatus, GroupContactStatus};
use super::types::{Call, CallGroup, CallGroupView, CallView};
use super::uploads::{delete_files, store_uploads, CallPayload, UploadedFile};
use crate::core::shared::error::{ApiError, ApiPath};
use crate::core::shared::schema::{
    call_group_agents, call_group_contacts, call_groups, calls, contact_products, contacts,
    products, users,
};
use crate::core::shared::state::AppState;
use crate::core::shared::utils::with_conn;
use crate::institution::access::require_member;
use crate::institution::FeedbackSchema;
use crate::security::auth::AuthenticatedUser;

/// The contact product a call is logged against, with what validation needs.
#[derive(Debug, Clone)]
struct CallTarget {
    contact_product: Uuid,
    contact: Uuid,
    institution_id: i32,
    feedback_fields: Value,
}

fn load_target(
    conn: &mut PgConnection,
    contact_product: Uuid,
) -> Result<Option<CallTarget>, ApiError> {
    let row: Option<(Uuid, i32, Value)> = contact_products::table
        .inner_join(contacts::table)
        .inner_join(products::table)
        .filter(contact_products::uuid.eq(contact_product))
        .select((
            contacts::uuid,
            contacts::institution_id,
            products::feedback_fields,
        ))
        .first(conn)
        .optional()?;

    Ok(row.map(|(contact, institution_id, feedback_fields)| CallTarget {
        contact_product,
        contact,
        institution_id,
        feedback_fields,
    }))
}

fn target_in_institution(
    conn: &mut PgConnection,
    contact_product: Uuid,
    institution_id: i32,
) -> Result<CallTarget, ApiError> {
    match load_target(conn, contact_product)? {
        Some(target) if target.institution_id == institution_id => Ok(target),
        Some(_) => Err(ApiError::field(
            "contact",
            "Contact does not belong to this institution.",
        )),
        None => Err(ApiError::field("contact", "Contact not found.")),
    }
}

fn parse_contact(raw: Option<&str>) -> Result<Option<Uuid>, ApiError> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        None => Ok(None),
        Some(raw) => Uuid::parse_str(raw)
            .map(Some)
            .map_err(|_| ApiError::field("contact", "Invalid contact UUID.")),
    }
}

fn parse_status(raw: Option<&str>) -> Result<Option<CallStatus>, ApiError> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        None => Ok(None),
        Some(raw) => CallStatus::parse(raw).map(Some).ok_or_else(|| {
            ApiError::field(
                "status",
                format!(
                    "Invalid call status '{}'. Must be one of failed, completed, busy.",
                    raw
                ),
            )
        }),
    }
}

fn check_uploads(schema: &FeedbackSchema, files: &[UploadedFile]) -> Result<HashSet<String>, ApiError> {
    let mut fields = HashSet::with_capacity(files.len());
    for file in files {
        validate_upload(schema, &file.field, &file.file_name, file.data.len() as u64)
            .map_err(feedback_error)?;
        if !fields.insert(file.field.clone()) {
            return Err(feedback_error(format!(
                "Field '{}' received more than one file",
                file.field
            )));
        }
    }
    Ok(fields)
}

/// Side effects of a completed call on the contact and its call group rows.
fn apply_completed(conn: &mut PgConnection, target: &CallTarget) -> Result<(), ApiError> {
    let moved = diesel::update(
        contacts::table
            .filter(contacts::uuid.eq(target.contact))
            .filter(contacts::status.eq(ContactStatus::Assigned.as_str())),
    )
    .set((
        contacts::status.eq(ContactStatus::AttendedTo.as_str()),
        contacts::updated_at.eq(Utc::now()),
    ))
    .execute(conn)?;

    diesel::update(
        call_group_contacts::table
            .filter(call_group_contacts::contact_product_uuid.eq(target.contact_product)),
    )
    .set(call_group_contacts::status.eq(GroupContactStatus::AttendedTo.as_str()))
    .execute(conn)?;

    if moved > 0 {
        info!("Contact {} attended to", target.contact);
    }
    Ok(())
}

fn call_views(conn: &mut PgConnection, rows: Vec<Call>) -> Result<Vec<CallView>, ApiError> {
    let link_uuids: Vec<Uuid> = rows.iter().map(|c| c.contact_product_uuid).collect();
    let links: HashMap<Uuid, _> = contact_product_views(conn, Some(&link_uuids), None)?
        .into_iter()
        .map(|(view, _)| (view.link.uuid, view))
        .collect();

    let user_ids: Vec<i32> = rows.iter().filter_map(|c| c.made_by).collect();
    let names: HashMap<i32, String> = users::table
        .filter(users::id.eq_any(&user_ids))
        .select((users::id, users::fullname))
        .load::<(i32, String)>(conn)?
        .into_iter()
        .collect();

    rows.into_iter()
        .map(|call| {
            let link = links.get(&call.contact_product_uuid).ok_or_else(|| {
                ApiError::Internal(format!("Call {} lost its contact product", call.uuid))
            })?;
            Ok(CallView {
                contact_name: link.contact_name.clone(),
                phone_number: link.phone_number.clone(),
                product: link.link.product_uuid,
                product_name: link.product_name.clone(),
                made_by_name: call.made_by.and_then(|id| names.get(&id).cloned()),
                call,
            })
        })
        .collect()
}

fn call_view(conn: &mut PgConnection, call: Call) -> Result<CallView, ApiError> {
    call_views(conn, vec![call])?
        .pop()
        .ok_or_else(|| ApiError::Internal("Call view was not built".into()))
}

fn load_call(conn: &mut PgConnection, uuid: Uuid) -> Result<Call, ApiError> {
    calls::table
        .find(uuid)
        .select(Call::as_select())
        .first(conn)
        .optional()?
        .ok_or_else(|| ApiError::NotFound("Call not found.".into()))
}

/// Institution owning a call, through its contact.
fn call_institution(conn: &mut PgConnection, call: &Call) -> Result<i32, ApiError> {
    contact_products::table
        .inner_join(contacts::table)
        .filter(contact_products::uuid.eq(call.contact_product_uuid))
        .select(contacts::institution_id)
        .first(conn)
        .map_err(ApiError::from)
}

pub async fn list_calls(
    State(state): State<Arc<AppState>>,
    auth: AuthenticatedUser,
    ApiPath(institution_id): ApiPath<i32>,
) -> Result<Json<Vec<CallView>>, ApiError> {
    let views = with_conn(&state.conn, move |conn| {
        require_member(conn, &auth, institution_id)?;
        let rows = calls::table
            .inner_join(contact_products::table.inner_join(contacts::table))
            .filter(contacts::institution_id.eq(institution_id))
            .select(Call::as_select())
            .order(calls::made_on.desc())
            .load(conn)?;
        call_views(conn, rows)
    })
    .await?;
    Ok(Json(views))
}

pub async fn create_call(
    State(state): State<Arc<AppState>>,
    auth: AuthenticatedUser,
    ApiPath(institution_id): ApiPath<i32>,
    payload: CallPayload,
) -> Result<(StatusCode, Json<CallView>), ApiError> {
    let contact_product = parse_contact(payload.contact.as_deref())?
        .ok_or_else(|| ApiError::field("contact", "Contact UUID is required."))?;
    let status = parse_status(payload.status.as_deref())?.unwrap_or(CallStatus::Completed);

    let member = auth.clone();
    let target = with_conn(&state.conn, move |conn| {
        require_member(conn, &member, institution_id)?;
        target_in_institution(conn, contact_product, institution_id)
    })
    .await?;

    let schema = FeedbackSchema::from_stored(&target.feedback_fields);
    let uploaded = check_uploads(&schema, &payload.files)?;
    let mut feedback = payload.feedback.unwrap_or_default();
    check_client_files(&schema, &feedback, &Map::new()).map_err(feedback_error)?;
    validate_feedback(&schema, &feedback, &uploaded).map_err(feedback_error)?;

    let call_uuid = Uuid::new_v4();
    let stored = store_uploads(state.storage.as_ref(), call_uuid, payload.files).await?;
    let written: Vec<Value> = stored.iter().map(|(_, entry)| entry.clone()).collect();
    feedback.extend(stored);

    let call = Call {
        uuid: call_uuid,
        contact_product_uuid: target.contact_product,
        feedback: Value::Object(feedback),
        status: status.as_str().to_string(),
        made_by: Some(auth.user_id),
        made_on: Utc::now(),
    };

    let result = with_conn(&state.conn, move |conn| {
        conn.transaction(|conn| {
            diesel::insert_into(calls::table)
                .values(&call)
                .execute(conn)?;
            if status == CallStatus::Completed {
                apply_completed(conn, &target)?;
            }
            call_view(conn, call)
        })
    })
    .await;

    let view = match result {
        Ok(view) => view,
        Err(e) => {
            delete_files(state.storage.as_ref(), call_uuid, written.iter()).await;
            return Err(e);
        }
    };

    info!(
        "User {} logged {} call {} for contact product {}",
        auth.user_id, view.call.status, view.call.uuid, view.call.contact_product_uuid
    );
    Ok((StatusCode::CREATED, Json(view)))
}

pub async fn get_call(
    State(state): State<Arc<AppState>>,
    auth: AuthenticatedUser,
    ApiPath(uuid): ApiPath<Uuid>,
) -> Result<Json<CallView>, ApiError> {
    let view = with_conn(&state.conn, move |conn| {
        let call = load_call(conn, uuid)?;
        let institution_id = call_institution(conn, &call)?;
        require_member(conn, &auth, institution_id)?;
        call_view(conn, call)
    })
    .await?;
    Ok(Json(view))
}

/// Feedback for an update: the submitted (or current) answers, plus stored
/// files that are neither re-uploaded nor dropped from the form.
fn merge_feedback(
    schema: &FeedbackSchema,
    existing: &Map<String, Value>,
    submitted: Option<Map<String, Value>>,
    uploaded: &HashSet<String>,
) -> Map<String, Value> {
    let mut merged = submitted.unwrap_or_else(|| existing.clone());
    for (key, value) in existing {
        if is_stored_file(value) && !uploaded.contains(key) && schema.field(key).is_some() {
            merged.insert(key.clone(), value.clone());
        }
    }
    merged
}

/// Stored file entries of `before` that no longer appear in `after`.
fn orphaned_files(before: &Map<String, Value>, after: &Map<String, Value>) -> Vec<Value> {
    let kept: HashSet<&str> = after
        .values()
        .filter_map(|v| v.get("file_path").and_then(Value::as_str))
        .collect();
    before
        .values()
        .filter(|v| is_stored_file(v))
        .filter(|v| {
            v.get("file_path")
                .and_then(Value::as_str)
                .is_some_and(|p| !kept.contains(p))
        })
        .cloned()
        .collect()
}

pub async fn update_call(
    State(state): State<Arc<AppState>>,
    auth: AuthenticatedUser,
    ApiPath(uuid): ApiPath<Uuid>,
    payload: CallPayload,
) -> Result<Json<CallView>, ApiError> {
    let new_contact = parse_contact(payload.contact.as_deref())?;
    let new_status = parse_status(payload.status.as_deref())?;

    let member = auth.clone();
    let (call, target) = with_conn(&state.conn, move |conn| {
        let call = load_call(conn, uuid)?;
        let institution_id = call_institution(conn, &call)?;
        require_member(conn, &member, institution_id)?;
        let contact_product = new_contact.unwrap_or(call.contact_product_uuid);
        let target = target_in_institution(conn, contact_product, institution_id)?;
        Ok((call, target))
    })
    .await?;

    let schema = FeedbackSchema::from_stored(&target.feedback_fields);
    let uploaded = check_uploads(&schema, &payload.files)?;
    let existing = call.feedback.as_object().cloned().unwrap_or_default();
    if let Some(submitted) = &payload.feedback {
        check_client_files(&schema, submitted, &existing).map_err(feedback_error)?;
    }
    let call_uuid = call.uuid;
    let mut feedback = merge_feedback(&schema, &existing, payload.feedback, &uploaded);
    validate_feedback(&schema, &feedback, &uploaded).map_err(feedback_error)?;

    let stored = store_uploads(state.storage.as_ref(), call.uuid, payload.files).await?;
    let written: Vec<Value> = stored.iter().map(|(_, entry)| entry.clone()).collect();
    feedback.extend(stored);
    let orphaned = orphaned_files(&existing, &feedback);

    let status = new_status
        .or_else(|| call.call_status())
        .unwrap_or(CallStatus::Completed);

    let result = with_conn(&state.conn, move |conn| {
        conn.transaction(|conn| {
            let updated = diesel::update(calls::table.find(call.uuid))
                .set((
                    calls::contact_product_uuid.eq(target.contact_product),
                    calls::feedback.eq(Value::Object(feedback)),
                    calls::status.eq(status.as_str()),
                ))
                .returning(Call::as_returning())
                .get_result(conn)?;
            if status == CallStatus::Completed {
                apply_completed(conn, &target)?;
            }
            call_view(conn, updated)
        })
    })
    .await;

    let view = match result {
        Ok(view) => view,
        Err(e) => {
            delete_files(state.storage.as_ref(), call_uuid, written.iter()).await;
            return Err(e);
        }
    };

    delete_files(state.storage.as_ref(), call_uuid, orphaned.iter()).await;
    info!("Updated call {} ({})", view.call.uuid, view.call.status);
    Ok(Json(view))
}

pub async fn delete_call(
    State(state): State<Arc<AppState>>,
    auth: AuthenticatedUser,
    ApiPath(uuid): ApiPath<Uuid>,
) -> Result<StatusCode, ApiError> {
    let call = with_conn(&state.conn, move |conn| {
        let call = load_call(conn, uuid)?;
        let institution_id = call_institution(conn, &call)?;
        require_member(conn, &auth, institution_id)?;
        diesel::delete(calls::table.find(uuid)).execute(conn)?;
        Ok(call)
    })
    .await?;

    if let Some(feedback) = call.feedback.as_object() {
        delete_files(
            state.storage.as_ref(),
            uuid,
            feedback.values().filter(|v| is_stored_file(v)),
        )
        .await;
    } else if !call.feedback.is_null() {
        warn!("Call {} had non-object feedback", uuid);
    }

    info!("Deleted call {}", uuid);
    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_contact_calls(
    State(state): State<Arc<AppState>>,
    auth: AuthenticatedUser,
    ApiPath(contact_uuid): ApiPath<Uuid>,
) -> Result<Json<Vec<CallView>>, ApiError> {
    let views = with_conn(&state.conn, move |conn| {
        let contact = load_contact(conn, contact_uuid)?;
        require_member(conn, &auth, contact.institution_id)?;
        let rows = calls::table
            .inner_join(contact_products::table)
            .filter(contact_products::contact_uuid.eq(contact.uuid))
            .select(Call::as_select())
            .order(calls::made_on.desc())
            .load(conn)?;
        call_views(conn, rows)
    })
    .await?;
    Ok(Json(views))
}

pub async fn list_agent_calls(
    State(state): State<Arc<AppState>>,
    auth: AuthenticatedUser,
    ApiPath(agent_uuid): ApiPath<Uuid>,
) -> Result<Json<Vec<CallView>>, ApiError> {
    let views = with_conn(&state.conn, move |conn| {
        let agent = load_agent(conn, agent_uuid)?;
        require_member(conn, &auth, agent.institution_id)?;
        let user_id = agent_user_id(conn, &agent)?;
        let rows = calls::table
            .inner_join(contact_products::table.inner_join(contacts::table))
            .filter(calls::made_by.eq(user_id))
            .filter(contacts::institution_id.eq(agent.institution_id))
            .select(Call::as_select())
            .order(calls::made_on.desc())
            .load(conn)?;
        call_views(conn, rows)
    })
    .await?;
    Ok(Json(views))
}

pub async fn list_agent_groups(
    State(state): State<Arc<AppState>>,
    auth: AuthenticatedUser,
    ApiPath(agent_uuid): ApiPath<Uuid>,
) -> Result<Json<Vec<CallGroupView>>, ApiError> {
    let views = with_conn(&state.conn, move |conn| {
        let agent = load_agent(conn, agent_uuid)?;
        require_member(conn, &auth, agent.institution_id)?;
        let groups: Vec<CallGroup> = call_groups::table
            .inner_join(call_group_agents::table)
            .filter(call_group_agents::agent_uuid.eq(agent.uuid))
            .select(CallGroup::as_select())
            .order(call_groups::created_at.desc())
            .load(conn)?;
        group_views(conn, groups)
    })
    .await?;
    Ok(Json(views))
}
