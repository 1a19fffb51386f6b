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

use super::agents::load_agent;
use super::groups::load_group;
use super::status::ActiveStatus;
use super::types::{CallGroupAgent, CreateCallGroupAgentRequest, UpdateStatusRequest};
use crate::core::shared::error::{ApiError, ApiJson, ApiPath, FieldErrors};
use crate::core::shared::schema::{call_group_agents, call_groups};
use crate::core::shared::state::AppState;
use crate::core::shared::utils::with_conn;
use crate::institution::access::require_member;
use crate::security::auth::AuthenticatedUser;

fn load_group_agent(
    conn: &mut PgConnection,
    uuid: Uuid,
) -> Result<(CallGroupAgent, i32), ApiError> {
    call_group_agents::table
        .inner_join(call_groups::table)
        .filter(call_group_agents::uuid.eq(uuid))
        .select((CallGroupAgent::as_select(), call_groups::institution_id))
        .first(conn)
        .optional()?
        .ok_or_else(|| ApiError::NotFound("Call group agent not found.".into()))
}

pub async fn list_group_agents(
    State(state): State<Arc<AppState>>,
    auth: AuthenticatedUser,
    ApiPath(institution_id): ApiPath<i32>,
) -> Result<Json<Vec<CallGroupAgent>>, ApiError> {
    let rows = with_conn(&state.conn, move |conn| {
        require_member(conn, &auth, institution_id)?;
        call_group_agents::table
            .inner_join(call_groups::table)
            .filter(call_groups::institution_id.eq(institution_id))
            .select(CallGroupAgent::as_select())
            .order(call_group_agents::created_at.desc())
            .load(conn)
            .map_err(ApiError::from)
    })
    .await?;
    Ok(Json(rows))
}

pub async fn create_group_agent(
    State(state): State<Arc<AppState>>,
    auth: AuthenticatedUser,
    ApiPath(institution_id): ApiPath<i32>,
    ApiJson(req): ApiJson<CreateCallGroupAgentRequest>,
) -> Result<(StatusCode, Json<CallGroupAgent>), ApiError> {
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
        let agent_ok = match load_agent(conn, req.agent) {
            Ok(agent) => agent.institution_id == institution_id,
            Err(ApiError::NotFound(_)) => false,
            Err(e) => return Err(e),
        };
        if !agent_ok {
            errors.add("agent", "Agent does not belong to this institution.");
        }
        errors.into_result()?;

        diesel::insert_into(call_group_agents::table)
            .values(&CallGroupAgent {
                uuid: Uuid::new_v4(),
                call_group_uuid: req.call_group,
                agent_uuid: req.agent,
                status: req.status.unwrap_or(ActiveStatus::Active).as_str().to_string(),
                created_at: Utc::now(),
            })
            .returning(CallGroupAgent::as_returning())
            .get_result(conn)
            .map_err(ApiError::from)
    })
    .await?;

    info!("Added agent {} to call group {}", row.agent_uuid, row.call_group_uuid);
    Ok((StatusCode::CREATED, Json(row)))
}

pub async fn get_group_agent(
    State(state): State<Arc<AppState>>,
    auth: AuthenticatedUser,
    ApiPath(uuid): ApiPath<Uuid>,
) -> Result<Json<CallGroupAgent>, ApiError> {
    let row = with_conn(&state.conn, move |conn| {
        let (row, institution_id) = load_group_agent(conn, uuid)?;
        require_member(conn, &auth, institution_id)?;
        Ok(row)
    })
    .await?;
    Ok(Json(row))
}

pub async fn update_group_agent(
    State(state): State<Arc<AppState>>,
    auth: AuthenticatedUser,
    ApiPath(uuid): ApiPath<Uuid>,
    ApiJson(req): ApiJson<UpdateStatusRequest<ActiveStatus>>,
) -> Result<Json<CallGroupAgent>, ApiError> {
    let row = with_conn(&state.conn, move |conn| {
        let (row, institution_id) = load_group_agent(conn, uuid)?;
        require_member(conn, &auth, institution_id)?;
        match req.status {
            Some(status) => diesel::update(call_group_agents::table.find(uuid))
                .set(call_group_agents::status.eq(status.as_str()))
                .returning(CallGroupAgent::as_returning())
                .get_result(conn)
                .map_err(ApiError::from),
            None => Ok(row),
        }
    })
    .await?;

    info!("Updated call group agent {} ({})", row.uuid, row.status);
    Ok(Json(row))
}

pub async fn delete_group_agent(
    State(state): State<Arc<AppState>>,
    auth: AuthenticatedUser,
    ApiPath(uuid): ApiPath<Uuid>,
) -> Result<StatusCode, ApiError> {
    with_conn(&state.conn, move |conn| {
        let (_, institution_id) = load_group_agent(conn, uuid)?;
        require_member(conn, &auth, institution_id)?;
        diesel::delete(call_group_agents::table.find(uuid)).execute(conn)?;
        Ok(())
    })
    .await?;

    info!("Removed call group agent {}", uuid);
    Ok(StatusCode::NO_CONTENT)
}
